use regex::Regex;

/// A text pattern.
///
/// Patterns appear wherever the engine matches names or words structurally
/// instead of by literal equality: lexical grammar entries, re-typing rules
/// and environment pattern bindings.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Matches the exact text, optionally ignoring ASCII case.
    Equals {
        /// The text to compare against.
        text:             String,
        /// Whether comparison ignores ASCII case.
        case_insensitive: bool,
    },
    /// Matches when the regular expression matches.
    Regex(Regex),
    /// Matches when the predicate returns `true`.
    Custom(fn(&str) -> bool),
}

impl Pattern {
    /// Creates a case-sensitive literal pattern.
    #[must_use]
    pub fn equals(text: impl Into<String>) -> Self {
        Self::Equals { text:             text.into(),
                       case_insensitive: false, }
    }

    /// Creates a case-insensitive literal pattern.
    #[must_use]
    pub fn equals_ignore_case(text: impl Into<String>) -> Self {
        Self::Equals { text:             text.into(),
                       case_insensitive: true, }
    }

    /// Compiles a regular expression pattern.
    ///
    /// # Errors
    /// Returns the underlying [`regex::Error`] when the source does not
    /// compile.
    pub fn regex(source: &str) -> Result<Self, regex::Error> {
        Ok(Self::Regex(Regex::new(source)?))
    }

    /// Tests the pattern against a piece of text.
    ///
    /// # Example
    /// ```
    /// use formulary::util::pattern::Pattern;
    ///
    /// let pattern = Pattern::regex(r"^\w{2}::.+$").unwrap();
    /// assert!(pattern.is_match("ST:DX::level") == false);
    /// assert!(pattern.is_match("hp::max"));
    /// ```
    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        match self {
            Self::Equals { text: expected, case_insensitive } => {
                if *case_insensitive {
                    expected.eq_ignore_ascii_case(text)
                } else {
                    expected == text
                }
            },
            Self::Regex(regex) => regex.is_match(text),
            Self::Custom(test) => test(text),
        }
    }
}
