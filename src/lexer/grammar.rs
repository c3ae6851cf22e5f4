//! Grammar used exclusively by the lexer (lexical analysis, tokenization).

use std::sync::LazyLock;

use regex::Regex;

use crate::{token::TokenKind, util::pattern::Pattern};

/// Priority band for keywords. Lower numbers win the scan.
pub const KEYWORD_PRIORITY: u32 = 1;
/// Priority band for literals.
pub const LITERAL_PRIORITY: u32 = 4;
/// Priority band for operators.
pub const OPERATOR_PRIORITY: u32 = 10;
/// Priority band for separators.
pub const SEPARATOR_PRIORITY: u32 = 20;

/// One entry of the lexical grammar.
///
/// An entry claims a span of text for a token kind. When several entries
/// claim overlapping spans starting at the same cursor, the one with the
/// *lowest* priority number wins, ties broken by the longest match.
#[derive(Debug, Clone)]
pub struct LexicalEntry {
    /// Scan priority; lower is stronger.
    pub priority: u32,
    /// The token kind produced on a match.
    pub kind:     TokenKind,
    /// The pattern a span must satisfy.
    pub pattern:  Pattern,
}

/// Creates a [`LexicalEntry`].
#[must_use]
pub fn create_entry(priority: u32, kind: TokenKind, pattern: Pattern) -> LexicalEntry {
    LexicalEntry { priority, kind, pattern }
}

/// The lexical grammar: the ordered set of entries the lexer scans with.
///
/// The grammar is a runtime registry. Domain extensions add or replace
/// entries without touching the lexer itself.
#[derive(Debug, Clone, Default)]
pub struct LexicalGrammar {
    entries: Vec<LexicalEntry>,
}

impl LexicalGrammar {
    /// Creates an empty grammar.
    #[must_use]
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Creates the default grammar: keywords, numeric and textual literals,
    /// operators and separators.
    #[must_use]
    pub fn default_grammar() -> Self {
        let mut grammar = Self::new();
        grammar.register_all(default_entries());

        grammar
    }

    /// Registers an entry, replacing any previous entry for the same kind.
    pub fn register(&mut self, entry: LexicalEntry) -> &mut Self {
        if let Some(existing) = self.entries.iter_mut().find(|e| e.kind == entry.kind) {
            *existing = entry;
        } else {
            self.entries.push(entry);
        }

        self
    }

    /// Registers several entries at once.
    pub fn register_all(&mut self, entries: impl IntoIterator<Item = LexicalEntry>) -> &mut Self {
        for entry in entries {
            self.register(entry);
        }

        self
    }

    /// Returns every entry whose pattern matches the word.
    pub fn matches<'g>(&'g self, word: &str) -> impl Iterator<Item = &'g LexicalEntry> {
        self.entries.iter().filter(move |entry| entry.pattern.is_match(word))
    }
}

static NUMBER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(([0-9]+)|(\.[0-9]+)|([0-9]+\.[0-9]+))$").expect("number pattern compiles")
});
static TEXT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-Za-z_$@:.?!]+$").expect("text pattern compiles"));
static IF_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?i)[@$]if$").expect("if pattern compiles"));
static PLACEHOLDER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\$[0-9]+$").expect("placeholder pattern compiles"));

fn default_entries() -> Vec<LexicalEntry> {
    use TokenKind::{
        Ampersand, Asterisk, CloseBrace, CloseBracket, CloseParenthesis, Comma, Dash, Else, Equals,
        Greater, GreaterOrEqual, If, InjectionPlaceholder, NotEquals, Number, OpenBrace,
        OpenBracket, OpenParenthesis, Percent, Pipe, Plus, Quotes, SemiColon, Slash, Smaller,
        SmallerOrEqual, Text, Then,
    };

    vec![// keywords
         create_entry(KEYWORD_PRIORITY, If, Pattern::Regex(IF_PATTERN.clone())),
         create_entry(KEYWORD_PRIORITY + 1, Then, Pattern::equals_ignore_case("then")),
         create_entry(KEYWORD_PRIORITY + 1, Else, Pattern::equals_ignore_case("else")),
         // literals
         create_entry(LITERAL_PRIORITY - 1,
                      InjectionPlaceholder,
                      Pattern::Regex(PLACEHOLDER_PATTERN.clone())),
         create_entry(LITERAL_PRIORITY, Number, Pattern::Regex(NUMBER_PATTERN.clone())),
         create_entry(LITERAL_PRIORITY + 1, Text, Pattern::Regex(TEXT_PATTERN.clone())),
         // operators
         create_entry(OPERATOR_PRIORITY, NotEquals, Pattern::equals("!=")),
         create_entry(OPERATOR_PRIORITY + 1, Equals, Pattern::equals("=")),
         create_entry(OPERATOR_PRIORITY + 2, GreaterOrEqual, Pattern::equals(">=")),
         create_entry(OPERATOR_PRIORITY + 2, SmallerOrEqual, Pattern::equals("<=")),
         create_entry(OPERATOR_PRIORITY + 3, Greater, Pattern::equals(">")),
         create_entry(OPERATOR_PRIORITY + 3, Smaller, Pattern::equals("<")),
         create_entry(OPERATOR_PRIORITY + 4, Asterisk, Pattern::equals("*")),
         create_entry(OPERATOR_PRIORITY + 4, Slash, Pattern::equals("/")),
         create_entry(OPERATOR_PRIORITY + 5, Plus, Pattern::equals("+")),
         create_entry(OPERATOR_PRIORITY + 5, Dash, Pattern::equals("-")),
         create_entry(OPERATOR_PRIORITY + 6, Ampersand, Pattern::equals("&")),
         create_entry(OPERATOR_PRIORITY + 7, Pipe, Pattern::equals("|")),
         // separators
         create_entry(SEPARATOR_PRIORITY, Comma, Pattern::equals(",")),
         create_entry(SEPARATOR_PRIORITY + 1, SemiColon, Pattern::equals(";")),
         create_entry(SEPARATOR_PRIORITY + 2, OpenParenthesis, Pattern::equals("(")),
         create_entry(SEPARATOR_PRIORITY + 2, CloseParenthesis, Pattern::equals(")")),
         create_entry(SEPARATOR_PRIORITY + 3, OpenBracket, Pattern::equals("[")),
         create_entry(SEPARATOR_PRIORITY + 3, CloseBracket, Pattern::equals("]")),
         create_entry(SEPARATOR_PRIORITY + 4, OpenBrace, Pattern::equals("{")),
         create_entry(SEPARATOR_PRIORITY + 4, CloseBrace, Pattern::equals("}")),
         create_entry(SEPARATOR_PRIORITY + 5, Quotes, Pattern::equals("\"")),
         create_entry(SEPARATOR_PRIORITY + 6, Percent, Pattern::equals("%"))]
}
