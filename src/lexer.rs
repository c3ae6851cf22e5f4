//! Lexical analysis in three stages.
//!
//! 1. **Extract** — nested `$name(...)` sub-expressions (injections) are cut
//!    out and replaced by index placeholders, so call syntax can embed
//!    recursively inside otherwise free text.
//! 2. **Split** — the expression breaks into whitespace-delimited words,
//!    with `::` kept atomic.
//! 3. **Scan** — each word is consumed by maximal munch against the lexical
//!    grammar, preferring the entry with the lowest priority number and
//!    breaking ties by the longest match. Characters nothing claims become
//!    `unknown` tokens instead of aborting the scan.

use crate::{
    error::ParseError,
    token::{Lexeme, Span, Token, TokenKind},
};

/// Grammar used exclusively by the lexer.
pub mod grammar;

pub use grammar::{LexicalEntry, LexicalGrammar, create_entry};

/// A nested sub-expression extracted before the main scan.
///
/// The injection's text is processed independently (it goes through the
/// whole pipeline again) and its resolved value replaces the `$N`
/// placeholder left in the token stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Injection {
    /// Position of this injection; the placeholder reads `$index`.
    pub index:      usize,
    /// The injection function name (`eval`, `solver`, ...).
    pub name:       String,
    /// The text between the injection's parentheses.
    pub expression: String,
    /// Byte offset of the `$` in the original expression.
    pub at:         usize,
}

/// The output of one lexer run: ordered tokens plus extracted injections.
#[derive(Debug, Clone)]
pub struct Scan {
    /// The tokens, in source order. Whitespace is kept.
    pub tokens:     Vec<Token>,
    /// Injections extracted before scanning, in placeholder order.
    pub injections: Vec<Injection>,
}

/// The lexer: raw text in, ordered tokens and injections out.
#[derive(Debug, Clone, Copy)]
pub struct Lexer<'g> {
    grammar: &'g LexicalGrammar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WordKind {
    Word,
    Whitespace,
    DoubleColon,
}

#[derive(Debug, Clone, Copy)]
struct Word {
    kind:   WordKind,
    start:  usize,
    length: usize,
}

impl<'g> Lexer<'g> {
    /// Creates a lexer over a lexical grammar.
    #[must_use]
    pub const fn new(grammar: &'g LexicalGrammar) -> Self {
        Self { grammar }
    }

    /// Tokenizes an expression.
    ///
    /// # Errors
    /// Returns [`ParseError::UnbalancedInjection`] when a `$name(...)`
    /// injection never closes its parentheses. Everything else is fail-soft:
    /// unclaimed characters come back as `unknown` tokens.
    ///
    /// # Example
    /// ```
    /// use formulary::lexer::{Lexer, LexicalGrammar};
    ///
    /// let grammar = LexicalGrammar::default_grammar();
    /// let scan = Lexer::new(&grammar).process("10 + 2 * 3").unwrap();
    ///
    /// let contents: Vec<&str> = scan.tokens.iter().map(|t| t.content.as_str()).collect();
    /// assert_eq!(contents, ["10", " ", "+", " ", "2", " ", "*", " ", "3"]);
    /// ```
    pub fn process(&self, expression: &str) -> Result<Scan, ParseError> {
        let (stripped, injections) = extract_injections(expression)?;

        let words = split(&stripped);
        let tokens = self.scan(&stripped, &words);

        Ok(Scan { tokens, injections })
    }

    /// Scans words into tokens by maximal munch against the grammar.
    fn scan(&self, source: &str, words: &[Word]) -> Vec<Token> {
        let mut tokens = Vec::new();

        for word in words {
            // 1. Word kind was decided by splitting.
            if word.kind != WordKind::Word {
                let kind = match word.kind {
                    WordKind::Whitespace => TokenKind::Whitespace,
                    _ => TokenKind::DoubleColon,
                };
                let lexeme = Lexeme { kind,
                                      span: Span { start:  word.start,
                                                   length: word.length, } };
                tokens.push(lexeme.evaluate(source));
                continue;
            }

            // 2. A word can break into many lexemes.
            let up_to = word.start + word.length;
            let mut cursor = word.start;
            while cursor < up_to {
                let lexeme = self.lookahead(source, cursor, up_to);
                tokens.push(lexeme.evaluate(source));
                cursor += lexeme.span.length;
            }
        }

        tokens
    }

    /// Returns the next lexeme, looking ahead no further than `up_to`.
    ///
    /// Every prefix of the remaining word is tested against the grammar;
    /// the winning possibility has the lowest priority number, ties broken
    /// by the longest match. With no possibility at all, the first
    /// character degrades to an `unknown` lexeme.
    fn lookahead(&self, source: &str, cursor: usize, up_to: usize) -> Lexeme {
        let word = &source[cursor..up_to];

        let mut best: Option<(u32, usize, TokenKind)> = None;

        let mut length = 0;
        for character in word.chars() {
            length += character.len_utf8();
            let sequence = &word[..length];

            for entry in self.grammar.matches(sequence) {
                let better = match best {
                    None => true,
                    Some((priority, best_length, _)) => {
                        entry.priority < priority
                        || (entry.priority == priority && length > best_length)
                    },
                };

                if better {
                    best = Some((entry.priority, length, entry.kind));
                }
            }
        }

        match best {
            Some((_, length, kind)) => Lexeme { kind,
                                                span: Span { start: cursor, length } },
            None => {
                // Unclaimed character; emit it as unknown and move on.
                let length = word.chars().next().map_or(1, char::len_utf8);
                Lexeme { kind: TokenKind::Unknown,
                         span: Span { start: cursor, length } }
            },
        }
    }
}

/// Splits an expression into words.
///
/// Whitespace breaks words and is kept as its own word; a double colon is
/// atomic and also breaks words, so `a::b` splits into three.
fn split(expression: &str) -> Vec<Word> {
    let mut words: Vec<Word> = Vec::new();

    let bytes = expression.as_bytes();
    let mut skip_until = 0;

    for (offset, character) in expression.char_indices() {
        if offset < skip_until {
            continue; // second half of a double colon
        }

        let (kind, length) = if character == ':' && bytes.get(offset + 1) == Some(&b':') {
            (WordKind::DoubleColon, 2)
        } else if character.is_whitespace() {
            (WordKind::Whitespace, character.len_utf8())
        } else {
            (WordKind::Word, character.len_utf8())
        };

        skip_until = offset + length;

        match words.last_mut() {
            // A double colon always stands alone; everything else merges
            // into a contiguous word of the same kind.
            Some(word) if word.kind == kind && kind != WordKind::DoubleColon => {
                word.length += length;
            },
            _ => words.push(Word { kind,
                                   start: offset,
                                   length }),
        }
    }

    words
}

/// Extracts `$name(...)` injections, replacing each with `$N`.
///
/// Injections nest: an inner `$name(...)` stays inside the extracted text
/// and is handled when that text is processed in turn. The `$if` keyword is
/// not an injection.
fn extract_injections(expression: &str) -> Result<(String, Vec<Injection>), ParseError> {
    let mut output = String::with_capacity(expression.len());
    let mut injections = Vec::new();

    let bytes = expression.as_bytes();
    let mut cursor = 0;

    while cursor < expression.len() {
        let rest = &expression[cursor..];

        let Some(header) = injection_header(rest) else {
            let character = rest.chars().next().unwrap_or('\0');
            output.push(character);
            cursor += character.len_utf8();
            continue;
        };

        let (name, body_start) = header;

        // Consume up to the balancing close parenthesis.
        let mut depth = 1usize;
        let mut index = cursor + body_start;
        let mut body_end = None;
        while index < expression.len() {
            match bytes[index] {
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        body_end = Some(index);
                        break;
                    }
                },
                _ => {},
            }
            index += 1;
        }

        let Some(body_end) = body_end else {
            return Err(ParseError::UnbalancedInjection { at: cursor });
        };

        let injection = Injection { index: injections.len(),
                                    name,
                                    expression: expression[cursor + body_start..body_end]
                                        .to_string(),
                                    at: cursor };
        output.push_str(&format!("${}", injection.index));
        injections.push(injection);

        cursor = body_end + 1;
    }

    Ok((output, injections))
}

/// Recognizes `$name(` at the start of the slice.
///
/// Returns the name and the byte offset just past the opening parenthesis.
/// `$if` belongs to the keyword grammar, not to injections.
fn injection_header(rest: &str) -> Option<(String, usize)> {
    let mut characters = rest.char_indices();

    let (_, dollar) = characters.next()?;
    if dollar != '$' {
        return None;
    }

    let mut name = String::new();
    for (offset, character) in characters {
        if character == '(' {
            if name.is_empty() || name.eq_ignore_ascii_case("if") {
                return None;
            }
            return Some((name, offset + 1));
        }

        let valid = character.is_ascii_alphanumeric() || character == '_';
        let leading_digit = name.is_empty() && character.is_ascii_digit();
        if !valid || leading_digit {
            return None;
        }

        name.push(character);
    }

    None
}
