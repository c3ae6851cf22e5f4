//! Syntactic analysis.
//!
//! The parser turns the lexer's token stream into an abstract syntax tree
//! by precedence climbing (Pratt parsing): each token kind is bound, per
//! denotation, to a binding power and a parser function in the
//! [`SyntacticalGrammar`]. The parser itself only owns the cursor; all
//! decisions live in the grammar's registries, which is what keeps the
//! grammar extensible without touching this file.

use crate::{
    ast::Statement,
    error::ParseError,
    token::{Token, TokenKind},
};

/// Grammar used exclusively by the parser.
pub mod grammar;
/// The default parser functions.
pub mod parsers;

pub use grammar::{
    BindingPower, Denotation, ParserFunction, ReTyper, SyntacticalContext, SyntacticalGrammar,
    SyntaxMode, binding_powers, create_retyper,
};

/// The parser: tokens in, one statement out.
#[derive(Debug)]
pub struct Parser<'g> {
    /// The grammar every decision is delegated to.
    pub grammar: &'g SyntacticalGrammar,
    tokens:      Vec<Token>,
    cursor:      usize,
}

impl<'g> Parser<'g> {
    /// Parses a token stream into a statement.
    ///
    /// Trailing tokens beyond the first statement are consumed and
    /// discarded; a formula is one statement.
    ///
    /// # Errors
    /// Returns a [`ParseError`] when no parser is registered for a token
    /// kind in the position it appears in, or when a required token is
    /// missing.
    pub fn process(grammar: &'g SyntacticalGrammar,
                   tokens: Vec<Token>,
                   context: &SyntacticalContext)
                   -> Result<Statement, ParseError> {
        let mut parser = Self { grammar,
                                tokens,
                                cursor: 0 };

        parser.parse(context)
    }

    fn parse(&mut self, context: &SyntacticalContext) -> Result<Statement, ParseError> {
        let mut statements = Vec::new();

        loop {
            self.skip_whitespace();
            if !self.has_tokens() {
                break;
            }

            let statement =
                self.grammar
                    .parse_statement(self, grammar::binding_powers::DEFAULT, context)?;
            statements.push(statement);
        }

        statements.into_iter().next().ok_or(ParseError::UnexpectedEndOfInput)
    }

    // #region CURSOR

    /// Check if there are still tokens to be consumed.
    #[must_use]
    pub fn has_tokens(&self) -> bool {
        self.cursor < self.tokens.len()
    }

    /// Peek the current token kind.
    #[must_use]
    pub fn peek(&self) -> Option<TokenKind> {
        self.peek_at(0)
    }

    /// Peek the token kind `offset` positions ahead of the cursor.
    #[must_use]
    pub fn peek_at(&self, offset: usize) -> Option<TokenKind> {
        self.tokens.get(self.cursor + offset).map(|token| token.kind)
    }

    /// Returns the current token without advancing.
    #[must_use]
    pub fn current(&self) -> Option<&Token> {
        self.tokens.get(self.cursor)
    }

    /// Advances past the current token and returns it.
    ///
    /// # Errors
    /// Returns [`ParseError::UnexpectedEndOfInput`] when no token remains.
    pub fn next(&mut self) -> Result<Token, ParseError> {
        let token = self.tokens.get(self.cursor).cloned().ok_or(ParseError::UnexpectedEndOfInput)?;
        self.cursor += 1;

        Ok(token)
    }

    /// Advances past the current token, requiring a specific kind.
    ///
    /// # Errors
    /// Returns [`ParseError::UnexpectedKind`] when the current token is of
    /// another kind, [`ParseError::UnexpectedEndOfInput`] when none
    /// remains.
    pub fn expect(&mut self, expected: TokenKind) -> Result<Token, ParseError> {
        let token = self.next()?;
        if token.kind != expected {
            return Err(ParseError::UnexpectedKind {
                expected: expected.name().to_string(),
                found:    token.kind.name().to_string(),
                at:       token.span.map_or(0, |span| span.start),
            });
        }

        Ok(token)
    }

    /// Consumes any run of whitespace tokens at the cursor.
    pub fn skip_whitespace(&mut self) {
        while self.peek() == Some(TokenKind::Whitespace) {
            self.cursor += 1;
        }
    }

    // #endregion
}
