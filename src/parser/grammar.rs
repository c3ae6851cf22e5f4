//! Grammar used exclusively by the parser (syntactic analysis).
//!
//! The grammar is a set of runtime registries: named parser functions, a
//! binding-power table keyed by (denotation, token kind), re-typing rules,
//! and the unit catalog. Domain extensions add or replace entries without
//! touching the parser itself.

use std::collections::HashMap;

use crate::{
    ast::{Expr, NodeType, Statement},
    error::ParseError,
    parser::Parser,
    token::TokenKind,
    units::{Unit, UnitCatalog},
    util::pattern::Pattern,
};

/// Precedence used to decide how much input an operator consumes.
pub type BindingPower = u8;

/// The binding-power ladder.
///
/// Left-associativity falls out of the Pratt loop: an infix parser asks for
/// the right operand at its own power, so an equal-power operator to the
/// right does not bind.
pub mod binding_powers {
    use super::BindingPower;

    /// Statement level; also the floor for grouped expressions.
    pub const DEFAULT: BindingPower = 0;
    /// Argument separators.
    pub const COMMA: BindingPower = 1;
    /// The level call arguments are parsed at.
    pub const ASSIGNMENT: BindingPower = 2;
    /// `&`, `|`.
    pub const LOGICAL: BindingPower = 3;
    /// `=`, `!=`, `>`, `<`, `>=`, `<=`.
    pub const RELATIONAL: BindingPower = 4;
    /// `+`, `-`.
    pub const ADDITIVE: BindingPower = 5;
    /// `*`, `/`; also implicit multiplication.
    pub const MULTIPLICATIVE: BindingPower = 6;
    /// Unary `+`/`-`.
    pub const PREFIX: BindingPower = 7;
    /// `::`
    pub const MEMBER: BindingPower = 8;
    /// `(...)` after a callee.
    pub const CALL: BindingPower = 9;
    /// Literals and glue.
    pub const PRIMARY: BindingPower = 10;
}

/// How a parser function is invoked: with no left operand yet (`prefix`),
/// with an existing left operand (`infix`), or at statement level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Denotation {
    /// Statement-level entry.
    Statement,
    /// Null denotation; begins an expression.
    Prefix,
    /// Left denotation; extends an expression to its left.
    Infix,
}

impl std::fmt::Display for Denotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Statement => "statement",
            Self::Prefix => "prefix",
            Self::Infix => "infix",
        };
        write!(f, "{name}")
    }
}

/// Parses a statement from the token stream.
pub type StatementParser =
    fn(&mut Parser<'_>, &SyntacticalContext) -> Result<Statement, ParseError>;
/// Begins an expression with no left operand.
pub type PrefixParser = fn(&mut Parser<'_>, &SyntacticalContext) -> Result<Expr, ParseError>;
/// Extends an existing left operand.
pub type InfixParser =
    fn(&mut Parser<'_>, Expr, BindingPower, &SyntacticalContext) -> Result<Expr, ParseError>;
/// Finishes a glued string literal (re-typing, units, dice).
pub type TextParser = fn(&mut Parser<'_>, Expr, &SyntacticalContext) -> Result<Expr, ParseError>;
/// Entry point driving the Pratt loop.
pub type ExpressionEntry =
    fn(&mut Parser<'_>, BindingPower, &SyntacticalContext) -> Result<Expr, ParseError>;
/// Entry point driving statement parsing.
pub type StatementEntry =
    fn(&mut Parser<'_>, BindingPower, &SyntacticalContext) -> Result<Statement, ParseError>;

/// A named, registrable parser function.
#[derive(Debug, Clone, Copy)]
pub enum ParserFunction {
    /// A statement-level parser.
    Statement(StatementParser),
    /// A prefix parser.
    Prefix(PrefixParser),
    /// An infix parser.
    Infix(InfixParser),
    /// A string-literal finisher.
    Text(TextParser),
}

/// Binds a (denotation, kind) pair to a binding power and a parser by name.
#[derive(Debug, Clone)]
pub struct ParserBinding {
    /// The binding power the Pratt loop compares against.
    pub binding_power: BindingPower,
    /// The registry name of the parser function.
    pub parser:        String,
}

/// A re-typing rule: reclassifies a string literal whose content matches a
/// pattern into another node type.
#[derive(Debug, Clone)]
pub struct ReTyper {
    /// Identifying key; later registrations with the same key replace
    /// earlier ones.
    pub key:     String,
    /// The pattern the literal's content must match.
    pub pattern: Pattern,
    /// The node type to reclassify into.
    pub target:  NodeType,
}

/// Creates a [`ReTyper`] entry.
#[must_use]
pub fn create_retyper(key: impl Into<String>, pattern: Pattern, target: NodeType) -> ReTyper {
    ReTyper { key: key.into(),
              pattern,
              target }
}

/// The mode a piece of source is parsed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxMode {
    /// Operators and calls carry their usual meaning.
    Expression,
    /// Bare tokens default to text; adjacent words glue into one literal.
    Text,
    /// Inside the branches of a conditional.
    If,
}

/// Context threaded through the whole parse recursion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntacticalContext {
    /// How bare tokens default.
    pub mode: SyntaxMode,
}

impl SyntacticalContext {
    /// Context for ordinary formula parsing.
    #[must_use]
    pub const fn expression() -> Self {
        Self { mode: SyntaxMode::Expression }
    }

    /// Context for free-text parsing.
    #[must_use]
    pub const fn text() -> Self {
        Self { mode: SyntaxMode::Text }
    }
}

/// The syntactic grammar.
///
/// Holds the parser-function registry, the binding-power table, the
/// re-typing rules and the unit catalog, plus the two entry functions the
/// parser drives everything through.
#[derive(Debug, Clone)]
pub struct SyntacticalGrammar {
    functions:        HashMap<String, ParserFunction>,
    bindings:         HashMap<(Denotation, TokenKind), ParserBinding>,
    retypers:         Vec<ReTyper>,
    units:            UnitCatalog,
    expression_entry: ExpressionEntry,
    statement_entry:  StatementEntry,
}

impl SyntacticalGrammar {
    /// Creates an empty grammar with the given entry functions and unit
    /// catalog.
    #[must_use]
    pub fn new(expression_entry: ExpressionEntry,
               statement_entry: StatementEntry,
               units: UnitCatalog)
               -> Self {
        Self { functions: HashMap::new(),
               bindings: HashMap::new(),
               retypers: Vec::new(),
               units,
               expression_entry,
               statement_entry }
    }

    /// Creates the default grammar over a unit catalog.
    #[must_use]
    pub fn default_grammar(units: UnitCatalog) -> Self {
        crate::parser::parsers::default_grammar(units)
    }

    // #region REGISTRIES

    /// Registers a parser function by name, replacing any previous one.
    pub fn register_function(&mut self, name: impl Into<String>, function: ParserFunction) {
        self.functions.insert(name.into(), function);
    }

    /// Binds a (denotation, kind) pair to a binding power and a registered
    /// parser name.
    pub fn bind(&mut self,
                denotation: Denotation,
                kind: TokenKind,
                binding_power: BindingPower,
                parser: impl Into<String>) {
        self.bindings.insert((denotation, kind),
                             ParserBinding { binding_power,
                                             parser: parser.into() });
    }

    /// Registers a re-typing rule, replacing any previous rule with the
    /// same key.
    pub fn register_retyper(&mut self, retyper: ReTyper) {
        if let Some(existing) = self.retypers.iter_mut().find(|r| r.key == retyper.key) {
            *existing = retyper;
        } else {
            self.retypers.push(retyper);
        }
    }

    // #endregion

    // #region LOOKUPS

    /// Returns the binding power bound for a (denotation, kind) pair.
    #[must_use]
    pub fn binding_power(&self, denotation: Denotation, kind: TokenKind) -> Option<BindingPower> {
        self.bindings.get(&(denotation, kind)).map(|binding| binding.binding_power)
    }

    /// Returns the statement parser bound for a kind, if any.
    ///
    /// Unlike expression denotations, a missing statement binding is not an
    /// error; the parser falls back to an expression statement.
    #[must_use]
    pub fn statement_parser(&self, kind: TokenKind) -> Option<StatementParser> {
        let binding = self.bindings.get(&(Denotation::Statement, kind))?;
        match self.functions.get(&binding.parser) {
            Some(ParserFunction::Statement(parser)) => Some(*parser),
            _ => None,
        }
    }

    /// Returns the prefix parser bound for a kind.
    ///
    /// # Errors
    /// A missing binding or registry entry is a hard
    /// [`ParseError::MissingParser`]; there is nothing sensible to do with
    /// a token no parser claims.
    pub fn prefix_parser(&self, kind: TokenKind) -> Result<PrefixParser, ParseError> {
        let binding = self.bindings
                          .get(&(Denotation::Prefix, kind))
                          .ok_or_else(|| missing(Denotation::Prefix, kind))?;
        match self.functions.get(&binding.parser) {
            Some(ParserFunction::Prefix(parser)) => Ok(*parser),
            _ => Err(ParseError::UnknownParserFunction { name: binding.parser.clone() }),
        }
    }

    /// Returns the infix parser bound for a kind.
    ///
    /// # Errors
    /// A missing binding or registry entry is a hard
    /// [`ParseError::MissingParser`].
    pub fn infix_parser(&self, kind: TokenKind) -> Result<InfixParser, ParseError> {
        let binding = self.bindings
                          .get(&(Denotation::Infix, kind))
                          .ok_or_else(|| missing(Denotation::Infix, kind))?;
        match self.functions.get(&binding.parser) {
            Some(ParserFunction::Infix(parser)) => Ok(*parser),
            _ => Err(ParseError::UnknownParserFunction { name: binding.parser.clone() }),
        }
    }

    /// Returns a registered infix parser by name (for cross-calls between
    /// parser functions).
    ///
    /// # Errors
    /// Returns [`ParseError::UnknownParserFunction`] when the name is
    /// missing or bound to another shape.
    pub fn named_infix(&self, name: &str) -> Result<InfixParser, ParseError> {
        match self.functions.get(name) {
            Some(ParserFunction::Infix(parser)) => Ok(*parser),
            _ => Err(ParseError::UnknownParserFunction { name: name.to_string() }),
        }
    }

    /// Returns a registered string-literal finisher by name.
    ///
    /// # Errors
    /// Returns [`ParseError::UnknownParserFunction`] when the name is
    /// missing or bound to another shape.
    pub fn named_text(&self, name: &str) -> Result<TextParser, ParseError> {
        match self.functions.get(name) {
            Some(ParserFunction::Text(parser)) => Ok(*parser),
            _ => Err(ParseError::UnknownParserFunction { name: name.to_string() }),
        }
    }

    /// Returns the target type of the first re-typing rule matching the
    /// content, if any.
    #[must_use]
    pub fn should_retype(&self, content: &str) -> Option<NodeType> {
        self.retypers
            .iter()
            .find(|retyper| retyper.pattern.is_match(content))
            .map(|retyper| retyper.target)
    }

    /// Looks the content up in the unit catalog.
    #[must_use]
    pub fn unit(&self, content: &str) -> Option<&Unit> {
        self.units.lookup(content)
    }

    // #endregion

    // #region ENTRY POINTS

    /// Parses an expression until something at or below the minimum binding
    /// power is reached.
    ///
    /// # Errors
    /// Propagates any [`ParseError`] from the registered parser functions.
    pub fn parse_expression(&self,
                            p: &mut Parser<'_>,
                            minimum: BindingPower,
                            context: &SyntacticalContext)
                            -> Result<Expr, ParseError> {
        (self.expression_entry)(p, minimum, context)
    }

    /// Parses one statement.
    ///
    /// # Errors
    /// Propagates any [`ParseError`] from the registered parser functions.
    pub fn parse_statement(&self,
                           p: &mut Parser<'_>,
                           minimum: BindingPower,
                           context: &SyntacticalContext)
                           -> Result<Statement, ParseError> {
        (self.statement_entry)(p, minimum, context)
    }

    // #endregion
}

fn missing(denotation: Denotation, kind: TokenKind) -> ParseError {
    ParseError::MissingParser { denotation: denotation.to_string(),
                                kind:       kind.name().to_string(), }
}
