//! # formulary
//!
//! formulary is a domain-specific expression engine written in Rust.
//! It tokenizes, parses, simplifies and partially evaluates formula strings
//! (algebraic expressions, conditional `@if`-expressions, member access via
//! `::`, function calls, dice-roll notation, unit-aware quantities) used to
//! compute derived values from a symbolic scope of named variables.
//!
//! A formula that references names the environment cannot supply yet does
//! not fail: it folds as far as it can and comes back as a *residual* tree,
//! ready to be resolved again once more bindings arrive.

#![warn(
    clippy::redundant_clone,
    clippy::needless_pass_by_value,
    clippy::similar_names,
    clippy::large_enum_variant,
    clippy::string_lit_as_bytes,
    clippy::match_same_arms,
    clippy::cargo,
    clippy::nursery,
    clippy::perf,
    clippy::style,
    clippy::suspicious,
    clippy::correctness,
    clippy::complexity,
    clippy::pedantic,
)]
#![allow(clippy::missing_errors_doc)]

use crate::{
    error::ParseError,
    interpreter::{environment::Environment, symbol_table::SymbolTable},
    parser::SyntacticalContext,
    processor::{Processor, ResolveOptions},
    token::TokenKind,
};

pub use crate::processor::Resolution;

/// Defines the structure of parsed formulas.
///
/// This module declares the `Expr` and `Statement` types that represent the
/// syntactic structure of a formula as a tree. The AST is built by the
/// parser, rearranged by the rewriter and traversed by the interpreter.
///
/// # Responsibilities
/// - Defines expression and statement types for all formula constructs.
/// - Reconstructs source-equivalent text (`content`) and node signatures.
pub mod ast;
/// Dice notation parsing and keep-rule mechanics.
///
/// # Responsibilities
/// - Parses the `AdXk[hlc]Y` suffix grammar.
/// - Applies keep rules to rolled dice.
pub mod dice;
/// Provides unified error types for parsing, evaluation and resolution.
///
/// This module defines all hard failures the engine can raise. It carries
/// detailed information about each failure for debugging and user feedback;
/// soft failures (missing bindings) never surface here.
///
/// # Responsibilities
/// - Defines error enums for lexing/parsing and evaluation/resolution.
/// - Wraps both in `EngineError` for whole-pipeline callers.
pub mod error;
/// The function catalog: name → signature, data only.
///
/// # Responsibilities
/// - Declares which names are callable and what they return.
pub mod functions;
/// Partially evaluates parsed formulas against an environment.
///
/// This module ties together the runtime values, the scoped environment,
/// the symbol table and the evaluation dispatch. Evaluation either produces
/// a concrete value or a residual tree to retry later.
///
/// # Responsibilities
/// - Evaluates AST nodes over the fixed value kinds.
/// - Suspends structurally on missing data instead of failing.
/// - Indexes every touched name into the symbol table.
pub mod interpreter;
/// The lexer: raw text → ordered tokens.
///
/// # Responsibilities
/// - Splits, scans and classifies source text by the lexical grammar.
/// - Extracts `$name(...)` injections ahead of the main scan.
pub mod lexer;
/// The parser: tokens → AST, by precedence climbing.
///
/// # Responsibilities
/// - Drives prefix/infix parser functions from the grammar registries.
/// - Threads the syntactical context (expression/text) through recursion.
pub mod parser;
/// Orchestrates repeated rewrite/evaluate cycles to a fixpoint.
///
/// # Responsibilities
/// - Parses expressions, resolving injections recursively.
/// - Prunes trees until resolved or converged, bounded by a ceiling.
/// - Retries resolution when the environment version moves.
pub mod processor;
/// Pattern → replacement term rewriting over the AST.
///
/// # Responsibilities
/// - Applies an open ruleset in one post-order pass per call.
/// - Ships the default algebraic simplification rules.
pub mod rewriter;
/// Tokens, lexemes and token kinds.
///
/// # Responsibilities
/// - Defines the closed set of token kinds and their categories.
/// - Distinguishes lexical tokens (with spans) from artificial ones.
pub mod token;
/// Units of measure and the unit catalog.
///
/// # Responsibilities
/// - Defines units, quantities and the symbol → unit lookup.
pub mod units;
/// General utilities: numeric formatting and text patterns.
pub mod util;

/// Parses and resolves a formula against an environment, with every
/// default: grammars, ruleset, base units and built-in function
/// signatures.
///
/// This is the convenience entry point; callers needing custom grammars,
/// rewrite rules, hooks or resolve options build a
/// [`Processor`](processor::Processor) themselves.
///
/// # Errors
/// Returns an error when parsing fails, when an injection cannot resolve,
/// or when evaluation hits a hard failure. A formula that merely references
/// unknown names succeeds with an *unresolved* resolution carrying the
/// residual tree.
///
/// # Examples
/// ```
/// use formulary::interpreter::environment::Environment;
/// use formulary::interpreter::value::RuntimeValue;
///
/// let mut environment = Environment::new("sheet");
/// let resolution = formulary::resolve_expression("10 + 2 * 3", &mut environment).unwrap();
/// assert_eq!(resolution.content, "16");
///
/// // Unknown names fold partially and stay residual.
/// let residual = formulary::resolve_expression("x + 1", &mut environment).unwrap();
/// assert!(!residual.is_resolved());
/// assert_eq!(residual.content, "x + 1");
///
/// // Bind the name and the same formula resolves.
/// environment.assign_value("x", RuntimeValue::Number(5.0)).unwrap();
/// let resolved = formulary::resolve_expression("x + 1", &mut environment).unwrap();
/// assert_eq!(resolved.content, "6");
/// ```
pub fn resolve_expression(source: &str,
                          environment: &mut Environment)
                          -> Result<Resolution, Box<dyn std::error::Error>> {
    let processor = Processor::default_processor();
    let mut symbols = SymbolTable::new();
    let context = SyntacticalContext::expression();

    let parsed = processor.parse(source, environment, &mut symbols, &context)?;

    let Some(ast) = parsed.ast else {
        let index = parsed.tokens
                          .iter()
                          .find(|token| token.kind == TokenKind::InjectionPlaceholder)
                          .and_then(|token| token.content[1..].parse().ok())
                          .unwrap_or(0);
        return Err(Box::new(ParseError::UnresolvedInjection { index }));
    };

    let resolution = processor.resolve(&ast, environment, &mut symbols, ResolveOptions::new(context))?;

    Ok(resolution)
}
