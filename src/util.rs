/// Numeric formatting helpers shared by literals and runtime values.
///
/// # Responsibilities
/// - Render `f64` values the way they are written in formulas (no trailing
///   `.0` for whole numbers).
pub mod num;
/// Text patterns used across the engine.
///
/// Patterns back the lexical grammar matchers, the parser's re-typing rules
/// and the environment's pattern bindings.
///
/// # Responsibilities
/// - Defines the `Pattern` enum (literal, regex, custom predicate).
/// - Provides uniform matching over all three forms.
pub mod pattern;
