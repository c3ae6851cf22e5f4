use std::fs;

use formulary::{
    interpreter::{
        environment::Environment,
        symbol_table::SymbolTable,
        value::{FunctionReturn, FunctionValue, RuntimeValue},
    },
    parser::SyntacticalContext,
    processor::{Processor, ResolveOptions},
};
use walkdir::WalkDir;

fn resolve(source: &str) -> formulary::Resolution {
    let mut environment = Environment::new("test");
    resolve_in(source, &mut environment)
}

fn resolve_in(source: &str, environment: &mut Environment) -> formulary::Resolution {
    formulary::resolve_expression(source, environment)
        .unwrap_or_else(|e| panic!("'{source}' failed: {e}"))
}

fn assert_resolves(source: &str, expected: &str) {
    let resolution = resolve(source);
    assert!(resolution.is_resolved(), "'{source}' did not resolve: {}", resolution.content);
    assert_eq!(resolution.content, expected, "'{source}' resolved to the wrong value");
}

fn assert_residual(source: &str, expected: &str) {
    let resolution = resolve(source);
    assert!(!resolution.is_resolved(), "'{source}' resolved but should have stayed residual");
    assert_eq!(resolution.content, expected, "'{source}' left the wrong residual");
}

fn assert_failure(source: &str) {
    let mut environment = Environment::new("test");
    assert!(formulary::resolve_expression(source, &mut environment).is_err(),
            "'{source}' succeeded but was expected to fail");
}

#[test]
fn doc_examples_work() {
    let mut count = 0;

    for entry in WalkDir::new("docs").into_iter()
                                     .filter_map(Result::ok)
                                     .filter(|e| {
                                         e.path().extension().is_some_and(|ext| ext == "md")
                                     })
    {
        let path = entry.path();
        let content =
            fs::read_to_string(path).unwrap_or_else(|e| panic!("Failed to read {path:?}: {e}"));

        for (i, line) in extract_formula_blocks(&content).into_iter().enumerate() {
            let Some((formula, expected)) = line.split_once("=>") else {
                panic!("Example {} in {:?} has no expectation: {}", i + 1, path, line);
            };

            count += 1;
            let resolution = resolve(formula.trim());
            assert_eq!(resolution.content,
                       expected.trim(),
                       "Example {} in {:?} failed: {}",
                       i + 1,
                       path,
                       line);
        }
    }

    assert!(count > 0, "No formula examples found in docs");
}

fn extract_formula_blocks(content: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut inside = false;

    for line in content.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```formulary") {
            inside = true;
            continue;
        }
        if inside && trimmed.starts_with("```") {
            inside = false;
            continue;
        }
        if inside && !trimmed.is_empty() {
            lines.push(trimmed.to_string());
        }
    }

    lines
}

#[test]
fn basic_arithmetic() {
    assert_resolves("10 + 2 * 3", "16");
    assert_resolves("10 * 3 + 6", "36");
    assert_resolves("8 - 5", "3");
    assert_resolves("10 / 2", "5");
    assert_resolves("2 * (5 + 5)", "20");
    assert_resolves("-4 + 10", "6");
    assert_resolves("+4 - 10", "-6");
}

#[test]
fn arithmetic_matches_direct_computation() {
    let pairs = [(12.0, 4.0), (7.0, 3.0), (0.5, 8.0), (100.0, 2.5)];

    for (a, b) in pairs {
        assert_resolves(&format!("{a} + {b}"), &RuntimeValue::Number(a + b).content());
        assert_resolves(&format!("{a} - {b}"), &RuntimeValue::Number(a - b).content());
        assert_resolves(&format!("{a} * {b}"), &RuntimeValue::Number(a * b).content());
        assert_resolves(&format!("{a} / {b}"), &RuntimeValue::Number(a / b).content());
    }
}

#[test]
fn division_by_zero_is_error() {
    assert_failure("1 / 0");
}

#[test]
fn unsupported_operator_pairs_are_errors() {
    // `&` has no dispatch rule for numbers and no custom hook is registered
    assert_failure("1 & 2");
    // subtraction has no meaning for strings
    assert_failure("\"a b\" - \"c d\"");
}

#[test]
fn comparisons_and_conditionals() {
    assert_resolves("@if(1 = 1 then 2 else 3)", "2");
    assert_resolves("@if(1 = 2 then 2 else 3)", "3");
    assert_resolves("@if(2 < 3 then 1 else 0)", "1");
    assert_resolves("@if(3 <= 2 then 1 else 0)", "0");
    assert_resolves("@if(2 != 3 then 1 else 0)", "1");
}

#[test]
fn keywordless_conditional_nests_in_groups() {
    assert_resolves("(2 < 3 then 5 else 6)", "5");
    assert_resolves("@if(1 = 1 then (2 = 2 then 9 else 8) else 3)", "9");
}

#[test]
fn quoted_text_resolves_to_itself() {
    assert_resolves("\"Feet Only\"", "Feet Only");
}

#[test]
fn unknown_callee_reads_as_text() {
    // `@itemhasmod` is not in the catalog, so the call is descriptive text
    assert_resolves("@itemhasmod(Feet Only)", "@itemhasmod(Feet Only)");
}

#[test]
fn unknown_variables_stay_residual() {
    assert_residual("x + 1", "x + 1");
    assert_residual("(10 + b) * 3", "(10 + b) * 3");
}

#[test]
fn bound_variables_resolve() {
    let mut environment = Environment::new("test");
    environment.assign_value("x", RuntimeValue::Number(5.0)).unwrap();

    let resolution = resolve_in("x + 1", &mut environment);
    assert_eq!(resolution.content, "6");
}

#[test]
fn indirection_resolves_through_the_chain() {
    let mut environment = Environment::new("test");
    environment.assign_value("a", RuntimeValue::Variable("b".to_string())).unwrap();
    environment.assign_value("b", RuntimeValue::Number(7.0)).unwrap();

    let resolution = resolve_in("a", &mut environment);
    assert_eq!(resolution.content, "7");
}

#[test]
fn circular_indirection_is_error() {
    let mut environment = Environment::new("test");
    environment.assign_value("a", RuntimeValue::Variable("b".to_string())).unwrap();
    environment.assign_value("b", RuntimeValue::Variable("a".to_string())).unwrap();

    assert!(formulary::resolve_expression("a", &mut environment).is_err());
}

#[test]
fn units_make_quantities() {
    assert_resolves("3 yd", "3 yd");
    assert_resolves("10 lb", "10 lb");
}

#[test]
fn dice_stay_residual_without_a_roller() {
    assert_residual("2d6", "2d6");
    assert_residual("d6", "1d6");
    assert_residual("2d6kh1", "2d6kh1");
}

#[test]
fn dice_parse_as_rolls_not_multiplications() {
    let processor = Processor::default_processor();
    let mut environment = Environment::new("test");
    let mut symbols = SymbolTable::new();
    let context = SyntacticalContext::expression();

    let parsed = processor.parse("2d6", &mut environment, &mut symbols, &context).unwrap();
    let ast = parsed.ast.expect("2d6 parses");

    let formulary::ast::Expr::DiceRoll { size, faces, keep } = ast.expr() else {
        panic!("expected a dice roll, got {}", ast.expr().node_type());
    };
    assert_eq!(size.numeric_value(), Some(2.0));
    assert_eq!(*faces, 6);
    assert!(keep.is_empty());
}

#[test]
fn registered_roller_resolves_dice() {
    let mut processor = Processor::default_processor();
    // every die lands on its highest face; deterministic for the test
    processor.node_evaluator_mut()
             .set_dice_roller(|count, faces| vec![faces; count as usize]);

    let mut environment = Environment::new("test");
    let mut symbols = SymbolTable::new();
    let context = SyntacticalContext::expression();

    let parsed = processor.parse("2d6 + 1", &mut environment, &mut symbols, &context).unwrap();
    let resolution = processor.resolve(&parsed.ast.unwrap(),
                                       &mut environment,
                                       &mut symbols,
                                       ResolveOptions::new(context))
                              .unwrap();

    assert_eq!(resolution.content, "13");
}

#[test]
fn keep_rules_filter_rolls() {
    let mut processor = Processor::default_processor();
    processor.node_evaluator_mut().set_dice_roller(|count, _| (1..=count).collect());

    let mut environment = Environment::new("test");
    let mut symbols = SymbolTable::new();
    let context = SyntacticalContext::expression();

    let parsed = processor.parse("4d6kh1", &mut environment, &mut symbols, &context).unwrap();
    let resolution = processor.resolve(&parsed.ast.unwrap(),
                                       &mut environment,
                                       &mut symbols,
                                       ResolveOptions::new(context))
                              .unwrap();

    assert_eq!(resolution.content, "4");
}

#[test]
fn bound_functions_are_called() {
    let mut environment = Environment::new("test");
    environment.assign_value("@max",
                             RuntimeValue::Function(FunctionValue::new("@max", |_, values| {
                                 let mut best: Option<f64> = None;
                                 for value in values {
                                     let Some(n) = value.as_number() else {
                                         return Err(formulary::error::RuntimeError::InvalidArgument {
                                             details: "all arguments must be numbers".to_string(),
                                         });
                                     };
                                     best = Some(best.map_or(n, |b| b.max(n)));
                                 }

                                 match best {
                                     Some(n) => {
                                         Ok(Some(FunctionReturn::Value(RuntimeValue::Number(n))))
                                     },
                                     None => Err(formulary::error::RuntimeError::InvalidArgument {
                                         details: "at least one argument is required".to_string(),
                                     }),
                                 }
                             })))
               .unwrap();

    let resolution = resolve_in("@max(2, 7, 5) + 1", &mut environment);
    assert_eq!(resolution.content, "8");
}

#[test]
fn calls_with_unresolved_arguments_stay_residual() {
    // `@max` is callable but `x` is unknown; the call waits
    assert_residual("@max(x, 2)", "@max(x, 2)");
}

#[test]
fn callable_names_without_implementations_stay_residual() {
    // the catalog knows `@max`, but nothing is bound in the environment
    assert_residual("@max(1, 2)", "@max(1, 2)");
}

#[test]
fn injections_resolve_before_parsing() {
    assert_resolves("$eval(2 * 3) + 1", "7");
    assert_resolves("$eval($eval(1 + 1) + 2) * 2", "8");
    assert_resolves("$eval(1 + 2) yd", "3 yd");
}

#[test]
fn unknown_injection_functions_are_errors() {
    assert_failure("$frobnicate(1 + 2)");
}

#[test]
fn unbalanced_injections_are_errors() {
    assert_failure("$eval(1 + 2");
}

#[test]
fn member_access_resolves_the_full_spelling() {
    let mut environment = Environment::new("test");
    environment.assign_value("One::level", RuntimeValue::Number(4.0)).unwrap();

    let resolution = resolve_in("One::level + 1", &mut environment);
    assert_eq!(resolution.content, "5");
}

#[test]
fn resolution_is_deterministic() {
    let mut environment = Environment::new("test");
    environment.assign_value("b", RuntimeValue::Number(2.0)).unwrap();

    let first = resolve_in("(10 + b) * 3", &mut environment);
    let second = resolve_in("(10 + b) * 3", &mut environment);

    assert_eq!(first.content, second.content);
    assert_eq!(first.evaluation, second.evaluation);
}

#[test]
fn parse_round_trips_through_content() {
    let sources = ["10 + 2 * 3",
                   "(10 + b) * 3",
                   "2d6kh1",
                   "@if(1 = 1 then 2 else 3)",
                   "3 yd",
                   "One::level + 1"];

    let processor = Processor::default_processor();
    let context = SyntacticalContext::expression();

    for source in sources {
        let mut environment = Environment::new("test");
        let mut symbols = SymbolTable::new();

        let first = processor.parse(source, &mut environment, &mut symbols, &context)
                             .unwrap_or_else(|e| panic!("'{source}' failed to parse: {e}"))
                             .ast
                             .unwrap_or_else(|| panic!("'{source}' produced no tree"));

        let content = first.content();
        let second = processor.parse(&content, &mut environment, &mut symbols, &context)
                              .unwrap_or_else(|e| panic!("'{content}' failed to re-parse: {e}"))
                              .ast
                              .unwrap_or_else(|| panic!("'{content}' produced no tree"));

        assert_eq!(first, second, "'{source}' did not round-trip (printed as '{content}')");
    }
}

#[test]
fn implicit_multiplication_normalizes_to_explicit() {
    let processor = Processor::default_processor();
    let context = SyntacticalContext::expression();
    let mut environment = Environment::new("test");
    let mut symbols = SymbolTable::new();

    let implicit = processor.parse("3x", &mut environment, &mut symbols, &context)
                            .unwrap()
                            .ast
                            .unwrap();
    let explicit = processor.parse("3 * x", &mut environment, &mut symbols, &context)
                            .unwrap()
                            .ast
                            .unwrap();

    assert_eq!(implicit, explicit);
    assert_eq!(implicit.content(), "3 * x");
}
