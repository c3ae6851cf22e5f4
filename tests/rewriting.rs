use formulary::{
    ast::Statement,
    interpreter::{environment::Environment, symbol_table::SymbolTable},
    parser::SyntacticalContext,
    processor::Processor,
    rewriter::RewritingSystem,
};

fn parse(source: &str) -> Statement {
    let processor = Processor::default_processor();
    let mut environment = Environment::new("test");
    let mut symbols = SymbolTable::new();
    let context = SyntacticalContext::expression();

    processor.parse(source, &mut environment, &mut symbols, &context)
             .unwrap_or_else(|e| panic!("'{source}' failed to parse: {e}"))
             .ast
             .unwrap_or_else(|| panic!("'{source}' produced no tree"))
}

fn rewrite(source: &str) -> String {
    let system = RewritingSystem::default_system();
    let (tree, _) = system.apply(parse(source)).unwrap_or_else(|e| panic!("rewrite failed: {e}"));

    tree.content()
}

#[test]
fn additive_zero_is_removed() {
    assert_eq!(rewrite("x + 0"), "x");
    assert_eq!(rewrite("0 + x"), "x");
}

#[test]
fn multiplicative_one_is_removed() {
    assert_eq!(rewrite("x * 1"), "x");
    assert_eq!(rewrite("1 * x"), "x");
    assert_eq!(rewrite("x / 1"), "x");
}

#[test]
fn identical_terms_fold() {
    assert_eq!(rewrite("x - x"), "0");
    assert_eq!(rewrite("x / x"), "1");
    // the doubled term normalizes with the literal to the right
    assert_eq!(rewrite("x + x"), "x * 2");
}

#[test]
fn literal_factor_cancels_out_of_division() {
    assert_eq!(rewrite("(4 * x) / 4"), "x");
    assert_eq!(rewrite("(x * 4) / 4"), "x");
}

#[test]
fn repeated_terms_group() {
    assert_eq!(rewrite("x + (x + y)"), "(x * 2) + y");
    assert_eq!(rewrite("(y + x) + x"), "(x * 2) + y");
    assert_eq!(rewrite("x + (y * x)"), "(y + 1) * x");
}

#[test]
fn distributive_factoring_extracts_the_repeated_operand() {
    assert_eq!(rewrite("(a * c) + (b * c)"), "(a + b) * c");
}

#[test]
fn literals_push_rightward() {
    assert_eq!(rewrite("7 + x"), "x + 7");
    assert_eq!(rewrite("7 * x"), "x * 7");
    assert_eq!(rewrite("7 + (x + 3)"), "x + (7 + 3)");
}

#[test]
fn operand_unwrapping_groups_literal_tails() {
    assert_eq!(rewrite("(x - 7) - 8"), "x - (7 + 8)");
    assert_eq!(rewrite("(x - 7) + 8"), "x + (8 - 7)");
    assert_eq!(rewrite("(x + 7) - 8"), "x + (7 - 8)");
    assert_eq!(rewrite("(x + 7) + 8"), "x + (7 + 8)");
}

#[test]
fn literal_factors_fold_into_dice_sizes() {
    assert_eq!(rewrite("2 * 1d6"), "2d6");
    assert_eq!(rewrite("2d6 * 3"), "6d6");
}

#[test]
fn normal_forms_are_stable() {
    // rewriting an already-normal-form tree returns the same tree
    for source in ["x + 1", "x * 2", "(x + y) * 3", "2d6", "@if(x then 1 else 2)"] {
        let system = RewritingSystem::default_system();
        let tree = parse(source);
        let (once, _) = system.apply(tree.clone()).unwrap();
        let (twice, changed) = system.apply(once.clone()).unwrap();

        assert_eq!(once, twice, "'{source}' kept changing");
        assert!(!changed, "'{source}' reported a change on its normal form");
    }
}

#[test]
fn custom_rules_can_be_registered() {
    use formulary::ast::Expr;
    use formulary::rewriter::{Rewrite, RuleMatch, create_rule};

    fn match_self(expr: &Expr) -> Option<RuleMatch> {
        matches!(expr, Expr::Identifier { .. } if expr.content() == "self")
            .then(|| RuleMatch::target("self"))
    }

    fn replace_self(_: &Expr, _: &RuleMatch) -> Rewrite {
        Rewrite::Replace(Expr::number(10.0))
    }

    let mut system = RewritingSystem::default_system();
    system.register(create_rule("inline_self", match_self, replace_self));

    let (tree, changed) = system.apply(parse("self + 5")).unwrap();
    assert!(changed);
    assert_eq!(tree.content(), "10 + 5");
}
