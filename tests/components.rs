use formulary::{
    dice::parse_dice_notation,
    functions::FunctionCatalog,
    interpreter::{
        environment::{Environment, Resolution},
        symbol_table::SymbolTable,
        value::RuntimeValue,
    },
    lexer::{Lexer, LexicalGrammar},
    parser::SyntacticalContext,
    processor::{Processor, ResolveOptions},
    token::TokenKind,
    units::UnitCatalog,
    util::pattern::Pattern,
};

fn lex(source: &str) -> formulary::lexer::Scan {
    let grammar = LexicalGrammar::default_grammar();
    Lexer::new(&grammar).process(source).unwrap_or_else(|e| panic!("'{source}' failed: {e}"))
}

fn kinds(source: &str) -> Vec<TokenKind> {
    lex(source).tokens
               .into_iter()
               .filter(|token| token.kind != TokenKind::Whitespace)
               .map(|token| token.kind)
               .collect()
}

#[test]
fn words_scan_by_lowest_priority_then_longest_match() {
    use TokenKind::{Number, Text};

    // `then` is a keyword even though the text entry matches it too
    assert_eq!(kinds("then"), [TokenKind::Then]);
    // a numeral beats the longer textual match of the whole word
    assert_eq!(kinds("2d6"), [Number, Text]);
    // maximal munch within the same priority
    assert_eq!(kinds("10"), [Number]);
    assert_eq!(kinds(">="), [TokenKind::GreaterOrEqual]);
}

#[test]
fn double_colon_is_atomic() {
    assert_eq!(kinds("a::b"), [TokenKind::Text, TokenKind::DoubleColon, TokenKind::Text]);
}

#[test]
fn whitespace_forces_boundaries_and_is_kept() {
    let scan = lex("10 + 2");
    let contents: Vec<&str> = scan.tokens.iter().map(|t| t.content.as_str()).collect();

    assert_eq!(contents, ["10", " ", "+", " ", "2"]);
}

#[test]
fn unknown_characters_scan_fail_soft() {
    let scan = lex("1 § 2");
    let unknown: Vec<&formulary::token::Token> =
        scan.tokens.iter().filter(|t| t.kind == TokenKind::Unknown).collect();

    assert_eq!(unknown.len(), 1);
    assert_eq!(unknown[0].content, "§");
}

#[test]
fn injections_extract_with_placeholders() {
    let scan = lex("$eval(1 + 2) yd");

    assert_eq!(scan.injections.len(), 1);
    assert_eq!(scan.injections[0].name, "eval");
    assert_eq!(scan.injections[0].expression, "1 + 2");

    let placeholder = scan.tokens
                          .iter()
                          .find(|t| t.kind == TokenKind::InjectionPlaceholder)
                          .expect("placeholder token");
    assert_eq!(placeholder.content, "$0");
}

#[test]
fn unbalanced_injections_fail_the_scan() {
    let grammar = LexicalGrammar::default_grammar();
    assert!(Lexer::new(&grammar).process("$eval(1 + 2").is_err());
}

#[test]
fn dice_notation_parses_faces_and_keep_rules() {
    let data = parse_dice_notation("d6kh1kl0").expect("valid notation");
    assert_eq!(data.faces, 6);
    assert_eq!(data.keep.highest, Some(1));
    assert_eq!(data.keep.lowest, Some(0));

    assert!(parse_dice_notation("door").is_none());
    assert!(parse_dice_notation("1d6").is_none(), "the size is not part of the suffix");
}

#[test]
fn environment_rejects_silent_overwrites() {
    let mut environment = Environment::new("test");
    environment.assign_value("x", RuntimeValue::Number(1.0)).unwrap();

    assert!(environment.assign_value("x", RuntimeValue::Number(2.0)).is_err());
    environment.update_value("x", RuntimeValue::Number(2.0)).unwrap();
    assert_eq!(environment.get("x").unwrap(), Some(RuntimeValue::Number(2.0)));
}

#[test]
fn version_moves_only_on_actual_changes() {
    let mut environment = Environment::new("test");
    environment.assign_value("x", RuntimeValue::Number(1.0)).unwrap();
    let version = environment.version();

    // same value: no movement
    environment.update_value("x", RuntimeValue::Number(1.0)).unwrap();
    assert_eq!(environment.version(), version);

    // new value: movement
    environment.update_value("x", RuntimeValue::Number(2.0)).unwrap();
    assert!(environment.version() > version);
}

#[test]
fn pattern_bindings_resolve_structurally() {
    let mut environment = Environment::new("test");
    environment.assign_value_to_pattern("hp",
                                        Pattern::regex("^hp::.+$").unwrap(),
                                        RuntimeValue::Number(0.0))
               .unwrap();

    assert_eq!(environment.get("hp::max").unwrap(), Some(RuntimeValue::Number(0.0)));
    assert_eq!(environment.get("mp::max").unwrap(), None);
}

#[test]
fn child_scopes_delegate_to_parents() {
    let mut environment = Environment::new("root");
    environment.assign_value("x", RuntimeValue::Number(3.0)).unwrap();

    let child = environment.create_child(environment.root(), "child");
    environment.assign_value_in(child, "y", RuntimeValue::Number(4.0)).unwrap();

    assert_eq!(environment.get_from(child, "x").unwrap(), Some(RuntimeValue::Number(3.0)));
    assert_eq!(environment.get_from(child, "y").unwrap(), Some(RuntimeValue::Number(4.0)));
    // the parent does not see the child's bindings
    assert_eq!(environment.get("y").unwrap(), None);
}

#[test]
fn indirection_chains_are_bounded_and_reported() {
    let mut environment = Environment::new("test");
    environment.assign_value("a", RuntimeValue::Variable("b".to_string())).unwrap();
    environment.assign_value("b", RuntimeValue::Variable("c".to_string())).unwrap();
    environment.assign_value("c", RuntimeValue::Number(9.0)).unwrap();

    let resolution = environment.resolve("a").unwrap();
    let Resolution::Found { name, chain, .. } = resolution else {
        panic!("'a' should resolve");
    };
    assert_eq!(name, "c");
    assert_eq!(chain, ["b", "c"]);

    environment.assign_value("loop", RuntimeValue::Variable("loop2".to_string())).unwrap();
    environment.assign_value("loop2", RuntimeValue::Variable("loop".to_string())).unwrap();
    assert!(environment.resolve("loop").is_err());
}

#[test]
fn symbol_table_indexes_every_touched_name() {
    let processor = Processor::default_processor();
    let mut environment = Environment::new("test");
    environment.assign_value("x", RuntimeValue::Number(1.0)).unwrap();
    let mut symbols = SymbolTable::new();
    let context = SyntacticalContext::expression();

    let parsed = processor.parse("x + y", &mut environment, &mut symbols, &context).unwrap();
    processor.resolve(&parsed.ast.unwrap(),
                      &mut environment,
                      &mut symbols,
                      ResolveOptions::new(context))
             .unwrap();

    assert!(symbols.has("x"));
    assert!(symbols.has("y"));

    let missing = symbols.missing_symbols(&environment, environment.root()).unwrap();
    assert_eq!(missing, ["y"]);
}

#[test]
fn missing_symbols_expand_to_resolved_spellings() {
    let mut environment = Environment::new("test");
    environment.assign_value("a", RuntimeValue::Variable("b".to_string())).unwrap();

    let mut symbols = SymbolTable::new();
    symbols.index("a", "t0", None);

    let missing = symbols.missing_symbols(&environment, environment.root()).unwrap();
    // both the mentioned spelling and the one the environment would need
    assert_eq!(missing, ["a", "b"]);
    assert!(symbols.has("b"));
}

#[test]
fn environment_updates_retrigger_resolution() {
    let processor = Processor::default_processor();
    let mut environment = Environment::new("test");
    let mut symbols = SymbolTable::new();
    let context = SyntacticalContext::expression();

    let parsed = processor.parse("x + 1", &mut environment, &mut symbols, &context).unwrap();
    let ast = parsed.ast.unwrap();

    let mut update = |environment: &mut Environment, symbols: &mut SymbolTable| {
        let missing = symbols.missing_symbols(environment, environment.root())
                             .unwrap_or_default();
        for name in missing {
            if name == "x" {
                let _ = environment.assign_value("x", RuntimeValue::Number(5.0));
            }
        }
    };

    let resolution = processor.resolve(&ast,
                                       &mut environment,
                                       &mut symbols,
                                       ResolveOptions::new(context)
                                           .with_environment_update(&mut update))
                              .unwrap();

    assert!(resolution.is_resolved());
    assert_eq!(resolution.content, "6");
}

#[test]
fn unchanged_versions_do_not_retrigger_resolution() {
    let processor = Processor::default_processor();
    let mut environment = Environment::new("test");
    environment.assign_value("y", RuntimeValue::Number(1.0)).unwrap();
    let mut symbols = SymbolTable::new();
    let context = SyntacticalContext::expression();

    let parsed = processor.parse("x + 1", &mut environment, &mut symbols, &context).unwrap();
    let ast = parsed.ast.unwrap();

    let mut update = |environment: &mut Environment, _: &mut SymbolTable| {
        // an update to the same value must not move the version
        environment.update_value("y", RuntimeValue::Number(1.0)).unwrap();
    };

    let resolution = processor.resolve(&ast,
                                       &mut environment,
                                       &mut symbols,
                                       ResolveOptions::new(context)
                                           .with_environment_update(&mut update))
                              .unwrap();

    assert!(!resolution.is_resolved());
    assert_eq!(resolution.content, "x + 1");
}

#[test]
fn retyping_rules_reclassify_quoted_aliases() {
    use formulary::ast::NodeType;
    use formulary::parser::create_retyper;

    let mut processor = Processor::default_processor();
    processor.syntactical_grammar_mut()
             .register_retyper(create_retyper("alias",
                                              Pattern::regex("^.+::.+$").unwrap(),
                                              NodeType::Identifier));

    let mut environment = Environment::new("test");
    environment.assign_value("ST:DX::level", RuntimeValue::Number(12.0)).unwrap();
    let mut symbols = SymbolTable::new();
    let context = SyntacticalContext::expression();

    let parsed = processor.parse("\"ST:DX::level\" + 1", &mut environment, &mut symbols, &context)
                          .unwrap();
    let resolution = processor.resolve(&parsed.ast.unwrap(),
                                       &mut environment,
                                       &mut symbols,
                                       ResolveOptions::new(context))
                              .unwrap();

    assert_eq!(resolution.content, "13");
}

#[test]
fn lexical_entries_can_be_registered() {
    use formulary::lexer::create_entry;

    let mut grammar = LexicalGrammar::default_grammar();
    // teach the lexer a word spelling for the AND operator
    grammar.register(create_entry(2, TokenKind::Ampersand, Pattern::equals_ignore_case("and")));

    let scan = Lexer::new(&grammar).process("2 and 3").unwrap();
    let kinds: Vec<TokenKind> = scan.tokens
                                    .iter()
                                    .filter(|t| t.kind != TokenKind::Whitespace)
                                    .map(|t| t.kind)
                                    .collect();

    assert_eq!(kinds, [TokenKind::Number, TokenKind::Ampersand, TokenKind::Number]);
}

#[test]
fn member_access_projects_object_properties() {
    use std::collections::HashMap;

    use formulary::interpreter::value::ObjectValue;

    let mut environment = Environment::new("test");
    let object =
        ObjectValue::new(HashMap::from([("level".to_string(), RuntimeValue::Number(3.0))]))
            .with_numeric(3.0);
    environment.assign_value("One", RuntimeValue::Object(object)).unwrap();

    let resolution = formulary::resolve_expression("One::level + 1", &mut environment).unwrap();
    assert_eq!(resolution.content, "4");

    // in expression mode the object itself collapses to its numeric
    // projection
    let collapsed = formulary::resolve_expression("One", &mut environment).unwrap();
    assert_eq!(collapsed.content, "3");
}

#[test]
fn objects_without_numeric_projections_stay_unresolved() {
    use std::collections::HashMap;

    use formulary::interpreter::value::ObjectValue;

    let mut environment = Environment::new("test");
    environment.assign_value("One", RuntimeValue::Object(ObjectValue::new(HashMap::new())))
               .unwrap();

    let resolution = formulary::resolve_expression("One", &mut environment).unwrap();
    assert!(!resolution.is_resolved());
}

#[test]
fn catalogs_answer_lookups() {
    let functions = FunctionCatalog::with_builtins();
    assert!(functions.is_callable("@max"));
    assert!(!functions.is_callable("reach"));

    let units = UnitCatalog::with_base_units();
    assert_eq!(units.lookup("yd").map(|u| u.name.as_str()), Some("yard"));
    assert!(units.lookup("parsec").is_none());
}
