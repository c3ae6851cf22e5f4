//! The default parser functions.
//!
//! Every function here is registered by name in the default grammar; domain
//! extensions replace entries (`parse_implicit_multiplication`,
//! `parse_string_expression`) or bind new (denotation, kind) pairs without
//! touching the Pratt loop.

use crate::{
    ast::{Expr, NodeType, Statement},
    dice::parse_dice_notation,
    error::ParseError,
    parser::{
        Parser,
        grammar::{
            BindingPower, Denotation, ParserFunction, SyntacticalContext, SyntacticalGrammar,
            SyntaxMode, binding_powers, create_retyper,
        },
    },
    token::{Token, TokenKind},
    units::UnitCatalog,
    util::pattern::Pattern,
};

/// Builds the default syntactic grammar over a unit catalog.
#[must_use]
pub fn default_grammar(units: UnitCatalog) -> SyntacticalGrammar {
    use Denotation::{Infix, Prefix};
    use TokenKind::{
        Ampersand, Asterisk, Dash, DoubleColon, Equals, Greater, GreaterOrEqual, If, NotEquals,
        Number, OpenBrace, OpenBracket, OpenParenthesis, Pipe, Plus, Quotes, Slash, Smaller,
        SmallerOrEqual, Text, Whitespace,
    };
    use binding_powers::{
        ADDITIVE, CALL, DEFAULT, LOGICAL, MEMBER, MULTIPLICATIVE, PREFIX, PRIMARY, RELATIONAL,
    };

    let mut grammar = SyntacticalGrammar::new(parse_expression, parse_statement, units);

    // named parser-function registry
    grammar.register_function("parse_binary_expression", ParserFunction::Infix(parse_binary));
    grammar.register_function("parse_prefix_expression", ParserFunction::Prefix(parse_prefix));
    grammar.register_function("parse_primary_expression", ParserFunction::Prefix(parse_primary));
    grammar.register_function("parse_concatenated_expression",
                              ParserFunction::Infix(parse_concatenated));
    grammar.register_function("parse_implicit_multiplication",
                              ParserFunction::Infix(parse_implicit_multiplication));
    grammar.register_function("parse_string_expression",
                              ParserFunction::Text(parse_string_expression));
    grammar.register_function("parse_member_expression", ParserFunction::Infix(parse_member));
    grammar.register_function("parse_call_expression", ParserFunction::Infix(parse_call));
    grammar.register_function("parse_grouping_expression", ParserFunction::Prefix(parse_grouping));
    grammar.register_function("parse_quoted_string_expression",
                              ParserFunction::Prefix(parse_quoted_string));
    grammar.register_function("parse_if_expression", ParserFunction::Prefix(parse_if));

    // logical
    grammar.bind(Infix, Ampersand, LOGICAL, "parse_binary_expression");
    grammar.bind(Infix, Pipe, LOGICAL, "parse_binary_expression");

    // relational
    grammar.bind(Infix, Smaller, RELATIONAL, "parse_binary_expression");
    grammar.bind(Infix, SmallerOrEqual, RELATIONAL, "parse_binary_expression");
    grammar.bind(Infix, Greater, RELATIONAL, "parse_binary_expression");
    grammar.bind(Infix, GreaterOrEqual, RELATIONAL, "parse_binary_expression");
    grammar.bind(Infix, Equals, RELATIONAL, "parse_binary_expression");
    grammar.bind(Infix, NotEquals, RELATIONAL, "parse_binary_expression");

    // additive/multiplicative
    grammar.bind(Infix, Plus, ADDITIVE, "parse_binary_expression");
    grammar.bind(Infix, Dash, ADDITIVE, "parse_binary_expression");
    grammar.bind(Infix, Asterisk, MULTIPLICATIVE, "parse_binary_expression");
    grammar.bind(Infix, Slash, MULTIPLICATIVE, "parse_binary_expression");

    // literals and glue
    grammar.bind(Prefix, Number, PRIMARY, "parse_primary_expression");
    grammar.bind(Prefix, Text, PRIMARY, "parse_primary_expression");
    grammar.bind(Infix, Text, PRIMARY, "parse_concatenated_expression");
    grammar.bind(Infix, Whitespace, PRIMARY, "parse_concatenated_expression");

    // unary
    grammar.bind(Prefix, Dash, PREFIX, "parse_prefix_expression");
    grammar.bind(Prefix, Plus, PREFIX, "parse_prefix_expression");

    // member/call
    grammar.bind(Infix, DoubleColon, MEMBER, "parse_member_expression");
    grammar.bind(Infix, OpenParenthesis, CALL, "parse_call_expression");

    // grouping
    grammar.bind(Prefix, OpenParenthesis, DEFAULT, "parse_grouping_expression");
    grammar.bind(Prefix, OpenBracket, DEFAULT, "parse_grouping_expression");
    grammar.bind(Prefix, OpenBrace, DEFAULT, "parse_grouping_expression");
    grammar.bind(Prefix, Quotes, DEFAULT, "parse_quoted_string_expression");

    // conditionals
    grammar.bind(Prefix, If, DEFAULT, "parse_if_expression");

    // re-typing rules: booleans first, then bare words become identifiers
    grammar.register_retyper(create_retyper("boolean",
                                            Pattern::regex("^(?i)(true|false)$")
                                                .expect("boolean pattern compiles"),
                                            NodeType::BooleanLiteral));
    grammar.register_retyper(create_retyper("bare_word",
                                            Pattern::regex("^[A-Za-z_][A-Za-z0-9_]*$")
                                                .expect("bare word pattern compiles"),
                                            NodeType::Identifier));

    grammar
}

/// Parses tokens into an expression until something at or below the minimum
/// binding power is reached.
///
/// # Errors
/// Returns [`ParseError::MissingParser`] when a token appears in a position
/// no parser is bound for.
pub fn parse_expression(p: &mut Parser<'_>,
                        minimum: BindingPower,
                        context: &SyntacticalContext)
                        -> Result<Expr, ParseError> {
    p.skip_whitespace();

    // 1. Start of (sub)expression; no left context yet, so the prefix
    //    parser builds one.
    let kind = p.peek().ok_or(ParseError::UnexpectedEndOfInput)?;
    let prefix = p.grammar.prefix_parser(kind)?;
    let mut left = prefix(p, context)?;

    // 2. While the next token binds stronger than the floor, keep extending
    //    the left operand through infix parsers.
    loop {
        let Some(kind) = p.peek() else { break };
        let Some(binding_power) = p.grammar.binding_power(Denotation::Infix, kind) else {
            break;
        };
        if binding_power <= minimum {
            break;
        }

        // Whitespace is meaningful only when it glues words into a string.
        if kind == TokenKind::Whitespace {
            let gluable = matches!(left, Expr::Text { .. } | Expr::Identifier { .. })
                          && matches!(p.peek_at(1),
                                      Some(TokenKind::Text | TokenKind::Whitespace));
            if context.mode == SyntaxMode::Expression && !gluable {
                p.skip_whitespace();
                continue;
            }
        }

        let infix = p.grammar.infix_parser(kind)?;
        left = infix(p, left, minimum, context)?;
    }

    Ok(left)
}

/// Parses one statement: a registered statement parser for the current
/// token kind, or the expression-statement fallback.
///
/// # Errors
/// Propagates any [`ParseError`] from expression parsing.
pub fn parse_statement(p: &mut Parser<'_>,
                       minimum: BindingPower,
                       context: &SyntacticalContext)
                       -> Result<Statement, ParseError> {
    p.skip_whitespace();

    let kind = p.peek().ok_or(ParseError::UnexpectedEndOfInput)?;
    if let Some(parser) = p.grammar.statement_parser(kind) {
        return parser(p, context);
    }

    let expression = p.grammar.parse_expression(p, minimum, context)?;
    Ok(Statement::expression(expression))
}

/// Parses a numeric or textual literal.
///
/// # Errors
/// Returns [`ParseError::InvalidNumber`] for an unreadable numeric literal
/// and [`ParseError::UnexpectedToken`] for any kind this parser was
/// mistakenly bound to.
pub fn parse_primary(p: &mut Parser<'_>, context: &SyntacticalContext) -> Result<Expr, ParseError> {
    match p.peek() {
        Some(TokenKind::Number) => {
            let token = p.next()?;
            let at = token.span.map_or(0, |span| span.start);
            let value: f64 = token.content
                                  .parse()
                                  .map_err(|_| ParseError::InvalidNumber { literal:
                                                                               token.content
                                                                                    .clone(),
                                                                           at })?;

            Ok(Expr::Numeric { token, value })
        },
        Some(TokenKind::Text) => {
            let token = p.next()?;
            let literal = Expr::Text { tokens: vec![token] };

            let finish = p.grammar.named_text("parse_string_expression")?;
            finish(p, literal, context)
        },
        _ => {
            let token = p.next()?;
            Err(ParseError::UnexpectedToken { token: token.content,
                                              at:    token.span.map_or(0, |span| span.start), })
        },
    }
}

/// Parses a binary expression from its operator onward.
///
/// # Errors
/// Propagates any [`ParseError`] from parsing the right operand.
pub fn parse_binary(p: &mut Parser<'_>,
                    left: Expr,
                    _minimum: BindingPower,
                    context: &SyntacticalContext)
                    -> Result<Expr, ParseError> {
    let operator = p.next()?;
    let binding_power =
        p.grammar
         .binding_power(Denotation::Infix, operator.kind)
         .ok_or_else(|| ParseError::MissingParser { denotation: "infix".to_string(),
                                                    kind: operator.kind.name().to_string() })?;
    let right = p.grammar.parse_expression(p, binding_power, context)?;

    Ok(Expr::binary(left, operator, right))
}

/// Parses a prefix expression (`-x`, `+x`).
///
/// # Errors
/// Propagates any [`ParseError`] from parsing the operand.
pub fn parse_prefix(p: &mut Parser<'_>, context: &SyntacticalContext) -> Result<Expr, ParseError> {
    let operator = p.next()?;
    let right = p.grammar.parse_expression(p, binding_powers::PREFIX, context)?;

    Ok(Expr::Prefix { operator,
                      right: Box::new(right) })
}

/// Glues adjacent words into one string literal, or hands a numeral off to
/// implicit multiplication.
///
/// An identifier to the left demotes back to plain text: once words glue,
/// prose has won over name lookup.
///
/// # Errors
/// Returns [`ParseError::UnexpectedToken`] when the left operand cannot
/// take part in a string.
pub fn parse_concatenated(p: &mut Parser<'_>,
                          left: Expr,
                          minimum: BindingPower,
                          context: &SyntacticalContext)
                          -> Result<Expr, ParseError> {
    if matches!(left, Expr::Numeric { .. }) {
        let implicit = p.grammar.named_infix("parse_implicit_multiplication")?;
        return implicit(p, left, minimum, context);
    }

    let mut tokens = match left {
        Expr::Text { tokens } | Expr::Identifier { tokens } => tokens,
        other => {
            let at = p.current().and_then(|token| token.span).map_or(0, |span| span.start);
            return Err(ParseError::UnexpectedToken { token: other.content(),
                                                     at });
        },
    };

    while matches!(p.peek(), Some(TokenKind::Text | TokenKind::Whitespace)) {
        tokens.push(p.next()?);
    }

    Ok(Expr::Text { tokens })
}

/// Parses the expression right of a numeral that has no operator before it.
///
/// `A B` reads as `A * B`, unless the right side is a bare dice suffix
/// (`d6`, `d20kh1`), in which case the numeral is the roll's size: `2d6` is
/// a dice roll, not `2 * d6`.
///
/// # Errors
/// Propagates any [`ParseError`] from parsing the right operand.
pub fn parse_implicit_multiplication(p: &mut Parser<'_>,
                                     left: Expr,
                                     _minimum: BindingPower,
                                     context: &SyntacticalContext)
                                     -> Result<Expr, ParseError> {
    let right = p.grammar.parse_expression(p, binding_powers::MULTIPLICATIVE, context)?;

    // A bare suffix became a roll of size one with an artificial size
    // token; an explicit `1d6` keeps its lexed token and stays a factor.
    if let Expr::DiceRoll { size, faces, keep } = &right
       && matches!(size.as_ref(),
                   Expr::Numeric { token, value } if *value == 1.0 && token.is_artificial())
    {
        return Ok(Expr::DiceRoll { size:  Box::new(left),
                                   faces: *faces,
                                   keep:  keep.clone(), });
    }

    let operator = Token::artificial(TokenKind::Asterisk, "*");
    Ok(Expr::binary(left, operator, right))
}

/// Finishes a string literal: dice suffixes, units and re-typing rules all
/// get a chance to reclassify it.
///
/// Units are consulted before the re-typing rules so registered unit
/// symbols are not swallowed by the default bare-word identifier rule.
///
/// # Errors
/// Returns [`ParseError::UnsupportedReType`] when a matching rule targets a
/// node type literals cannot become.
pub fn parse_string_expression(p: &mut Parser<'_>,
                               literal: Expr,
                               _context: &SyntacticalContext)
                               -> Result<Expr, ParseError> {
    let content = literal.content();
    let Expr::Text { tokens } = literal else {
        return Ok(literal);
    };

    // 1. A bare dice suffix is a roll of one die.
    if let Some(data) = parse_dice_notation(content.trim()) {
        return Ok(Expr::DiceRoll { size:  Box::new(Expr::number(1.0)),
                                   faces: data.faces,
                                   keep:  data.keep, });
    }

    // 2. A registered unit symbol.
    if let Some(unit) = p.grammar.unit(&content) {
        return Ok(Expr::Unit { unit: unit.clone(),
                               tokens });
    }

    // 3. Re-typing rules from the grammar.
    if let Some(target) = p.grammar.should_retype(&content) {
        return match target {
            NodeType::Identifier => Ok(Expr::Identifier { tokens }),
            NodeType::BooleanLiteral => {
                let value = content.eq_ignore_ascii_case("true");
                let token = tokens.into_iter()
                                  .next()
                                  .unwrap_or_else(|| Token::artificial(TokenKind::Text,
                                                                       content.clone()));
                Ok(Expr::Boolean { token, value })
            },
            other => Err(ParseError::UnsupportedReType { target: other.to_string() }),
        };
    }

    Ok(Expr::Text { tokens })
}

/// Parses a member access from its `::` onward.
///
/// # Errors
/// Returns [`ParseError::UnexpectedKind`] when the property is not a word.
pub fn parse_member(p: &mut Parser<'_>,
                    left: Expr,
                    _minimum: BindingPower,
                    _context: &SyntacticalContext)
                    -> Result<Expr, ParseError> {
    p.expect(TokenKind::DoubleColon)?;
    let property = p.expect(TokenKind::Text)?;

    Ok(Expr::Member { object: Box::new(left),
                      property })
}

/// Parses a call from its opening parenthesis onward.
///
/// # Errors
/// Returns [`ParseError::UnexpectedKind`] on a malformed argument list.
pub fn parse_call(p: &mut Parser<'_>,
                  left: Expr,
                  _minimum: BindingPower,
                  context: &SyntacticalContext)
                  -> Result<Expr, ParseError> {
    p.expect(TokenKind::OpenParenthesis)?;

    let mut arguments = Vec::new();
    loop {
        p.skip_whitespace();
        match p.peek() {
            None => return Err(ParseError::UnexpectedEndOfInput),
            Some(TokenKind::CloseParenthesis) => break,
            _ => {},
        }

        // Anything below the assignment level belongs to the comma.
        let argument = p.grammar.parse_expression(p, binding_powers::ASSIGNMENT, context)?;
        arguments.push(argument);

        p.skip_whitespace();
        if p.peek() != Some(TokenKind::CloseParenthesis) {
            p.expect(TokenKind::Comma)?;
        }
    }

    p.expect(TokenKind::CloseParenthesis)?;

    Ok(Expr::Call { callee: Box::new(left),
                    arguments })
}

/// Parses a grouped expression: `(...)`, `[...]` or `{...}`.
///
/// A group can also carry a keyword-less conditional tail
/// (`(cond then cons else alt)`), the nested form of `@if`.
///
/// # Errors
/// Returns [`ParseError::UnexpectedKind`] when the closing delimiter is
/// missing.
pub fn parse_grouping(p: &mut Parser<'_>,
                      context: &SyntacticalContext)
                      -> Result<Expr, ParseError> {
    let opener = p.next()?;
    let closer = match opener.kind {
        TokenKind::OpenParenthesis => TokenKind::CloseParenthesis,
        TokenKind::OpenBracket => TokenKind::CloseBracket,
        TokenKind::OpenBrace => TokenKind::CloseBrace,
        _ => {
            return Err(ParseError::UnexpectedToken {
                token: opener.content,
                at:    opener.span.map_or(0, |span| span.start),
            });
        },
    };

    let expression = p.grammar.parse_expression(p, binding_powers::DEFAULT, context)?;
    p.skip_whitespace();

    if p.peek() == Some(TokenKind::Then) {
        let conditional = parse_if_tail(p, expression, context)?;
        p.skip_whitespace();
        p.expect(closer)?;
        return Ok(conditional);
    }

    p.expect(closer)?;
    Ok(expression)
}

/// Parses a quoted string: every token up to the closing quote glues into
/// one literal, then the usual string finishing applies (re-typing rules
/// still recognize quoted aliases).
///
/// # Errors
/// Returns [`ParseError::UnexpectedKind`] when the closing quote is
/// missing.
pub fn parse_quoted_string(p: &mut Parser<'_>,
                           context: &SyntacticalContext)
                           -> Result<Expr, ParseError> {
    p.expect(TokenKind::Quotes)?;

    let mut tokens = Vec::new();
    while p.has_tokens() && p.peek() != Some(TokenKind::Quotes) {
        tokens.push(p.next()?);
    }

    p.expect(TokenKind::Quotes)?;

    let finish = p.grammar.named_text("parse_string_expression")?;
    finish(p, Expr::Text { tokens }, context)
}

/// Parses `@if(<condition> then <consequent> else <alternative>)`.
///
/// # Errors
/// Returns [`ParseError::UnexpectedKind`] when the keyword skeleton is
/// malformed.
pub fn parse_if(p: &mut Parser<'_>, context: &SyntacticalContext) -> Result<Expr, ParseError> {
    p.expect(TokenKind::If)?;
    p.skip_whitespace();
    p.expect(TokenKind::OpenParenthesis)?;

    let condition = p.grammar.parse_expression(p, binding_powers::COMMA, context)?;
    let conditional = parse_if_tail(p, condition, context)?;

    p.skip_whitespace();
    p.expect(TokenKind::CloseParenthesis)?;

    Ok(conditional)
}

/// Parses the `then ... [else ...]` tail of a conditional whose condition
/// is already in hand.
fn parse_if_tail(p: &mut Parser<'_>,
                 condition: Expr,
                 context: &SyntacticalContext)
                 -> Result<Expr, ParseError> {
    p.skip_whitespace();
    p.expect(TokenKind::Then)?;

    let consequent = p.grammar.parse_expression(p, binding_powers::COMMA, context)?;

    p.skip_whitespace();
    let alternative = if p.peek() == Some(TokenKind::Else) {
        p.next()?;
        let expression = p.grammar.parse_expression(p, binding_powers::DEFAULT, context)?;
        Some(Box::new(expression))
    } else {
        None
    };

    Ok(Expr::If { condition: Box::new(condition),
                  consequent: Box::new(consequent),
                  alternative })
}
