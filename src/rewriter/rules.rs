//! The default algebraic ruleset.
//!
//! Identity elimination, identical-term folding, distributive factoring and
//! literal normalization (literals pushed rightward so evaluation can fold
//! constant tails). The dice ruleset folds literal factors into a roll's
//! size. Rules only rearrange trees; actual arithmetic belongs to the
//! evaluator.

use crate::{
    ast::Expr,
    dice::DiceKeep,
    rewriter::{Rewrite, RewriteRule, RuleMatch, create_rule},
    token::{Token, TokenKind},
};

/// Builds the default algebraic ruleset, in application order.
#[must_use]
pub fn default_ruleset() -> Vec<RewriteRule> {
    vec![create_rule("remove_zero_from_addition", match_zero_addition, replace_keep_side),
         create_rule("remove_one_from_multiplication_or_dividend",
                     match_one_multiplication,
                     replace_keep_side),
         create_rule("remove_identical_terms", match_identical_terms, replace_identical_terms),
         create_rule("distributive_factoring", match_distributive, replace_distributive),
         create_rule("group_literals_at_right", match_group_literals, replace_group_literals),
         create_rule("swap_literal_and_non_literal", match_swap_literal, replace_swap_literal),
         create_rule("unwrap_operands_to_swap_literals_rightmost",
                     match_unwrap_operands,
                     replace_unwrap_operands)]
}

/// Builds the dice ruleset.
#[must_use]
pub fn dice_ruleset() -> Vec<RewriteRule> {
    vec![create_rule("literal_multiplying_dice_roll", match_literal_dice, replace_literal_dice)]
}

fn plus() -> Token {
    Token::artificial(TokenKind::Plus, "+")
}

fn dash() -> Token {
    Token::artificial(TokenKind::Dash, "-")
}

fn asterisk() -> Token {
    Token::artificial(TokenKind::Asterisk, "*")
}

/// Destructures a binary node whose operator is one of `operators`.
fn binary<'e>(expr: &'e Expr, operators: &[&str]) -> Option<(&'e Expr, &'e str, &'e Expr)> {
    if let Expr::Binary { left, operator, right } = expr
       && operators.contains(&operator.content.as_str())
    {
        Some((left.as_ref(), operator.content.as_str(), right.as_ref()))
    } else {
        None
    }
}

// 0 + x -> x
// x + 0 -> x
fn match_zero_addition(expr: &Expr) -> Option<RuleMatch> {
    let (left, _, right) = binary(expr, &["+"])?;

    if left.is_number(0.0) {
        return Some(RuleMatch::target("right"));
    }
    if right.is_number(0.0) {
        return Some(RuleMatch::target("left"));
    }

    None
}

// 1 * x -> x
// x * 1 -> x
// x / 1 -> x
fn match_one_multiplication(expr: &Expr) -> Option<RuleMatch> {
    let (left, operator, right) = binary(expr, &["*", "/"])?;

    if operator == "*" {
        if left.is_number(1.0) {
            return Some(RuleMatch::target("right"));
        }
        if right.is_number(1.0) {
            return Some(RuleMatch::target("left"));
        }
    } else if right.is_number(1.0) {
        return Some(RuleMatch::target("left"));
    }

    None
}

/// Keeps the side named by the match and drops the rest of the node.
fn replace_keep_side(expr: &Expr, found: &RuleMatch) -> Rewrite {
    if let Expr::Binary { left, right, .. } = expr {
        let kept = if found.target == "left" { left } else { right };
        return Rewrite::Replace((**kept).clone());
    }

    Rewrite::Keep
}

// x - x -> 0                          {A}
// x / x -> 1                          {B}
// x + x -> 2 * x                      {C}
// (L * x) / L -> x                    {D}
// (x * L) / L -> x                    {E}
// x + (x + y) -> (x * 2) + y          {F}
// x + (y + x) -> (x * 2) + y          {G}
// (x + y) + x -> (x * 2) + y          {H}
// (y + x) + x -> (x * 2) + y          {I}
// x + (y * x) -> (y + 1) * x          {J}
// x + (x * y) -> (y + 1) * x          {K}
// (y * x) + x -> (y + 1) * x          {L}
// (x * y) + x -> (y + 1) * x          {M}
fn match_identical_terms(expr: &Expr) -> Option<RuleMatch> {
    let (left, operator, right) = binary(expr, &["/", "-", "+"])?;

    if operator == "/"
       && let Some((inner_left, _, inner_right)) = binary(left, &["*"])
       && right.is_literal()
    {
        if inner_left.is_literal() && inner_left.is_similar(right) {
            return Some(RuleMatch::target("D"));
        }
        if inner_right.is_literal() && inner_right.is_similar(right) {
            return Some(RuleMatch::target("E"));
        }
    }

    if operator == "+" {
        if let Some((inner_left, _, inner_right)) = binary(right, &["+"]) {
            if left.is_similar(inner_left) {
                return Some(RuleMatch::target("F"));
            }
            if left.is_similar(inner_right) {
                return Some(RuleMatch::target("G"));
            }
        } else if let Some((inner_left, _, inner_right)) = binary(left, &["+"]) {
            if right.is_similar(inner_left) {
                return Some(RuleMatch::target("H"));
            }
            if right.is_similar(inner_right) {
                return Some(RuleMatch::target("I"));
            }
        } else if let Some((inner_left, _, inner_right)) = binary(right, &["*"]) {
            if left.is_similar(inner_right) {
                return Some(RuleMatch::target("J"));
            }
            if left.is_similar(inner_left) {
                return Some(RuleMatch::target("K"));
            }
        } else if let Some((inner_left, _, inner_right)) = binary(left, &["*"]) {
            if right.is_similar(inner_right) {
                return Some(RuleMatch::target("L"));
            }
            if right.is_similar(inner_left) {
                return Some(RuleMatch::target("M"));
            }
        }
    }

    if left.is_similar(right) {
        return Some(RuleMatch::target("ABC"));
    }

    None
}

fn replace_identical_terms(expr: &Expr, found: &RuleMatch) -> Rewrite {
    let Expr::Binary { left, operator, right } = expr else {
        return Rewrite::Keep;
    };

    let inner_of = |side: &Expr| -> Option<(Expr, Expr)> {
        if let Expr::Binary { left, right, .. } = side {
            Some(((**left).clone(), (**right).clone()))
        } else {
            None
        }
    };

    match found.target {
        "D" => match inner_of(left) {
            Some((_, kept)) => Rewrite::Replace(kept),
            None => Rewrite::Keep,
        },
        "E" => match inner_of(left) {
            Some((kept, _)) => Rewrite::Replace(kept),
            None => Rewrite::Keep,
        },
        "F" | "G" | "H" | "I" => {
            let (repeated, other_side) =
                if found.target == "F" || found.target == "G" { (left, right) } else { (right, left) };
            let Some((inner_left, inner_right)) = inner_of(other_side) else {
                return Rewrite::Keep;
            };
            let leftover = match found.target {
                "F" | "H" => inner_right,
                _ => inner_left,
            };

            let doubled =
                Expr::binary((**repeated).clone(), asterisk(), Expr::number(2.0));
            Rewrite::Replace(Expr::binary(doubled, plus(), leftover))
        },
        "J" | "K" | "L" | "M" => {
            let (repeated, other_side) =
                if found.target == "J" || found.target == "K" { (left, right) } else { (right, left) };
            let Some((inner_left, inner_right)) = inner_of(other_side) else {
                return Rewrite::Keep;
            };
            let factor = match found.target {
                "J" | "L" => inner_left,
                _ => inner_right,
            };

            let incremented = Expr::binary(factor, plus(), Expr::number(1.0));
            Rewrite::Replace(Expr::binary(incremented, asterisk(), (**repeated).clone()))
        },
        _ => match operator.content.as_str() {
            "-" => Rewrite::Replace(Expr::number(0.0)),
            "/" => Rewrite::Replace(Expr::number(1.0)),
            _ => {
                let doubled = Expr::binary(Expr::number(2.0), asterisk(), (**right).clone());
                Rewrite::Replace(doubled)
            },
        },
    }
}

// (a * c) + (b * c) -> (a + b) * c
fn match_distributive(expr: &Expr) -> Option<RuleMatch> {
    let (left, _, right) = binary(expr, &["+"])?;
    let (a, _, b) = binary(left, &["*"])?;
    let (c, _, d) = binary(right, &["*"])?;

    let mut matches = Vec::new();
    for (i, x) in [a, b].iter().enumerate() {
        for (j, y) in [c, d].iter().enumerate() {
            if x.is_similar(y) {
                matches.push((i, j));
            }
        }
    }

    // anything but exactly one repeated operand is ambiguous
    match matches.as_slice() {
        [(0, 0)] => Some(RuleMatch::target("00")),
        [(0, 1)] => Some(RuleMatch::target("01")),
        [(1, 0)] => Some(RuleMatch::target("10")),
        [(1, 1)] => Some(RuleMatch::target("11")),
        _ => None,
    }
}

fn replace_distributive(expr: &Expr, found: &RuleMatch) -> Rewrite {
    let Some((left, _, right)) = binary(expr, &["+"]) else {
        return Rewrite::Keep;
    };
    let (Some((a, _, b)), Some((c, _, d))) = (binary(left, &["*"]), binary(right, &["*"]))
    else {
        return Rewrite::Keep;
    };

    let (repeated, first, second) = match found.target {
        "00" => (a, b, d),
        "01" => (a, b, c),
        "10" => (b, a, d),
        _ => (b, a, c),
    };

    let addition = Expr::binary(first.clone(), plus(), second.clone());
    Rewrite::Replace(Expr::binary(addition, asterisk(), repeated.clone()))
}

// L1 + (NL + L2) -> NL + (L1 + L2)
fn match_group_literals(expr: &Expr) -> Option<RuleMatch> {
    let (left, _, right) = binary(expr, &["+"])?;
    let (inner_left, _, inner_right) = binary(right, &["+"])?;

    let applies = left.is_literal() && !inner_left.is_literal() && inner_right.is_literal();
    applies.then(|| RuleMatch::target("swap"))
}

fn replace_group_literals(expr: &Expr, _found: &RuleMatch) -> Rewrite {
    let Some((left, _, right)) = binary(expr, &["+"]) else {
        return Rewrite::Keep;
    };
    let Some((inner_left, _, inner_right)) = binary(right, &["+"]) else {
        return Rewrite::Keep;
    };

    let grouped = Expr::binary(left.clone(), plus(), inner_right.clone());
    Rewrite::Replace(Expr::binary(inner_left.clone(), plus(), grouped))
}

// L * NL -> NL * L
// L + NL -> NL + L
fn match_swap_literal(expr: &Expr) -> Option<RuleMatch> {
    let (left, _, right) = binary(expr, &["+", "*"])?;

    let applies = left.is_literal() && !right.is_literal();
    applies.then(|| RuleMatch::target("swap"))
}

fn replace_swap_literal(expr: &Expr, _found: &RuleMatch) -> Rewrite {
    if let Expr::Binary { left, operator, right } = expr {
        return Rewrite::Replace(Expr::binary((**right).clone(),
                                             operator.clone(),
                                             (**left).clone()));
    }

    Rewrite::Keep
}

// (NL - L1) + L2 -> NL + (L2 - L1)     {A}
// (NL - L1) - L2 -> NL - (L1 + L2)     {B}
// (NL + L1) - L2 -> NL + (L1 - L2)     {C}
// (NL + L1) + L2 -> NL + (L1 + L2)     {D}
fn match_unwrap_operands(expr: &Expr) -> Option<RuleMatch> {
    let (left, operator, right) = binary(expr, &["+", "-"])?;

    if !right.is_literal() {
        return None;
    }
    let (inner_left, inner_operator, inner_right) = binary(left, &["+", "-"])?;
    if inner_left.is_literal() || !inner_right.is_literal() {
        return None;
    }

    match (operator, inner_operator) {
        ("+", "-") => Some(RuleMatch::target("A")),
        ("-", "-") => Some(RuleMatch::target("B")),
        ("-", "+") => Some(RuleMatch::target("C")),
        _ => Some(RuleMatch::target("D")),
    }
}

fn replace_unwrap_operands(expr: &Expr, found: &RuleMatch) -> Rewrite {
    let Some((left, _, outer_literal)) = binary(expr, &["+", "-"]) else {
        return Rewrite::Keep;
    };
    let Some((non_literal, _, inner_literal)) = binary(left, &["+", "-"]) else {
        return Rewrite::Keep;
    };

    let (outer, grouped) = match found.target {
        "A" => (plus(), Expr::binary(outer_literal.clone(), dash(), inner_literal.clone())),
        "B" => (dash(), Expr::binary(inner_literal.clone(), plus(), outer_literal.clone())),
        "C" => (plus(), Expr::binary(inner_literal.clone(), dash(), outer_literal.clone())),
        _ => (plus(), Expr::binary(inner_literal.clone(), plus(), outer_literal.clone())),
    };

    Rewrite::Replace(Expr::binary(non_literal.clone(), outer, grouped))
}

// roll * L -> roll with folded size
// L * roll -> roll with folded size
fn match_literal_dice(expr: &Expr) -> Option<RuleMatch> {
    let (left, _, right) = binary(expr, &["*"])?;

    if dice_with_numeric_size(left).is_some() && right.numeric_value().is_some() {
        return Some(RuleMatch::target("left"));
    }
    if dice_with_numeric_size(right).is_some() && left.numeric_value().is_some() {
        return Some(RuleMatch::target("right"));
    }

    None
}

fn replace_literal_dice(expr: &Expr, found: &RuleMatch) -> Rewrite {
    let Expr::Binary { left, right, .. } = expr else {
        return Rewrite::Keep;
    };

    let (roll, factor) = if found.target == "left" { (left, right) } else { (right, left) };

    let (Some((size, faces, keep)), Some(factor)) =
        (dice_with_numeric_size(roll), factor.numeric_value())
    else {
        return Rewrite::Keep;
    };

    Rewrite::Replace(Expr::DiceRoll { size:  Box::new(Expr::number(size * factor)),
                                      faces,
                                      keep })
}

fn dice_with_numeric_size(expr: &Expr) -> Option<(f64, u32, DiceKeep)> {
    if let Expr::DiceRoll { size, faces, keep } = expr
       && let Some(value) = size.numeric_value()
    {
        Some((value, *faces, keep.clone()))
    } else {
        None
    }
}
