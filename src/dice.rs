//! Dice notation: `AdXk[hlc]Y`.
//!
//! `A` is the number of dice and `X` the number of faces. An optional keep
//! rule selects a subset of the rolls: `kh` keeps the highest, `kl` the
//! lowest, `kc` lets the player choose.
//!
//! The lexer has no dice entry. `2d6` scans as the number `2` followed by
//! the word `d6`; the parser's implicit-multiplication path recognizes the
//! suffix and produces a dice-roll node instead of `2 * d6`.

use regex::Regex;
use std::sync::LazyLock;

/// How many of the rolled dice are kept.
///
/// All fields absent means every die counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiceKeep {
    /// Keep the `n` highest rolls (`khN`).
    pub highest:        Option<u32>,
    /// Keep the `n` lowest rolls (`klN`).
    pub lowest:         Option<u32>,
    /// Keep `n` rolls of the player's choice (`kcN`).
    pub players_choice: Option<u32>,
}

impl DiceKeep {
    /// Returns `true` when no keep rule is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.highest.is_none() && self.lowest.is_none() && self.players_choice.is_none()
    }

    /// Renders the notation suffix (`kh1`, `kl2`, ...), empty when unset.
    #[must_use]
    pub fn notation(&self) -> String {
        let mut notation = String::new();
        if let Some(n) = self.highest {
            notation.push_str(&format!("kh{n}"));
        }
        if let Some(n) = self.lowest {
            notation.push_str(&format!("kl{n}"));
        }
        if let Some(n) = self.players_choice {
            notation.push_str(&format!("kc{n}"));
        }

        notation
    }
}

/// The faces-and-keep part of a dice notation, without the dice count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiceData {
    /// Number of faces per die.
    pub faces: u32,
    /// Which rolls are kept.
    pub keep:  DiceKeep,
}

static DICE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i)(d[0-9]+)(k[hlc][0-9]+)?(k[hlc][0-9]+)?(k[hlc][0-9]+)?$")
        .expect("dice suffix pattern compiles")
});

/// Parses a dice suffix such as `d6`, `d20kh1` or `d6kh1kl0`.
///
/// Returns `None` when the notation does not describe dice; the caller then
/// falls back to whatever the word meant before (a unit, an identifier,
/// plain text).
///
/// # Example
/// ```
/// use formulary::dice::parse_dice_notation;
///
/// let data = parse_dice_notation("d6kh1").unwrap();
/// assert_eq!(data.faces, 6);
/// assert_eq!(data.keep.highest, Some(1));
/// assert!(parse_dice_notation("door").is_none());
/// ```
#[must_use]
pub fn parse_dice_notation(notation: &str) -> Option<DiceData> {
    let captures = DICE_SUFFIX.captures(notation)?;

    let faces: u32 = captures.get(1)?.as_str()[1..].parse().ok()?;

    let mut keep = DiceKeep::default();
    for group in 2..=4 {
        let Some(rule) = captures.get(group) else {
            continue;
        };
        let rule = rule.as_str();

        let count: u32 = rule[2..].parse().ok()?;
        match rule[..2].to_ascii_lowercase().as_str() {
            "kh" => keep.highest = Some(count),
            "kl" => keep.lowest = Some(count),
            "kc" => keep.players_choice = Some(count),
            _ => return None,
        }
    }

    Some(DiceData { faces, keep })
}

/// Applies a keep rule to a set of rolls and returns the kept total.
///
/// Rolls are sorted per rule before truncation. A `kc` rule has no mechanics
/// here; it keeps the highest rolls, which is what an optimizing player
/// would pick.
#[must_use]
pub fn keep_total(rolls: &[u32], keep: &DiceKeep) -> u32 {
    if keep.is_empty() {
        return rolls.iter().sum();
    }

    let mut sorted = rolls.to_vec();
    let mut total = 0u32;

    if let Some(n) = keep.highest {
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        total += sorted.iter().take(n as usize).sum::<u32>();
    }
    if let Some(n) = keep.lowest {
        sorted.sort_unstable();
        total += sorted.iter().take(n as usize).sum::<u32>();
    }
    if let Some(n) = keep.players_choice {
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        total += sorted.iter().take(n as usize).sum::<u32>();
    }

    total
}
