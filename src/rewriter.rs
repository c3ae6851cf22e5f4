//! Pattern → replacement term rewriting over the AST.
//!
//! One `apply()` call collects the tree's nodes in a single post-order pass
//! and runs a local fixpoint at each: rules are scanned in registration
//! order, the first match splices its replacement in, and the scan restarts
//! at that position until nothing matches. Replacements are not re-entered
//! by the same pass, so a single call is *not* guaranteed to reach a global
//! fixpoint across the whole tree; the processor re-invokes the rewriter
//! between evaluation passes until the printed content stops changing.

use crate::{
    ast::{Expr, Statement},
    error::RuntimeError,
};

/// The default algebraic ruleset.
pub mod rules;

/// What a rule's matcher found; the tag tells the replacement which of the
/// rule's shapes applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleMatch {
    /// Which of the rule's cases matched.
    pub target: &'static str,
}

impl RuleMatch {
    /// A match with a case tag.
    #[must_use]
    pub const fn target(target: &'static str) -> Self {
        Self { target }
    }
}

/// The outcome of a rule's replacement.
#[derive(Debug)]
pub enum Rewrite {
    /// Splice this node in place of the matched one.
    Replace(Expr),
    /// Delete the matched node. Only valid where the parent can lose a
    /// child (a call argument).
    Remove,
    /// Leave the node as it is; the scan moves to the next rule.
    Keep,
}

/// Decides whether a rule applies to a node.
pub type RuleMatcher = fn(&Expr) -> Option<RuleMatch>;
/// Computes the replacement for a matched node.
pub type RuleReplacement = fn(&Expr, &RuleMatch) -> Rewrite;

/// A graph rewriting rule.
#[derive(Debug, Clone)]
pub struct RewriteRule {
    /// Identifying key; later registrations with the same key replace
    /// earlier ones.
    pub key:         String,
    /// Decides whether the rule applies.
    pub matcher:     RuleMatcher,
    /// Computes the replacement.
    pub replacement: RuleReplacement,
}

/// Creates a [`RewriteRule`].
#[must_use]
pub fn create_rule(key: impl Into<String>,
                   matcher: RuleMatcher,
                   replacement: RuleReplacement)
                   -> RewriteRule {
    RewriteRule { key: key.into(),
                  matcher,
                  replacement }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeOutcome {
    Unchanged,
    Changed,
    Removed,
}

/// The rewriting system: an ordered, open set of rules.
#[derive(Debug, Clone, Default)]
pub struct RewritingSystem {
    rules: Vec<RewriteRule>,
}

impl RewritingSystem {
    /// Creates a system with no rules.
    #[must_use]
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Creates a system loaded with the default algebraic ruleset and the
    /// dice ruleset.
    #[must_use]
    pub fn default_system() -> Self {
        let mut system = Self::new();
        system.register_all(rules::default_ruleset());
        system.register_all(rules::dice_ruleset());

        system
    }

    /// Registers a rule, replacing any previous rule with the same key.
    pub fn register(&mut self, rule: RewriteRule) -> &mut Self {
        if let Some(existing) = self.rules.iter_mut().find(|r| r.key == rule.key) {
            *existing = rule;
        } else {
            self.rules.push(rule);
        }

        self
    }

    /// Registers several rules at once.
    pub fn register_all(&mut self, rules: impl IntoIterator<Item = RewriteRule>) -> &mut Self {
        for rule in rules {
            self.register(rule);
        }

        self
    }

    /// Applies the ruleset to a tree, returning the rewritten tree and
    /// whether anything changed.
    ///
    /// # Errors
    /// Returns [`RuntimeError::CannotRemoveNode`] when a rule asks to
    /// remove a node from a fixed position.
    pub fn apply(&self, tree: Statement) -> Result<(Statement, bool), RuntimeError> {
        let mut expr = tree.into_expr();
        let changed = self.rewrite(&mut expr)?;

        Ok((Statement::expression(expr), changed))
    }

    /// Rewrites one subtree: children first, then a local fixpoint here.
    fn rewrite(&self, expr: &mut Expr) -> Result<bool, RuntimeError> {
        let mut changed = self.rewrite_children(expr)?;

        match self.apply_node(expr)? {
            NodeOutcome::Changed => changed = true,
            NodeOutcome::Removed => {
                return Err(RuntimeError::CannotRemoveNode { rule: self.removing_rule(expr) });
            },
            NodeOutcome::Unchanged => {},
        }

        Ok(changed)
    }

    fn rewrite_children(&self, expr: &mut Expr) -> Result<bool, RuntimeError> {
        let mut changed = false;

        match expr {
            Expr::Binary { left, right, .. } => {
                changed |= self.rewrite(left)?;
                changed |= self.rewrite(right)?;
            },
            Expr::Prefix { right, .. } => changed |= self.rewrite(right)?,
            Expr::Member { object, .. } => changed |= self.rewrite(object)?,
            Expr::DiceRoll { size, .. } => changed |= self.rewrite(size)?,
            Expr::Call { callee, arguments } => {
                changed |= self.rewrite(callee)?;
                changed |= self.rewrite_list(arguments)?;
            },
            Expr::If { condition, consequent, alternative } => {
                changed |= self.rewrite(condition)?;
                changed |= self.rewrite(consequent)?;
                if let Some(alternative) = alternative {
                    changed |= self.rewrite(alternative)?;
                }
            },
            Expr::Numeric { .. }
            | Expr::Text { .. }
            | Expr::Boolean { .. }
            | Expr::Unit { .. }
            | Expr::Identifier { .. } => {},
        }

        Ok(changed)
    }

    /// Rewrites a variable-length child list, honoring node removal.
    fn rewrite_list(&self, list: &mut Vec<Expr>) -> Result<bool, RuntimeError> {
        let mut changed = false;

        let mut index = 0;
        while index < list.len() {
            changed |= self.rewrite_children(&mut list[index])?;
            match self.apply_node(&mut list[index])? {
                NodeOutcome::Removed => {
                    list.remove(index);
                    changed = true;
                },
                NodeOutcome::Changed => {
                    changed = true;
                    index += 1;
                },
                NodeOutcome::Unchanged => index += 1,
            }
        }

        Ok(changed)
    }

    /// Runs the local fixpoint at one node: first matching rule replaces,
    /// then the scan restarts until no rule matches.
    fn apply_node(&self, expr: &mut Expr) -> Result<NodeOutcome, RuntimeError> {
        let mut outcome = NodeOutcome::Unchanged;

        'restart: loop {
            for rule in &self.rules {
                let Some(found) = (rule.matcher)(expr) else {
                    continue;
                };

                match (rule.replacement)(expr, &found) {
                    Rewrite::Replace(replacement) => {
                        *expr = replacement;
                        outcome = NodeOutcome::Changed;
                        continue 'restart;
                    },
                    Rewrite::Remove => return Ok(NodeOutcome::Removed),
                    Rewrite::Keep => {},
                }
            }

            break;
        }

        Ok(outcome)
    }

    /// Names the rule that asked for a removal, for diagnostics.
    fn removing_rule(&self, expr: &Expr) -> String {
        for rule in &self.rules {
            if let Some(found) = (rule.matcher)(expr)
               && matches!((rule.replacement)(expr, &found), Rewrite::Remove)
            {
                return rule.key.clone();
            }
        }

        "unknown".to_string()
    }
}
