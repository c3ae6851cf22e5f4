//! Partial evaluation of parsed formulas.
//!
//! The central dispatch switches on node type and returns an
//! [`Evaluation`]: a pair of an optional runtime value and a node. When a
//! subtree cannot resolve (a variable the environment does not know yet, a
//! dice roll with no roller), the evaluation comes back *unresolved*,
//! carrying a best-effort partially folded residual tree instead of
//! raising. The caller binds more data and evaluates the residual again;
//! this return-based suspension is what lets formulas reference
//! not-yet-known names.

/// Scoped variable bindings with indirection resolution.
///
/// # Responsibilities
/// - Holds exact-name and pattern bindings in a parent-linked scope tree.
/// - Follows indirection chains with bounded depth and cycle detection.
/// - Tracks a monotonic version so the processor can detect change.
pub mod environment;
/// The evaluator's open extension points.
///
/// # Responsibilities
/// - Declares the number⊗other and custom-operation hooks.
/// - Carries the optional dice-roller extension.
pub mod evaluator;
/// Cross-tree indexing of the names evaluation touched.
///
/// # Responsibilities
/// - Indexes identifier, call and member nodes per variable name.
/// - Expands names to the resolved spellings an environment would need.
pub mod symbol_table;
/// Runtime value types.
///
/// # Responsibilities
/// - Defines the `RuntimeValue` union and its projections.
/// - Defines function values and their native implementation shape.
pub mod value;

use crate::{
    ast::{Expr, Statement},
    dice::{DiceKeep, keep_total},
    error::RuntimeError,
    functions::FunctionCatalog,
    lexer::{Lexer, LexicalGrammar},
    parser::grammar::{SyntacticalContext, SyntaxMode},
    token::{Token, TokenKind},
};

use environment::{Environment, ScopeId};
use evaluator::NodeEvaluator;
use symbol_table::SymbolTable;
use value::{FunctionContext, FunctionReturn, RuntimeValue};

/// The output of evaluating a node.
///
/// *Resolved* iff the value is present; otherwise the node is the
/// best-effort residual form, ready to be evaluated again once the
/// environment knows more. Within one evaluation the transition is one-way
/// (unresolved to resolved only); a later pass with an updated environment
/// may resolve what was previously residual.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// The concrete value, when resolution succeeded.
    pub value: Option<RuntimeValue>,
    /// The node: the evaluated form when resolved, the residual otherwise.
    pub node:  Expr,
}

impl Evaluation {
    /// Creates a resolved evaluation.
    #[must_use]
    pub const fn resolved(value: RuntimeValue, node: Expr) -> Self {
        Self { value: Some(value),
               node }
    }

    /// Creates an unresolved evaluation around a residual node.
    #[must_use]
    pub const fn unresolved(node: Expr) -> Self {
        Self { value: None, node }
    }

    /// Returns `true` when a concrete value is present.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        self.value.is_some()
    }

    /// Renders the evaluation: the value when resolved, the residual
    /// content otherwise.
    #[must_use]
    pub fn content(&self) -> String {
        match &self.value {
            Some(value) => value.content(),
            None => self.node.content(),
        }
    }

    /// Converts the evaluation into its node form: the value's node
    /// equivalent when resolved, the residual node otherwise.
    #[must_use]
    pub fn into_node(self, interpreter: &Interpreter<'_>) -> Expr {
        match self.value {
            Some(value) => interpreter.convert_to_node(&value, Some(&self.node)),
            None => self.node,
        }
    }
}

/// The interpreter: one evaluation pass over one tree.
///
/// Borrows the environment read-only; bindings change between passes (the
/// processor's environment-update callback), never during one.
pub struct Interpreter<'a> {
    id:          String,
    environment: &'a Environment,
    scope:       ScopeId,
    symbols:     &'a mut SymbolTable,
    evaluator:   &'a NodeEvaluator,
    lexical:     &'a LexicalGrammar,
    functions:   &'a FunctionCatalog,
    context:     SyntacticalContext,
}

impl<'a> Interpreter<'a> {
    /// Creates an interpreter for one pass.
    ///
    /// The `id` designates the tree in symbol-table references; successive
    /// passes over the same formula use distinct ids.
    #[allow(clippy::too_many_arguments)]
    pub fn new(id: impl Into<String>,
               environment: &'a Environment,
               scope: ScopeId,
               symbols: &'a mut SymbolTable,
               evaluator: &'a NodeEvaluator,
               lexical: &'a LexicalGrammar,
               functions: &'a FunctionCatalog,
               context: SyntacticalContext)
               -> Self {
        Self { id: id.into(),
               environment,
               scope,
               symbols,
               evaluator,
               lexical,
               functions,
               context }
    }

    /// Evaluates a whole tree and post-processes the outcome.
    ///
    /// In expression mode an object value collapses to its numeric
    /// projection; an object without one leaves the evaluation unresolved.
    ///
    /// # Errors
    /// Returns a [`RuntimeError`] only for hard failures (an unsupported
    /// operator over resolved types, a non-finite result, a circular
    /// indirection). Missing bindings produce an unresolved evaluation.
    pub fn process(&mut self, tree: &Statement) -> Result<Evaluation, RuntimeError> {
        let Evaluation { value, node } = self.evaluate(tree.expr())?;

        match self.post_process(value) {
            Some(value) => {
                let node = self.convert_to_node(&value, Some(&node));
                Ok(Evaluation::resolved(value, node))
            },
            None => Ok(Evaluation::unresolved(node)),
        }
    }

    /// Central dispatch: evaluates one node.
    ///
    /// # Errors
    /// Returns a [`RuntimeError`] for hard failures; soft failures come
    /// back as unresolved evaluations.
    pub fn evaluate(&mut self, node: &Expr) -> Result<Evaluation, RuntimeError> {
        match node {
            // literal handlers are total
            Expr::Numeric { value, .. } => {
                Ok(Evaluation::resolved(RuntimeValue::Number(*value), node.clone()))
            },
            Expr::Text { .. } => {
                Ok(Evaluation::resolved(RuntimeValue::Text(node.content()), node.clone()))
            },
            Expr::Boolean { value, .. } => {
                Ok(Evaluation::resolved(RuntimeValue::Boolean(*value), node.clone()))
            },
            Expr::Unit { unit, .. } => {
                Ok(Evaluation::resolved(RuntimeValue::Unit(unit.clone()), node.clone()))
            },
            Expr::Identifier { .. } => self.evaluate_identifier(node),
            Expr::Binary { left, operator, right } => {
                self.evaluate_binary(node, left, operator, right)
            },
            Expr::Prefix { operator, right } => self.evaluate_prefix(node, operator, right),
            Expr::Call { callee, arguments } => self.evaluate_call(node, callee, arguments),
            Expr::Member { object, property } => self.evaluate_member(node, object, property),
            Expr::If { condition, consequent, alternative } => {
                self.evaluate_if(node, condition, consequent, alternative.as_deref())
            },
            Expr::DiceRoll { size, faces, keep } => self.evaluate_dice(node, size, *faces, keep),
        }
    }

    fn evaluate_identifier(&mut self, node: &Expr) -> Result<Evaluation, RuntimeError> {
        let name = node.content();
        let tree = self.id.clone();
        self.symbols.index(&name, &tree, Some(node));

        match self.environment.get_from(self.scope, &name)? {
            Some(value) => Ok(Evaluation::resolved(value, node.clone())),
            None => Ok(Evaluation::unresolved(node.clone())),
        }
    }

    fn evaluate_binary(&mut self,
                       node: &Expr,
                       left: &Expr,
                       operator: &Token,
                       right: &Expr)
                       -> Result<Evaluation, RuntimeError> {
        let left_eval = self.evaluate(left)?;
        let right_eval = self.evaluate(right)?;

        // either side unresolved: rebuild the partially folded expression
        let (Some(left_value), Some(right_value)) = (&left_eval.value, &right_eval.value) else {
            let residual = Expr::Binary { left:     Box::new(left_eval.into_node(self)),
                                          operator: operator.clone(),
                                          right:    Box::new(right_eval.into_node(self)), };
            return Ok(Evaluation::unresolved(residual));
        };

        let operator_text = operator.content.as_str();
        let is_algebraic = matches!(operator_text, "+" | "-" | "*" | "/");
        let is_logical = matches!(operator_text, "=" | "!=" | ">" | "<" | ">=" | "<=");

        if is_logical {
            let value = logical_operation(left_value, right_value, operator_text)?;
            return Ok(Evaluation::resolved(value, node.clone()));
        }

        if is_algebraic {
            if let (RuntimeValue::Number(a), RuntimeValue::Number(b)) = (left_value, right_value) {
                let value = numeric_operation(*a, *b, operator_text)?;
                return Ok(Evaluation::resolved(value, node.clone()));
            }

            if matches!(left_value, RuntimeValue::Number(_))
               && let Some(value) =
                   (self.evaluator.numeric_and_other)(left_value, right_value, operator_text)
            {
                return Ok(Evaluation::resolved(value, node.clone()));
            }
        }

        // no clue about the types; ask the injectable custom operation
        if let Some(custom) = self.evaluator.custom_operation
           && let Some(value) = custom(left_value, right_value, operator_text, node)
        {
            return Ok(Evaluation::resolved(value, node.clone()));
        }

        Err(RuntimeError::UnsupportedOperator { operator: operator_text.to_string(),
                                                left:     left_value.type_name().to_string(),
                                                right:    right_value.type_name().to_string(), })
    }

    fn evaluate_prefix(&mut self,
                       node: &Expr,
                       operator: &Token,
                       right: &Expr)
                       -> Result<Evaluation, RuntimeError> {
        let right_eval = self.evaluate(right)?;

        let Some(value) = &right_eval.value else {
            let residual = Expr::Prefix { operator: operator.clone(),
                                          right:    Box::new(right_eval.into_node(self)), };
            return Ok(Evaluation::unresolved(residual));
        };

        match (operator.content.as_str(), value) {
            ("-", RuntimeValue::Number(n)) => {
                Ok(Evaluation::resolved(RuntimeValue::Number(-n), node.clone()))
            },
            ("+", RuntimeValue::Number(n)) => {
                Ok(Evaluation::resolved(RuntimeValue::Number(*n), node.clone()))
            },
            (op, other) => {
                Err(RuntimeError::UnsupportedPrefix { operator: op.to_string(),
                                                      operand:  other.type_name().to_string(), })
            },
        }
    }

    fn evaluate_call(&mut self,
                     node: &Expr,
                     callee: &Expr,
                     arguments: &[Expr])
                     -> Result<Evaluation, RuntimeError> {
        let callee_text = callee.content();

        // 1. An unrecognized callee is not a call at all: the whole thing
        //    is descriptive text.
        if !self.functions.is_callable(&callee_text) {
            return self.reinterpret_as_text(node);
        }

        let tree = self.id.clone();
        self.symbols.index(&callee_text, &tree, Some(node));

        // 2. Arguments evaluate left to right; any unresolved argument
        //    aborts to a residual call.
        let mut evaluations = Vec::new();
        for argument in arguments {
            evaluations.push(self.evaluate(argument)?);
        }

        if evaluations.iter().any(|evaluation| !evaluation.is_resolved()) {
            let residual_arguments: Vec<Expr> =
                evaluations.into_iter().map(|evaluation| evaluation.into_node(self)).collect();
            let residual = Expr::Call { callee:    Box::new(callee.clone()),
                                        arguments: residual_arguments, };
            return Ok(Evaluation::unresolved(residual));
        }

        let mut values = Vec::new();
        for evaluation in &evaluations {
            if let Some(value) = &evaluation.value {
                values.push(value.clone());
            }
        }

        // 3. A callable name with no bound implementation stays residual;
        //    the environment may supply it later.
        let Some(bound) = self.environment.get_from(self.scope, &callee_text)? else {
            return Ok(Evaluation::unresolved(node.clone()));
        };
        let RuntimeValue::Function(function) = bound else {
            return Err(RuntimeError::NotAFunction { name: callee_text });
        };

        // 4. The return folds back into the same pipeline.
        let context = FunctionContext { environment: self.environment,
                                        scope:       self.scope,
                                        node, };
        match function.call(&context, &values)? {
            None => Ok(Evaluation::unresolved(node.clone())),
            Some(FunctionReturn::Value(value)) => Ok(Evaluation::resolved(value, node.clone())),
            Some(FunctionReturn::Node(expr)) => self.evaluate(&expr),
            Some(FunctionReturn::Evaluation(evaluation)) => Ok(evaluation),
        }
    }

    fn evaluate_member(&mut self,
                       node: &Expr,
                       object: &Expr,
                       property: &Token)
                       -> Result<Evaluation, RuntimeError> {
        let full_name = node.content();
        let tree = self.id.clone();
        self.symbols.index(&full_name, &tree, Some(node));

        // 1. The whole spelling may be bound directly.
        if let Some(value) = self.environment.get_from(self.scope, &full_name)? {
            return Ok(Evaluation::resolved(value, node.clone()));
        }

        // 2. Otherwise project the property out of a resolved object.
        let object_eval = self.evaluate(object)?;
        match &object_eval.value {
            Some(RuntimeValue::Object(object_value)) => {
                match object_value.property(&property.content) {
                    Some(value) => Ok(Evaluation::resolved(value.clone(), node.clone())),
                    None => Ok(Evaluation::unresolved(node.clone())),
                }
            },
            Some(_) => Ok(Evaluation::unresolved(node.clone())),
            None => {
                let residual = Expr::Member { object:   Box::new(object_eval.into_node(self)),
                                              property: property.clone(), };
                Ok(Evaluation::unresolved(residual))
            },
        }
    }

    fn evaluate_if(&mut self,
                   node: &Expr,
                   condition: &Expr,
                   consequent: &Expr,
                   alternative: Option<&Expr>)
                   -> Result<Evaluation, RuntimeError> {
        let condition_eval = self.evaluate(condition)?;

        let Some(condition_value) = &condition_eval.value else {
            // fold the branches as far as they go while the condition waits
            let consequent_eval = self.evaluate(consequent)?;
            let alternative_node = match alternative {
                Some(alternative) => Some(Box::new(self.evaluate(alternative)?.into_node(self))),
                None => None,
            };

            let residual = Expr::If { condition:   Box::new(condition_eval.into_node(self)),
                                      consequent:  Box::new(consequent_eval.into_node(self)),
                                      alternative: alternative_node, };
            return Ok(Evaluation::unresolved(residual));
        };

        let truth = match condition_value {
            RuntimeValue::Boolean(value) => *value,
            RuntimeValue::Number(value) => *value != 0.0,
            other => match other.as_boolean() {
                Some(value) => value,
                None => {
                    return Err(RuntimeError::InvalidCondition { found: other.type_name()
                                                                            .to_string(), });
                },
            },
        };

        if truth {
            self.evaluate(consequent)
        } else {
            match alternative {
                Some(alternative) => self.evaluate(alternative),
                None => Ok(Evaluation::resolved(RuntimeValue::Text(String::new()), node.clone())),
            }
        }
    }

    fn evaluate_dice(&mut self,
                     node: &Expr,
                     size: &Expr,
                     faces: u32,
                     keep: &DiceKeep)
                     -> Result<Evaluation, RuntimeError> {
        let size_eval = self.evaluate(size)?;

        let Some(RuntimeValue::Number(count)) = &size_eval.value else {
            let residual = Expr::DiceRoll { size:  Box::new(size_eval.into_node(self)),
                                            faces,
                                            keep:  keep.clone(), };
            return Ok(Evaluation::unresolved(residual));
        };

        // only a registered roller turns dice into numbers
        let Some(roller) = self.evaluator.dice_roller() else {
            let residual = Expr::DiceRoll { size:  Box::new(Expr::number(*count)),
                                            faces,
                                            keep:  keep.clone(), };
            return Ok(Evaluation::unresolved(residual));
        };

        let dice = if *count < 0.0 { 0 } else { *count as u32 };
        let rolls = roller(dice, faces);
        let total = keep_total(&rolls, keep);

        Ok(Evaluation::resolved(RuntimeValue::Number(f64::from(total)), node.clone()))
    }

    /// Reinterprets a call-shaped node as literal text, re-lexed so the
    /// literal glues from real tokens (text mode wins).
    fn reinterpret_as_text(&mut self, node: &Expr) -> Result<Evaluation, RuntimeError> {
        let content = node.content();

        let tokens = match Lexer::new(self.lexical).process(&content) {
            Ok(scan) => scan.tokens,
            Err(_) => vec![Token::artificial(TokenKind::Text, content)],
        };

        let literal = Expr::Text { tokens };
        let value = RuntimeValue::Text(literal.content());

        Ok(Evaluation::resolved(value, literal))
    }

    /// Converts a runtime value back into its node equivalent.
    #[must_use]
    pub fn convert_to_node(&self, value: &RuntimeValue, source: Option<&Expr>) -> Expr {
        match value {
            RuntimeValue::Number(v) => Expr::number(*v),
            RuntimeValue::Text(v) => Expr::text(v.clone()),
            RuntimeValue::Boolean(v) => Expr::boolean(*v),
            RuntimeValue::Unit(unit) => unit_literal(unit),
            RuntimeValue::Quantity(quantity) => {
                Expr::binary(Expr::number(quantity.value),
                             Token::artificial(TokenKind::Asterisk, "*"),
                             unit_literal(&quantity.unit))
            },
            RuntimeValue::Object(object) => object.numeric
                                                  .map(Expr::number)
                                                  .or_else(|| object.text.clone().map(Expr::text))
                                                  .or_else(|| source.cloned())
                                                  .unwrap_or_else(|| Expr::text("{}")),
            RuntimeValue::Function(function) => Expr::text(format!("{}(...)", function.name)),
            RuntimeValue::Expression(expression) => (**expression).clone(),
            RuntimeValue::Variable(name) => Expr::identifier(name.clone()),
        }
    }

    /// Expression-mode post-processing: objects collapse to their numeric
    /// projection or leave the evaluation unresolved.
    fn post_process(&self, value: Option<RuntimeValue>) -> Option<RuntimeValue> {
        match value {
            Some(RuntimeValue::Object(object))
                if matches!(self.context.mode, SyntaxMode::Expression | SyntaxMode::If) =>
            {
                object.numeric.map(RuntimeValue::Number)
            },
            other => other,
        }
    }
}

fn unit_literal(unit: &crate::units::Unit) -> Expr {
    Expr::Unit { unit:   unit.clone(),
                 tokens: vec![Token::artificial(TokenKind::Text, unit.symbol.clone())], }
}

/// Arithmetic over two resolved numbers.
fn numeric_operation(left: f64, right: f64, operator: &str) -> Result<RuntimeValue, RuntimeError> {
    let result = match operator {
        "+" => left + right,
        "-" => left - right,
        "*" => left * right,
        "/" => {
            if right == 0.0 {
                return Err(RuntimeError::DivisionByZero);
            }
            left / right
        },
        _ => {
            return Err(RuntimeError::UnsupportedOperator { operator: operator.to_string(),
                                                           left:     "number".to_string(),
                                                           right:    "number".to_string(), });
        },
    };

    if !result.is_finite() {
        return Err(RuntimeError::NonFiniteResult { operator: operator.to_string() });
    }

    Ok(RuntimeValue::Number(result))
}

/// Comparison over two resolved values.
fn logical_operation(left: &RuntimeValue,
                     right: &RuntimeValue,
                     operator: &str)
                     -> Result<RuntimeValue, RuntimeError> {
    if let (Some(a), Some(b)) = (left.as_number(), right.as_number()) {
        let result = match operator {
            "=" => a == b,
            "!=" => a != b,
            ">" => a > b,
            "<" => a < b,
            ">=" => a >= b,
            "<=" => a <= b,
            _ => return Err(unsupported(left, right, operator)),
        };
        return Ok(RuntimeValue::Boolean(result));
    }

    if let (RuntimeValue::Text(a), RuntimeValue::Text(b)) = (left, right) {
        let result = match operator {
            "=" => a == b,
            "!=" => a != b,
            ">" => a > b,
            "<" => a < b,
            ">=" => a >= b,
            "<=" => a <= b,
            _ => return Err(unsupported(left, right, operator)),
        };
        return Ok(RuntimeValue::Boolean(result));
    }

    match operator {
        "=" => Ok(RuntimeValue::Boolean(left.is_equal(right))),
        "!=" => Ok(RuntimeValue::Boolean(!left.is_equal(right))),
        _ => Err(unsupported(left, right, operator)),
    }
}

fn unsupported(left: &RuntimeValue, right: &RuntimeValue, operator: &str) -> RuntimeError {
    RuntimeError::UnsupportedOperator { operator: operator.to_string(),
                                        left:     left.type_name().to_string(),
                                        right:    right.type_name().to_string(), }
}
