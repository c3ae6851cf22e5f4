use crate::{
    ast::Expr,
    interpreter::value::RuntimeValue,
    units::Quantity,
};

/// Resolves a number paired with a non-numeric operand (`3 yd`).
///
/// Returning `None` passes the pair on to the custom-operation hook.
pub type NumericAndOtherHook =
    fn(left: &RuntimeValue, right: &RuntimeValue, operator: &str) -> Option<RuntimeValue>;

/// Resolves an operator over a pair of values the built-in dispatch has no
/// rule for. Returning `None` makes the pair a hard error.
pub type CustomOperationHook = fn(left: &RuntimeValue,
                                  right: &RuntimeValue,
                                  operator: &str,
                                  node: &Expr)
                                  -> Option<RuntimeValue>;

/// Produces the rolls for `count` dice of `faces` faces.
pub type DiceRoller = Box<dyn Fn(u32, u32) -> Vec<u32>>;

/// The evaluator's open extension points.
///
/// The dispatch over the fixed node and value kinds is closed; these hooks
/// are where domains inject behavior the core cannot know: operations over
/// opaque objects, unit semantics beyond the quantity case, and actual
/// dice rolling. With no roller registered, dice rolls stay residual.
pub struct NodeEvaluator {
    /// Number ⊗ non-number dispatch. The default resolves
    /// `number * unit` into a quantity.
    pub numeric_and_other: NumericAndOtherHook,
    /// Last-resort dispatch for operand pairs nothing else claims.
    pub custom_operation:  Option<CustomOperationHook>,
    dice_roller:           Option<DiceRoller>,
}

impl NodeEvaluator {
    /// Creates the default evaluator: quantities, no custom operations, no
    /// dice roller.
    #[must_use]
    pub fn new() -> Self {
        Self { numeric_and_other: default_numeric_and_other,
               custom_operation:  None,
               dice_roller:       None, }
    }

    /// Registers the dice roller extension.
    pub fn set_dice_roller(&mut self, roller: impl Fn(u32, u32) -> Vec<u32> + 'static) {
        self.dice_roller = Some(Box::new(roller));
    }

    /// Returns the registered dice roller, if any.
    #[must_use]
    pub fn dice_roller(&self) -> Option<&DiceRoller> {
        self.dice_roller.as_ref()
    }
}

impl Default for NodeEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for NodeEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeEvaluator")
         .field("custom_operation", &self.custom_operation.is_some())
         .field("dice_roller", &self.dice_roller.is_some())
         .finish_non_exhaustive()
    }
}

/// The built-in number ⊗ other rule: multiplying a number by a unit makes
/// a quantity.
fn default_numeric_and_other(left: &RuntimeValue,
                             right: &RuntimeValue,
                             operator: &str)
                             -> Option<RuntimeValue> {
    if let (RuntimeValue::Number(value), RuntimeValue::Unit(unit), "*") = (left, right, operator) {
        return Some(RuntimeValue::Quantity(Quantity::new(*value, unit.clone())));
    }

    None
}
