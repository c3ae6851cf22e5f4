use std::{collections::HashMap, rc::Rc};

use crate::{
    ast::Expr,
    error::RuntimeError,
    interpreter::{
        Evaluation,
        environment::{Environment, ScopeId},
    },
    units::{Quantity, Unit},
    util::num::format_number,
};

/// An opaque object value.
///
/// Objects carry named properties plus optional numeric and textual
/// projections. The engine never looks inside beyond that: member access
/// projects properties, and post-processing in expression mode collapses an
/// object to its numeric projection when one exists.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectValue {
    /// Named properties, themselves runtime values.
    pub properties: HashMap<String, RuntimeValue>,
    /// The numeric projection, when the object can stand in for a number.
    pub numeric:    Option<f64>,
    /// The textual projection, when the object can stand in for a string.
    pub text:       Option<String>,
    /// The boolean projection, when the object can stand in for a truth
    /// value.
    pub boolean:    Option<bool>,
}

impl ObjectValue {
    /// Creates an object from its properties.
    #[must_use]
    pub fn new(properties: HashMap<String, RuntimeValue>) -> Self {
        Self { properties,
               numeric: None,
               text: None,
               boolean: None }
    }

    /// Sets the numeric projection.
    #[must_use]
    pub const fn with_numeric(mut self, numeric: f64) -> Self {
        self.numeric = Some(numeric);
        self
    }

    /// Sets the textual projection.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Sets the boolean projection.
    #[must_use]
    pub const fn with_boolean(mut self, boolean: bool) -> Self {
        self.boolean = Some(boolean);
        self
    }

    /// Returns `true` when the object has no properties.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Returns a property value, if present.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&RuntimeValue> {
        self.properties.get(name)
    }
}

/// Everything a native function can hand back.
///
/// Whatever comes back is folded into the same evaluation pipeline: a node
/// is evaluated in turn, a value resolves the call, a full evaluation
/// passes through unchanged.
#[derive(Debug)]
pub enum FunctionReturn {
    /// A concrete value; the call resolves to it.
    Value(RuntimeValue),
    /// A node; evaluated as if it had been in the tree all along.
    Node(Expr),
    /// A complete evaluation, resolved or residual.
    Evaluation(Evaluation),
}

/// Context handed to a native function at call time.
pub struct FunctionContext<'a> {
    /// The environment the call is being resolved against.
    pub environment: &'a Environment,
    /// The scope the call is being resolved in.
    pub scope:       ScopeId,
    /// The call node itself.
    pub node:        &'a Expr,
}

/// The implementation shape of a native function.
///
/// Returning `Ok(None)` means the function cannot produce an answer yet;
/// the call stays residual and is retried on the next resolution.
pub type NativeFunction =
    Rc<dyn Fn(&FunctionContext<'_>, &[RuntimeValue]) -> Result<Option<FunctionReturn>, RuntimeError>>;

/// A callable bound in the environment.
#[derive(Clone)]
pub struct FunctionValue {
    /// The name the function is bound under.
    pub name:       String,
    implementation: NativeFunction,
}

impl FunctionValue {
    /// Creates a function value from a name and an implementation.
    pub fn new(name: impl Into<String>,
               implementation: impl Fn(&FunctionContext<'_>, &[RuntimeValue])
                   -> Result<Option<FunctionReturn>, RuntimeError>
                   + 'static)
               -> Self {
        Self { name:           name.into(),
               implementation: Rc::new(implementation), }
    }

    /// Invokes the implementation.
    ///
    /// # Errors
    /// Propagates whatever [`RuntimeError`] the implementation raises.
    pub fn call(&self,
                context: &FunctionContext<'_>,
                arguments: &[RuntimeValue])
                -> Result<Option<FunctionReturn>, RuntimeError> {
        (self.implementation)(context, arguments)
    }
}

impl std::fmt::Debug for FunctionValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionValue").field("name", &self.name).finish_non_exhaustive()
    }
}

impl PartialEq for FunctionValue {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// A concrete, fully evaluated result.
///
/// The [`Variable`](RuntimeValue::Variable) variant is the *indirection*: a
/// bound value whose payload is another variable's name. The environment
/// follows indirections during resolution, so evaluation itself only ever
/// sees the other variants.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeValue {
    /// A numeric value.
    Number(f64),
    /// A textual value.
    Text(String),
    /// A boolean value.
    Boolean(bool),
    /// A unit of measure.
    Unit(Unit),
    /// A number paired with a unit.
    Quantity(Quantity),
    /// An opaque object.
    Object(ObjectValue),
    /// A callable function.
    Function(FunctionValue),
    /// A detached expression, as returned by native functions.
    Expression(Box<Expr>),
    /// An indirection to another variable.
    Variable(String),
}

impl RuntimeValue {
    /// Returns the type name used in diagnostics.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Number(_) => "number",
            Self::Text(_) => "string",
            Self::Boolean(_) => "boolean",
            Self::Unit(_) => "unit",
            Self::Quantity(_) => "quantity",
            Self::Object(_) => "object",
            Self::Function(_) => "function",
            Self::Expression(_) => "expression",
            Self::Variable(_) => "variable",
        }
    }

    /// Returns `true` when the value can stand in for a number.
    #[must_use]
    pub const fn has_numeric_representation(&self) -> bool {
        match self {
            Self::Number(_) | Self::Boolean(_) => true,
            Self::Object(object) => object.numeric.is_some(),
            _ => false,
        }
    }

    /// Returns the numeric representation, when there is one.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Boolean(value) => Some(f64::from(u8::from(*value))),
            Self::Object(object) => object.numeric,
            _ => None,
        }
    }

    /// Returns the textual representation, when there is one.
    #[must_use]
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Text(value) => Some(value.clone()),
            Self::Object(object) => object.text.clone(),
            _ => None,
        }
    }

    /// Returns the boolean representation, when there is one.
    #[must_use]
    pub const fn as_boolean(&self) -> Option<bool> {
        match self {
            Self::Boolean(value) => Some(*value),
            Self::Object(object) => object.boolean,
            _ => None,
        }
    }

    /// Compares two values for equality.
    #[must_use]
    pub fn is_equal(&self, other: &Self) -> bool {
        self == other
    }

    /// Renders the value the way it would appear in a formula.
    #[must_use]
    pub fn content(&self) -> String {
        match self {
            Self::Number(value) => format_number(*value),
            Self::Text(value) => value.clone(),
            Self::Boolean(value) => value.to_string(),
            Self::Unit(unit) => unit.symbol.clone(),
            Self::Quantity(quantity) => quantity.to_string(),
            Self::Object(object) => {
                if let Some(numeric) = object.numeric {
                    format_number(numeric)
                } else if let Some(text) = &object.text {
                    text.clone()
                } else {
                    "{}".to_string()
                }
            },
            Self::Function(function) => format!("{}(...)", function.name),
            Self::Expression(expression) => expression.content(),
            Self::Variable(name) => name.clone(),
        }
    }

    /// Builds the token form of the value, for injection placeholders.
    ///
    /// Only values with a literal spelling have one.
    #[must_use]
    pub fn to_token(&self) -> Option<crate::token::Token> {
        use crate::token::{Token, TokenKind};

        match self {
            Self::Number(value) => {
                Some(Token::artificial(TokenKind::Number, format_number(*value)))
            },
            Self::Text(value) => Some(Token::artificial(TokenKind::Text, value.clone())),
            Self::Boolean(value) => Some(Token::artificial(TokenKind::Text, value.to_string())),
            Self::Unit(unit) => Some(Token::artificial(TokenKind::Text, unit.symbol.clone())),
            _ => None,
        }
    }
}

impl std::fmt::Display for RuntimeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{}> {}", self.type_name(), self.content())
    }
}
