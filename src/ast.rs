use crate::{
    dice::DiceKeep,
    token::{Token, TokenKind},
    units::Unit,
    util::num::format_number,
};

/// Identifies the shape of a node.
///
/// Used for signatures, symbol-table references and re-typing rules, where
/// the shape matters but the payload does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    /// A statement wrapping a single expression.
    ExpressionStatement,
    /// A numeric literal.
    NumericLiteral,
    /// A string literal (one or more glued words).
    StringLiteral,
    /// A boolean literal.
    BooleanLiteral,
    /// A literal denoting a unit of measure.
    UnitLiteral,
    /// A variable reference.
    Identifier,
    /// A binary operation.
    BinaryExpression,
    /// A prefix (unary) operation.
    PrefixExpression,
    /// A function call.
    CallExpression,
    /// A member access (`object::property`).
    MemberExpression,
    /// A conditional expression.
    IfExpression,
    /// A dice roll (`2d6kh1`).
    DiceRollExpression,
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::ExpressionStatement => "ExpressionStatement",
            Self::NumericLiteral => "NumericLiteral",
            Self::StringLiteral => "StringLiteral",
            Self::BooleanLiteral => "BooleanLiteral",
            Self::UnitLiteral => "UnitLiteral",
            Self::Identifier => "Identifier",
            Self::BinaryExpression => "BinaryExpression",
            Self::PrefixExpression => "PrefixExpression",
            Self::CallExpression => "CallExpression",
            Self::MemberExpression => "MemberExpression",
            Self::IfExpression => "IfExpression",
            Self::DiceRollExpression => "DiceRollExpression",
        };
        write!(f, "{name}")
    }
}

/// An expression node.
///
/// `Expr` covers every construct that can yield a value: literals,
/// identifiers, operations, calls, member access, conditionals and dice
/// rolls. Children are owned; structural edits replace subtrees wholesale,
/// which keeps positions stable and makes the rewriter's splicing explicit.
///
/// Equality is structural and ignores where tokens came from — an
/// artificial `6` equals a lexed `6`.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A numeric literal such as `42` or `3.5`.
    Numeric {
        /// The backing token.
        token: Token,
        /// The parsed value.
        value: f64,
    },
    /// A string literal; possibly several words glued with whitespace.
    Text {
        /// The backing tokens, whitespace included.
        tokens: Vec<Token>,
    },
    /// A boolean literal.
    Boolean {
        /// The backing token.
        token: Token,
        /// The literal value.
        value: bool,
    },
    /// A literal recognized as a unit of measure by the unit catalog.
    Unit {
        /// The unit the literal denotes.
        unit:   Unit,
        /// The backing tokens.
        tokens: Vec<Token>,
    },
    /// A reference to a variable by name.
    Identifier {
        /// The tokens spelling the variable name.
        tokens: Vec<Token>,
    },
    /// A binary operation.
    Binary {
        /// Left operand.
        left:     Box<Expr>,
        /// The operator token.
        operator: Token,
        /// Right operand.
        right:    Box<Expr>,
    },
    /// A prefix operation (`-x`, `+x`).
    Prefix {
        /// The operator token.
        operator: Token,
        /// The operand.
        right:    Box<Expr>,
    },
    /// A function call.
    Call {
        /// The callee expression.
        callee:    Box<Expr>,
        /// The arguments, in source order.
        arguments: Vec<Expr>,
    },
    /// A member access (`object::property`).
    Member {
        /// The object expression.
        object:   Box<Expr>,
        /// The property token.
        property: Token,
    },
    /// A conditional: `@if(condition then consequent else alternative)`.
    If {
        /// The condition.
        condition:   Box<Expr>,
        /// Expression taken when the condition holds.
        consequent:  Box<Expr>,
        /// Expression taken otherwise, when present.
        alternative: Option<Box<Expr>>,
    },
    /// A dice roll: `<size>d<faces><keep>`.
    DiceRoll {
        /// How many dice are rolled; an expression so rewrites can fold
        /// literal factors into it.
        size:  Box<Expr>,
        /// Number of faces per die.
        faces: u32,
        /// Which rolls are kept.
        keep:  DiceKeep,
    },
}

impl Expr {
    // #region CONSTRUCTORS

    /// Creates a numeric literal backed by an artificial token.
    #[must_use]
    pub fn number(value: f64) -> Self {
        Self::Numeric { token: Token::artificial(TokenKind::Number, format_number(value)),
                        value }
    }

    /// Creates a string literal backed by an artificial token.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text { tokens: vec![Token::artificial(TokenKind::Text, content)] }
    }

    /// Creates a boolean literal backed by an artificial token.
    #[must_use]
    pub fn boolean(value: bool) -> Self {
        Self::Boolean { token: Token::artificial(TokenKind::Text,
                                                 if value { "true" } else { "false" }),
                        value }
    }

    /// Creates an identifier backed by an artificial token.
    #[must_use]
    pub fn identifier(name: impl Into<String>) -> Self {
        Self::Identifier { tokens: vec![Token::artificial(TokenKind::Text, name)] }
    }

    /// Creates a binary expression.
    #[must_use]
    pub fn binary(left: Self, operator: Token, right: Self) -> Self {
        Self::Binary { left: Box::new(left),
                       operator,
                       right: Box::new(right) }
    }

    // #endregion

    /// Returns the shape of this node.
    #[must_use]
    pub const fn node_type(&self) -> NodeType {
        match self {
            Self::Numeric { .. } => NodeType::NumericLiteral,
            Self::Text { .. } => NodeType::StringLiteral,
            Self::Boolean { .. } => NodeType::BooleanLiteral,
            Self::Unit { .. } => NodeType::UnitLiteral,
            Self::Identifier { .. } => NodeType::Identifier,
            Self::Binary { .. } => NodeType::BinaryExpression,
            Self::Prefix { .. } => NodeType::PrefixExpression,
            Self::Call { .. } => NodeType::CallExpression,
            Self::Member { .. } => NodeType::MemberExpression,
            Self::If { .. } => NodeType::IfExpression,
            Self::DiceRoll { .. } => NodeType::DiceRollExpression,
        }
    }

    /// Returns the number of child expressions.
    #[must_use]
    pub fn child_count(&self) -> usize {
        match self {
            Self::Numeric { .. }
            | Self::Text { .. }
            | Self::Boolean { .. }
            | Self::Unit { .. }
            | Self::Identifier { .. } => 0,
            Self::Prefix { .. } | Self::Member { .. } | Self::DiceRoll { .. } => 1,
            Self::Binary { .. } => 2,
            Self::Call { arguments, .. } => 1 + arguments.len(),
            Self::If { alternative, .. } => 2 + usize::from(alternative.is_some()),
        }
    }

    /// Reconstructs source-equivalent text for this subtree.
    ///
    /// Child contents are concatenated with the node's own tokens (the
    /// operator, the keyword) re-injected at the right position. A subtree
    /// is parenthesized only when syntactically required: it has more than
    /// one child, it is not the tree root, and it does not stand alone
    /// under its parent.
    ///
    /// # Example
    /// ```
    /// use formulary::ast::Expr;
    /// use formulary::token::{Token, TokenKind};
    ///
    /// let inner = Expr::binary(Expr::number(2.0),
    ///                          Token::artificial(TokenKind::Asterisk, "*"),
    ///                          Expr::number(3.0));
    /// let tree = Expr::binary(Expr::number(10.0),
    ///                         Token::artificial(TokenKind::Plus, "+"),
    ///                         inner);
    ///
    /// assert_eq!(tree.content(), "10 + (2 * 3)");
    /// ```
    #[must_use]
    pub fn content(&self) -> String {
        self.render(true, 1)
    }

    fn render(&self, is_root: bool, parent_children: usize) -> String {
        match self {
            Self::Numeric { token, .. } | Self::Boolean { token, .. } => token.content.clone(),
            Self::Text { tokens } | Self::Identifier { tokens } | Self::Unit { tokens, .. } => {
                tokens_content(tokens)
            },
            Self::Binary { left, operator, right } => {
                let body = format!("{} {} {}",
                                   left.render(false, 2),
                                   operator.content,
                                   right.render(false, 2));

                if !is_root && parent_children > 1 {
                    format!("({body})")
                } else {
                    body
                }
            },
            Self::Prefix { operator, right } => {
                format!("{}{}", operator.content, right.wrapped_if_composite())
            },
            Self::Call { callee, arguments } => {
                let rendered: Vec<String> = arguments.iter()
                                                     .map(|argument| {
                                                         argument.render(false, 1 + arguments.len())
                                                     })
                                                     .collect();

                format!("{}({})", callee.wrapped_if_composite(), rendered.join(", "))
            },
            Self::Member { object, property } => {
                format!("{}::{}", object.wrapped_if_composite(), property.content)
            },
            Self::If { condition, consequent, alternative } => {
                let children = self.child_count();
                let mut body = format!("@if({} then {}",
                                       condition.render(false, children),
                                       consequent.render(false, children));
                if let Some(alternative) = alternative {
                    body.push_str(&format!(" else {}", alternative.render(false, children)));
                }
                body.push(')');

                body
            },
            Self::DiceRoll { size, faces, keep } => {
                format!("{}d{faces}{}", size.wrapped_if_composite(), keep.notation())
            },
        }
    }

    /// Renders a lone child, parenthesizing multi-child subtrees so the
    /// result still re-parses to the same shape.
    fn wrapped_if_composite(&self) -> String {
        let rendered = self.render(false, 1);
        if self.child_count() > 1 {
            format!("({rendered})")
        } else {
            rendered
        }
    }

    /// Returns the node signature: shape plus serialized content.
    ///
    /// Signatures detect converged or duplicate subtrees; two nodes with
    /// equal signatures print the same and parse back to the same shape.
    #[must_use]
    pub fn signature(&self) -> String {
        format!("{}::{}", self.node_type(), self.content())
    }

    /// Returns `true` when both nodes share a signature.
    #[must_use]
    pub fn is_similar(&self, other: &Self) -> bool {
        self.signature() == other.signature()
    }

    /// Returns `true` for literal nodes (numeric, string, boolean, unit).
    #[must_use]
    pub const fn is_literal(&self) -> bool {
        matches!(self,
                 Self::Numeric { .. } | Self::Text { .. } | Self::Boolean { .. } | Self::Unit { .. })
    }

    /// Returns the numeric value when this is a numeric literal.
    #[must_use]
    pub const fn numeric_value(&self) -> Option<f64> {
        match self {
            Self::Numeric { value, .. } => Some(*value),
            _ => None,
        }
    }

    /// Returns `true` when this is a numeric literal of the given value.
    #[must_use]
    pub fn is_number(&self, expected: f64) -> bool {
        matches!(self, Self::Numeric { value, .. } if *value == expected)
    }

    /// Returns the referenced variable name when this is an identifier.
    #[must_use]
    pub fn variable_name(&self) -> Option<String> {
        match self {
            Self::Identifier { tokens } => Some(tokens_content(tokens)),
            _ => None,
        }
    }
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.content())
    }
}

fn tokens_content(tokens: &[Token]) -> String {
    tokens.iter().map(|token| token.content.as_str()).collect()
}

/// A statement node.
///
/// Statements do not yield a value of their own; they wrap the expressions
/// that do. The engine parses one statement per formula.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// A standalone expression; the root form of every parsed formula.
    Expression {
        /// The wrapped expression.
        expr: Expr,
    },
}

impl Statement {
    /// Wraps an expression into a statement.
    #[must_use]
    pub const fn expression(expr: Expr) -> Self {
        Self::Expression { expr }
    }

    /// Returns the wrapped expression.
    #[must_use]
    pub const fn expr(&self) -> &Expr {
        match self {
            Self::Expression { expr } => expr,
        }
    }

    /// Consumes the statement and returns the wrapped expression.
    #[must_use]
    pub fn into_expr(self) -> Expr {
        match self {
            Self::Expression { expr } => expr,
        }
    }

    /// Returns the shape of this node.
    #[must_use]
    pub const fn node_type(&self) -> NodeType {
        NodeType::ExpressionStatement
    }

    /// Reconstructs source-equivalent text for the whole tree.
    #[must_use]
    pub fn content(&self) -> String {
        self.expr().content()
    }

    /// Returns the node signature: shape plus serialized content.
    #[must_use]
    pub fn signature(&self) -> String {
        format!("{}::{}", self.node_type(), self.content())
    }
}

impl std::fmt::Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.content())
    }
}
