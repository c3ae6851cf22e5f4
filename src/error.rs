#[derive(Debug)]
/// Represents all errors that can occur during lexing or parsing.
///
/// Parse-time failures are hard: they are reported immediately and never
/// retried. Soft conditions (an unknown character, a word no grammar entry
/// claims) do not surface here; the lexer degrades them to `unknown` tokens
/// instead.
pub enum ParseError {
    /// Found a token the current parse position cannot accept.
    UnexpectedToken {
        /// The content of the offending token.
        token: String,
        /// Byte offset of the token in the source expression.
        at:    usize,
    },
    /// A specific token kind was required but another was found.
    UnexpectedKind {
        /// The kind(s) that would have been accepted.
        expected: String,
        /// The kind actually found.
        found:    String,
        /// Byte offset of the token in the source expression.
        at:       usize,
    },
    /// Reached the end of input while more tokens were required.
    UnexpectedEndOfInput,
    /// No parser function is bound for a (denotation, token kind) pair.
    MissingParser {
        /// The denotation that was looked up (`statement`, `prefix`, `infix`).
        denotation: String,
        /// The token kind that had no binding.
        kind:       String,
    },
    /// A parser function was bound under a name missing from the registry.
    UnknownParserFunction {
        /// The name that failed to resolve.
        name: String,
    },
    /// A numeric literal could not be read as a number.
    InvalidNumber {
        /// The literal text.
        literal: String,
        /// Byte offset of the literal in the source expression.
        at:      usize,
    },
    /// Parentheses of an injection never balanced out.
    UnbalancedInjection {
        /// Byte offset where the injection started.
        at: usize,
    },
    /// An injection named a function the processor does not know.
    UnknownInjectionFunction {
        /// The unrecognized injection function name.
        name: String,
    },
    /// A re-typing rule targets a node type the parser cannot produce.
    UnsupportedReType {
        /// The node type the rule asked for.
        target: String,
    },
    /// An injection could not be resolved to a value before parsing.
    UnresolvedInjection {
        /// The placeholder index of the pending injection.
        index: usize,
    },
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnexpectedToken { token, at } => {
                write!(f, "Unexpected token '{token}' at byte {at}.")
            },
            Self::UnexpectedKind { expected, found, at } => {
                write!(f, "Expected token kind {expected}, got {found} at byte {at}.")
            },
            Self::UnexpectedEndOfInput => write!(f, "Unexpected end of input."),
            Self::MissingParser { denotation, kind } => {
                write!(f, "No {denotation} parser registered for token kind '{kind}'.")
            },
            Self::UnknownParserFunction { name } => {
                write!(f, "Parser function '{name}' is not registered.")
            },
            Self::InvalidNumber { literal, at } => {
                write!(f, "Invalid numeric literal '{literal}' at byte {at}.")
            },
            Self::UnbalancedInjection { at } => {
                write!(f, "Unbalanced parentheses in injection starting at byte {at}.")
            },
            Self::UnknownInjectionFunction { name } => {
                write!(f, "Unknown injection function '{name}'.")
            },
            Self::UnsupportedReType { target } => {
                write!(f, "Re-typing to node type '{target}' is not supported.")
            },
            Self::UnresolvedInjection { index } => {
                write!(f, "Injection ${index} did not resolve to a value.")
            },
        }
    }
}

impl std::error::Error for ParseError {}

#[derive(Debug)]
/// Represents all hard errors that can occur during evaluation and
/// resolution.
///
/// Missing bindings are deliberately *not* represented here: a formula that
/// references a name the environment cannot supply yet produces an
/// unresolved evaluation (a residual tree), not an error. Everything below
/// is a condition no amount of extra data can repair.
pub enum RuntimeError {
    /// An operator is genuinely unsupported for the resolved operand types.
    UnsupportedOperator {
        /// The operator content (`+`, `=`, ...).
        operator: String,
        /// The runtime type of the left operand.
        left:     String,
        /// The runtime type of the right operand.
        right:    String,
    },
    /// A prefix operator was applied to a value it cannot act on.
    UnsupportedPrefix {
        /// The operator content (`-`, `+`).
        operator: String,
        /// The runtime type of the operand.
        operand:  String,
    },
    /// An arithmetic operation produced a NaN or infinite result.
    NonFiniteResult {
        /// The operator that produced the result.
        operator: String,
    },
    /// Attempted division by zero.
    DivisionByZero,
    /// An `if` condition resolved to a value with no truth interpretation.
    InvalidCondition {
        /// The runtime type of the condition value.
        found: String,
    },
    /// A callee resolved to a value that is not a function.
    NotAFunction {
        /// The callee text.
        name: String,
    },
    /// An argument to a native function was invalid or of the wrong shape.
    InvalidArgument {
        /// Details about why the argument was rejected.
        details: String,
    },
    /// Tried to assign a variable that is already bound in the scope.
    VariableAlreadyDefined {
        /// The variable name.
        name:  String,
        /// The scope name.
        scope: String,
    },
    /// Tried to update a variable that was never bound.
    VariableNotDefined {
        /// The variable name.
        name: String,
    },
    /// Tried to register a pattern binding under a key already in use.
    PatternAlreadyDefined {
        /// The pattern key.
        key:   String,
        /// The scope name.
        scope: String,
    },
    /// An indirection chain revisited a variable name.
    CircularIndirection {
        /// The chain of names followed, in resolution order.
        chain: String,
    },
    /// An indirection chain exceeded the configured depth bound.
    IndirectionTooDeep {
        /// The chain of names followed, in resolution order.
        chain: String,
        /// The depth bound that was exceeded.
        limit: usize,
    },
    /// The resolve loop hit its iteration ceiling without converging.
    ///
    /// This is an authoring bug (a rewrite rule and the evaluator fighting
    /// each other, or a pathological formula), not a user-input error.
    ResolutionExhausted {
        /// The configured ceiling that was reached.
        limit: usize,
    },
    /// A rewrite rule asked to remove a node from a position that cannot
    /// lose a child.
    CannotRemoveNode {
        /// The key of the offending rule.
        rule: String,
    },
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedOperator { operator, left, right } => {
                write!(f, "Operator '{operator}' is not supported for {left} and {right}.")
            },
            Self::UnsupportedPrefix { operator, operand } => {
                write!(f, "Prefix operator '{operator}' is not supported for {operand}.")
            },
            Self::NonFiniteResult { operator } => {
                write!(f, "Operator '{operator}' produced a non-finite result.")
            },
            Self::DivisionByZero => write!(f, "Division by zero."),
            Self::InvalidCondition { found } => {
                write!(f, "Condition resolved to {found}, which has no truth value.")
            },
            Self::NotAFunction { name } => {
                write!(f, "'{name}' does not resolve to a function.")
            },
            Self::InvalidArgument { details } => write!(f, "Invalid argument: {details}."),
            Self::VariableAlreadyDefined { name, scope } => {
                write!(f, "Variable '{name}' is already defined in scope '{scope}'.")
            },
            Self::VariableNotDefined { name } => {
                write!(f, "Variable '{name}' is not defined; assign it before updating.")
            },
            Self::PatternAlreadyDefined { key, scope } => {
                write!(f, "Resolution pattern '{key}' is already defined in scope '{scope}'.")
            },
            Self::CircularIndirection { chain } => {
                write!(f, "Circular indirection: {chain}.")
            },
            Self::IndirectionTooDeep { chain, limit } => {
                write!(f, "Indirection chain exceeded {limit} steps: {chain}.")
            },
            Self::ResolutionExhausted { limit } => {
                write!(f, "Resolution did not converge within {limit} pruning runs.")
            },
            Self::CannotRemoveNode { rule } => {
                write!(f, "Rewrite rule '{rule}' asked to remove a node that cannot be removed.")
            },
        }
    }
}

impl std::error::Error for RuntimeError {}

#[derive(Debug)]
/// Either side of the pipeline's failure modes, for callers driving the
/// whole parse-and-resolve flow at once.
pub enum EngineError {
    /// A lexing or parsing failure.
    Parse(ParseError),
    /// An evaluation or resolution failure.
    Runtime(RuntimeError),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(error) => write!(f, "{error}"),
            Self::Runtime(error) => write!(f, "{error}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(error) => Some(error),
            Self::Runtime(error) => Some(error),
        }
    }
}

impl From<ParseError> for EngineError {
    fn from(error: ParseError) -> Self {
        Self::Parse(error)
    }
}

impl From<RuntimeError> for EngineError {
    fn from(error: RuntimeError) -> Self {
        Self::Runtime(error)
    }
}
