use std::collections::HashMap;

/// The semantic kind of a function argument or return value.
///
/// These are coarse shapes, not a type system: the catalog only answers
/// "is this name callable, and what kind of thing comes back".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticKind {
    /// A numeric value.
    Number,
    /// A textual value.
    Text,
    /// A boolean value.
    Boolean,
    /// An opaque object.
    Object,
    /// Anything.
    Any,
}

/// The declared shape of a callable function.
#[derive(Debug, Clone)]
pub struct FunctionSignature {
    /// The function name as written in formulas (`@max`).
    pub name:       String,
    /// The kinds of the declared parameters.
    pub parameters: Vec<SemanticKind>,
    /// Whether the last parameter repeats.
    pub variadic:   bool,
    /// The kind of the returned value.
    pub returns:    SemanticKind,
}

/// The function catalog: an external, data-only name → signature table.
///
/// Consulted by call evaluation to decide whether a callee is a real
/// function. A call whose callee is *not* in the catalog is reinterpreted
/// as literal text, so descriptive prose resembling `name(args)` can
/// coexist with actual calls. Implementations live in the environment as
/// function values; the catalog only vouches for the name.
#[derive(Debug, Clone, Default)]
pub struct FunctionCatalog {
    entries: HashMap<String, FunctionSignature>,
}

impl FunctionCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self { entries: HashMap::new() }
    }

    /// Creates a catalog seeded with the built-in signatures.
    ///
    /// # Example
    /// ```
    /// use formulary::functions::FunctionCatalog;
    ///
    /// let catalog = FunctionCatalog::with_builtins();
    /// assert!(catalog.is_callable("@max"));
    /// assert!(!catalog.is_callable("reach"));
    /// ```
    #[must_use]
    pub fn with_builtins() -> Self {
        use SemanticKind::Number;

        let mut catalog = Self::new();
        catalog.declare(FunctionSignature { name:       "@max".to_string(),
                                            parameters: vec![Number],
                                            variadic:   true,
                                            returns:    Number, });
        catalog.declare(FunctionSignature { name:       "@min".to_string(),
                                            parameters: vec![Number],
                                            variadic:   true,
                                            returns:    Number, });
        catalog.declare(FunctionSignature { name:       "@floor".to_string(),
                                            parameters: vec![Number],
                                            variadic:   false,
                                            returns:    Number, });
        catalog.declare(FunctionSignature { name:       "@ceil".to_string(),
                                            parameters: vec![Number],
                                            variadic:   false,
                                            returns:    Number, });

        catalog
    }

    /// Declares a signature, replacing any previous one with the same name.
    pub fn declare(&mut self, signature: FunctionSignature) {
        self.entries.insert(signature.name.clone(), signature);
    }

    /// Returns `true` when the name is a callable function.
    #[must_use]
    pub fn is_callable(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Returns the signature declared for a name.
    #[must_use]
    pub fn signature(&self, name: &str) -> Option<&FunctionSignature> {
        self.entries.get(name)
    }
}
