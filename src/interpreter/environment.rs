use std::collections::HashMap;

use crate::{error::RuntimeError, interpreter::value::RuntimeValue, util::pattern::Pattern};

/// Identifies a scope inside an [`Environment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

/// How far an indirection chain may go before resolution gives up.
pub const INDIRECTION_LIMIT: usize = 16;

/// A pattern binding: names matching the pattern resolve to the value.
#[derive(Debug, Clone)]
struct PatternBinding {
    key:     String,
    pattern: Pattern,
    value:   RuntimeValue,
}

#[derive(Debug, Clone)]
struct Scope {
    name:      String,
    parent:    Option<ScopeId>,
    variables: HashMap<String, RuntimeValue>,
    patterns:  Vec<PatternBinding>,
}

/// The outcome of resolving a variable name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The name (possibly after indirections) is bound.
    Found {
        /// The final name the binding lives under.
        name:  String,
        /// The scope holding the binding.
        scope: ScopeId,
        /// Indirection names followed on the way, in order.
        chain: Vec<String>,
    },
    /// The name is not bound anywhere up the scope tree.
    NotFound {
        /// Indirection names followed before the chain went cold. The last
        /// entry, when present, is the spelling the environment would
        /// actually need.
        chain: Vec<String>,
    },
}

/// A parent-linked tree of scopes holding variable bindings.
///
/// Each scope holds exact-name bindings and pattern bindings (structural
/// match instead of literal equality). A bound value may itself be an
/// indirection ([`RuntimeValue::Variable`]) naming another variable;
/// resolution follows those through a bounded chain and reports cycles.
///
/// The environment carries a monotonic version counter, bumped only on
/// actual value changes. The processor compares versions to decide whether
/// re-resolving a residual tree can possibly make progress.
///
/// # Example
/// ```
/// use formulary::interpreter::environment::Environment;
/// use formulary::interpreter::value::RuntimeValue;
///
/// let mut environment = Environment::new("sheet");
/// environment.assign_value("b", RuntimeValue::Variable("base".to_string())).unwrap();
/// environment.assign_value("base", RuntimeValue::Number(7.0)).unwrap();
///
/// let value = environment.get("b").unwrap();
/// assert_eq!(value, Some(RuntimeValue::Number(7.0)));
/// ```
#[derive(Debug, Clone)]
pub struct Environment {
    scopes:  Vec<Scope>,
    version: u64,
}

impl Environment {
    /// Creates an environment with a single root scope.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { scopes:  vec![Scope { name:      name.into(),
                                     parent:    None,
                                     variables: HashMap::new(),
                                     patterns:  Vec::new(), }],
               version: 0, }
    }

    /// Returns the root scope.
    #[must_use]
    pub const fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    /// Creates a child scope under a parent.
    pub fn create_child(&mut self, parent: ScopeId, name: impl Into<String>) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope { name:      name.into(),
                                 parent:    Some(parent),
                                 variables: HashMap::new(),
                                 patterns:  Vec::new(), });

        id
    }

    /// Returns the current version. The counter moves only on actual value
    /// changes.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Returns a scope's name, for diagnostics.
    #[must_use]
    pub fn scope_name(&self, scope: ScopeId) -> &str {
        self.scopes.get(scope.0).map_or("<unknown>", |s| s.name.as_str())
    }

    // #region ASSIGNMENT

    /// Binds a value to a name in the root scope.
    ///
    /// # Errors
    /// Returns [`RuntimeError::VariableAlreadyDefined`] when the name is
    /// already bound in the scope; silent overwrite is not allowed. Use
    /// [`Environment::update_value`] to replace a binding.
    pub fn assign_value(&mut self,
                        name: impl Into<String>,
                        value: RuntimeValue)
                        -> Result<(), RuntimeError> {
        self.assign_value_in(self.root(), name, value)
    }

    /// Binds a value to a name in a specific scope.
    ///
    /// # Errors
    /// Returns [`RuntimeError::VariableAlreadyDefined`] when the name is
    /// already bound in the scope.
    pub fn assign_value_in(&mut self,
                           scope: ScopeId,
                           name: impl Into<String>,
                           value: RuntimeValue)
                           -> Result<(), RuntimeError> {
        let name = name.into();
        let scope_name = self.scope_name(scope).to_string();

        let variables = &mut self.scopes[scope.0].variables;
        if variables.contains_key(&name) {
            return Err(RuntimeError::VariableAlreadyDefined { name,
                                                              scope: scope_name });
        }

        variables.insert(name, value);
        self.version += 1;

        Ok(())
    }

    /// Replaces an existing binding, searching from the root scope.
    ///
    /// The version counter moves only when the new value actually differs.
    ///
    /// # Errors
    /// Returns [`RuntimeError::VariableNotDefined`] when the name was never
    /// bound.
    pub fn update_value(&mut self, name: &str, value: RuntimeValue) -> Result<(), RuntimeError> {
        self.update_value_in(self.root(), name, value)
    }

    /// Replaces an existing binding, searching from a specific scope
    /// upward.
    ///
    /// # Errors
    /// Returns [`RuntimeError::VariableNotDefined`] when the name is not
    /// bound anywhere up the chain.
    pub fn update_value_in(&mut self,
                           scope: ScopeId,
                           name: &str,
                           value: RuntimeValue)
                           -> Result<(), RuntimeError> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(existing) = self.scopes[id.0].variables.get_mut(name) {
                if !existing.is_equal(&value) {
                    *existing = value;
                    self.version += 1;
                }
                return Ok(());
            }
            current = self.scopes[id.0].parent;
        }

        Err(RuntimeError::VariableNotDefined { name: name.to_string() })
    }

    /// Registers a pattern binding in the root scope: any name matching the
    /// pattern resolves to the value.
    ///
    /// # Errors
    /// Returns [`RuntimeError::PatternAlreadyDefined`] when the key is
    /// already in use in the scope.
    pub fn assign_value_to_pattern(&mut self,
                                   key: impl Into<String>,
                                   pattern: Pattern,
                                   value: RuntimeValue)
                                   -> Result<(), RuntimeError> {
        self.assign_value_to_pattern_in(self.root(), key, pattern, value)
    }

    /// Registers a pattern binding in a specific scope.
    ///
    /// # Errors
    /// Returns [`RuntimeError::PatternAlreadyDefined`] when the key is
    /// already in use in the scope.
    pub fn assign_value_to_pattern_in(&mut self,
                                      scope: ScopeId,
                                      key: impl Into<String>,
                                      pattern: Pattern,
                                      value: RuntimeValue)
                                      -> Result<(), RuntimeError> {
        let key = key.into();
        let scope_name = self.scope_name(scope).to_string();

        let patterns = &mut self.scopes[scope.0].patterns;
        if patterns.iter().any(|binding| binding.key == key) {
            return Err(RuntimeError::PatternAlreadyDefined { key,
                                                             scope: scope_name });
        }

        patterns.push(PatternBinding { key, pattern, value });
        self.version += 1;

        Ok(())
    }

    // #endregion

    // #region RESOLUTION

    /// Resolves a name starting from the root scope.
    ///
    /// # Errors
    /// Returns [`RuntimeError::CircularIndirection`] when an indirection
    /// chain revisits a name, [`RuntimeError::IndirectionTooDeep`] when it
    /// exceeds [`INDIRECTION_LIMIT`].
    pub fn resolve(&self, name: &str) -> Result<Resolution, RuntimeError> {
        self.resolve_from(self.root(), name)
    }

    /// Resolves a name starting from a specific scope.
    ///
    /// Local exact bindings win, indirections are followed (continuing up
    /// the parent chain when the target is absent locally), then pattern
    /// bindings, then the parent scope.
    ///
    /// # Errors
    /// Returns [`RuntimeError::CircularIndirection`] or
    /// [`RuntimeError::IndirectionTooDeep`] on degenerate chains.
    pub fn resolve_from(&self, scope: ScopeId, name: &str) -> Result<Resolution, RuntimeError> {
        let mut chain = Vec::new();
        self.resolve_inner(scope, name, &mut chain)
    }

    fn resolve_inner(&self,
                     scope: ScopeId,
                     name: &str,
                     chain: &mut Vec<String>)
                     -> Result<Resolution, RuntimeError> {
        if chain.len() > INDIRECTION_LIMIT {
            return Err(RuntimeError::IndirectionTooDeep { chain: chain.join(" -> "),
                                                          limit: INDIRECTION_LIMIT, });
        }

        let current = &self.scopes[scope.0];

        // 1. A plain old variable.
        if let Some(value) = current.variables.get(name) {
            return match value {
                RuntimeValue::Variable(target) => self.follow(scope, name, target, chain),
                _ => Ok(Resolution::Found { name:  name.to_string(),
                                            scope,
                                            chain: chain.clone(), }),
            };
        }

        // 2. A name following a registered pattern.
        if let Some(binding) = current.patterns.iter().find(|b| b.pattern.is_match(name)) {
            return match &binding.value {
                RuntimeValue::Variable(target) => self.follow(scope, name, target, chain),
                _ => Ok(Resolution::Found { name:  name.to_string(),
                                            scope,
                                            chain: chain.clone(), }),
            };
        }

        // 3. Try the parent scope.
        match current.parent {
            Some(parent) => self.resolve_inner(parent, name, chain),
            None => Ok(Resolution::NotFound { chain: chain.clone() }),
        }
    }

    /// Follows one indirection step.
    fn follow(&self,
              scope: ScopeId,
              name: &str,
              target: &str,
              chain: &mut Vec<String>)
              -> Result<Resolution, RuntimeError> {
        if chain.iter().any(|followed| followed == target) || target == name {
            let mut cycle = chain.clone();
            cycle.push(name.to_string());
            cycle.push(target.to_string());
            return Err(RuntimeError::CircularIndirection { chain: cycle.join(" -> ") });
        }

        chain.push(target.to_string());
        self.resolve_inner(scope, target, chain)
    }

    /// Returns the concrete value bound to a name, following indirections,
    /// starting from the root scope.
    ///
    /// # Errors
    /// Propagates the resolution errors of [`Environment::resolve`].
    pub fn get(&self, name: &str) -> Result<Option<RuntimeValue>, RuntimeError> {
        self.get_from(self.root(), name)
    }

    /// Returns the concrete value bound to a name, starting from a
    /// specific scope.
    ///
    /// # Errors
    /// Propagates the resolution errors of [`Environment::resolve_from`].
    pub fn get_from(&self,
                    scope: ScopeId,
                    name: &str)
                    -> Result<Option<RuntimeValue>, RuntimeError> {
        match self.resolve_from(scope, name)? {
            Resolution::Found { name, scope, .. } => Ok(self.fetch(scope, &name)),
            Resolution::NotFound { .. } => Ok(None),
        }
    }

    /// Fetches the value at a resolved (scope, name) pair.
    fn fetch(&self, scope: ScopeId, name: &str) -> Option<RuntimeValue> {
        let current = &self.scopes[scope.0];

        if let Some(value) = current.variables.get(name) {
            return Some(value.clone());
        }

        current.patterns
               .iter()
               .find(|binding| binding.pattern.is_match(name))
               .map(|binding| binding.value.clone())
    }

    // #endregion
}
