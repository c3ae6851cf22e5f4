use std::collections::BTreeMap;

use crate::{
    ast::{Expr, NodeType},
    error::RuntimeError,
    interpreter::environment::{Environment, Resolution, ScopeId},
};

/// A reference to an AST node that mentioned a variable name.
///
/// Symbols can span several trees (one formula's residual and the next
/// attempt both index into the same table), so a reference names the tree
/// it came from alongside the node's shape and content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRef {
    /// The designation of the tree the node belongs to.
    pub tree:      String,
    /// The shape of the node.
    pub node_type: NodeType,
    /// The node's serialized content.
    pub content:   String,
}

impl NodeRef {
    fn key(&self) -> String {
        format!("{}::{}::{}", self.tree, self.node_type, self.content)
    }
}

/// One indexed variable name and the nodes that mentioned it.
#[derive(Debug, Clone, Default)]
pub struct Symbol {
    /// The variable name.
    pub name: String,
    linked:   BTreeMap<String, NodeRef>,
}

impl Symbol {
    /// Creates a symbol for a name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name:   name.into(),
               linked: BTreeMap::new(), }
    }

    /// Links a node to this symbol; linking the same node twice is a no-op.
    pub fn link_node(&mut self, tree: impl Into<String>, node: &Expr) {
        let reference = NodeRef { tree:      tree.into(),
                                  node_type: node.node_type(),
                                  content:   node.content(), };

        self.linked.entry(reference.key()).or_insert(reference);
    }

    /// Iterates over the linked node references.
    pub fn linked_nodes(&self) -> impl Iterator<Item = &NodeRef> {
        self.linked.values()
    }
}

/// The symbol table: variable name → nodes that mentioned it.
///
/// Every identifier, call and member node touched during evaluation is
/// indexed here, once per distinct name, across however many trees share
/// the table. [`SymbolTable::missing_symbols`] expands entries to their
/// resolved-name variants, so a caller can proactively supply whichever
/// spelling the environment will actually look up.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    table: BTreeMap<String, Symbol>,
}

impl SymbolTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self { table: BTreeMap::new() }
    }

    /// Indexes a variable name, linking the mentioning node when given.
    pub fn index(&mut self, name: &str, tree: &str, node: Option<&Expr>) -> &Symbol {
        let symbol = self.table
                         .entry(name.to_string())
                         .or_insert_with(|| Symbol::new(name));
        if let Some(node) = node {
            symbol.link_node(tree, node);
        }

        symbol
    }

    /// Returns `true` when the name is indexed.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    /// Returns the symbol for a name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.table.get(name)
    }

    /// Iterates over the indexed names, in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(String::as_str)
    }

    /// Returns the number of indexed symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` when nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns every symbol the environment cannot supply, expanded to
    /// resolved-name variants.
    ///
    /// When a name resolves through indirections into *another* name that
    /// is itself missing, that spelling is indexed as a new symbol and
    /// reported, so the caller can bind the name the environment will
    /// actually look up.
    ///
    /// # Errors
    /// Propagates resolution errors (circular or overlong indirections).
    pub fn missing_symbols(&mut self,
                           environment: &Environment,
                           scope: ScopeId)
                           -> Result<Vec<String>, RuntimeError> {
        let names: Vec<String> = self.table.keys().cloned().collect();
        let mut missing = Vec::new();

        for name in names {
            match environment.resolve_from(scope, &name)? {
                Resolution::Found { .. } => {},
                Resolution::NotFound { chain } => {
                    missing.push(name.clone());

                    // The chain went cold at its last link; that spelling
                    // is the one worth supplying.
                    if let Some(last) = chain.last()
                       && last != &name
                    {
                        self.index(last, "", None);
                        missing.push(last.clone());
                    }
                },
            }
        }

        missing.sort();
        missing.dedup();

        Ok(missing)
    }
}
