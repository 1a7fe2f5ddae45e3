//! Scope tree for name resolution.
//!
//! Scopes form a tree whose root has no parent. Each scope owns a
//! symbol table mapping a variable name to its declaration; lookups
//! that miss walk the parent chain. Parent links are arena indices, so
//! no scope ever owns another and parents outlive their children by
//! construction.

use emberc_util::{Idx, IndexVec};
use indexmap::IndexMap;

use crate::ast::DeclId;

/// Index of a scope in the tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ScopeId(pub u32);

impl Idx for ScopeId {
    fn from_usize(idx: usize) -> Self {
        ScopeId(idx as u32)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// A single scope: its symbol table and its enclosing scope.
#[derive(Debug, Default)]
pub struct ScopeData {
    /// Name -> declaration, insertion-ordered for deterministic
    /// diagnostics.
    pub bindings: IndexMap<String, DeclId>,
    pub parent: Option<ScopeId>,
}

/// Arena of all scopes in a compilation unit.
#[derive(Debug)]
pub struct ScopeTree {
    scopes: IndexVec<ScopeId, ScopeData>,
    root: ScopeId,
}

impl ScopeTree {
    /// Create a tree holding just the root scope.
    pub fn new() -> Self {
        let mut scopes = IndexVec::new();
        let root = scopes.push(ScopeData::default());
        Self { scopes, root }
    }

    pub fn root(&self) -> ScopeId {
        self.root
    }

    /// Add a fresh scope under `parent`.
    pub fn push_scope(&mut self, parent: ScopeId) -> ScopeId {
        self.scopes.push(ScopeData {
            bindings: IndexMap::new(),
            parent: Some(parent),
        })
    }

    pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.scopes[scope].parent
    }

    /// Bind `name` in `scope`, replacing any existing entry.
    pub fn bind(&mut self, scope: ScopeId, name: &str, decl: DeclId) {
        self.scopes[scope].bindings.insert(name.to_string(), decl);
    }

    /// Look `name` up in `scope` only, without walking parents.
    pub fn lookup_local(&self, scope: ScopeId, name: &str) -> Option<DeclId> {
        self.scopes[scope].bindings.get(name).copied()
    }

    /// Look `name` up in `scope` and then outward through its parents.
    pub fn resolve(&self, scope: ScopeId, name: &str) -> Option<DeclId> {
        let mut current = scope;
        loop {
            if let Some(decl) = self.lookup_local(current, name) {
                return Some(decl);
            }
            match self.scopes[current].parent {
                Some(parent) => current = parent,
                None => return None,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}
