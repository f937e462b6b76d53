//! Lexical scope tree.
//!
//! Scopes form a tree over an [`IndexVec`]; each scope maps names to
//! symbol ids and points at its parent. Lookup walks parent links from the
//! innermost scope outward. Bindings live in an [`IndexMap`] so iterating
//! a scope always follows declaration order, which keeps re-analysis
//! deterministic.

use indexmap::IndexMap;
use kuki_util::{Idx, IndexVec, Name};

use crate::table::SymbolId;

/// Identity of a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub u32);

impl Idx for ScopeId {
    fn from_usize(idx: usize) -> Self {
        ScopeId(idx as u32)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// What kind of construct opened a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// The module's root scope
    Root,
    /// A function or lambda body
    Function,
    /// A statement block (`if` arm, `switch` clause, explicit block)
    Block,
    /// A loop body, including its iteration binders
    Loop,
}

/// One scope: bindings plus a parent pointer
#[derive(Debug)]
pub struct Scope {
    /// Name to symbol, in declaration order
    pub bindings: IndexMap<Name, SymbolId>,
    /// Enclosing scope, `None` only for the root
    pub parent: Option<ScopeId>,
    /// What opened this scope
    pub kind: ScopeKind,
}

/// The scope tree of one compilation
#[derive(Debug)]
pub struct ScopeTree {
    scopes: IndexVec<ScopeId, Scope>,
    root: ScopeId,
}

impl ScopeTree {
    /// Create a tree holding just the root scope
    pub fn new() -> Self {
        let mut scopes = IndexVec::new();
        let root = scopes.push(Scope {
            bindings: IndexMap::new(),
            parent: None,
            kind: ScopeKind::Root,
        });
        Self { scopes, root }
    }

    /// The root scope
    #[inline]
    pub fn root(&self) -> ScopeId {
        self.root
    }

    /// Open a child scope
    pub fn push(&mut self, parent: ScopeId, kind: ScopeKind) -> ScopeId {
        self.scopes.push(Scope {
            bindings: IndexMap::new(),
            parent: Some(parent),
            kind,
        })
    }

    /// Borrow a scope
    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id]
    }

    /// Bind `name` in `scope`
    ///
    /// Returns the previous binding of the same name in this exact scope,
    /// if any; the caller turns that into a redeclaration error.
    pub fn define(&mut self, scope: ScopeId, name: Name, symbol: SymbolId) -> Option<SymbolId> {
        self.scopes[scope].bindings.insert(name, symbol)
    }

    /// Look `name` up in `scope` only, without walking parents
    pub fn lookup_local(&self, scope: ScopeId, name: Name) -> Option<SymbolId> {
        self.scopes[scope].bindings.get(&name).copied()
    }

    /// Resolve `name` from `scope`, walking parent links
    pub fn lookup(&self, scope: ScopeId, name: Name) -> Option<SymbolId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(&symbol) = self.scopes[id].bindings.get(&name) {
                return Some(symbol);
            }
            current = self.scopes[id].parent;
        }
        None
    }

    /// Number of scopes in the tree
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    /// Always false; the root scope exists from construction
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> Name {
        Name::intern(s)
    }

    #[test]
    fn test_root_lookup() {
        let mut tree = ScopeTree::new();
        let root = tree.root();
        tree.define(root, name("print"), SymbolId(0));
        assert_eq!(tree.lookup(root, name("print")), Some(SymbolId(0)));
        assert_eq!(tree.lookup(root, name("missing")), None);
    }

    #[test]
    fn test_lookup_walks_parents() {
        let mut tree = ScopeTree::new();
        let root = tree.root();
        let func = tree.push(root, ScopeKind::Function);
        let block = tree.push(func, ScopeKind::Block);

        tree.define(root, name("global"), SymbolId(0));
        tree.define(func, name("param"), SymbolId(1));

        assert_eq!(tree.lookup(block, name("global")), Some(SymbolId(0)));
        assert_eq!(tree.lookup(block, name("param")), Some(SymbolId(1)));
        assert_eq!(tree.lookup(root, name("param")), None);
    }

    #[test]
    fn test_shadowing() {
        let mut tree = ScopeTree::new();
        let root = tree.root();
        let inner = tree.push(root, ScopeKind::Block);

        tree.define(root, name("x"), SymbolId(0));
        tree.define(inner, name("x"), SymbolId(1));

        assert_eq!(tree.lookup(inner, name("x")), Some(SymbolId(1)));
        assert_eq!(tree.lookup(root, name("x")), Some(SymbolId(0)));
    }

    #[test]
    fn test_define_reports_previous_binding() {
        let mut tree = ScopeTree::new();
        let root = tree.root();
        assert_eq!(tree.define(root, name("x"), SymbolId(0)), None);
        assert_eq!(tree.define(root, name("x"), SymbolId(1)), Some(SymbolId(0)));
    }

    #[test]
    fn test_lookup_local_does_not_walk() {
        let mut tree = ScopeTree::new();
        let root = tree.root();
        let inner = tree.push(root, ScopeKind::Block);
        tree.define(root, name("x"), SymbolId(0));
        assert_eq!(tree.lookup_local(inner, name("x")), None);
    }
}
