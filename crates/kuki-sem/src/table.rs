//! Symbol table and built-in seeding.
//!
//! Every named entity the analyzer knows about lives in one
//! [`SymbolTable`] arena; scopes and resolution maps refer to entries by
//! [`SymbolId`]. The root scope is seeded with the built-in functions,
//! which user code may not redefine.

use kuki_util::{Idx, IndexVec, Name, Span};

use crate::types::{FuncTy, Ty};

/// Identity of a symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub u32);

impl Idx for SymbolId {
    fn from_usize(idx: usize) -> Self {
        SymbolId(idx as u32)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// What a symbol names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    /// The module itself
    Module,
    /// An imported module
    Import,
    /// A record or alias type
    Type,
    /// An interface
    Interface,
    /// A top-level function
    Function,
    /// A method (function with a receiver)
    Method,
    /// A variable, parameter, or loop binder
    Variable,
    /// A record field
    Field,
    /// One of the predeclared functions
    Builtin,
}

/// One entry in the symbol table
#[derive(Debug, Clone)]
pub struct SymbolInfo {
    pub name: Name,
    pub kind: SymbolKind,
    /// Declared or inferred type; functions carry their signature
    pub ty: Ty,
    /// Defining position
    pub span: Span,
    /// Documentation attached with `explain`
    pub doc: Option<String>,
    /// First character is uppercase
    pub exported: bool,
    /// Receiver type, methods only
    pub receiver: Option<Ty>,
}

impl SymbolInfo {
    /// The function signature, when this symbol is callable
    pub fn signature(&self) -> Option<&FuncTy> {
        match &self.ty {
            Ty::Func(func) => Some(func),
            _ => None,
        }
    }
}

/// Arena of all symbols in a compilation
#[derive(Default, Debug)]
pub struct SymbolTable {
    symbols: IndexVec<SymbolId, SymbolInfo>,
}

impl SymbolTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a symbol
    pub fn push(&mut self, info: SymbolInfo) -> SymbolId {
        self.symbols.push(info)
    }

    /// Borrow a symbol
    pub fn get(&self, id: SymbolId) -> &SymbolInfo {
        &self.symbols[id]
    }

    /// Mutably borrow a symbol
    pub fn get_mut(&mut self, id: SymbolId) -> &mut SymbolInfo {
        &mut self.symbols[id]
    }

    /// Iterate `(id, symbol)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &SymbolInfo)> {
        self.symbols.iter_enumerated()
    }

    /// Number of symbols
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// True when no symbol has been added
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// True when a Kukicha identifier is exported (initial uppercase)
pub fn is_exported(name: Name) -> bool {
    name.as_str()
        .chars()
        .next()
        .map(|c| c.is_uppercase())
        .unwrap_or(false)
}

/// The predeclared functions of the root scope
///
/// `make`, `close`, `panic`, and `recover` are keywords with their own
/// expression nodes but still occupy root-scope entries so user code
/// cannot take their names. The element types in these signatures are
/// placeholders; calls to builtins are typed by dedicated rules, not by
/// these rows.
pub fn builtin_signatures() -> Vec<(&'static str, FuncTy)> {
    vec![
        (
            "print",
            FuncTy {
                params: vec![Ty::Any],
                results: vec![],
                variadic: true,
            },
        ),
        (
            "len",
            FuncTy {
                params: vec![Ty::Any],
                results: vec![Ty::Int],
                variadic: false,
            },
        ),
        (
            "append",
            FuncTy {
                params: vec![Ty::List(Box::new(Ty::Any)), Ty::Any],
                results: vec![Ty::List(Box::new(Ty::Any))],
                variadic: true,
            },
        ),
        (
            "make",
            FuncTy {
                params: vec![Ty::Any, Ty::Int],
                results: vec![Ty::Any],
                variadic: true,
            },
        ),
        (
            "close",
            FuncTy {
                params: vec![Ty::Chan(Box::new(Ty::Any))],
                results: vec![],
                variadic: false,
            },
        ),
        (
            "panic",
            FuncTy {
                params: vec![Ty::Any],
                results: vec![Ty::Never],
                variadic: false,
            },
        ),
        (
            "recover",
            FuncTy {
                params: vec![],
                results: vec![Ty::Any],
                variadic: false,
            },
        ),
        (
            "min",
            FuncTy {
                params: vec![Ty::Any, Ty::Any],
                results: vec![Ty::Any],
                variadic: true,
            },
        ),
        (
            "max",
            FuncTy {
                params: vec![Ty::Any, Ty::Any],
                results: vec![Ty::Any],
                variadic: true,
            },
        ),
    ]
}
