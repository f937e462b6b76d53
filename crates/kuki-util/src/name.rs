//! Interned identifier names.
//!
//! Every identifier the compiler keeps beyond a single token (AST names,
//! symbol-table keys, import aliases) is interned once and handled as a
//! cheap copyable [`Name`]. Interned strings are allocated once and leaked
//! to obtain `'static` references; the table lives for the whole process,
//! entries are never removed, and the front-end runs on a single thread, so
//! a plain mutex around the table is sufficient.
//!
//! # Examples
//!
//! ```
//! use kuki_util::Name;
//!
//! let a = Name::intern("repos");
//! let b = Name::intern("repos");
//! assert_eq!(a, b);
//! assert_eq!(a.as_str(), "repos");
//! ```

use std::fmt;
use std::sync::{Mutex, OnceLock};

use rustc_hash::FxHashMap;

/// An interned string, compared and hashed by index
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(u32);

struct Interner {
    map: FxHashMap<&'static str, u32>,
    strings: Vec<&'static str>,
}

impl Interner {
    fn new() -> Self {
        Self {
            map: FxHashMap::default(),
            strings: Vec::new(),
        }
    }

    fn intern(&mut self, string: &str) -> u32 {
        if let Some(&idx) = self.map.get(string) {
            return idx;
        }
        let leaked: &'static str = Box::leak(string.to_owned().into_boxed_str());
        let idx = self.strings.len() as u32;
        self.strings.push(leaked);
        self.map.insert(leaked, idx);
        idx
    }
}

fn interner() -> &'static Mutex<Interner> {
    static INTERNER: OnceLock<Mutex<Interner>> = OnceLock::new();
    INTERNER.get_or_init(|| Mutex::new(Interner::new()))
}

impl Name {
    /// Intern a string, returning its stable handle
    pub fn intern(string: &str) -> Self {
        let mut table = interner().lock().unwrap_or_else(|e| e.into_inner());
        Name(table.intern(string))
    }

    /// The interned string
    pub fn as_str(&self) -> &'static str {
        let table = interner().lock().unwrap_or_else(|e| e.into_inner());
        table.strings[self.0 as usize]
    }

    /// The raw table index
    #[inline]
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({:?})", self.as_str())
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
