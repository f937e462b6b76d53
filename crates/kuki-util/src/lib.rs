//! kuki-util - Shared infrastructure for the Kukicha compiler.
//!
//! Every phase crate depends on this one for:
//!
//! - [`Span`]/[`FileId`]/[`SourceMap`]: source positions and file registry
//! - [`Diagnostic`]/[`Handler`]: accumulated error and warning reporting
//! - [`Name`]: interned identifier strings
//! - [`IndexVec`]/[`Idx`]: typed arenas for symbols and scopes
//!
//! Nothing here knows anything about Kukicha syntax or semantics; the
//! dependency arrows only point upward from this crate.

pub mod diagnostic;
pub mod error;
pub mod index_vec;
pub mod name;
pub mod span;

pub use diagnostic::{Diagnostic, Handler, Level, Stage};
pub use error::{SourceMapError, SourceMapResult};
pub use index_vec::{Idx, IndexVec};
pub use name::Name;
pub use span::{FileId, SourceFile, SourceMap, Span};

pub use rustc_hash::FxHashMap;
pub use rustc_hash::FxHashSet;
