//! Core error types for the kuki-util crate.

use thiserror::Error;

/// Error type for source map operations
#[derive(Debug, Error)]
pub enum SourceMapError {
    /// File id was never registered with this source map
    #[error("unknown file id {id}")]
    UnknownFile { id: usize },

    /// Invalid span range
    #[error("invalid span: start {start} > end {end}")]
    InvalidSpan { start: usize, end: usize },
}

/// Result type alias for source map operations
pub type SourceMapResult<T> = std::result::Result<T, SourceMapError>;
