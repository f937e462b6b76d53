//! Source map for managing source files and computing source locations.
//!
//! This module provides the [`SourceMap`] type for managing the source files
//! of a compilation and mapping a [`FileId`] back to a display name when
//! diagnostics are rendered.

use std::sync::Arc;

use super::FileId;
use crate::error::SourceMapError;

/// A source file with its content and metadata
///
/// # Examples
///
/// ```
/// use kuki_util::span::SourceFile;
///
/// let file = SourceFile::new(0, "main.kuki", "petiole demo\n");
/// assert_eq!(file.name(), "main.kuki");
/// assert_eq!(file.content(), "petiole demo\n");
/// ```
#[derive(Clone, Debug)]
pub struct SourceFile {
    /// Unique file identifier
    id: FileId,
    /// File name (path or display name)
    name: String,
    /// File content
    content: Arc<str>,
    /// Precomputed line start offsets
    line_starts: Arc<[usize]>,
}

impl SourceFile {
    /// Create a new source file
    pub fn new(id: usize, name: impl Into<String>, content: impl Into<Arc<str>>) -> Self {
        let content = content.into();
        let line_starts = Self::compute_line_starts(&content);
        Self {
            id: FileId(id),
            name: name.into(),
            content,
            line_starts,
        }
    }

    /// Compute line start offsets from content
    fn compute_line_starts(content: &str) -> Arc<[usize]> {
        let mut line_starts = vec![0];
        for (i, ch) in content.char_indices() {
            if ch == '\n' {
                line_starts.push(i + 1);
            }
        }
        line_starts.into()
    }

    /// The file identifier
    #[inline]
    pub fn id(&self) -> FileId {
        self.id
    }

    /// The file name or display path
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The full file content
    #[inline]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Number of lines in the file
    #[inline]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// The text of a 1-based line, without its trailing newline
    ///
    /// # Examples
    ///
    /// ```
    /// use kuki_util::span::SourceFile;
    ///
    /// let file = SourceFile::new(0, "m.kuki", "petiole demo\nfunc F()\n");
    /// assert_eq!(file.line_text(2), Some("func F()"));
    /// assert_eq!(file.line_text(9), None);
    /// ```
    pub fn line_text(&self, line: usize) -> Option<&str> {
        if line == 0 || line > self.line_starts.len() {
            return None;
        }
        let start = self.line_starts[line - 1];
        let end = self
            .line_starts
            .get(line)
            .map(|s| s - 1)
            .unwrap_or(self.content.len());
        self.content.get(start..end).map(|s| s.trim_end_matches('\r'))
    }
}

/// Registry of every source file in a compilation
///
/// FileIds are handed out sequentially by [`SourceMap::add_file`] and are the
/// only way the rest of the compiler refers to a file.
///
/// # Examples
///
/// ```
/// use kuki_util::span::SourceMap;
///
/// let mut map = SourceMap::new();
/// let id = map.add_file("main.kuki", "petiole demo\n");
/// assert_eq!(map.name(id), "main.kuki");
/// ```
#[derive(Default, Debug)]
pub struct SourceMap {
    files: Vec<SourceFile>,
}

impl SourceMap {
    /// Create an empty source map
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file and return its id
    pub fn add_file(&mut self, name: impl Into<String>, content: impl Into<Arc<str>>) -> FileId {
        let id = self.files.len();
        self.files.push(SourceFile::new(id, name, content));
        FileId(id)
    }

    /// Look up a file by id
    pub fn file(&self, id: FileId) -> Result<&SourceFile, SourceMapError> {
        self.files
            .get(id.index())
            .ok_or(SourceMapError::UnknownFile { id: id.index() })
    }

    /// Display name for a file id, `"<unknown>"` when the id is stale
    pub fn name(&self, id: FileId) -> &str {
        self.files
            .get(id.index())
            .map(|f| f.name())
            .unwrap_or("<unknown>")
    }

    /// Number of registered files
    #[inline]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// True when no file has been registered
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
