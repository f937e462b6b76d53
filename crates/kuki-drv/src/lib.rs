//! kuki-drv - The compiler front-end pipeline.
//!
//! One function, [`compile_source`], wires the three stages together:
//!
//! ```text
//! source text --[kuki-lex]--> tokens --[kuki-par]--> AST --[kuki-sem]--> typed AST
//! ```
//!
//! All stages share one diagnostic handler and every stage runs to
//! completion, so a single compile reports problems from every stage at
//! once. The pipeline owns no global state: compiling many files means
//! one [`Compilation`] per file.
//!
//! # Examples
//!
//! ```
//! use kuki_drv::compile_source;
//!
//! let compilation = compile_source(
//!     "demo.kuki",
//!     "petiole demo\n\nfunc Add(a int, b int) int\n    return a + b\n",
//! );
//! assert!(!compilation.has_errors());
//! assert_eq!(compilation.analysis.exported_functions().len(), 1);
//! ```

use std::path::Path;

use thiserror::Error;

use kuki_lex::tokenize;
use kuki_par::{parse, Program};
use kuki_sem::{analyze, Analysis};
use kuki_util::{Diagnostic, FileId, Handler, Level, SourceMap};

/// Errors of the pipeline itself (not of the compiled program)
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The source file could not be read
    #[error("cannot read '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Kukicha sources use the `.kuki` extension
    #[error("'{0}' is not a .kuki file")]
    WrongExtension(String),
}

/// The result of compiling one source file
#[derive(Debug)]
pub struct Compilation {
    /// Source registry holding the one compiled file
    pub sources: SourceMap,
    /// The compiled file's id
    pub file: FileId,
    /// The parsed program, possibly partial after errors
    pub program: Program,
    /// Symbol table, scope tree, and typed side tables
    pub analysis: Analysis,
    /// Every diagnostic from every stage, in source order
    pub diagnostics: Vec<Diagnostic>,
}

impl Compilation {
    /// True when any error-level diagnostic was reported
    ///
    /// The driver's rule: any error prevents handing the AST to code
    /// generation; warnings do not.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.level == Level::Error)
    }

    /// Render all diagnostics in the canonical
    /// `{file}:{line}:{column}: {message}` format, one per line
    pub fn render_diagnostics(&self) -> String {
        self.diagnostics
            .iter()
            .map(|d| d.render(&self.sources))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Run the full front-end over one source string
pub fn compile_source(file_name: &str, source: &str) -> Compilation {
    let mut sources = SourceMap::new();
    let file = sources.add_file(file_name, source);

    let handler = Handler::new();
    let tokens = tokenize(source, file, &handler);
    let program = parse(tokens, &handler);
    let analysis = analyze(&program, &handler);

    let mut diagnostics = handler.take();
    diagnostics.sort_by_key(|d| (d.span.file_id, d.span.start, d.span.end));

    Compilation {
        sources,
        file,
        program,
        analysis,
        diagnostics,
    }
}

/// Read and compile one `.kuki` file
///
/// Reading the source is the pipeline's only I/O.
pub fn compile_file(path: &Path) -> Result<Compilation, PipelineError> {
    let display = path.display().to_string();
    if path.extension().and_then(|e| e.to_str()) != Some("kuki") {
        return Err(PipelineError::WrongExtension(display));
    }
    let source = std::fs::read_to_string(path).map_err(|source| PipelineError::Read {
        path: display.clone(),
        source,
    })?;
    Ok(compile_source(&display, &source))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_compile() {
        let compilation = compile_source(
            "demo.kuki",
            "petiole demo\n\nfunc Add(a int, b int) int\n    return a + b\n",
        );
        assert!(!compilation.has_errors());
        assert!(compilation.render_diagnostics().is_empty());
        assert!(compilation.program.module.is_some());
    }

    #[test]
    fn test_diagnostics_in_source_order() {
        // A lex error on line 2 and a resolve error on line 4, emitted by
        // different stages, must render in line order.
        let source = "petiole demo\n\nfunc F()\n    x := missing\n    y := \"unterminated\n    print(x)\n    print(y)\n";
        let compilation = compile_source("demo.kuki", source);
        assert!(compilation.has_errors());
        let rendered = compilation.render_diagnostics();
        let lines: Vec<_> = rendered.lines().filter(|l| l.contains(".kuki:")).collect();
        let positions: Vec<u32> = compilation.diagnostics.iter().map(|d| d.span.line).collect();
        let mut sorted = positions.clone();
        sorted.sort();
        assert_eq!(positions, sorted);
        assert!(!lines.is_empty());
    }

    #[test]
    fn test_diagnostic_format() {
        let compilation = compile_source("bad.kuki", "func F()\n\treturn\n");
        let rendered = compilation.render_diagnostics();
        assert!(
            rendered.starts_with("bad.kuki:2:1: Use 4 spaces for indentation, not tabs"),
            "{rendered}"
        );
    }

    #[test]
    fn test_wrong_extension() {
        let err = compile_file(Path::new("program.go")).unwrap_err();
        assert!(matches!(err, PipelineError::WrongExtension(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = compile_file(Path::new("no-such-file.kuki")).unwrap_err();
        assert!(matches!(err, PipelineError::Read { .. }));
    }
}
