//! Registry export filter.
//!
//! The downstream registry tooling needs to know which functions a module
//! offers to generated glue code: exported, top-level, non-method
//! functions that actually produce a value. This module is that filter,
//! exposed on [`Analysis`] so the driver can hand the list over without
//! re-walking the tree.

use kuki_util::{Name, Span};

use crate::table::SymbolKind;
use crate::types::Ty;
use crate::Analysis;

/// One function visible to the downstream registry
#[derive(Debug, Clone)]
pub struct ExportedFunction {
    pub name: Name,
    /// Number of declared return values
    pub return_arity: usize,
    /// `explain` documentation, if any
    pub doc: Option<String>,
    /// Defining position
    pub span: Span,
}

impl Analysis {
    /// Exported, non-method, non-void top-level functions with their
    /// return arities, in declaration order
    pub fn exported_functions(&self) -> Vec<ExportedFunction> {
        self.symbols
            .iter()
            .filter(|(_, info)| info.kind == SymbolKind::Function && info.exported)
            .filter_map(|(_, info)| {
                let Ty::Func(sig) = &info.ty else {
                    return None;
                };
                if sig.results.is_empty() {
                    return None;
                }
                Some(ExportedFunction {
                    name: info.name,
                    return_arity: sig.results.len(),
                    doc: info.doc.clone(),
                    span: info.span,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use kuki_lex::tokenize;
    use kuki_util::{FileId, Handler};

    use crate::analyze;

    fn exported(source: &str) -> Vec<(String, usize)> {
        let handler = Handler::new();
        let tokens = tokenize(source, FileId::DUMMY, &handler);
        let program = kuki_par::parse(tokens, &handler);
        let analysis = analyze(&program, &handler);
        analysis
            .exported_functions()
            .into_iter()
            .map(|f| (f.name.as_str().to_owned(), f.return_arity))
            .collect()
    }

    #[test]
    fn test_registry_filter() {
        // A module with: two exported value-returning functions, one
        // unexported function, one method, one type, and one void
        // function. Only the two exported non-method non-void functions
        // surface.
        let source = "\
petiole registry

type Counter
    count int

func Total(values list of int) int
    sum := 0
    for v in values
        sum = sum + v
    return sum

func Parse(text string) (int, error)
    return 0, empty

func helper() int
    return 1

func (c on Counter) Bump()
    c.count++

func Reset()
    return
";
        let list = exported(source);
        assert_eq!(list.len(), 2);
        assert_eq!(list[0], ("Total".to_owned(), 1));
        assert_eq!(list[1], ("Parse".to_owned(), 2));
    }

    #[test]
    fn test_doc_travels_with_export() {
        let source = "explain \"adds numbers\"\nfunc Add(a int, b int) int\n    return a + b\n";
        let handler = Handler::new();
        let tokens = tokenize(source, FileId::DUMMY, &handler);
        let program = kuki_par::parse(tokens, &handler);
        let analysis = analyze(&program, &handler);
        let list = analysis.exported_functions();
        assert_eq!(list[0].doc.as_deref(), Some("adds numbers"));
    }

    #[test]
    fn test_empty_module_exports_nothing() {
        assert!(exported("petiole quiet\n").is_empty());
    }
}
