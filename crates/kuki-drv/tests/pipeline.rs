//! End-to-end pipeline tests: source text in, typed AST and diagnostics
//! out.

use kuki_drv::{compile_file, compile_source};
use kuki_par::ast::{Decl, Expr, OnerrHandler, Stmt};
use kuki_sem::Ty;
use kuki_util::Level;

fn body_of<'a>(compilation: &'a kuki_drv::Compilation, index: usize) -> &'a kuki_par::ast::Block {
    match &compilation.program.decls[index] {
        Decl::Func(func) => &func.body,
        other => panic!("expected function, got {other:?}"),
    }
}

// Scenario: module header and simple function.
#[test]
fn test_module_header_and_simple_function() {
    let source = "petiole demo\n\nfunc Add(a int, b int) int\n    return a + b\n";
    let compilation = compile_source("demo.kuki", source);

    assert!(compilation.diagnostics.is_empty(), "{}", compilation.render_diagnostics());
    assert_eq!(
        compilation.program.module.as_ref().unwrap().name.as_str(),
        "demo"
    );

    let Decl::Func(add) = &compilation.program.decls[0] else {
        panic!("expected function");
    };
    assert_eq!(add.name.as_str(), "Add");
    assert_eq!(add.params.len(), 2);
    assert_eq!(add.returns.len(), 1);

    // The function landed in the root scope.
    let root = compilation.analysis.scopes.root();
    assert!(compilation
        .analysis
        .scopes
        .lookup(root, kuki_util::Name::intern("Add"))
        .is_some());

    // The body is a single return of `a + b`.
    let Stmt::Return(ret) = &add.body.stmts[0] else {
        panic!("expected return");
    };
    let Expr::Binary(sum) = &ret.values[0] else {
        panic!("expected binary");
    };
    assert_eq!(
        compilation.analysis.types.get(&sum.id),
        Some(&Ty::Int)
    );
}

// Scenario: pipe chain with an onerr handler over continuation lines.
#[test]
fn test_pipe_with_onerr_handler() {
    let source = "\
petiole demo

import json

func fetch(url string) (string, error)
    return \"\", empty

func Load(url string) (string, error)
    result := fetch(url)
        |> json.Parse()
        onerr return \"\", error \"bad\"
    return result as string, empty
";
    let compilation = compile_source("demo.kuki", source);
    assert!(
        !compilation.has_errors(),
        "{}",
        compilation.render_diagnostics()
    );

    let body = body_of(&compilation, 1);
    let Stmt::VarDecl(decl) = &body.stmts[0] else {
        panic!("expected var decl, got {:?}", body.stmts[0]);
    };
    let Expr::Onerr(onerr) = &decl.value else {
        panic!("expected onerr value");
    };
    let Expr::Pipe(pipe) = onerr.primary.as_ref() else {
        panic!("expected pipe primary");
    };
    assert!(matches!(pipe.left.as_ref(), Expr::Call(_)));
    let Expr::MethodCall(parse) = pipe.right.as_ref() else {
        panic!("expected method call right side");
    };
    assert_eq!(parse.method.as_str(), "Parse");
    assert!(matches!(&onerr.handler, OnerrHandler::Return(_)));
}

// Scenario: switch dispatch with multi-value cases.
#[test]
fn test_switch_dispatch() {
    let source = "\
petiole demo

func stop()
    return

func showHelp()
    return

func unknown(cmd string)
    return

func Dispatch(cmd string)
    switch cmd
        when \"quit\", \"exit\"
            stop()
        when \"help\"
            showHelp()
        otherwise
            unknown(cmd)
";
    let compilation = compile_source("demo.kuki", source);
    assert!(
        !compilation.has_errors(),
        "{}",
        compilation.render_diagnostics()
    );

    let body = body_of(&compilation, 3);
    let Stmt::Switch(switch) = &body.stmts[0] else {
        panic!("expected switch");
    };
    assert!(switch.tag.is_some());
    assert_eq!(switch.clauses.len(), 2);
    assert_eq!(switch.clauses[0].exprs.len(), 2);
    assert!(switch.default.is_some());
}

// Scenario: a `when` clause after `otherwise` is a parse error at the
// `when` token.
#[test]
fn test_when_after_otherwise_is_rejected() {
    let source = "\
func Dispatch(cmd string)
    switch cmd
        otherwise
            print(cmd)
        when \"late\"
            print(cmd)
";
    let compilation = compile_source("demo.kuki", source);
    assert!(compilation.has_errors());
    let offending = compilation
        .diagnostics
        .iter()
        .find(|d| d.message.contains("'when' clause after"))
        .expect("expected the when-after-otherwise diagnostic");
    // Points at the `when` token.
    assert_eq!(offending.span.line, 5);
    assert_eq!(offending.span.column, 9);
}

// Scenario: arrow lambda parameter inference against an unavailable
// module signature.
#[test]
fn test_lambda_inference_diagnostic() {
    let source = "\
petiole demo

import slice

func Active(repos list of int) int
    active := repos |> slice.Filter(r => r > 100)
    return len(active)
";
    let compilation = compile_source("demo.kuki", source);
    let inference: Vec<_> = compilation
        .diagnostics
        .iter()
        .filter(|d| d.message.contains("cannot infer type of parameter r"))
        .collect();
    assert_eq!(inference.len(), 1);
}

// Scenario: arrow lambda inference against a known local signature stays
// quiet.
#[test]
fn test_lambda_inference_from_local_signature() {
    let source = "\
petiole demo

func Filter(values list of int, keep func(int) bool) list of int
    kept := make(list of int)
    for v in values
        if keep(v)
            kept = append(kept, v)
    return kept

func Big(values list of int) list of int
    return values |> Filter(v => v > 100)
";
    let compilation = compile_source("demo.kuki", source);
    assert!(
        !compilation.has_errors(),
        "{}",
        compilation.render_diagnostics()
    );
}

// Scenario: tab-indented line.
#[test]
fn test_tab_indentation() {
    let source = "petiole demo\n\nfunc F()\n\tprint(1)\n";
    let compilation = compile_source("demo.kuki", source);
    let errors: Vec<_> = compilation
        .diagnostics
        .iter()
        .filter(|d| d.level == Level::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "Use 4 spaces for indentation, not tabs");
    // The file still parsed.
    let body = body_of(&compilation, 0);
    assert_eq!(body.stmts.len(), 1);
}

// Scenario: registry-style export filter.
#[test]
fn test_registry_export_filter() {
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
    let compilation = compile_source("registry.kuki", source);
    assert!(
        !compilation.has_errors(),
        "{}",
        compilation.render_diagnostics()
    );
    let exported = compilation.analysis.exported_functions();
    let summary: Vec<_> = exported
        .iter()
        .map(|f| (f.name.as_str(), f.return_arity))
        .collect();
    assert_eq!(summary, vec![("Total", 1), ("Parse", 2)]);
}

#[test]
fn test_compile_file_round_trip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("hello.kuki");
    std::fs::write(
        &path,
        "petiole hello\n\nfunc Greet(name string) string\n    return \"hi {name}\"\n",
    )
    .expect("write source");

    let compilation = compile_file(&path).expect("pipeline runs");
    assert!(
        !compilation.has_errors(),
        "{}",
        compilation.render_diagnostics()
    );
    assert_eq!(compilation.analysis.exported_functions().len(), 1);
}

#[test]
fn test_all_stages_report_into_one_list() {
    // One broken token, one syntax error, one type error: three stages,
    // one diagnostic list, source order.
    let source = "\
petiole demo

func F()
    x := 1 & 2
    y := (
    if 1
        print(x)
";
    let compilation = compile_source("demo.kuki", source);
    assert!(compilation.has_errors());
    let lines: Vec<u32> = compilation.diagnostics.iter().map(|d| d.span.line).collect();
    let mut sorted = lines.clone();
    sorted.sort();
    assert_eq!(lines, sorted);
    assert!(compilation.diagnostics.len() >= 2);
}

#[test]
fn test_deterministic_compilation() {
    let source = "\
petiole demo

func F(a int) int
    b := a * 2
    return b
";
    let first = compile_source("demo.kuki", source);
    let second = compile_source("demo.kuki", source);
    assert_eq!(first.diagnostics.len(), second.diagnostics.len());
    assert_eq!(first.analysis.types.len(), second.analysis.types.len());
    for (node, ty) in &first.analysis.types {
        assert_eq!(second.analysis.types.get(node), Some(ty));
    }
    assert_eq!(
        format!("{:?}", first.program),
        format!("{:?}", second.program)
    );
}
