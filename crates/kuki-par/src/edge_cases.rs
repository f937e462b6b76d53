//! Edge case tests for kuki-par

#[cfg(test)]
mod tests {
    use crate::ast::*;
    use kuki_lex::tokenize;
    use kuki_util::{FileId, Handler};

    fn parse_source(source: &str) -> (Program, Handler) {
        let handler = Handler::new();
        let tokens = tokenize(source, FileId::DUMMY, &handler);
        let program = crate::parse(tokens, &handler);
        (program, handler)
    }

    fn body_of(program: &Program, index: usize) -> &Block {
        match &program.decls[index] {
            Decl::Func(f) => &f.body,
            other => panic!("expected function, got {other:?}"),
        }
    }

    // ==================== EDGE CASES ====================

    #[test]
    fn test_edge_module_and_function_scenario() {
        // Scenario: module header plus a simple function.
        let source = "petiole demo\n\nfunc Add(a int, b int) int\n    return a + b\n";
        let (program, handler) = parse_source(source);
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
        assert_eq!(program.module.as_ref().unwrap().name.as_str(), "demo");

        let Decl::Func(func) = &program.decls[0] else {
            panic!("expected function");
        };
        assert_eq!(func.name.as_str(), "Add");
        let Stmt::Return(ret) = &func.body.stmts[0] else {
            panic!("expected return");
        };
        let Expr::Binary(add) = &ret.values[0] else {
            panic!("expected binary return value");
        };
        assert_eq!(add.op, BinOp::Add);
        assert!(matches!(add.left.as_ref(), Expr::Ident(i) if i.name.as_str() == "a"));
        assert!(matches!(add.right.as_ref(), Expr::Ident(i) if i.name.as_str() == "b"));
    }

    #[test]
    fn test_edge_pipe_onerr_continuation_scenario() {
        // Scenario: a pipe chain continued over three physical lines with
        // a final onerr handler.
        let source = "func T()\n    result := fetch(url)\n        |> json.Parse()\n        onerr return error \"bad\"\n";
        let (program, handler) = parse_source(source);
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());

        let body = body_of(&program, 0);
        let Stmt::VarDecl(decl) = &body.stmts[0] else {
            panic!("expected var decl, got {:?}", body.stmts);
        };
        let Expr::Onerr(onerr) = &decl.value else {
            panic!("expected onerr value");
        };
        let Expr::Pipe(pipe) = onerr.primary.as_ref() else {
            panic!("expected pipe primary");
        };
        assert!(matches!(pipe.left.as_ref(), Expr::Call(_)));
        let Expr::MethodCall(method) = pipe.right.as_ref() else {
            panic!("expected method call right side");
        };
        assert_eq!(method.method.as_str(), "Parse");
        assert!(matches!(&onerr.handler, OnerrHandler::Return(r) if r.values.len() == 1));
    }

    #[test]
    fn test_edge_switch_dispatch_scenario() {
        let source = "func T()\n    switch cmd\n        when \"quit\", \"exit\"\n            stop()\n        when \"help\"\n            showHelp()\n        otherwise\n            unknown(cmd)\n";
        let (program, handler) = parse_source(source);
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
        let body = body_of(&program, 0);
        let Stmt::Switch(switch) = &body.stmts[0] else {
            panic!("expected switch");
        };
        assert!(matches!(switch.tag.as_ref(), Some(Expr::Ident(i)) if i.name.as_str() == "cmd"));
        assert_eq!(switch.clauses.len(), 2);
        assert_eq!(switch.clauses[0].exprs.len(), 2);
        assert!(switch.default.is_some());
    }

    #[test]
    fn test_edge_lambda_in_pipe_scenario() {
        let source = "func T()\n    active := repos |> slice.Filter(r => r.Stars > 100)\n";
        let (program, handler) = parse_source(source);
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
        let body = body_of(&program, 0);
        let Stmt::VarDecl(decl) = &body.stmts[0] else {
            panic!("expected decl");
        };
        let Expr::Pipe(pipe) = &decl.value else {
            panic!("expected pipe");
        };
        let Expr::MethodCall(filter) = pipe.right.as_ref() else {
            panic!("expected method call");
        };
        let Expr::Lambda(lambda) = &filter.args[0] else {
            panic!("expected lambda argument");
        };
        assert_eq!(lambda.params[0].name.as_str(), "r");
        assert!(lambda.params[0].ty.is_none());
    }

    #[test]
    fn test_edge_tab_indent_still_parses() {
        // Scenario: a tab-indented line produces exactly one lex
        // diagnostic and the file still parses.
        let source = "func T()\n\treturn\n";
        let (program, handler) = parse_source(source);
        assert_eq!(handler.error_count(), 1);
        assert_eq!(
            handler.diagnostics()[0].message,
            "Use 4 spaces for indentation, not tabs"
        );
        let body = body_of(&program, 0);
        assert!(matches!(body.stmts[0], Stmt::Return(_)));
    }

    #[test]
    fn test_edge_empty_function_body() {
        let (_, handler) = parse_source("func T()\nfunc U()\n    return\n");
        // T has no indented body: that is a parse error, but U survives.
        assert!(handler.has_errors());
    }

    #[test]
    fn test_edge_deeply_nested_expression() {
        let source = "func T()\n    x := ((((1 + 2))))\n";
        let (_, handler) = parse_source(source);
        assert!(!handler.has_errors());
    }

    #[test]
    fn test_edge_nested_lambdas() {
        let source = "func T()\n    f := a => b => a + b\n";
        let (program, handler) = parse_source(source);
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
        let body = body_of(&program, 0);
        let Stmt::VarDecl(decl) = &body.stmts[0] else {
            panic!("expected decl");
        };
        let Expr::Lambda(outer) = &decl.value else {
            panic!("expected lambda");
        };
        let LambdaBody::Expr(inner) = &outer.body else {
            panic!("expected expression body");
        };
        assert!(matches!(inner.as_ref(), Expr::Lambda(_)));
    }

    #[test]
    fn test_edge_block_lambda() {
        let source = "func T()\n    handler := x =>\n        y := x + 1\n        return y\n";
        let (program, handler) = parse_source(source);
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
        let body = body_of(&program, 0);
        let Stmt::VarDecl(decl) = &body.stmts[0] else {
            panic!("expected decl");
        };
        let Expr::Lambda(lambda) = &decl.value else {
            panic!("expected lambda");
        };
        assert!(matches!(&lambda.body, LambdaBody::Block(b) if b.stmts.len() == 2));
    }

    #[test]
    fn test_edge_lambda_without_body_is_error() {
        let source = "func T()\n    f := x =>\n";
        let (_, handler) = parse_source(source);
        assert!(handler.has_errors());
        assert!(handler
            .diagnostics()
            .iter()
            .any(|d| d.message.contains("missing its body")));
    }

    #[test]
    fn test_edge_reparse_is_identical() {
        // Re-tokenizing and re-parsing the same source must produce a
        // structurally identical tree with identical positions.
        let source = "petiole demo\n\nfunc F(a int) int\n    if a > 0\n        return a\n    return -a\n";
        let (first, h1) = parse_source(source);
        let (second, h2) = parse_source(source);
        assert!(!h1.has_errors() && !h2.has_errors());
        assert_eq!(format!("{first:?}"), format!("{second:?}"));
    }

    #[test]
    fn test_edge_positions_survive_round_trip() {
        let source = "func F()\n    x := 1 + 2\n";
        let (program, _) = parse_source(source);
        let body = body_of(&program, 0);
        let Stmt::VarDecl(decl) = &body.stmts[0] else {
            panic!("expected decl");
        };
        // `1 + 2` starts at line 2, column 10.
        assert_eq!(decl.value.span().line, 2);
        assert_eq!(decl.value.span().column, 10);
    }

    #[test]
    fn test_edge_statement_after_bad_line_survives() {
        let source = "func T()\n    x := (1 +\n    y := 2\n";
        let (program, handler) = parse_source(source);
        assert!(handler.has_errors());
        // The parser recovered somewhere; the program still came back.
        assert_eq!(program.decls.len(), 1);
    }

    #[test]
    fn test_edge_trailing_commas() {
        let source = "func T()\n    xs := [1, 2,]\n    m := {\"a\": 1,}\n    p := Point{x: 1,}\n";
        let (_, handler) = parse_source(source);
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
    }

    #[test]
    fn test_edge_interpolation_inside_function() {
        let source = "func Greet(name string) string\n    return \"hi {name}\"\n";
        let (program, handler) = parse_source(source);
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
        let body = body_of(&program, 0);
        let Stmt::Return(ret) = &body.stmts[0] else {
            panic!("expected return");
        };
        assert!(matches!(&ret.values[0], Expr::Str(s) if s.parts.len() == 3));
    }
}
