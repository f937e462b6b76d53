//! Statement parsing - declarations, control flow, loops, channel sends.

use crate::ast::*;
use crate::Parser;
use kuki_lex::TokenKind;
use kuki_util::Name;

impl<'a> Parser<'a> {
    /// Parse an indentation-delimited block
    ///
    /// The caller has consumed the header's NEWLINE; the block is the
    /// statements between INDENT and the matching DEDENT. A missing INDENT
    /// is an error and yields an empty block.
    pub(crate) fn parse_block(&mut self) -> Block {
        let span = self.span();
        let mut stmts = Vec::new();

        if !self.eat(TokenKind::Indent) {
            self.error("expected an indented block");
            return Block { stmts, span };
        }

        while !self.check(TokenKind::Dedent) && !self.at_end() {
            let before = self.pos;
            if self.eat(TokenKind::Newline) {
                continue;
            }
            match self.parse_stmt() {
                Some(stmt) => stmts.push(stmt),
                None => self.sync(),
            }
            if self.pos == before {
                self.advance();
            }
        }
        self.eat(TokenKind::Dedent);

        Block { stmts, span }
    }

    /// Parse a single statement
    pub(crate) fn parse_stmt(&mut self) -> Option<Stmt> {
        match self.kind() {
            TokenKind::Return => self.parse_return_stmt(),
            TokenKind::Break => {
                let span = self.span();
                self.advance();
                self.expect_stmt_end();
                Some(Stmt::Break(span))
            }
            TokenKind::Continue => {
                let span = self.span();
                self.advance();
                self.expect_stmt_end();
                Some(Stmt::Continue(span))
            }
            TokenKind::If => self.parse_if_stmt().map(Stmt::If),
            TokenKind::Switch => self.parse_switch_stmt(),
            TokenKind::For => self.parse_for_stmt(),
            TokenKind::Defer => self.parse_defer_stmt(),
            TokenKind::Go => self.parse_go_stmt(),
            TokenKind::Var => self.parse_var_typed_stmt(),
            TokenKind::Send => self.parse_send_word_stmt(),
            _ => self.parse_simple_stmt(),
        }
    }

    /// Statements that start with an expression or a `:=` binder list
    fn parse_simple_stmt(&mut self) -> Option<Stmt> {
        if self.looks_like_var_decl() {
            let decl = self.parse_var_decl()?;
            self.expect_stmt_end();
            return Some(Stmt::VarDecl(decl));
        }

        let span = self.span();
        let expr = self.parse_expression()?;

        let stmt = match self.kind() {
            TokenKind::Assign => {
                self.advance();
                let value = self.parse_expression()?;
                self.check_assign_target(&expr);
                Stmt::Assign(AssignStmt {
                    target: expr,
                    value,
                    span,
                })
            }
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let increment = self.kind() == TokenKind::PlusPlus;
                self.advance();
                self.check_assign_target(&expr);
                Stmt::IncDec(IncDecStmt {
                    target: expr,
                    increment,
                    span,
                })
            }
            TokenKind::LArrow => {
                self.advance();
                let value = self.parse_expression()?;
                Stmt::Send(SendStmt {
                    channel: expr,
                    value,
                    span,
                })
            }
            _ => Stmt::Expr(ExprStmt { expr, span }),
        };

        self.expect_stmt_end();
        Some(stmt)
    }

    /// Report when an assignment target is not an identifier, index, or
    /// selector
    fn check_assign_target(&self, expr: &Expr) {
        if !matches!(
            expr,
            Expr::Ident(_) | Expr::Index(_) | Expr::Selector(_) | Expr::Deref(_)
        ) {
            self.error_at(expr.span(), "invalid assignment target");
        }
    }

    /// One-token-wide scan for `name[, name]* :=`
    pub(crate) fn looks_like_var_decl(&self) -> bool {
        let mut i = 0;
        loop {
            match self.peek_kind(i) {
                TokenKind::Ident | TokenKind::Discard => {}
                _ => return false,
            }
            match self.peek_kind(i + 1) {
                TokenKind::ColonEq => return true,
                TokenKind::Comma => i += 2,
                _ => return false,
            }
        }
    }

    /// Parse `names := value` without the statement terminator
    ///
    /// Shared between statements, top-level declarations, and switch
    /// initializers.
    pub(crate) fn parse_var_decl(&mut self) -> Option<VarDeclStmt> {
        let span = self.span();
        let mut names = vec![self.parse_bind_name()?];
        while self.eat(TokenKind::Comma) {
            names.push(self.parse_bind_name()?);
        }
        self.expect(TokenKind::ColonEq)?;
        let value = self.parse_expression()?;
        Some(VarDeclStmt { names, value, span })
    }

    /// Parse one binder: an identifier or the `discard` placeholder
    fn parse_bind_name(&mut self) -> Option<BindName> {
        let span = self.span();
        match self.kind() {
            TokenKind::Ident => {
                let token = self.advance();
                Some(BindName {
                    name: Self::name_of(&token),
                    discard: false,
                    span,
                })
            }
            TokenKind::Discard => {
                self.advance();
                Some(BindName {
                    name: Name::intern("discard"),
                    discard: true,
                    span,
                })
            }
            _ => {
                self.error(format!("expected a name, found {}", self.kind().describe()));
                None
            }
        }
    }

    /// Parse `var name TYPE`
    fn parse_var_typed_stmt(&mut self) -> Option<Stmt> {
        let span = self.span();
        self.advance(); // var
        let name = self.parse_bind_name()?;
        let ty = self.parse_type()?;
        self.expect_stmt_end();
        Some(Stmt::VarTyped(VarTypedStmt { name, ty, span }))
    }

    /// Parse `return [expr, ...]`
    fn parse_return_stmt(&mut self) -> Option<Stmt> {
        let span = self.span();
        self.advance(); // return
        let mut values = Vec::new();
        if !self.check(TokenKind::Newline) && !self.check(TokenKind::Dedent) && !self.at_end() {
            values.push(self.parse_expression()?);
            while self.eat(TokenKind::Comma) {
                values.push(self.parse_expression()?);
            }
        }
        self.expect_stmt_end();
        Some(Stmt::Return(ReturnStmt { values, span }))
    }

    /// Parse an `if` statement with its else-if chain
    pub(crate) fn parse_if_stmt(&mut self) -> Option<IfStmt> {
        let span = self.span();
        self.advance(); // if
        let cond = self.parse_expression()?;
        self.expect(TokenKind::Newline)?;
        let then_block = self.parse_block();

        let else_branch = if self.eat(TokenKind::Else) {
            if self.check(TokenKind::If) {
                Some(Box::new(ElseBranch::ElseIf(self.parse_if_stmt()?)))
            } else {
                self.expect(TokenKind::Newline)?;
                Some(Box::new(ElseBranch::Else(self.parse_block())))
            }
        } else {
            None
        };

        Some(IfStmt {
            cond,
            then_block,
            else_branch,
            span,
        })
    }

    /// Parse a `switch` statement
    ///
    /// `switch [init ;] [tag]` followed by an indented block of `when`
    /// clauses and at most one final `otherwise` clause. A `when` after
    /// `otherwise` is rejected with an error at the `when` token.
    fn parse_switch_stmt(&mut self) -> Option<Stmt> {
        let span = self.span();
        self.advance(); // switch

        let init = if self.looks_like_var_decl() {
            let decl = self.parse_var_decl();
            self.expect(TokenKind::Semicolon);
            decl
        } else {
            None
        };

        let tag = if self.check(TokenKind::Newline) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(TokenKind::Newline)?;

        let mut clauses = Vec::new();
        let mut default: Option<DefaultClause> = None;

        if !self.eat(TokenKind::Indent) {
            self.error("expected an indented block of switch clauses");
            return Some(Stmt::Switch(SwitchStmt {
                init,
                tag,
                clauses,
                default,
                span,
            }));
        }

        while !self.check(TokenKind::Dedent) && !self.at_end() {
            let before = self.pos;
            if self.eat(TokenKind::Newline) {
                continue;
            }
            match self.kind() {
                TokenKind::When => {
                    let clause_span = self.span();
                    let spelling = self.current().lexeme.clone();
                    let after_default = default.is_some();
                    if after_default {
                        self.error_at(
                            clause_span,
                            format!("'{spelling}' clause after the final 'otherwise' clause"),
                        );
                    }
                    self.advance();
                    let mut exprs = Vec::new();
                    if let Some(expr) = self.parse_expression() {
                        exprs.push(expr);
                    }
                    while self.eat(TokenKind::Comma) {
                        if let Some(expr) = self.parse_expression() {
                            exprs.push(expr);
                        }
                    }
                    self.expect(TokenKind::Newline);
                    let body = self.parse_block();
                    if !after_default {
                        clauses.push(SwitchClause {
                            exprs,
                            body,
                            span: clause_span,
                        });
                    }
                }
                TokenKind::Otherwise => {
                    let clause_span = self.span();
                    self.advance();
                    self.expect(TokenKind::Newline);
                    let body = self.parse_block();
                    if default.is_some() {
                        self.error_at(clause_span, "duplicate 'otherwise' clause");
                    } else {
                        default = Some(DefaultClause {
                            body,
                            span: clause_span,
                        });
                    }
                }
                _ => {
                    self.error(format!(
                        "expected 'when' or 'otherwise', found {}",
                        self.kind().describe()
                    ));
                    self.sync();
                }
            }
            if self.pos == before {
                self.advance();
            }
        }
        self.eat(TokenKind::Dedent);

        Some(Stmt::Switch(SwitchStmt {
            init,
            tag,
            clauses,
            default,
            span,
        }))
    }

    /// Parse the three `for` forms
    fn parse_for_stmt(&mut self) -> Option<Stmt> {
        let span = self.span();
        self.advance(); // for

        let binder_at = |k: TokenKind| matches!(k, TokenKind::Ident | TokenKind::Discard);

        // `for x in ...` / `for i, x in ...`
        if binder_at(self.kind()) && self.peek_kind(1) == TokenKind::In {
            let binders = vec![self.parse_bind_name()?];
            return self.finish_for_range(binders, span);
        }
        if binder_at(self.kind())
            && self.peek_kind(1) == TokenKind::Comma
            && binder_at(self.peek_kind(2))
            && self.peek_kind(3) == TokenKind::In
        {
            let first = self.parse_bind_name()?;
            self.advance(); // comma
            let second = self.parse_bind_name()?;
            return self.finish_for_range(vec![first, second], span);
        }

        // `for i from a to b` / `for i from a through b`
        if binder_at(self.kind()) && self.peek_kind(1) == TokenKind::From {
            let binder = self.parse_bind_name()?;
            self.advance(); // from
            let from = self.parse_expression()?;
            let inclusive = match self.kind() {
                TokenKind::To => {
                    self.advance();
                    false
                }
                TokenKind::Through => {
                    self.advance();
                    true
                }
                _ => {
                    self.error(format!(
                        "expected 'to' or 'through', found {}",
                        self.kind().describe()
                    ));
                    false
                }
            };
            let to = self.parse_expression()?;
            self.expect(TokenKind::Newline)?;
            let body = self.parse_block();
            return Some(Stmt::ForNumeric(ForNumericStmt {
                binder,
                from,
                to,
                inclusive,
                body,
                span,
            }));
        }

        // `for cond` predicate loop
        let cond = self.parse_expression()?;
        self.expect(TokenKind::Newline)?;
        let body = self.parse_block();
        Some(Stmt::ForCond(ForCondStmt { cond, body, span }))
    }

    fn finish_for_range(&mut self, binders: Vec<BindName>, span: kuki_util::Span) -> Option<Stmt> {
        self.expect(TokenKind::In)?;
        let iterable = self.parse_expression()?;
        self.expect(TokenKind::Newline)?;
        let body = self.parse_block();
        Some(Stmt::ForRange(ForRangeStmt {
            binders,
            iterable,
            body,
            span,
        }))
    }

    /// Parse `defer call`
    fn parse_defer_stmt(&mut self) -> Option<Stmt> {
        let span = self.span();
        self.advance(); // defer
        let call = self.parse_expression()?;
        self.expect_stmt_end();
        Some(Stmt::Defer(DeferStmt { call, span }))
    }

    /// Parse `go call` or the `go` block shorthand
    ///
    /// A bare `go` followed by a block is wrapped into a call of a
    /// zero-argument lambda, so downstream stages only ever see `go CALL`.
    fn parse_go_stmt(&mut self) -> Option<Stmt> {
        let span = self.span();
        self.advance(); // go

        if self.check(TokenKind::Newline) {
            self.advance();
            let body = self.parse_block();
            let lambda = Expr::Lambda(LambdaExpr {
                id: self.fresh_id(),
                params: Vec::new(),
                body: LambdaBody::Block(body),
                span,
            });
            let call = Expr::Call(CallExpr {
                id: self.fresh_id(),
                callee: Box::new(lambda),
                args: Vec::new(),
                span,
            });
            return Some(Stmt::Go(GoStmt { call, span }));
        }

        let call = self.parse_expression()?;
        self.expect_stmt_end();
        Some(Stmt::Go(GoStmt { call, span }))
    }

    /// Parse the word form `send value to channel`
    fn parse_send_word_stmt(&mut self) -> Option<Stmt> {
        let span = self.span();
        self.advance(); // send
        let value = self.parse_expression()?;
        self.expect(TokenKind::To)?;
        let channel = self.parse_expression()?;
        self.expect_stmt_end();
        Some(Stmt::Send(SendStmt {
            channel,
            value,
            span,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kuki_lex::tokenize;
    use kuki_util::{FileId, Handler};

    fn parse_body(source: &str) -> (Vec<Stmt>, Handler) {
        let wrapped = format!("func T()\n{}", indent(source));
        let handler = Handler::new();
        let tokens = tokenize(&wrapped, FileId::DUMMY, &handler);
        let program = crate::parse(tokens, &handler);
        let Decl::Func(func) = program.decls.into_iter().next().expect("one decl") else {
            panic!("expected function");
        };
        (func.body.stmts, handler)
    }

    fn indent(source: &str) -> String {
        source
            .lines()
            .map(|l| {
                if l.is_empty() {
                    String::new()
                } else {
                    format!("    {l}")
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
            + "\n"
    }

    #[test]
    fn test_var_decl() {
        let (stmts, handler) = parse_body("x := 1");
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
        let Stmt::VarDecl(decl) = &stmts[0] else {
            panic!("expected var decl");
        };
        assert_eq!(decl.names.len(), 1);
        assert_eq!(decl.names[0].name.as_str(), "x");
    }

    #[test]
    fn test_multi_return_destructuring() {
        let (stmts, handler) = parse_body("data, err := fetch(url)");
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
        let Stmt::VarDecl(decl) = &stmts[0] else {
            panic!("expected var decl");
        };
        assert_eq!(decl.names.len(), 2);
        assert_eq!(decl.names[1].name.as_str(), "err");
    }

    #[test]
    fn test_discard_binder() {
        let (stmts, handler) = parse_body("discard, err := fetch(url)");
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
        let Stmt::VarDecl(decl) = &stmts[0] else {
            panic!("expected var decl");
        };
        assert!(decl.names[0].discard);
        assert!(!decl.names[1].discard);
    }

    #[test]
    fn test_assignment() {
        let (stmts, handler) = parse_body("x = 2");
        assert!(!handler.has_errors());
        assert!(matches!(&stmts[0], Stmt::Assign(_)));
    }

    #[test]
    fn test_selector_and_index_assignment() {
        let (stmts, handler) = parse_body("p.x = 1\nitems[0] = 2");
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
        assert!(matches!(&stmts[0], Stmt::Assign(a) if matches!(a.target, Expr::Selector(_))));
        assert!(matches!(&stmts[1], Stmt::Assign(a) if matches!(a.target, Expr::Index(_))));
    }

    #[test]
    fn test_invalid_assignment_target() {
        let (_, handler) = parse_body("1 + 2 = 3");
        assert!(handler.has_errors());
    }

    #[test]
    fn test_inc_dec() {
        let (stmts, handler) = parse_body("i++\nj--");
        assert!(!handler.has_errors());
        assert!(matches!(&stmts[0], Stmt::IncDec(s) if s.increment));
        assert!(matches!(&stmts[1], Stmt::IncDec(s) if !s.increment));
    }

    #[test]
    fn test_var_typed() {
        let (stmts, handler) = parse_body("var count int");
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
        assert!(matches!(&stmts[0], Stmt::VarTyped(v) if v.name.name.as_str() == "count"));
    }

    #[test]
    fn test_if_else_chain() {
        let source = "if a\n    f()\nelse if b\n    g()\nelse\n    h()";
        let (stmts, handler) = parse_body(source);
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
        let Stmt::If(stmt) = &stmts[0] else {
            panic!("expected if");
        };
        let Some(else_branch) = &stmt.else_branch else {
            panic!("expected else branch");
        };
        let ElseBranch::ElseIf(elif) = else_branch.as_ref() else {
            panic!("expected else-if");
        };
        assert!(matches!(
            elif.else_branch.as_deref(),
            Some(ElseBranch::Else(_))
        ));
    }

    #[test]
    fn test_switch_with_clauses() {
        let source = "switch cmd\n    when \"quit\", \"exit\"\n        stop()\n    when \"help\"\n        showHelp()\n    otherwise\n        unknown(cmd)";
        let (stmts, handler) = parse_body(source);
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
        let Stmt::Switch(stmt) = &stmts[0] else {
            panic!("expected switch");
        };
        assert!(stmt.tag.is_some());
        assert_eq!(stmt.clauses.len(), 2);
        assert_eq!(stmt.clauses[0].exprs.len(), 2);
        assert_eq!(stmt.clauses[1].exprs.len(), 1);
        assert!(stmt.default.is_some());
    }

    #[test]
    fn test_when_after_otherwise_is_error() {
        let source = "switch cmd\n    otherwise\n        a()\n    when \"x\"\n        b()";
        let (stmts, handler) = parse_body(source);
        assert!(handler.has_errors());
        let diags = handler.diagnostics();
        assert!(diags
            .iter()
            .any(|d| d.message.contains("'when' clause after")));
        // The rejected clause is not kept.
        let Stmt::Switch(stmt) = &stmts[0] else {
            panic!("expected switch");
        };
        assert!(stmt.clauses.is_empty());
    }

    #[test]
    fn test_case_spelling_in_diagnostic() {
        let source = "switch cmd\n    default\n        a()\n    case \"x\"\n        b()";
        let (_, handler) = parse_body(source);
        // The user wrote `case`; the diagnostic says `case`.
        assert!(handler
            .diagnostics()
            .iter()
            .any(|d| d.message.contains("'case' clause after")));
    }

    #[test]
    fn test_tagless_switch() {
        let source = "switch\n    when x > 1\n        a()\n    otherwise\n        b()";
        let (stmts, handler) = parse_body(source);
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
        let Stmt::Switch(stmt) = &stmts[0] else {
            panic!("expected switch");
        };
        assert!(stmt.tag.is_none());
    }

    #[test]
    fn test_switch_with_init() {
        let source = "switch c := next(); c\n    when 'a'\n        f()";
        let (stmts, handler) = parse_body(source);
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
        let Stmt::Switch(stmt) = &stmts[0] else {
            panic!("expected switch");
        };
        assert!(stmt.init.is_some());
        assert!(stmt.tag.is_some());
    }

    #[test]
    fn test_for_range_forms() {
        let (stmts, handler) = parse_body("for v in items\n    use(v)");
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
        assert!(matches!(&stmts[0], Stmt::ForRange(f) if f.binders.len() == 1));

        let (stmts, handler) = parse_body("for i, v in items\n    use(i, v)");
        assert!(!handler.has_errors());
        assert!(matches!(&stmts[0], Stmt::ForRange(f) if f.binders.len() == 2));
    }

    #[test]
    fn test_for_numeric_to_and_through() {
        let (stmts, handler) = parse_body("for i from 0 to 10\n    use(i)");
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
        assert!(matches!(&stmts[0], Stmt::ForNumeric(f) if !f.inclusive));

        let (stmts, handler) = parse_body("for i from 1 through 5\n    use(i)");
        assert!(!handler.has_errors());
        assert!(matches!(&stmts[0], Stmt::ForNumeric(f) if f.inclusive));
    }

    #[test]
    fn test_for_condition() {
        let (stmts, handler) = parse_body("for n < limit\n    n++");
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
        assert!(matches!(&stmts[0], Stmt::ForCond(_)));
    }

    #[test]
    fn test_defer_and_go() {
        let (stmts, handler) = parse_body("defer file.Close()\ngo worker()");
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
        assert!(matches!(&stmts[0], Stmt::Defer(_)));
        assert!(matches!(&stmts[1], Stmt::Go(_)));
    }

    #[test]
    fn test_go_block_wraps_into_lambda_call() {
        let (stmts, handler) = parse_body("go\n    work()\n    done()");
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
        let Stmt::Go(go) = &stmts[0] else {
            panic!("expected go");
        };
        let Expr::Call(call) = &go.call else {
            panic!("go block must wrap into a call");
        };
        let Expr::Lambda(lambda) = call.callee.as_ref() else {
            panic!("callee must be a lambda");
        };
        assert!(lambda.params.is_empty());
        let LambdaBody::Block(block) = &lambda.body else {
            panic!("lambda body must be the block");
        };
        assert_eq!(block.stmts.len(), 2);
    }

    #[test]
    fn test_send_forms() {
        let (stmts, handler) = parse_body("ch <- 1\nsend 2 to ch");
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
        assert!(matches!(&stmts[0], Stmt::Send(_)));
        assert!(matches!(&stmts[1], Stmt::Send(_)));
    }

    #[test]
    fn test_return_forms() {
        let (stmts, handler) = parse_body("return\n");
        assert!(!handler.has_errors());
        assert!(matches!(&stmts[0], Stmt::Return(r) if r.values.is_empty()));

        let (stmts, handler) = parse_body("return a, err\n");
        assert!(!handler.has_errors());
        assert!(matches!(&stmts[0], Stmt::Return(r) if r.values.len() == 2));
    }

    #[test]
    fn test_break_continue() {
        let (stmts, handler) = parse_body("for x\n    break\n    continue");
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
        let Stmt::ForCond(f) = &stmts[0] else {
            panic!("expected loop");
        };
        assert!(matches!(f.body.stmts[0], Stmt::Break(_)));
        assert!(matches!(f.body.stmts[1], Stmt::Continue(_)));
    }

    #[test]
    fn test_missing_indent_is_error() {
        let (_, handler) = parse_body("if ready\nf()");
        assert!(handler.has_errors());
        assert!(handler
            .diagnostics()
            .iter()
            .any(|d| d.message.contains("indented block")));
    }

    #[test]
    fn test_recovery_within_block() {
        let (stmts, handler) = parse_body("x := := 1\ny := 2");
        assert!(handler.has_errors());
        // The second statement survives recovery.
        assert!(stmts
            .iter()
            .any(|s| matches!(s, Stmt::VarDecl(d) if d.names[0].name.as_str() == "y")));
    }
}
