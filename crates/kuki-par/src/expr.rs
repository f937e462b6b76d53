//! Expression parsing.
//!
//! A hand-rolled precedence ladder, loosest first:
//!
//! | Level | Forms |
//! |-------|-------|
//! | 1 | `onerr` handler attachment |
//! | 2 | `\|>` pipe (left-associative) |
//! | 3 | `or`, `\|\|` |
//! | 4 | `and`, `&&` |
//! | 5 | `equals`, `==`, `!=` |
//! | 6 | `<`, `>`, `<=`, `>=` |
//! | 7 | `+`, `-`, `\|` |
//! | 8 | `*`, `/`, `%` |
//! | 9 | unary `-`, `!`, `not`, `reference`, `dereference`, receive |
//! | 10 | postfix call, index, slice, selector, `as TYPE` |
//! | 11 | primary |
//!
//! All binary levels are left-associative, so each level is a simple loop
//! over the next-tighter level. `a + b * c` parses as `a + (b * c)` and
//! `x |> f() |> g()` as `(x |> f()) |> g()`, which is structurally
//! `g(f(x))`.

use crate::ast::*;
use crate::Parser;
use kuki_lex::TokenKind;
use kuki_util::Span;

impl<'a> Parser<'a> {
    /// Expression entry point: the `onerr` level
    pub(crate) fn parse_expression(&mut self) -> Option<Expr> {
        let expr = self.parse_pipe()?;
        if self.check(TokenKind::Onerr) {
            let span = expr.span();
            self.advance();
            let handler = self.parse_onerr_handler()?;
            return Some(Expr::Onerr(OnerrExpr {
                id: self.fresh_id(),
                primary: Box::new(expr),
                handler,
                span,
            }));
        }
        Some(expr)
    }

    /// The handler after `onerr`: return, panic, discard, or a fallback
    /// expression
    fn parse_onerr_handler(&mut self) -> Option<OnerrHandler> {
        match self.kind() {
            TokenKind::Return => {
                let span = self.span();
                self.advance();
                let mut values = Vec::new();
                if !self.check(TokenKind::Newline)
                    && !self.check(TokenKind::Dedent)
                    && !self.at_end()
                {
                    values.push(self.parse_expression()?);
                    while self.eat(TokenKind::Comma) {
                        values.push(self.parse_expression()?);
                    }
                }
                Some(OnerrHandler::Return(ReturnStmt { values, span }))
            }
            TokenKind::Discard => {
                let span = self.span();
                self.advance();
                Some(OnerrHandler::Discard(span))
            }
            _ => {
                let expr = self.parse_pipe()?;
                match expr {
                    Expr::Panic(panic) => Some(OnerrHandler::Panic(panic.message)),
                    other => Some(OnerrHandler::Expr(Box::new(other))),
                }
            }
        }
    }

    /// Pipe level: `left |> call(...)`
    ///
    /// The right side must be a call; a bare identifier is promoted to a
    /// zero-argument call so `x |> double` means `double(x)`.
    fn parse_pipe(&mut self) -> Option<Expr> {
        let mut left = self.parse_or()?;
        while self.check(TokenKind::PipeGt) {
            let op_span = self.span();
            self.advance();
            let mut right = self.parse_or()?;
            if let Expr::Ident(_) = right {
                let span = right.span();
                right = Expr::Call(CallExpr {
                    id: self.fresh_id(),
                    callee: Box::new(right),
                    args: Vec::new(),
                    span,
                });
            }
            if !matches!(right, Expr::Call(_) | Expr::MethodCall(_)) {
                self.error_at(op_span, "right side of '|>' must be a call");
            }
            let span = left.span();
            left = Expr::Pipe(PipeExpr {
                id: self.fresh_id(),
                left: Box::new(left),
                right: Box::new(right),
                span,
            });
        }
        Some(left)
    }

    fn mk_binary(&mut self, op: BinOp, op_span: Span, left: Expr, right: Expr) -> Expr {
        let span = left.span();
        Expr::Binary(BinaryExpr {
            id: self.fresh_id(),
            op,
            op_span,
            left: Box::new(left),
            right: Box::new(right),
            span,
        })
    }

    fn parse_or(&mut self) -> Option<Expr> {
        let mut left = self.parse_and()?;
        while matches!(self.kind(), TokenKind::Or | TokenKind::PipePipe) {
            let op_span = self.span();
            self.advance();
            let right = self.parse_and()?;
            left = self.mk_binary(BinOp::Or, op_span, left, right);
        }
        Some(left)
    }

    fn parse_and(&mut self) -> Option<Expr> {
        let mut left = self.parse_equality()?;
        while matches!(self.kind(), TokenKind::And | TokenKind::AmpAmp) {
            let op_span = self.span();
            self.advance();
            let right = self.parse_equality()?;
            left = self.mk_binary(BinOp::And, op_span, left, right);
        }
        Some(left)
    }

    fn parse_equality(&mut self) -> Option<Expr> {
        let mut left = self.parse_ordering()?;
        loop {
            let op = match self.kind() {
                TokenKind::Equals | TokenKind::EqEq => BinOp::Eq,
                TokenKind::NotEq => BinOp::Ne,
                _ => break,
            };
            let op_span = self.span();
            self.advance();
            let right = self.parse_ordering()?;
            left = self.mk_binary(op, op_span, left, right);
        }
        Some(left)
    }

    fn parse_ordering(&mut self) -> Option<Expr> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.kind() {
                TokenKind::Lt => BinOp::Lt,
                TokenKind::Gt => BinOp::Gt,
                TokenKind::LtEq => BinOp::Le,
                TokenKind::GtEq => BinOp::Ge,
                _ => break,
            };
            let op_span = self.span();
            self.advance();
            let right = self.parse_additive()?;
            left = self.mk_binary(op, op_span, left, right);
        }
        Some(left)
    }

    fn parse_additive(&mut self) -> Option<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.kind() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                TokenKind::BitOr => BinOp::BitOr,
                _ => break,
            };
            let op_span = self.span();
            self.advance();
            let right = self.parse_multiplicative()?;
            left = self.mk_binary(op, op_span, left, right);
        }
        Some(left)
    }

    fn parse_multiplicative(&mut self) -> Option<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.kind() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            let op_span = self.span();
            self.advance();
            let right = self.parse_unary()?;
            left = self.mk_binary(op, op_span, left, right);
        }
        Some(left)
    }

    /// Unary prefix operators
    fn parse_unary(&mut self) -> Option<Expr> {
        let span = self.span();
        match self.kind() {
            TokenKind::Minus => {
                self.advance();
                let expr = self.parse_unary()?;
                Some(Expr::Unary(UnaryExpr {
                    id: self.fresh_id(),
                    op: UnOp::Neg,
                    expr: Box::new(expr),
                    span,
                }))
            }
            TokenKind::Bang | TokenKind::Not => {
                self.advance();
                let expr = self.parse_unary()?;
                Some(Expr::Unary(UnaryExpr {
                    id: self.fresh_id(),
                    op: UnOp::Not,
                    expr: Box::new(expr),
                    span,
                }))
            }
            TokenKind::Reference => {
                self.advance();
                let expr = self.parse_unary()?;
                Some(Expr::Ref(RefExpr {
                    id: self.fresh_id(),
                    expr: Box::new(expr),
                    span,
                }))
            }
            TokenKind::Dereference => {
                self.advance();
                let expr = self.parse_unary()?;
                Some(Expr::Deref(DerefExpr {
                    id: self.fresh_id(),
                    expr: Box::new(expr),
                    span,
                }))
            }
            TokenKind::LArrow | TokenKind::Receive => {
                self.advance();
                let channel = self.parse_unary()?;
                Some(Expr::Receive(ReceiveExpr {
                    id: self.fresh_id(),
                    channel: Box::new(channel),
                    span,
                }))
            }
            _ => self.parse_postfix(),
        }
    }

    /// Postfix chains: calls, indexing, slicing, selectors, casts
    fn parse_postfix(&mut self) -> Option<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.kind() {
                TokenKind::LParen => {
                    let span = expr.span();
                    let args = self.parse_call_args()?;
                    expr = Expr::Call(CallExpr {
                        id: self.fresh_id(),
                        callee: Box::new(expr),
                        args,
                        span,
                    });
                }
                TokenKind::LBracket => {
                    expr = self.parse_index_or_slice(expr)?;
                }
                TokenKind::Dot => {
                    self.advance();
                    let field = self.expect(TokenKind::Ident)?;
                    let span = expr.span();
                    if self.check(TokenKind::LParen) {
                        let args = self.parse_call_args()?;
                        expr = Expr::MethodCall(MethodCallExpr {
                            id: self.fresh_id(),
                            receiver: Box::new(expr),
                            method: Self::name_of(&field),
                            method_span: field.span,
                            args,
                            span,
                        });
                    } else {
                        expr = Expr::Selector(SelectorExpr {
                            id: self.fresh_id(),
                            object: Box::new(expr),
                            field: Self::name_of(&field),
                            field_span: field.span,
                            span,
                        });
                    }
                }
                TokenKind::As => {
                    self.advance();
                    let ty = self.parse_type()?;
                    let span = expr.span();
                    expr = Expr::Cast(CastExpr {
                        id: self.fresh_id(),
                        expr: Box::new(expr),
                        ty,
                        span,
                    });
                }
                _ => break,
            }
        }
        Some(expr)
    }

    /// Parse `(args...)` after a callee
    fn parse_call_args(&mut self) -> Option<Vec<Expr>> {
        self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                args.push(self.parse_expression()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
                if self.check(TokenKind::RParen) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;
        Some(args)
    }

    /// Parse `[index]`, `[start:end]`, `[:end]`, `[start:]`, or `[:]`
    fn parse_index_or_slice(&mut self, object: Expr) -> Option<Expr> {
        let span = object.span();
        self.advance(); // [

        if self.eat(TokenKind::Colon) {
            let end = if self.check(TokenKind::RBracket) {
                None
            } else {
                Some(Box::new(self.parse_expression()?))
            };
            self.expect(TokenKind::RBracket)?;
            return Some(Expr::Slice(SliceExpr {
                id: self.fresh_id(),
                object: Box::new(object),
                start: None,
                end,
                span,
            }));
        }

        let first = self.parse_expression()?;
        if self.eat(TokenKind::Colon) {
            let end = if self.check(TokenKind::RBracket) {
                None
            } else {
                Some(Box::new(self.parse_expression()?))
            };
            self.expect(TokenKind::RBracket)?;
            Some(Expr::Slice(SliceExpr {
                id: self.fresh_id(),
                object: Box::new(object),
                start: Some(Box::new(first)),
                end,
                span,
            }))
        } else {
            self.expect(TokenKind::RBracket)?;
            Some(Expr::Index(IndexExpr {
                id: self.fresh_id(),
                object: Box::new(object),
                index: Box::new(first),
                span,
            }))
        }
    }

    /// Primary expressions
    fn parse_primary(&mut self) -> Option<Expr> {
        let span = self.span();
        match self.kind() {
            TokenKind::Integer => {
                let token = self.advance();
                Some(Expr::Int(LitExpr {
                    id: self.fresh_id(),
                    text: token.lexeme,
                    span,
                }))
            }
            TokenKind::Float => {
                let token = self.advance();
                Some(Expr::Float(LitExpr {
                    id: self.fresh_id(),
                    text: token.lexeme,
                    span,
                }))
            }
            TokenKind::Rune => {
                let token = self.advance();
                Some(Expr::Rune(LitExpr {
                    id: self.fresh_id(),
                    text: token.lexeme,
                    span,
                }))
            }
            TokenKind::True | TokenKind::False => {
                let value = self.kind() == TokenKind::True;
                self.advance();
                Some(Expr::Bool(BoolExpr {
                    id: self.fresh_id(),
                    value,
                    span,
                }))
            }
            TokenKind::Str => {
                let token = self.advance();
                self.parse_string_literal(token)
            }
            TokenKind::Ident => {
                if self.peek_kind(1) == TokenKind::FatArrow {
                    return self.parse_lambda_single();
                }
                if self.peek_kind(1) == TokenKind::LBrace {
                    return self.parse_struct_literal();
                }
                if self.peek_kind(1) == TokenKind::Dot
                    && self.peek_kind(2) == TokenKind::Ident
                    && self.peek_kind(3) == TokenKind::LBrace
                {
                    return self.parse_struct_literal();
                }
                let token = self.advance();
                if token.lexeme == "this" {
                    return Some(Expr::This(ThisExpr {
                        id: self.fresh_id(),
                        span,
                    }));
                }
                Some(Expr::Ident(IdentExpr {
                    id: self.fresh_id(),
                    name: Self::name_of(&token),
                    span,
                }))
            }
            TokenKind::LParen => {
                if self.lparen_starts_lambda() {
                    return self.parse_lambda_parenthesized();
                }
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RParen)?;
                Some(expr)
            }
            TokenKind::LBracket => self.parse_list_literal(),
            TokenKind::LBrace => self.parse_map_literal(),
            TokenKind::Empty => {
                self.advance();
                let ty = if matches!(
                    self.kind(),
                    TokenKind::Ident
                        | TokenKind::List
                        | TokenKind::Map
                        | TokenKind::Channel
                        | TokenKind::Reference
                        | TokenKind::ErrorKw
                        | TokenKind::Func
                ) {
                    self.parse_type()
                } else {
                    None
                };
                Some(Expr::Empty(EmptyExpr {
                    id: self.fresh_id(),
                    ty,
                    span,
                }))
            }
            TokenKind::Discard => {
                self.advance();
                Some(Expr::Discard(DiscardExpr {
                    id: self.fresh_id(),
                    span,
                }))
            }
            TokenKind::ErrorKw => {
                self.advance();
                let message = self.parse_unary()?;
                Some(Expr::ErrorNew(ErrorNewExpr {
                    id: self.fresh_id(),
                    message: Box::new(message),
                    span,
                }))
            }
            TokenKind::Make => {
                self.advance();
                self.expect(TokenKind::LParen)?;
                let ty = self.parse_type()?;
                let mut sizes = Vec::new();
                while self.eat(TokenKind::Comma) {
                    sizes.push(self.parse_expression()?);
                }
                self.expect(TokenKind::RParen)?;
                Some(Expr::Make(MakeExpr {
                    id: self.fresh_id(),
                    ty,
                    sizes,
                    span,
                }))
            }
            TokenKind::Close => {
                self.advance();
                self.expect(TokenKind::LParen)?;
                let channel = self.parse_expression()?;
                self.expect(TokenKind::RParen)?;
                Some(Expr::Close(CloseExpr {
                    id: self.fresh_id(),
                    channel: Box::new(channel),
                    span,
                }))
            }
            TokenKind::Panic => {
                self.advance();
                self.expect(TokenKind::LParen)?;
                let message = self.parse_expression()?;
                self.expect(TokenKind::RParen)?;
                Some(Expr::Panic(PanicExpr {
                    id: self.fresh_id(),
                    message: Box::new(message),
                    span,
                }))
            }
            TokenKind::Recover => {
                self.advance();
                self.expect(TokenKind::LParen)?;
                self.expect(TokenKind::RParen)?;
                Some(Expr::Recover(RecoverExpr {
                    id: self.fresh_id(),
                    span,
                }))
            }
            _ => {
                self.error(format!(
                    "expected an expression, found {}",
                    self.kind().describe()
                ));
                None
            }
        }
    }

    /// Bounded lookahead: does this `(` open a lambda parameter list?
    ///
    /// Scans forward pairing brackets until the matching `)`; the `(` is a
    /// lambda head exactly when `=>` follows it.
    fn lparen_starts_lambda(&self) -> bool {
        let mut depth = 0usize;
        let mut i = 0usize;
        loop {
            match self.peek_kind(i) {
                TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => depth += 1,
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return self.peek_kind(i + 1) == TokenKind::FatArrow;
                    }
                }
                TokenKind::Eof => return false,
                _ => {}
            }
            i += 1;
        }
    }

    /// `name => body`
    fn parse_lambda_single(&mut self) -> Option<Expr> {
        let span = self.span();
        let name = self.advance();
        let param = LambdaParam {
            name: Self::name_of(&name),
            ty: None,
            span: name.span,
        };
        self.expect(TokenKind::FatArrow)?;
        let body = self.parse_lambda_body()?;
        Some(Expr::Lambda(LambdaExpr {
            id: self.fresh_id(),
            params: vec![param],
            body,
            span,
        }))
    }

    /// `(a, b TYPE, ...) => body`
    fn parse_lambda_parenthesized(&mut self) -> Option<Expr> {
        let span = self.span();
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                let pspan = self.span();
                let name = self.expect(TokenKind::Ident)?;
                let ty = if self.type_starts_here() && !self.check(TokenKind::LParen) {
                    self.parse_type()
                } else {
                    None
                };
                params.push(LambdaParam {
                    name: Self::name_of(&name),
                    ty,
                    span: pspan,
                });
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;
        self.expect(TokenKind::FatArrow)?;
        let body = self.parse_lambda_body()?;
        Some(Expr::Lambda(LambdaExpr {
            id: self.fresh_id(),
            params,
            body,
            span,
        }))
    }

    /// Expression body on the same line, or NEWLINE INDENT block DEDENT
    fn parse_lambda_body(&mut self) -> Option<LambdaBody> {
        if self.check(TokenKind::Newline) {
            self.advance();
            if !self.check(TokenKind::Indent) {
                self.error("arrow lambda is missing its body");
                return None;
            }
            return Some(LambdaBody::Block(self.parse_block()));
        }
        if self.check(TokenKind::Dedent) || self.at_end() {
            self.error("arrow lambda is missing its body");
            return None;
        }
        Some(LambdaBody::Expr(Box::new(self.parse_expression()?)))
    }

    /// `[a, b, c]`
    fn parse_list_literal(&mut self) -> Option<Expr> {
        let span = self.span();
        self.advance(); // [
        let mut elems = Vec::new();
        if !self.check(TokenKind::RBracket) {
            loop {
                elems.push(self.parse_expression()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
                if self.check(TokenKind::RBracket) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RBracket)?;
        Some(Expr::ListLit(ListLitExpr {
            id: self.fresh_id(),
            elems,
            span,
        }))
    }

    /// `{key: value, ...}`
    fn parse_map_literal(&mut self) -> Option<Expr> {
        let span = self.span();
        self.advance(); // {
        let mut entries = Vec::new();
        if !self.check(TokenKind::RBrace) {
            loop {
                let key = self.parse_expression()?;
                self.expect(TokenKind::Colon)?;
                let value = self.parse_expression()?;
                entries.push((key, value));
                if !self.eat(TokenKind::Comma) {
                    break;
                }
                if self.check(TokenKind::RBrace) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RBrace)?;
        Some(Expr::MapLit(MapLitExpr {
            id: self.fresh_id(),
            entries,
            span,
        }))
    }

    /// `Name{field: value, ...}` or `module.Name{...}`
    fn parse_struct_literal(&mut self) -> Option<Expr> {
        let span = self.span();
        let ty = self.parse_type()?;
        self.expect(TokenKind::LBrace)?;
        let mut fields = Vec::new();
        if !self.check(TokenKind::RBrace) {
            loop {
                let fspan = self.span();
                let name = self.expect(TokenKind::Ident)?;
                self.expect(TokenKind::Colon)?;
                let value = self.parse_expression()?;
                fields.push(FieldInit {
                    name: Self::name_of(&name),
                    value,
                    span: fspan,
                });
                if !self.eat(TokenKind::Comma) {
                    break;
                }
                if self.check(TokenKind::RBrace) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RBrace)?;
        Some(Expr::StructLit(StructLitExpr {
            id: self.fresh_id(),
            ty,
            fields,
            span,
        }))
    }
}
