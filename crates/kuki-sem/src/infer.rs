//! Expression type inference.
//!
//! Inference is local and syntax-directed: each expression's type follows
//! from its operands, with three context-sensitive exceptions spelled out
//! by the language:
//!
//! - a pipe injects its left value as the first argument of the right
//!   call, so the right call is checked with one extra leading argument;
//! - `onerr` peels the error half off a `(T, error)` pair;
//! - an untyped lambda parameter adopts the parameter type of the
//!   function the lambda is being passed to, when that signature is
//!   known.
//!
//! Once a subexpression has failed, its type is `Unknown` and every rule
//! involving it stays silent, so a single mistake reports once.

use kuki_par::ast::*;
use kuki_util::{Span, Stage};

use crate::table::SymbolKind;
use crate::types::{FuncTy, Ty};
use crate::{Analyzer, ReturnCtx, ScopeKind};

/// The parameter type at a call position; a variadic signature keeps
/// matching its final element type
fn expected_param(sig: &FuncTy, position: usize) -> Option<&Ty> {
    if sig.variadic && position + 1 >= sig.params.len() {
        sig.params.last()
    } else {
        sig.params.get(position)
    }
}

impl<'a> Analyzer<'a> {
    /// Infer an expression's type, recording it in the `types` side table
    pub(crate) fn infer_expr(&mut self, expr: &Expr) -> Ty {
        let ty = self.infer_expr_inner(expr);
        self.types.insert(expr.id(), ty.clone());
        ty
    }

    fn infer_expr_inner(&mut self, expr: &Expr) -> Ty {
        match expr {
            Expr::Ident(ident) => self.infer_ident(ident),
            Expr::Int(_) => Ty::Int,
            Expr::Float(_) => Ty::Float,
            Expr::Rune(_) => Ty::Rune,
            Expr::Bool(_) => Ty::Bool,
            Expr::Str(s) => {
                for part in &s.parts {
                    if let StringPart::Expr(inner) = part {
                        let ty = self.infer_expr(inner);
                        if matches!(ty, Ty::Void) {
                            self.error(
                                Stage::Types,
                                "interpolated expression has no value",
                                inner.span(),
                            );
                        }
                    }
                }
                Ty::Str
            }
            Expr::Binary(binary) => self.infer_binary(binary),
            Expr::Unary(unary) => self.infer_unary(unary),
            Expr::Pipe(pipe) => self.infer_pipe(pipe),
            Expr::Onerr(onerr) => self.infer_onerr(onerr),
            Expr::Call(call) => self.infer_call(call, None),
            Expr::MethodCall(call) => self.infer_method_call(call, None),
            Expr::Selector(sel) => self.infer_selector(sel),
            Expr::Index(index) => self.infer_index(index),
            Expr::Slice(slice) => self.infer_slice(slice),
            Expr::StructLit(lit) => self.infer_struct_lit(lit),
            Expr::ListLit(lit) => self.infer_list_lit(lit),
            Expr::MapLit(lit) => self.infer_map_lit(lit),
            Expr::Receive(recv) => {
                let chan_ty = self.infer_expr(&recv.channel);
                match self.underlying(&chan_ty) {
                    Ty::Chan(elem) => *elem,
                    Ty::Unknown => Ty::Unknown,
                    other => {
                        self.error(
                            Stage::Types,
                            format!("cannot receive from a value of type {other}"),
                            recv.channel.span(),
                        );
                        Ty::Unknown
                    }
                }
            }
            Expr::Cast(cast) => self.infer_cast(cast),
            Expr::Ref(r) => {
                let inner = self.infer_expr(&r.expr);
                Ty::Ref(Box::new(inner))
            }
            Expr::Deref(d) => {
                let inner = self.infer_expr(&d.expr);
                match self.underlying(&inner) {
                    Ty::Ref(target) => *target,
                    Ty::Unknown => Ty::Unknown,
                    other => {
                        self.error(
                            Stage::Types,
                            format!("cannot dereference a value of type {other}"),
                            d.expr.span(),
                        );
                        Ty::Unknown
                    }
                }
            }
            Expr::Lambda(lambda) => self.infer_lambda(lambda, None),
            Expr::Empty(empty) => match &empty.ty {
                Some(ty) => self.resolve_type(ty),
                None => Ty::Unknown,
            },
            Expr::Discard(discard) => {
                self.error(
                    Stage::Resolve,
                    "'discard' can only receive a value, not produce one",
                    discard.span,
                );
                Ty::Unknown
            }
            Expr::ErrorNew(err) => {
                let msg_ty = self.infer_expr(&err.message);
                if !matches!(self.underlying(&msg_ty), Ty::Str | Ty::Unknown) {
                    self.error(
                        Stage::Types,
                        format!("'error' needs a string message, found {msg_ty}"),
                        err.message.span(),
                    );
                }
                Ty::Error
            }
            Expr::Make(make) => self.infer_make(make),
            Expr::Close(close) => {
                let chan_ty = self.infer_expr(&close.channel);
                if !matches!(self.underlying(&chan_ty), Ty::Chan(_) | Ty::Unknown) {
                    self.error(
                        Stage::Types,
                        format!("'close' needs a channel, found {chan_ty}"),
                        close.channel.span(),
                    );
                }
                Ty::Void
            }
            Expr::Panic(panic) => {
                self.infer_expr(&panic.message);
                Ty::Never
            }
            Expr::Recover(_) => Ty::Any,
            Expr::This(this) => match self.current_receiver {
                Some(id) => {
                    self.used.insert(id);
                    self.resolutions.insert(this.id, id);
                    self.symbols.get(id).ty.clone()
                }
                None => {
                    self.error(
                        Stage::Resolve,
                        "'this' is only valid inside a method",
                        this.span,
                    );
                    Ty::Unknown
                }
            },
        }
    }

    fn infer_ident(&mut self, ident: &IdentExpr) -> Ty {
        match self.scopes.lookup(self.current, ident.name) {
            Some(id) => {
                self.used.insert(id);
                self.resolutions.insert(ident.id, id);
                self.symbols.get(id).ty.clone()
            }
            None => {
                self.error(
                    Stage::Resolve,
                    format!("undefined: '{}'", ident.name),
                    ident.span,
                );
                Ty::Unknown
            }
        }
    }

    fn infer_binary(&mut self, binary: &BinaryExpr) -> Ty {
        let left_ty = self.infer_expr(&binary.left);
        let right_ty = self.infer_expr(&binary.right);
        let left = self.underlying(&left_ty);
        let right = self.underlying(&right_ty);

        if binary.op.is_arithmetic() {
            if left.is_unknown() || right.is_unknown() {
                return Ty::Unknown;
            }
            if binary.op == BinOp::Add && left == Ty::Str && right == Ty::Str {
                return left_ty;
            }
            if binary.op == BinOp::BitOr {
                if left.is_integer() && right.is_integer() {
                    return left.promote(&right).unwrap_or(Ty::Int);
                }
            } else if let Some(promoted) = left.promote(&right) {
                if promoted.is_numeric() || promoted.is_unknown() {
                    return promoted;
                }
            }
            self.error(
                Stage::Types,
                format!(
                    "operator '{}' cannot combine {left_ty} and {right_ty}",
                    binary.op.as_str()
                ),
                binary.op_span,
            );
            return Ty::Unknown;
        }

        if binary.op.is_equality() {
            if !left.is_unknown() && !right.is_unknown() && !left.comparable_with(&right) {
                self.error(
                    Stage::Types,
                    format!("cannot compare {left_ty} with {right_ty}"),
                    binary.op_span,
                );
            }
            return Ty::Bool;
        }

        if binary.op.is_ordering() {
            let fine = left.is_unknown()
                || right.is_unknown()
                || (left == Ty::Str && right == Ty::Str)
                || (left.is_numeric() && right.is_numeric() && left.promote(&right).is_some());
            if !fine {
                self.error(
                    Stage::Types,
                    format!(
                        "operator '{}' cannot order {left_ty} and {right_ty}",
                        binary.op.as_str()
                    ),
                    binary.op_span,
                );
            }
            return Ty::Bool;
        }

        // Logical operators.
        self.check_bool(&left_ty, binary.left.span(), "logical operand");
        self.check_bool(&right_ty, binary.right.span(), "logical operand");
        Ty::Bool
    }

    fn infer_unary(&mut self, unary: &UnaryExpr) -> Ty {
        let ty = self.infer_expr(&unary.expr);
        match unary.op {
            UnOp::Neg => {
                let under = self.underlying(&ty);
                if under.is_numeric() || under.is_unknown() {
                    ty
                } else {
                    self.error(
                        Stage::Types,
                        format!("unary '-' needs a numeric operand, found {ty}"),
                        unary.expr.span(),
                    );
                    Ty::Unknown
                }
            }
            UnOp::Not => {
                self.check_bool(&ty, unary.expr.span(), "'not' operand");
                Ty::Bool
            }
        }
    }

    /// `left |> call(...)`: the left value becomes the call's first
    /// argument; the pipe's type is the call's result type
    fn infer_pipe(&mut self, pipe: &PipeExpr) -> Ty {
        let left_ty = self.infer_expr(&pipe.left);
        let result = match pipe.right.as_ref() {
            Expr::Call(call) => self.infer_call(call, Some(left_ty)),
            Expr::MethodCall(call) => self.infer_method_call(call, Some(left_ty)),
            other => {
                // The parser already rejected this shape; stay quiet.
                self.infer_expr(other);
                Ty::Unknown
            }
        };
        self.types.insert(pipe.right.id(), result.clone());
        result
    }

    /// `primary onerr handler`: the primary must produce `error` or
    /// `(T, error)`; the result is the non-error payload
    fn infer_onerr(&mut self, onerr: &OnerrExpr) -> Ty {
        let primary_ty = self.infer_expr(&onerr.primary);
        let result = match self.underlying(&primary_ty) {
            Ty::Tuple(items)
                if items.len() == 2 && matches!(self.underlying(&items[1]), Ty::Error) =>
            {
                items[0].clone()
            }
            Ty::Error => Ty::Void,
            Ty::Unknown => Ty::Unknown,
            other => {
                self.error(
                    Stage::Types,
                    format!("'onerr' needs an expression that can fail, found {other}"),
                    onerr.primary.span(),
                );
                Ty::Unknown
            }
        };

        match &onerr.handler {
            OnerrHandler::Return(ret) => self.check_onerr_return(ret),
            OnerrHandler::Panic(message) => {
                self.infer_expr(message);
            }
            OnerrHandler::Discard(_) => {}
            OnerrHandler::Expr(fallback) => {
                let fallback_ty = self.infer_expr(fallback);
                if !matches!(result, Ty::Void | Ty::Unknown)
                    && !self.expr_assignable(fallback, &fallback_ty, &result)
                {
                    self.error(
                        Stage::Types,
                        format!("'onerr' fallback must produce {result}, found {fallback_ty}"),
                        fallback.span(),
                    );
                }
            }
        }
        result
    }

    /// An `onerr return ...` handler returns from the enclosing function;
    /// arity is checked only when a function's return list is in scope
    fn check_onerr_return(&mut self, ret: &ReturnStmt) {
        let tys: Vec<Ty> = ret.values.iter().map(|v| self.infer_expr(v)).collect();
        if let ReturnCtx::Function(expected) = self.return_ctx.clone() {
            if tys.len() != expected.len() {
                self.error(
                    Stage::Types,
                    format!(
                        "this function returns {} value{}, the handler returns {}",
                        expected.len(),
                        if expected.len() == 1 { "" } else { "s" },
                        tys.len()
                    ),
                    ret.span,
                );
                return;
            }
            for ((value, ty), want) in ret.values.iter().zip(&tys).zip(&expected) {
                if !self.expr_assignable(value, ty, want) {
                    self.error(
                        Stage::Types,
                        format!("cannot return {ty} where {want} is expected"),
                        value.span(),
                    );
                }
            }
        }
    }

    /// Infer a call; `piped` carries the type of a value injected by `|>`
    pub(crate) fn infer_call(&mut self, call: &CallExpr, piped: Option<Ty>) -> Ty {
        // Builtins dispatch to their own rules.
        if let Expr::Ident(ident) = call.callee.as_ref() {
            if let Some(id) = self.scopes.lookup(self.current, ident.name) {
                if self.symbols.get(id).kind == SymbolKind::Builtin {
                    self.used.insert(id);
                    self.resolutions.insert(ident.id, id);
                    let callee_ty = self.symbols.get(id).ty.clone();
                    self.types.insert(ident.id, callee_ty);
                    return self.infer_builtin_call(ident.name.as_str(), call, piped);
                }
            }
        }

        let callee_ty = self.infer_expr(&call.callee);
        match self.underlying(&callee_ty) {
            Ty::Func(sig) => self.check_call_args(&sig, &call.args, piped, call.span),
            Ty::Unknown => {
                for arg in &call.args {
                    self.infer_arg(arg, None);
                }
                Ty::Unknown
            }
            other => {
                self.error(
                    Stage::Types,
                    format!("cannot call a value of type {other}"),
                    call.callee.span(),
                );
                for arg in &call.args {
                    self.infer_arg(arg, None);
                }
                Ty::Unknown
            }
        }
    }

    /// Infer a method call; the receiver may be an import alias (opaque
    /// module), a record or interface value, or a reference to one
    pub(crate) fn infer_method_call(&mut self, call: &MethodCallExpr, piped: Option<Ty>) -> Ty {
        // `json.Parse()`: a call into an imported module. Imports are
        // recorded, not resolved, so the signature is unavailable.
        if let Expr::Ident(ident) = call.receiver.as_ref() {
            if let Some(id) = self.scopes.lookup(self.current, ident.name) {
                if self.symbols.get(id).kind == SymbolKind::Import {
                    self.used.insert(id);
                    self.resolutions.insert(ident.id, id);
                    self.types.insert(ident.id, Ty::Unknown);
                    for arg in &call.args {
                        self.infer_arg(arg, None);
                    }
                    return Ty::Unknown;
                }
            }
        }

        let recv_ty = self.infer_expr(&call.receiver);
        let mut base = self.underlying(&recv_ty);
        if let Ty::Ref(inner) = &base {
            base = self.underlying(inner);
        }

        match base {
            Ty::Named(type_name) => {
                if let Some(&method_id) = self.methods.get(&(type_name, call.method)) {
                    self.used.insert(method_id);
                    self.resolutions.insert(call.id, method_id);
                    let sig = match self.symbols.get(method_id).signature() {
                        Some(sig) => sig.clone(),
                        None => return Ty::Unknown,
                    };
                    return self.check_call_args(&sig, &call.args, piped, call.span);
                }
                if let Some(methods) = self.interfaces.get(&type_name) {
                    if let Some((_, sig)) = methods.iter().find(|(n, _)| *n == call.method) {
                        let sig = sig.clone();
                        return self.check_call_args(&sig, &call.args, piped, call.span);
                    }
                }
                self.error(
                    Stage::Types,
                    format!("type '{type_name}' has no method '{}'", call.method),
                    call.method_span,
                );
                for arg in &call.args {
                    self.infer_arg(arg, None);
                }
                Ty::Unknown
            }
            Ty::Unknown => {
                for arg in &call.args {
                    self.infer_arg(arg, None);
                }
                Ty::Unknown
            }
            other => {
                self.error(
                    Stage::Types,
                    format!("type {other} has no methods"),
                    call.method_span,
                );
                for arg in &call.args {
                    self.infer_arg(arg, None);
                }
                Ty::Unknown
            }
        }
    }

    /// Check arity and argument types against a known signature
    ///
    /// When `piped` is set, the injected value occupies parameter slot
    /// zero and the written arguments shift right by one.
    fn check_call_args(
        &mut self,
        sig: &FuncTy,
        args: &[Expr],
        piped: Option<Ty>,
        span: Span,
    ) -> Ty {
        let shift = usize::from(piped.is_some());
        let found = args.len() + shift;

        if sig.variadic {
            let required = sig.params.len().saturating_sub(1);
            if found < required {
                self.error(
                    Stage::Types,
                    format!(
                        "not enough arguments: expected at least {required}, found {found}"
                    ),
                    span,
                );
            }
        } else if found != sig.params.len() {
            self.error(
                Stage::Types,
                format!(
                    "wrong number of arguments: expected {}, found {found}",
                    sig.params.len()
                ),
                span,
            );
        }

        if let Some(piped_ty) = &piped {
            if let Some(want) = expected_param(sig, 0) {
                if !piped_ty.assignable_to(want) {
                    self.error(
                        Stage::Types,
                        format!("piped value of type {piped_ty} cannot flow into a {want} parameter"),
                        span,
                    );
                }
            }
        }

        for (index, arg) in args.iter().enumerate() {
            let want = expected_param(sig, index + shift).cloned();
            let ty = self.infer_arg(arg, want.as_ref());
            if let Some(want) = want {
                if !self.expr_assignable(arg, &ty, &want) {
                    self.error(
                        Stage::Types,
                        format!("argument of type {ty} where {want} is expected"),
                        arg.span(),
                    );
                }
            }
        }

        sig.result_ty()
    }

    /// Infer one argument, pushing an expected function type into lambda
    /// parameters
    fn infer_arg(&mut self, arg: &Expr, expected: Option<&Ty>) -> Ty {
        if let Expr::Lambda(lambda) = arg {
            let expected_sig = expected.and_then(|t| match self.underlying(t) {
                Ty::Func(sig) => Some(sig),
                _ => None,
            });
            let ty = self.infer_lambda(lambda, expected_sig);
            self.types.insert(arg.id(), ty.clone());
            return ty;
        }
        self.infer_expr(arg)
    }

    /// Infer a lambda, optionally against an expected signature
    ///
    /// Untyped parameters adopt the expected parameter types; with no
    /// expectation each untyped parameter is a diagnostic suggesting an
    /// explicit annotation.
    pub(crate) fn infer_lambda(&mut self, lambda: &LambdaExpr, expected: Option<FuncTy>) -> Ty {
        let saved_scope = self.current;
        let saved_ctx = self.return_ctx.clone();
        let saved_loops = self.loop_depth;
        let saved_switches = self.switch_depth;

        self.current = self.scopes.push(saved_scope, ScopeKind::Function);
        self.loop_depth = 0;
        self.switch_depth = 0;

        let mut param_tys = Vec::new();
        for (index, param) in lambda.params.iter().enumerate() {
            let ty = match &param.ty {
                Some(annotation) => self.resolve_type(annotation),
                None => match expected.as_ref().and_then(|sig| sig.params.get(index)) {
                    Some(ty) => ty.clone(),
                    None => {
                        self.error_with_help(
                            Stage::Types,
                            format!("cannot infer type of parameter {}", param.name),
                            param.span,
                            format!(
                                "add an explicit type, e.g. `({} TYPE) => ...`",
                                param.name
                            ),
                        );
                        Ty::Unknown
                    }
                },
            };
            self.define_binding(param.name, ty.clone(), param.span, false);
            param_tys.push(ty);
        }

        self.return_ctx = match &expected {
            Some(sig) => ReturnCtx::Function(sig.results.clone()),
            None => ReturnCtx::Lambda,
        };

        let results = match &lambda.body {
            LambdaBody::Expr(body) => {
                let body_ty = self.infer_expr(body);
                if let Some(sig) = &expected {
                    sig.results.clone()
                } else if matches!(body_ty, Ty::Void) {
                    Vec::new()
                } else {
                    vec![body_ty]
                }
            }
            LambdaBody::Block(block) => {
                for stmt in &block.stmts {
                    self.check_stmt(stmt);
                }
                expected
                    .as_ref()
                    .map(|sig| sig.results.clone())
                    .unwrap_or_default()
            }
        };

        self.current = saved_scope;
        self.return_ctx = saved_ctx;
        self.loop_depth = saved_loops;
        self.switch_depth = saved_switches;

        Ty::Func(FuncTy {
            params: param_tys,
            results,
            variadic: false,
        })
    }

    /// The dedicated typing rules for `print`, `len`, `append`, `min`,
    /// and `max`
    ///
    /// `make`, `close`, `panic`, and `recover` never reach here; they are
    /// keywords with their own expression nodes.
    fn infer_builtin_call(&mut self, name: &str, call: &CallExpr, piped: Option<Ty>) -> Ty {
        // The piped value acts as the first argument.
        let mut arg_tys: Vec<(Ty, Span)> = Vec::new();
        if let Some(ty) = piped {
            arg_tys.push((ty, call.span));
        }
        for arg in &call.args {
            let ty = self.infer_arg(arg, None);
            arg_tys.push((ty, arg.span()));
        }

        match name {
            "print" => Ty::Void,
            "len" => {
                match arg_tys.as_slice() {
                    [(ty, span)] => {
                        let under = self.underlying(ty);
                        if !matches!(under, Ty::List(_) | Ty::Map(_, _) | Ty::Str | Ty::Unknown) {
                            self.error(
                                Stage::Types,
                                format!("'len' needs a list, map, or string, found {ty}"),
                                *span,
                            );
                        }
                    }
                    _ => self.error(
                        Stage::Types,
                        format!("'len' takes one argument, found {}", arg_tys.len()),
                        call.span,
                    ),
                }
                Ty::Int
            }
            "append" => {
                let Some((list_ty, list_span)) = arg_tys.first() else {
                    self.error(Stage::Types, "'append' needs a list argument", call.span);
                    return Ty::Unknown;
                };
                match self.underlying(list_ty) {
                    Ty::List(elem) => {
                        for (ty, span) in &arg_tys[1..] {
                            if !ty.assignable_to(&elem) && !ty.is_unknown() {
                                self.error(
                                    Stage::Types,
                                    format!("cannot append {ty} to a list of {elem}"),
                                    *span,
                                );
                            }
                        }
                        list_ty.clone()
                    }
                    Ty::Unknown => Ty::Unknown,
                    other => {
                        self.error(
                            Stage::Types,
                            format!("'append' needs a list, found {other}"),
                            *list_span,
                        );
                        Ty::Unknown
                    }
                }
            }
            "min" | "max" => {
                if arg_tys.len() < 2 {
                    self.error(
                        Stage::Types,
                        format!("'{name}' needs at least two arguments"),
                        call.span,
                    );
                    return Ty::Unknown;
                }
                let mut common = self.underlying(&arg_tys[0].0);
                for (ty, span) in &arg_tys[1..] {
                    match common.promote(&self.underlying(ty)) {
                        Some(promoted) => common = promoted,
                        None => {
                            self.error(
                                Stage::Types,
                                format!("'{name}' arguments must share a numeric type"),
                                *span,
                            );
                            return Ty::Unknown;
                        }
                    }
                }
                if !common.is_numeric() && !common.is_unknown() {
                    self.error(
                        Stage::Types,
                        format!("'{name}' needs numeric arguments, found {common}"),
                        call.span,
                    );
                    return Ty::Unknown;
                }
                common
            }
            _ => Ty::Unknown,
        }
    }

    fn infer_selector(&mut self, sel: &SelectorExpr) -> Ty {
        // Selecting from an import alias reaches into an opaque module.
        if let Expr::Ident(ident) = sel.object.as_ref() {
            if let Some(id) = self.scopes.lookup(self.current, ident.name) {
                if self.symbols.get(id).kind == SymbolKind::Import {
                    self.used.insert(id);
                    self.resolutions.insert(ident.id, id);
                    self.types.insert(ident.id, Ty::Unknown);
                    return Ty::Unknown;
                }
            }
        }

        let object_ty = self.infer_expr(&sel.object);
        let mut base = self.underlying(&object_ty);
        if let Ty::Ref(inner) = &base {
            base = self.underlying(inner);
        }

        match base {
            Ty::Named(type_name) => {
                if let Some(fields) = self.records.get(&type_name) {
                    if let Some((_, ty, field_id)) =
                        fields.iter().find(|(name, _, _)| *name == sel.field)
                    {
                        let ty = ty.clone();
                        let field_id = *field_id;
                        self.used.insert(field_id);
                        self.resolutions.insert(sel.id, field_id);
                        return ty;
                    }
                }
                self.error(
                    Stage::Types,
                    format!("type '{type_name}' has no field '{}'", sel.field),
                    sel.field_span,
                );
                Ty::Unknown
            }
            Ty::Unknown => Ty::Unknown,
            other => {
                self.error(
                    Stage::Types,
                    format!("type {other} has no fields"),
                    sel.field_span,
                );
                Ty::Unknown
            }
        }
    }

    fn infer_index(&mut self, index: &IndexExpr) -> Ty {
        let object_ty = self.infer_expr(&index.object);
        let index_ty = self.infer_expr(&index.index);

        match self.underlying(&object_ty) {
            Ty::List(elem) => {
                self.check_integer_index(&index_ty, index.index.span());
                *elem
            }
            Ty::Str => {
                self.check_integer_index(&index_ty, index.index.span());
                Ty::Byte
            }
            Ty::Map(key, value) => {
                if !self.expr_assignable(&index.index, &index_ty, &key) {
                    self.error(
                        Stage::Types,
                        format!("map key of type {key} expected, found {index_ty}"),
                        index.index.span(),
                    );
                }
                *value
            }
            Ty::Unknown => Ty::Unknown,
            other => {
                self.error(
                    Stage::Types,
                    format!("cannot index a value of type {other}"),
                    index.object.span(),
                );
                Ty::Unknown
            }
        }
    }

    fn infer_slice(&mut self, slice: &SliceExpr) -> Ty {
        let object_ty = self.infer_expr(&slice.object);
        for bound in [&slice.start, &slice.end].into_iter().flatten() {
            let ty = self.infer_expr(bound);
            self.check_integer_index(&ty, bound.span());
        }
        match self.underlying(&object_ty) {
            Ty::List(_) | Ty::Str | Ty::Unknown => object_ty,
            other => {
                self.error(
                    Stage::Types,
                    format!("cannot slice a value of type {other}"),
                    slice.object.span(),
                );
                Ty::Unknown
            }
        }
    }

    fn check_integer_index(&self, ty: &Ty, span: Span) {
        let under = self.underlying(ty);
        if !under.is_integer() && !under.is_unknown() {
            self.error(
                Stage::Types,
                format!("index must be an integer, found {ty}"),
                span,
            );
        }
    }

    fn infer_struct_lit(&mut self, lit: &StructLitExpr) -> Ty {
        let ty = self.resolve_type(&lit.ty);
        let Ty::Named(type_name) = &ty else {
            for field in &lit.fields {
                self.infer_expr(&field.value);
            }
            return ty;
        };
        let type_name = *type_name;

        let Some(layout) = self.records.get(&type_name).cloned() else {
            self.error(
                Stage::Types,
                format!("'{type_name}' is not a record type"),
                lit.span,
            );
            for field in &lit.fields {
                self.infer_expr(&field.value);
            }
            return Ty::Unknown;
        };

        let mut seen = Vec::new();
        for field in &lit.fields {
            if seen.contains(&field.name) {
                self.error(
                    Stage::Types,
                    format!("field '{}' set twice", field.name),
                    field.span,
                );
            }
            seen.push(field.name);

            let value_ty = self.infer_expr(&field.value);
            match layout.iter().find(|(name, _, _)| *name == field.name) {
                Some((_, want, field_id)) => {
                    self.resolutions.insert(field.value.id(), *field_id);
                    if !self.expr_assignable(&field.value, &value_ty, want) {
                        self.error(
                            Stage::Types,
                            format!(
                                "field '{}' has type {want}, found {value_ty}",
                                field.name
                            ),
                            field.value.span(),
                        );
                    }
                }
                None => {
                    self.error(
                        Stage::Types,
                        format!("type '{type_name}' has no field '{}'", field.name),
                        field.span,
                    );
                }
            }
        }
        ty
    }

    fn infer_list_lit(&mut self, lit: &ListLitExpr) -> Ty {
        let mut elem = Ty::Unknown;
        for value in &lit.elems {
            let ty = self.infer_expr(value);
            if elem.is_unknown() {
                elem = ty;
                continue;
            }
            let unified = self.underlying(&elem).promote(&self.underlying(&ty));
            if let Some(promoted) = unified {
                elem = promoted;
            } else if !self.expr_assignable(value, &ty, &elem) {
                self.error(
                    Stage::Types,
                    format!("list element of type {ty} in a list of {elem}"),
                    value.span(),
                );
            }
        }
        Ty::List(Box::new(elem))
    }

    fn infer_map_lit(&mut self, lit: &MapLitExpr) -> Ty {
        let mut key_ty = Ty::Unknown;
        let mut value_ty = Ty::Unknown;
        for (key, value) in &lit.entries {
            let kt = self.infer_expr(key);
            let vt = self.infer_expr(value);
            if key_ty.is_unknown() {
                key_ty = kt;
            } else if !self.expr_assignable(key, &kt, &key_ty) {
                self.error(
                    Stage::Types,
                    format!("map key of type {kt} in a map keyed by {key_ty}"),
                    key.span(),
                );
            }
            if value_ty.is_unknown() {
                value_ty = vt;
            } else if !self.expr_assignable(value, &vt, &value_ty) {
                self.error(
                    Stage::Types,
                    format!("map value of type {vt} in a map of {value_ty}"),
                    value.span(),
                );
            }
        }
        Ty::Map(Box::new(key_ty), Box::new(value_ty))
    }

    fn infer_make(&mut self, make: &MakeExpr) -> Ty {
        let ty = self.resolve_type(&make.ty);
        if !matches!(
            self.underlying(&ty),
            Ty::List(_) | Ty::Map(_, _) | Ty::Chan(_) | Ty::Unknown
        ) {
            self.error(
                Stage::Types,
                format!("'make' needs a list, map, or channel type, found {ty}"),
                make.span,
            );
        }
        for size in &make.sizes {
            let size_ty = self.infer_expr(size);
            self.check_integer_index(&size_ty, size.span());
        }
        ty
    }

    fn infer_cast(&mut self, cast: &CastExpr) -> Ty {
        let from = self.infer_expr(&cast.expr);
        let to = self.resolve_type(&cast.ty);

        let from_u = self.underlying(&from);
        let to_u = self.underlying(&to);
        let fine = from_u.is_unknown()
            || to_u.is_unknown()
            || from_u == to_u
            || matches!(from_u, Ty::Any)
            || matches!(to_u, Ty::Any)
            || (from_u.is_numeric() && to_u.is_numeric())
            || (from_u == Ty::Str && matches!(&to_u, Ty::List(e) if **e == Ty::Byte))
            || (matches!(&from_u, Ty::List(e) if **e == Ty::Byte) && to_u == Ty::Str);
        if !fine {
            self.error(
                Stage::Types,
                format!("cannot use 'as' to convert {from} to {to}"),
                cast.span,
            );
        }
        to
    }

    /// Assignability with literal adoption
    ///
    /// An integer literal adopts any numeric target, a float literal any
    /// float target, and a bare `empty` adopts everything; beyond that the
    /// structural rule decides on underlying types.
    pub(crate) fn expr_assignable(&self, expr: &Expr, ty: &Ty, expected: &Ty) -> bool {
        let ty_u = self.underlying(ty);
        let expected_u = self.underlying(expected);
        if ty_u.assignable_to(&expected_u) {
            return true;
        }
        match expr {
            Expr::Int(_) => expected_u.is_numeric(),
            Expr::Float(_) => expected_u.is_float(),
            Expr::Unary(unary) if unary.op == UnOp::Neg => {
                self.expr_assignable(&unary.expr, ty, expected)
            }
            Expr::Empty(empty) => empty.ty.is_none(),
            _ => false,
        }
    }
}
