//! kuki-sem - Semantic analysis for the Kukicha language.
//!
//! The analyzer turns a parsed [`Program`] into a resolved, typed view:
//!
//! 1. A signature-first pass collects every top-level function, method,
//!    type, interface, and import into the root scope before any body is
//!    looked at, so mutual recursion and forward references just work.
//! 2. Each body is then walked to resolve identifiers, infer `:=` binding
//!    types, check type compatibility and call arity, and enforce
//!    control-flow legality (`break`/`continue` placement, return counts,
//!    `defer`/`go` operands).
//!
//! Nothing stops at the first problem: every check reports into the shared
//! [`Handler`] and analysis continues, returning a partial [`Analysis`]
//! alongside whatever diagnostics accumulated.
//!
//! # Examples
//!
//! ```
//! use kuki_lex::tokenize;
//! use kuki_par::parse;
//! use kuki_sem::analyze;
//! use kuki_util::{FileId, Handler};
//!
//! let source = "petiole demo\n\nfunc Add(a int, b int) int\n    return a + b\n";
//! let handler = Handler::new();
//! let tokens = tokenize(source, FileId::DUMMY, &handler);
//! let program = parse(tokens, &handler);
//! let analysis = analyze(&program, &handler);
//!
//! assert!(!handler.has_errors());
//! assert_eq!(analysis.exported_functions().len(), 1);
//! ```

mod edge_cases;
pub mod exports;
mod infer;
pub mod scope;
pub mod table;
pub mod types;

pub use exports::ExportedFunction;
pub use scope::{Scope, ScopeId, ScopeKind, ScopeTree};
pub use table::{is_exported, SymbolId, SymbolInfo, SymbolKind, SymbolTable};
pub use types::{FuncTy, Ty};

use kuki_par::ast::*;
use kuki_util::{Diagnostic, FxHashMap, FxHashSet, Handler, Name, Span, Stage};

/// The analyzer's output: symbol table, scope tree, and per-node side
/// tables
///
/// `types` and `resolutions` are keyed by the parser's [`NodeId`]s; this
/// is the contract code generation consumes.
#[derive(Debug)]
pub struct Analysis {
    pub symbols: SymbolTable,
    pub scopes: ScopeTree,
    /// Inferred type of every expression node
    pub types: FxHashMap<NodeId, Ty>,
    /// Resolved symbol of every identifier, method, and field reference
    pub resolutions: FxHashMap<NodeId, SymbolId>,
    /// The `petiole` module name
    pub module: Option<Name>,
    /// Record layouts: type name to fields
    pub records: FxHashMap<Name, Vec<(Name, Ty, SymbolId)>>,
    /// Interface method sets
    pub interfaces: FxHashMap<Name, Vec<(Name, FuncTy)>>,
}

/// Analyze a parsed program
pub fn analyze(program: &Program, handler: &Handler) -> Analysis {
    let mut analyzer = Analyzer::new(handler);
    analyzer.collect_signatures(program);
    analyzer.check_bodies(program);
    analyzer.finish()
}

/// Where a `return` statement currently lands
#[derive(Clone, Debug)]
pub(crate) enum ReturnCtx {
    /// Top-level code: `return` is illegal
    Outside,
    /// A function body with this declared return list
    Function(Vec<Ty>),
    /// A lambda body whose return list is not declared; arity unchecked
    Lambda,
}

/// The tree walker
pub(crate) struct Analyzer<'a> {
    handler: &'a Handler,
    pub(crate) symbols: SymbolTable,
    pub(crate) scopes: ScopeTree,
    pub(crate) types: FxHashMap<NodeId, Ty>,
    pub(crate) resolutions: FxHashMap<NodeId, SymbolId>,
    pub(crate) records: FxHashMap<Name, Vec<(Name, Ty, SymbolId)>>,
    pub(crate) interfaces: FxHashMap<Name, Vec<(Name, FuncTy)>>,
    pub(crate) aliases: FxHashMap<Name, Ty>,
    /// Methods: (receiver type name, method name) to symbol
    pub(crate) methods: FxHashMap<(Name, Name), SymbolId>,
    module: Option<Name>,
    /// Innermost scope during the walk
    pub(crate) current: ScopeId,
    /// Enclosing loops, for `break`/`continue`
    pub(crate) loop_depth: u32,
    /// Enclosing switch bodies, for `break`
    pub(crate) switch_depth: u32,
    pub(crate) return_ctx: ReturnCtx,
    /// Receiver symbol of the method being checked
    pub(crate) current_receiver: Option<SymbolId>,
    /// Symbols that were read at least once
    pub(crate) used: FxHashSet<SymbolId>,
    /// Locals of the function being checked, for unused warnings
    locals: Vec<SymbolId>,
}

impl<'a> Analyzer<'a> {
    fn new(handler: &'a Handler) -> Self {
        let scopes = ScopeTree::new();
        let current = scopes.root();
        Self {
            handler,
            symbols: SymbolTable::new(),
            scopes,
            types: FxHashMap::default(),
            resolutions: FxHashMap::default(),
            records: FxHashMap::default(),
            interfaces: FxHashMap::default(),
            aliases: FxHashMap::default(),
            methods: FxHashMap::default(),
            module: None,
            current,
            loop_depth: 0,
            switch_depth: 0,
            return_ctx: ReturnCtx::Outside,
            current_receiver: None,
            used: FxHashSet::default(),
            locals: Vec::new(),
        }
    }

    fn finish(self) -> Analysis {
        Analysis {
            symbols: self.symbols,
            scopes: self.scopes,
            types: self.types,
            resolutions: self.resolutions,
            module: self.module,
            records: self.records,
            interfaces: self.interfaces,
        }
    }

    // =========================================================================
    // DIAGNOSTICS
    // =========================================================================

    pub(crate) fn error(&self, stage: Stage, message: impl Into<String>, span: Span) {
        self.handler.emit(Diagnostic::error(stage, message, span));
    }

    pub(crate) fn error_with_help(
        &self,
        stage: Stage,
        message: impl Into<String>,
        span: Span,
        help: impl Into<String>,
    ) {
        self.handler
            .emit(Diagnostic::error(stage, message, span).with_help(help));
    }

    pub(crate) fn warn(&self, stage: Stage, message: impl Into<String>, span: Span) {
        self.handler.emit(Diagnostic::warning(stage, message, span));
    }

    // =========================================================================
    // SIGNATURE-FIRST PASS
    // =========================================================================

    /// Populate the root scope before any body is analyzed
    fn collect_signatures(&mut self, program: &Program) {
        self.seed_builtins();

        if let Some(module) = &program.module {
            self.module = Some(module.name);
            let id = self.symbols.push(SymbolInfo {
                name: module.name,
                kind: SymbolKind::Module,
                ty: Ty::Unknown,
                span: module.span,
                doc: None,
                exported: false,
                receiver: None,
            });
            // The module name itself is not a binding; keep the symbol
            // reachable for tooling without claiming the identifier.
            let _ = id;
        }

        for import in &program.imports {
            let name = import
                .alias
                .unwrap_or_else(|| *import.path.last().expect("import path is non-empty"));
            let id = self.symbols.push(SymbolInfo {
                name,
                kind: SymbolKind::Import,
                ty: Ty::Unknown,
                span: import.span,
                doc: None,
                exported: false,
                receiver: None,
            });
            self.define_root(name, id, import.span);
        }

        // Pass A: claim every type and interface name, so field and
        // signature types can refer to declarations in any order.
        for decl in &program.decls {
            match decl {
                Decl::Type(ty_decl) => {
                    let id = self.symbols.push(SymbolInfo {
                        name: ty_decl.name,
                        kind: SymbolKind::Type,
                        ty: Ty::Named(ty_decl.name),
                        span: ty_decl.span,
                        doc: ty_decl.doc.clone(),
                        exported: is_exported(ty_decl.name),
                        receiver: None,
                    });
                    self.define_root(ty_decl.name, id, ty_decl.span);
                }
                Decl::Interface(iface) => {
                    let id = self.symbols.push(SymbolInfo {
                        name: iface.name,
                        kind: SymbolKind::Interface,
                        ty: Ty::Named(iface.name),
                        span: iface.span,
                        doc: iface.doc.clone(),
                        exported: is_exported(iface.name),
                        receiver: None,
                    });
                    self.define_root(iface.name, id, iface.span);
                }
                _ => {}
            }
        }

        // Pass B: resolve signatures, fields, and method sets.
        for decl in &program.decls {
            match decl {
                Decl::Type(ty_decl) => match &ty_decl.kind {
                    TypeDeclKind::Record(fields) => {
                        let mut layout = Vec::new();
                        for field in fields {
                            let field_ty = self.resolve_type(&field.ty);
                            let field_id = self.symbols.push(SymbolInfo {
                                name: field.name,
                                kind: SymbolKind::Field,
                                ty: field_ty.clone(),
                                span: field.span,
                                doc: None,
                                exported: is_exported(field.name),
                                receiver: Some(Ty::Named(ty_decl.name)),
                            });
                            if layout.iter().any(|(n, _, _)| *n == field.name) {
                                self.error(
                                    Stage::Resolve,
                                    format!("duplicate field '{}'", field.name),
                                    field.span,
                                );
                                continue;
                            }
                            layout.push((field.name, field_ty, field_id));
                        }
                        self.records.insert(ty_decl.name, layout);
                    }
                    TypeDeclKind::Alias(target) => {
                        let resolved = self.resolve_type(target);
                        self.aliases.insert(ty_decl.name, resolved);
                    }
                },
                Decl::Interface(iface) => {
                    let mut methods = Vec::new();
                    for sig in &iface.methods {
                        let func_ty = self.signature_of(&sig.params, &sig.returns);
                        methods.push((sig.name, func_ty));
                    }
                    self.interfaces.insert(iface.name, methods);
                }
                Decl::Func(func) => self.collect_function(func),
                Decl::Var(decl) => {
                    for binder in &decl.names {
                        if binder.discard {
                            continue;
                        }
                        let id = self.symbols.push(SymbolInfo {
                            name: binder.name,
                            kind: SymbolKind::Variable,
                            ty: Ty::Unknown,
                            span: binder.span,
                            doc: None,
                            exported: is_exported(binder.name),
                            receiver: None,
                        });
                        self.define_root(binder.name, id, binder.span);
                    }
                }
            }
        }
    }

    /// Insert the nine predeclared functions
    fn seed_builtins(&mut self) {
        let root = self.scopes.root();
        for (name, sig) in table::builtin_signatures() {
            let name = Name::intern(name);
            let id = self.symbols.push(SymbolInfo {
                name,
                kind: SymbolKind::Builtin,
                ty: Ty::Func(sig),
                span: Span::DUMMY,
                doc: None,
                exported: false,
                receiver: None,
            });
            self.scopes.define(root, name, id);
        }
    }

    /// Define a top-level name, diagnosing collisions and builtin
    /// redefinition
    fn define_root(&mut self, name: Name, id: SymbolId, span: Span) {
        let root = self.scopes.root();
        if let Some(existing) = self.scopes.lookup_local(root, name) {
            if self.symbols.get(existing).kind == SymbolKind::Builtin {
                self.error(
                    Stage::Resolve,
                    format!("cannot redefine built-in '{name}'"),
                    span,
                );
            } else {
                self.error(
                    Stage::Resolve,
                    format!("'{name}' redeclared in this module"),
                    span,
                );
            }
            return;
        }
        self.scopes.define(root, name, id);
    }

    /// Turn parameter and return annotations into a [`FuncTy`]
    fn signature_of(&mut self, params: &[Param], returns: &[TypeExpr]) -> FuncTy {
        let mut param_tys = Vec::new();
        let mut variadic = false;
        for param in params {
            let ty = self.resolve_type(&param.ty);
            if param.variadic {
                variadic = true;
            }
            param_tys.push(ty);
        }
        let results = returns.iter().map(|r| self.resolve_type(r)).collect();
        FuncTy {
            params: param_tys,
            results,
            variadic,
        }
    }

    /// Collect one function or method signature
    fn collect_function(&mut self, func: &FuncDecl) {
        let sig = self.signature_of(&func.params, &func.returns);

        match &func.receiver {
            None => {
                let id = self.symbols.push(SymbolInfo {
                    name: func.name,
                    kind: SymbolKind::Function,
                    ty: Ty::Func(sig),
                    span: func.span,
                    doc: func.doc.clone(),
                    exported: is_exported(func.name),
                    receiver: None,
                });
                self.define_root(func.name, id, func.span);
            }
            Some(receiver) => {
                let receiver_ty = self.resolve_type(&receiver.ty);
                let base = match &receiver_ty {
                    Ty::Named(name) => Some(*name),
                    Ty::Ref(inner) => match inner.as_ref() {
                        Ty::Named(name) => Some(*name),
                        _ => None,
                    },
                    Ty::Unknown => None,
                    _ => None,
                };
                let Some(base) = base else {
                    self.error(
                        Stage::Resolve,
                        format!("invalid receiver type '{receiver_ty}'"),
                        receiver.span,
                    );
                    return;
                };
                let id = self.symbols.push(SymbolInfo {
                    name: func.name,
                    kind: SymbolKind::Method,
                    ty: Ty::Func(sig),
                    span: func.span,
                    doc: func.doc.clone(),
                    exported: is_exported(func.name),
                    receiver: Some(receiver_ty),
                });
                if self.methods.insert((base, func.name), id).is_some() {
                    self.error(
                        Stage::Resolve,
                        format!("method '{}' redeclared on type '{}'", func.name, base),
                        func.span,
                    );
                }
            }
        }
    }

    /// Resolve a surface type annotation into a [`Ty`]
    ///
    /// Unqualified names must be declared types or interfaces; qualified
    /// names belong to imported modules, which this front-end treats as
    /// opaque.
    pub(crate) fn resolve_type(&mut self, ty: &TypeExpr) -> Ty {
        match ty {
            TypeExpr::Primitive(prim, _) => primitive_ty(*prim),
            TypeExpr::Named(named) => {
                if let Some(module) = named.module {
                    // Imported type: recorded, not resolved.
                    let root = self.scopes.root();
                    if self.scopes.lookup_local(root, module).is_none() {
                        self.error(
                            Stage::Resolve,
                            format!("undefined module '{module}'"),
                            named.span,
                        );
                    }
                    return Ty::Unknown;
                }
                let root = self.scopes.root();
                match self.scopes.lookup_local(root, named.name) {
                    Some(id)
                        if matches!(
                            self.symbols.get(id).kind,
                            SymbolKind::Type | SymbolKind::Interface
                        ) =>
                    {
                        self.used.insert(id);
                        Ty::Named(named.name)
                    }
                    _ => {
                        self.error(
                            Stage::Resolve,
                            format!("undefined type '{}'", named.name),
                            named.span,
                        );
                        Ty::Unknown
                    }
                }
            }
            TypeExpr::Reference(inner, _) => Ty::Ref(Box::new(self.resolve_type(inner))),
            TypeExpr::List(elem, _) => Ty::List(Box::new(self.resolve_type(elem))),
            TypeExpr::Map(key, value, _) => Ty::Map(
                Box::new(self.resolve_type(key)),
                Box::new(self.resolve_type(value)),
            ),
            TypeExpr::Channel(elem, _) => Ty::Chan(Box::new(self.resolve_type(elem))),
            TypeExpr::Func(func) => {
                let mut variadic = false;
                let params = func
                    .params
                    .iter()
                    .map(|p| {
                        if matches!(p, TypeExpr::Variadic(_, _)) {
                            variadic = true;
                        }
                        self.resolve_type(p)
                    })
                    .collect();
                let results = func.returns.iter().map(|r| self.resolve_type(r)).collect();
                Ty::Func(FuncTy {
                    params,
                    results,
                    variadic,
                })
            }
            TypeExpr::Variadic(inner, _) => self.resolve_type(inner),
        }
    }

    /// Strip alias chains down to the underlying type
    pub(crate) fn underlying(&self, ty: &Ty) -> Ty {
        let mut current = ty.clone();
        for _ in 0..32 {
            match &current {
                Ty::Named(name) => match self.aliases.get(name) {
                    Some(target) => current = target.clone(),
                    None => return current,
                },
                _ => return current,
            }
        }
        current
    }

    // =========================================================================
    // BODY PASS
    // =========================================================================

    fn check_bodies(&mut self, program: &Program) {
        for decl in &program.decls {
            match decl {
                Decl::Func(func) => self.check_function(func),
                Decl::Var(decl) => self.check_top_var(decl),
                Decl::Type(_) | Decl::Interface(_) => {}
            }
        }
    }

    /// Infer a top-level `:=` declaration and back-fill its symbol types
    fn check_top_var(&mut self, decl: &VarDeclStmt) {
        let tys = self.destructured_types(decl);
        let root = self.scopes.root();
        for (binder, ty) in decl.names.iter().zip(tys) {
            if binder.discard {
                continue;
            }
            if let Some(id) = self.scopes.lookup_local(root, binder.name) {
                if self.symbols.get(id).kind == SymbolKind::Variable {
                    self.symbols.get_mut(id).ty = ty;
                }
            }
        }
    }

    /// Infer the value of `names := value` and split it per binder
    fn destructured_types(&mut self, decl: &VarDeclStmt) -> Vec<Ty> {
        let value_ty = self.infer_expr(&decl.value);
        let n = decl.names.len();
        match self.underlying(&value_ty) {
            Ty::Tuple(items) => {
                if items.len() == n {
                    items
                } else {
                    self.error(
                        Stage::Types,
                        format!("{} names cannot receive {} values", n, items.len()),
                        decl.span,
                    );
                    vec![Ty::Unknown; n]
                }
            }
            Ty::Unknown => vec![Ty::Unknown; n],
            Ty::Void => {
                self.error(
                    Stage::Types,
                    "this call has no value to bind",
                    decl.value.span(),
                );
                vec![Ty::Unknown; n]
            }
            single => {
                if n == 1 {
                    vec![single]
                } else {
                    self.error(
                        Stage::Types,
                        format!("cannot destructure a single value into {n} names"),
                        decl.span,
                    );
                    vec![Ty::Unknown; n]
                }
            }
        }
    }

    /// Check one function or method body
    fn check_function(&mut self, func: &FuncDecl) {
        let saved_scope = self.current;
        let saved_ctx = self.return_ctx.clone();
        let saved_receiver = self.current_receiver;
        let locals_mark = self.locals.len();

        self.current = self.scopes.push(self.scopes.root(), ScopeKind::Function);

        if let Some(receiver) = &func.receiver {
            let ty = self.resolve_type(&receiver.ty);
            let id = self.define_binding(
                receiver.name,
                ty,
                receiver.span,
                false,
            );
            self.current_receiver = Some(id);
        } else {
            self.current_receiver = None;
        }

        for param in &func.params {
            let mut ty = self.resolve_type(&param.ty);
            if param.variadic {
                // A `many T` parameter binds as `list of T` in the body.
                ty = Ty::List(Box::new(ty));
            }
            self.define_binding(param.name, ty, param.span, false);
        }

        let results = func.returns.iter().map(|r| self.resolve_type(r)).collect();
        self.return_ctx = ReturnCtx::Function(results);

        for stmt in &func.body.stmts {
            self.check_stmt(stmt);
        }

        self.warn_unused_locals(locals_mark);
        self.locals.truncate(locals_mark);
        self.current = saved_scope;
        self.return_ctx = saved_ctx;
        self.current_receiver = saved_receiver;
    }

    /// Warn about `:=` locals that were never read
    fn warn_unused_locals(&mut self, mark: usize) {
        for index in mark..self.locals.len() {
            let id = self.locals[index];
            if self.used.contains(&id) {
                continue;
            }
            let info = self.symbols.get(id);
            if info.name.as_str().starts_with('_') {
                continue;
            }
            self.warn(
                Stage::Resolve,
                format!("unused variable '{}'", info.name),
                info.span,
            );
        }
    }

    /// Bind a new variable in the innermost scope
    ///
    /// Redeclaring a name already bound in the same scope is an error;
    /// shadowing an outer binding is allowed but flagged when it hides a
    /// top-level declaration.
    pub(crate) fn define_binding(
        &mut self,
        name: Name,
        ty: Ty,
        span: Span,
        track_unused: bool,
    ) -> SymbolId {
        let root = self.scopes.root();
        if self.scopes.lookup_local(self.current, name).is_some() {
            self.error(
                Stage::Resolve,
                format!("'{name}' redeclared in this scope"),
                span,
            );
        } else if self.current != root {
            if let Some(existing) = self.scopes.lookup_local(root, name) {
                let kind = self.symbols.get(existing).kind;
                if kind == SymbolKind::Builtin {
                    self.error(
                        Stage::Resolve,
                        format!("cannot redefine built-in '{name}'"),
                        span,
                    );
                } else if matches!(
                    kind,
                    SymbolKind::Function | SymbolKind::Type | SymbolKind::Interface
                ) {
                    self.warn(
                        Stage::Resolve,
                        format!("'{name}' shadows the top-level declaration of the same name"),
                        span,
                    );
                }
            }
        }

        let id = self.symbols.push(SymbolInfo {
            name,
            kind: SymbolKind::Variable,
            ty,
            span,
            doc: None,
            exported: false,
            receiver: None,
        });
        self.scopes.define(self.current, name, id);
        if track_unused {
            self.locals.push(id);
        }
        id
    }

    /// Walk a nested block in a child scope
    pub(crate) fn check_block(&mut self, block: &Block, kind: ScopeKind) {
        let saved = self.current;
        self.current = self.scopes.push(saved, kind);
        for stmt in &block.stmts {
            self.check_stmt(stmt);
        }
        self.current = saved;
    }

    /// Check one statement
    pub(crate) fn check_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::VarDecl(decl) => {
                let tys = self.destructured_types(decl);
                for (binder, ty) in decl.names.iter().zip(tys) {
                    if binder.discard {
                        continue;
                    }
                    self.define_binding(binder.name, ty, binder.span, true);
                }
            }
            Stmt::VarTyped(decl) => {
                let ty = self.resolve_type(&decl.ty);
                if !decl.name.discard {
                    self.define_binding(decl.name.name, ty, decl.name.span, true);
                }
            }
            Stmt::Assign(assign) => self.check_assign(assign),
            Stmt::Return(ret) => self.check_return(ret),
            Stmt::Break(span) => {
                if self.loop_depth == 0 && self.switch_depth == 0 {
                    self.error(
                        Stage::Flow,
                        "'break' outside of a loop or switch",
                        *span,
                    );
                }
            }
            Stmt::Continue(span) => {
                if self.loop_depth == 0 && self.switch_depth == 0 {
                    self.error(
                        Stage::Flow,
                        "'continue' outside of a loop or switch",
                        *span,
                    );
                }
            }
            Stmt::If(stmt) => self.check_if(stmt),
            Stmt::Switch(stmt) => self.check_switch(stmt),
            Stmt::ForRange(stmt) => self.check_for_range(stmt),
            Stmt::ForNumeric(stmt) => self.check_for_numeric(stmt),
            Stmt::ForCond(stmt) => {
                let cond_ty = self.infer_expr(&stmt.cond);
                self.check_bool(&cond_ty, stmt.cond.span(), "loop condition");
                self.loop_depth += 1;
                self.check_block(&stmt.body, ScopeKind::Loop);
                self.loop_depth -= 1;
            }
            Stmt::Defer(stmt) => {
                self.require_call(&stmt.call, "defer");
                self.infer_expr(&stmt.call);
            }
            Stmt::Go(stmt) => {
                self.require_call(&stmt.call, "go");
                self.infer_expr(&stmt.call);
            }
            Stmt::Send(stmt) => {
                let chan_ty = self.infer_expr(&stmt.channel);
                let value_ty = self.infer_expr(&stmt.value);
                match self.underlying(&chan_ty) {
                    Ty::Chan(elem) => {
                        if !self.expr_assignable(&stmt.value, &value_ty, &elem) {
                            self.error(
                                Stage::Types,
                                format!("cannot send {value_ty} on a channel of {elem}"),
                                stmt.value.span(),
                            );
                        }
                    }
                    Ty::Unknown => {}
                    other => self.error(
                        Stage::Types,
                        format!("cannot send on a value of type {other}"),
                        stmt.channel.span(),
                    ),
                }
            }
            Stmt::IncDec(stmt) => {
                let ty = self.infer_expr(&stmt.target);
                self.check_assignable_place(&stmt.target);
                if !self.underlying(&ty).is_numeric() && !ty.is_unknown() {
                    let op = if stmt.increment { "++" } else { "--" };
                    self.error(
                        Stage::Types,
                        format!("'{op}' needs a numeric variable, found {ty}"),
                        stmt.target.span(),
                    );
                }
            }
            Stmt::Expr(stmt) => {
                self.infer_expr(&stmt.expr);
            }
            Stmt::Block(block) => self.check_block(block, ScopeKind::Block),
        }
    }

    fn check_assign(&mut self, assign: &AssignStmt) {
        let target_ty = self.infer_expr(&assign.target);
        self.check_assignable_place(&assign.target);
        let value_ty = self.infer_expr(&assign.value);
        if !self.expr_assignable(&assign.value, &value_ty, &target_ty) {
            self.error(
                Stage::Types,
                format!("cannot assign {value_ty} to a target of type {target_ty}"),
                assign.value.span(),
            );
        }
    }

    /// An assignment target must resolve to a mutable binding (or a place
    /// derived from one)
    fn check_assignable_place(&mut self, target: &Expr) {
        if let Expr::Ident(ident) = target {
            if let Some(&id) = self.resolutions.get(&ident.id) {
                let kind = self.symbols.get(id).kind;
                if !matches!(kind, SymbolKind::Variable) {
                    self.error(
                        Stage::Resolve,
                        format!("cannot assign to '{}'", ident.name),
                        ident.span,
                    );
                }
            }
        }
    }

    fn check_return(&mut self, ret: &ReturnStmt) {
        let mut tys: Vec<Ty> = ret.values.iter().map(|v| self.infer_expr(v)).collect();
        // `return f()` forwarding a multi-return call counts per value.
        if tys.len() == 1 {
            if let Ty::Tuple(items) = self.underlying(&tys[0]) {
                tys = items;
            }
        }

        match self.return_ctx.clone() {
            ReturnCtx::Outside => {
                self.error(Stage::Flow, "'return' outside of a function", ret.span);
            }
            ReturnCtx::Lambda => {}
            ReturnCtx::Function(expected) => {
                if tys.len() != expected.len() {
                    self.error(
                        Stage::Types,
                        format!(
                            "this function returns {} value{}, found {}",
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
    }

    fn check_if(&mut self, stmt: &IfStmt) {
        let cond_ty = self.infer_expr(&stmt.cond);
        self.check_bool(&cond_ty, stmt.cond.span(), "if condition");
        self.check_block(&stmt.then_block, ScopeKind::Block);
        match stmt.else_branch.as_deref() {
            Some(ElseBranch::ElseIf(elif)) => self.check_if(elif),
            Some(ElseBranch::Else(block)) => self.check_block(block, ScopeKind::Block),
            None => {}
        }
    }

    fn check_switch(&mut self, stmt: &SwitchStmt) {
        let saved = self.current;
        self.current = self.scopes.push(saved, ScopeKind::Block);

        if let Some(init) = &stmt.init {
            let tys = self.destructured_types(init);
            for (binder, ty) in init.names.iter().zip(tys) {
                if !binder.discard {
                    self.define_binding(binder.name, ty, binder.span, true);
                }
            }
        }

        let tag_ty = stmt.tag.as_ref().map(|tag| self.infer_expr(tag));

        self.switch_depth += 1;
        for clause in &stmt.clauses {
            for expr in &clause.exprs {
                let ty = self.infer_expr(expr);
                match &tag_ty {
                    None => self.check_bool(&ty, expr.span(), "case condition"),
                    Some(tag) => {
                        if !self.underlying(&ty).comparable_with(&self.underlying(tag)) {
                            self.error(
                                Stage::Types,
                                format!("case value of type {ty} does not match the switch tag type {tag}"),
                                expr.span(),
                            );
                        }
                    }
                }
            }
            self.check_block(&clause.body, ScopeKind::Block);
        }
        if let Some(default) = &stmt.default {
            self.check_block(&default.body, ScopeKind::Block);
        }
        self.switch_depth -= 1;

        self.current = saved;
    }

    fn check_for_range(&mut self, stmt: &ForRangeStmt) {
        let iter_ty = self.infer_expr(&stmt.iterable);
        let n = stmt.binders.len();

        let binder_tys: Vec<Ty> = match self.underlying(&iter_ty) {
            Ty::List(elem) => {
                if n == 1 {
                    vec![*elem]
                } else {
                    vec![Ty::Int, *elem]
                }
            }
            Ty::Map(key, value) => {
                if n == 1 {
                    vec![*key]
                } else {
                    vec![*key, *value]
                }
            }
            Ty::Str => {
                if n == 1 {
                    vec![Ty::Rune]
                } else {
                    vec![Ty::Int, Ty::Rune]
                }
            }
            Ty::Chan(elem) => {
                if n == 1 {
                    vec![*elem]
                } else {
                    self.error(
                        Stage::Types,
                        "a channel yields one value per iteration",
                        stmt.span,
                    );
                    vec![*elem, Ty::Unknown]
                }
            }
            Ty::Unknown => vec![Ty::Unknown; n],
            other => {
                self.error(
                    Stage::Types,
                    format!("cannot iterate over a value of type {other}"),
                    stmt.iterable.span(),
                );
                vec![Ty::Unknown; n]
            }
        };

        let saved = self.current;
        self.current = self.scopes.push(saved, ScopeKind::Loop);
        for (binder, ty) in stmt.binders.iter().zip(binder_tys) {
            if !binder.discard {
                self.define_binding(binder.name, ty, binder.span, true);
            }
        }
        self.loop_depth += 1;
        for s in &stmt.body.stmts {
            self.check_stmt(s);
        }
        self.loop_depth -= 1;
        self.current = saved;
    }

    fn check_for_numeric(&mut self, stmt: &ForNumericStmt) {
        let from_ty = self.infer_expr(&stmt.from);
        let to_ty = self.infer_expr(&stmt.to);

        let from_u = self.underlying(&from_ty);
        let to_u = self.underlying(&to_ty);
        let binder_ty = match from_u.promote(&to_u) {
            Some(ty) if ty.is_numeric() || ty.is_unknown() => ty,
            _ => {
                if !from_u.is_unknown() && !to_u.is_unknown() {
                    self.error(
                        Stage::Types,
                        format!("loop bounds must share a numeric type, found {from_ty} and {to_ty}"),
                        stmt.from.span(),
                    );
                }
                Ty::Int
            }
        };

        let saved = self.current;
        self.current = self.scopes.push(saved, ScopeKind::Loop);
        if !stmt.binder.discard {
            self.define_binding(stmt.binder.name, binder_ty, stmt.binder.span, true);
        }
        self.loop_depth += 1;
        for s in &stmt.body.stmts {
            self.check_stmt(s);
        }
        self.loop_depth -= 1;
        self.current = saved;
    }

    /// `defer` and `go` take a call expression; a `go` block was already
    /// wrapped by the parser
    fn require_call(&mut self, expr: &Expr, keyword: &str) {
        if !matches!(expr, Expr::Call(_) | Expr::MethodCall(_)) {
            self.error(
                Stage::Flow,
                format!("'{keyword}' needs a function or method call"),
                expr.span(),
            );
        }
    }

    /// Conditions must be bool
    pub(crate) fn check_bool(&self, ty: &Ty, span: Span, what: &str) {
        if !matches!(self.underlying(ty), Ty::Bool | Ty::Unknown | Ty::Never) {
            self.error(
                Stage::Types,
                format!("{what} must be bool, found {ty}"),
                span,
            );
        }
    }
}

/// Map a surface primitive to its semantic type
fn primitive_ty(prim: PrimitiveType) -> Ty {
    match prim {
        PrimitiveType::Int => Ty::Int,
        PrimitiveType::Int8 => Ty::Int8,
        PrimitiveType::Int16 => Ty::Int16,
        PrimitiveType::Int32 => Ty::Int32,
        PrimitiveType::Int64 => Ty::Int64,
        PrimitiveType::Float => Ty::Float,
        PrimitiveType::Float32 => Ty::Float32,
        PrimitiveType::Float64 => Ty::Float64,
        PrimitiveType::String => Ty::Str,
        PrimitiveType::Bool => Ty::Bool,
        PrimitiveType::Byte => Ty::Byte,
        PrimitiveType::Rune => Ty::Rune,
        PrimitiveType::Any => Ty::Any,
        PrimitiveType::Error => Ty::Error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kuki_lex::tokenize;
    use kuki_util::FileId;

    pub(crate) fn analyze_source(source: &str) -> (Analysis, Handler) {
        let handler = Handler::new();
        let tokens = tokenize(source, FileId::DUMMY, &handler);
        let program = kuki_par::parse(tokens, &handler);
        let analysis = analyze(&program, &handler);
        (analysis, handler)
    }

    #[test]
    fn test_clean_function() {
        let source = "petiole demo\n\nfunc Add(a int, b int) int\n    return a + b\n";
        let (analysis, handler) = analyze_source(source);
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
        assert_eq!(analysis.module.unwrap().as_str(), "demo");
        assert!(analysis
            .symbols
            .iter()
            .any(|(_, s)| s.name.as_str() == "Add" && s.kind == SymbolKind::Function));
    }

    #[test]
    fn test_undefined_identifier() {
        let source = "func F() int\n    return missing\n";
        let (_, handler) = analyze_source(source);
        assert!(handler.has_errors());
        assert!(handler
            .diagnostics()
            .iter()
            .any(|d| d.message.contains("undefined")));
    }

    #[test]
    fn test_forward_reference_is_fine() {
        let source = "func A() int\n    return B()\n\nfunc B() int\n    return 1\n";
        let (_, handler) = analyze_source(source);
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
    }

    #[test]
    fn test_mutual_recursion() {
        let source = "func Even(n int) bool\n    if n == 0\n        return true\n    return Odd(n - 1)\n\nfunc Odd(n int) bool\n    if n == 0\n        return false\n    return Even(n - 1)\n";
        let (_, handler) = analyze_source(source);
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
    }

    #[test]
    fn test_redeclaration_in_same_scope() {
        let source = "func F()\n    x := 1\n    x := 2\n    print(x)\n";
        let (_, handler) = analyze_source(source);
        assert!(handler.has_errors());
        assert!(handler
            .diagnostics()
            .iter()
            .any(|d| d.message.contains("redeclared")));
    }

    #[test]
    fn test_shadowing_inner_scope_allowed_but_top_level_flagged() {
        let source = "func Helper() int\n    return 1\n\nfunc F()\n    if true\n        Helper := 2\n        print(Helper)\n";
        let (_, handler) = analyze_source(source);
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
        assert!(handler
            .diagnostics()
            .iter()
            .any(|d| d.level == kuki_util::Level::Warning && d.message.contains("shadows")));
    }

    #[test]
    fn test_plain_shadowing_not_flagged() {
        let source = "func F()\n    x := 1\n    if x > 0\n        x := 2\n        print(x)\n    print(x)\n";
        let (_, handler) = analyze_source(source);
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
        assert!(!handler
            .diagnostics()
            .iter()
            .any(|d| d.message.contains("shadows")));
    }

    #[test]
    fn test_break_outside_loop() {
        let source = "func F()\n    break\n";
        let (_, handler) = analyze_source(source);
        assert!(handler
            .diagnostics()
            .iter()
            .any(|d| d.stage == Stage::Flow && d.message.contains("'break'")));
    }

    #[test]
    fn test_break_in_loop_and_switch_ok() {
        let source = "func F(xs list of int)\n    for x in xs\n        break\n    switch 1\n        when 1\n            break\n";
        let (_, handler) = analyze_source(source);
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
    }

    #[test]
    fn test_return_count_mismatch() {
        let source = "func Pair() (int, int)\n    return 1\n";
        let (_, handler) = analyze_source(source);
        assert!(handler.has_errors());
        assert!(handler
            .diagnostics()
            .iter()
            .any(|d| d.message.contains("returns 2 values")));
    }

    #[test]
    fn test_return_forwards_multi_value_call() {
        let source = "func Pair() (int, error)\n    return 1, empty\n\nfunc Wrap() (int, error)\n    return Pair()\n";
        let (_, handler) = analyze_source(source);
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
    }

    #[test]
    fn test_lambda_without_context_needs_annotations() {
        // A lambda bound with no call-site signature has nothing to infer
        // its parameter types from.
        let source = "f := x => x\n";
        let (_, handler) = analyze_source(source);
        assert!(handler
            .diagnostics()
            .iter()
            .any(|d| d.message.contains("cannot infer type of parameter x")));
    }

    #[test]
    fn test_defer_requires_call() {
        let source = "func F()\n    defer 42\n";
        let (_, handler) = analyze_source(source);
        assert!(handler
            .diagnostics()
            .iter()
            .any(|d| d.stage == Stage::Flow && d.message.contains("'defer'")));
    }

    #[test]
    fn test_go_block_is_accepted() {
        let source = "func F()\n    go\n        print(1)\n";
        let (_, handler) = analyze_source(source);
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
    }

    #[test]
    fn test_non_boolean_condition() {
        let source = "func F()\n    if 1\n        print(1)\n";
        let (_, handler) = analyze_source(source);
        assert!(handler
            .diagnostics()
            .iter()
            .any(|d| d.message.contains("must be bool")));
    }

    #[test]
    fn test_cannot_redefine_builtin() {
        let source = "func print(x int)\n    return\n";
        let (_, handler) = analyze_source(source);
        assert!(handler
            .diagnostics()
            .iter()
            .any(|d| d.message.contains("built-in")));
    }

    #[test]
    fn test_method_collection() {
        let source = "type Stack\n    items list of int\n\nfunc (s on Stack) Len() int\n    return len(s.items)\n";
        let (analysis, handler) = analyze_source(source);
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
        assert!(analysis
            .symbols
            .iter()
            .any(|(_, s)| s.kind == SymbolKind::Method && s.name.as_str() == "Len"));
    }

    #[test]
    fn test_invalid_receiver() {
        let source = "func (x on int) Bad()\n    return\n";
        let (_, handler) = analyze_source(source);
        assert!(handler
            .diagnostics()
            .iter()
            .any(|d| d.message.contains("invalid receiver")));
    }

    #[test]
    fn test_unused_variable_warning() {
        let source = "func F()\n    x := 1\n";
        let (_, handler) = analyze_source(source);
        assert!(!handler.has_errors());
        assert!(handler
            .diagnostics()
            .iter()
            .any(|d| d.message.contains("unused variable 'x'")));
    }

    #[test]
    fn test_discard_never_warns() {
        let source = "func F() (int, error)\n    return 1, empty\n\nfunc G()\n    discard, err := F()\n    print(err)\n";
        let (_, handler) = analyze_source(source);
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
        assert!(!handler
            .diagnostics()
            .iter()
            .any(|d| d.message.contains("unused")));
    }

    #[test]
    fn test_analysis_is_idempotent() {
        let source = "petiole demo\n\nfunc F(a int) int\n    b := a * 2\n    return b\n";
        let handler = Handler::new();
        let tokens = tokenize(source, FileId::DUMMY, &handler);
        let program = kuki_par::parse(tokens, &handler);

        let h1 = Handler::new();
        let first = analyze(&program, &h1);
        let h2 = Handler::new();
        let second = analyze(&program, &h2);

        assert_eq!(h1.diagnostics().len(), h2.diagnostics().len());
        assert_eq!(first.types.len(), second.types.len());
        assert_eq!(first.resolutions.len(), second.resolutions.len());
        for (node, ty) in &first.types {
            assert_eq!(second.types.get(node), Some(ty));
        }
    }
}
