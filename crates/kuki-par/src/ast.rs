//! AST node definitions.
//!
//! The tree is four closed sum types: [`Decl`], [`Stmt`], [`Expr`], and
//! [`TypeExpr`]. Every node carries the span of the token that introduced
//! it; every expression additionally carries a [`NodeId`] so the semantic
//! analyzer can attach types and resolutions in side tables without
//! back-references into the tree.

use kuki_util::{Name, Span};

/// Identity of an expression node, assigned by the parser
///
/// Ids are dense and start at zero, so side tables can be plain hash maps
/// or vectors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// A parsed source file
#[derive(Debug, Clone)]
pub struct Program {
    /// The `petiole NAME` header, if present
    pub module: Option<ModuleDecl>,
    /// Imports, in source order
    pub imports: Vec<ImportDecl>,
    /// Everything after the imports
    pub decls: Vec<Decl>,
}

/// Module header: `petiole demo`
#[derive(Debug, Clone)]
pub struct ModuleDecl {
    pub name: Name,
    pub span: Span,
}

/// Import: `import strings/builder as sb`
#[derive(Debug, Clone)]
pub struct ImportDecl {
    /// Path segments
    pub path: Vec<Name>,
    /// Optional `as` alias
    pub alias: Option<Name>,
    pub span: Span,
}

/// Top-level declaration
#[derive(Debug, Clone)]
pub enum Decl {
    /// Function or method
    Func(FuncDecl),
    /// Record or alias type
    Type(TypeDecl),
    /// Interface
    Interface(InterfaceDecl),
    /// Top-level `name := value`
    Var(VarDeclStmt),
}

impl Decl {
    /// The span of the declaration's introducing token
    pub fn span(&self) -> Span {
        match self {
            Decl::Func(d) => d.span,
            Decl::Type(d) => d.span,
            Decl::Interface(d) => d.span,
            Decl::Var(d) => d.span,
        }
    }
}

/// Function declaration
///
/// A method is a function with a receiver. Exactly one body block, always.
#[derive(Debug, Clone)]
pub struct FuncDecl {
    pub name: Name,
    /// Documentation attached with `explain`
    pub doc: Option<String>,
    /// Present exactly when this is a method
    pub receiver: Option<Receiver>,
    pub params: Vec<Param>,
    pub returns: Vec<TypeExpr>,
    pub body: Block,
    pub span: Span,
}

/// Method receiver: `(s on Stack)`
#[derive(Debug, Clone)]
pub struct Receiver {
    pub name: Name,
    pub ty: TypeExpr,
    pub span: Span,
}

/// Function parameter
#[derive(Debug, Clone)]
pub struct Param {
    pub name: Name,
    pub ty: TypeExpr,
    /// `many` marker: variadic final parameter
    pub variadic: bool,
    pub span: Span,
}

/// Type declaration: record body or alias
#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub name: Name,
    pub doc: Option<String>,
    pub kind: TypeDeclKind,
    pub span: Span,
}

/// Body of a type declaration
#[derive(Debug, Clone)]
pub enum TypeDeclKind {
    /// `type Point` followed by an indented field block
    Record(Vec<FieldDef>),
    /// `type Celsius float`
    Alias(TypeExpr),
}

/// Record field
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: Name,
    pub ty: TypeExpr,
    pub span: Span,
}

/// Interface declaration: a named set of method signatures
#[derive(Debug, Clone)]
pub struct InterfaceDecl {
    pub name: Name,
    pub doc: Option<String>,
    pub methods: Vec<MethodSig>,
    pub span: Span,
}

/// Method signature inside an interface
#[derive(Debug, Clone)]
pub struct MethodSig {
    pub name: Name,
    pub params: Vec<Param>,
    pub returns: Vec<TypeExpr>,
    pub span: Span,
}

/// An indentation-delimited sequence of statements
#[derive(Debug, Clone)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

// ============================================================================
// STATEMENTS
// ============================================================================

/// Statement
#[derive(Debug, Clone)]
pub enum Stmt {
    /// `names := value`
    VarDecl(VarDeclStmt),
    /// `var name TYPE` - declaration with explicit type and zero value
    VarTyped(VarTypedStmt),
    /// `target = value`
    Assign(AssignStmt),
    /// `return [values]`
    Return(ReturnStmt),
    /// `break`
    Break(Span),
    /// `continue`
    Continue(Span),
    /// `if` / `else if` / `else`
    If(IfStmt),
    /// `switch` with clauses
    Switch(SwitchStmt),
    /// `for x[, y] in expr`
    ForRange(ForRangeStmt),
    /// `for i from a to b` / `for i from a through b`
    ForNumeric(ForNumericStmt),
    /// `for cond` (predicate loop)
    ForCond(ForCondStmt),
    /// `defer call`
    Defer(DeferStmt),
    /// `go call` (a `go` block is wrapped into a zero-argument lambda call)
    Go(GoStmt),
    /// `channel <- value` or `send value to channel`
    Send(SendStmt),
    /// `x++` / `x--`
    IncDec(IncDecStmt),
    /// A bare expression with an observable effect
    Expr(ExprStmt),
    /// An explicit nested block
    Block(Block),
}

impl Stmt {
    /// The span of the statement's introducing token
    pub fn span(&self) -> Span {
        match self {
            Stmt::VarDecl(s) => s.span,
            Stmt::VarTyped(s) => s.span,
            Stmt::Assign(s) => s.span,
            Stmt::Return(s) => s.span,
            Stmt::Break(span) | Stmt::Continue(span) => *span,
            Stmt::If(s) => s.span,
            Stmt::Switch(s) => s.span,
            Stmt::ForRange(s) => s.span,
            Stmt::ForNumeric(s) => s.span,
            Stmt::ForCond(s) => s.span,
            Stmt::Defer(s) => s.span,
            Stmt::Go(s) => s.span,
            Stmt::Send(s) => s.span,
            Stmt::IncDec(s) => s.span,
            Stmt::Expr(s) => s.span,
            Stmt::Block(b) => b.span,
        }
    }
}

/// A name on the left of `:=` or a loop binder
///
/// `discard` is a valid binder that creates no binding.
#[derive(Debug, Clone)]
pub struct BindName {
    pub name: Name,
    /// True for the `discard` placeholder
    pub discard: bool,
    pub span: Span,
}

/// `names := value`, one name per destructured result
#[derive(Debug, Clone)]
pub struct VarDeclStmt {
    pub names: Vec<BindName>,
    pub value: Expr,
    pub span: Span,
}

/// `var name TYPE`
#[derive(Debug, Clone)]
pub struct VarTypedStmt {
    pub name: BindName,
    pub ty: TypeExpr,
    pub span: Span,
}

/// `target = value`
#[derive(Debug, Clone)]
pub struct AssignStmt {
    /// Identifier, index, or selector (validated by the parser)
    pub target: Expr,
    pub value: Expr,
    pub span: Span,
}

/// `return [expr, ...]`
#[derive(Debug, Clone)]
pub struct ReturnStmt {
    pub values: Vec<Expr>,
    pub span: Span,
}

/// `if` statement with optional else-if chain
#[derive(Debug, Clone)]
pub struct IfStmt {
    pub cond: Expr,
    pub then_block: Block,
    pub else_branch: Option<Box<ElseBranch>>,
    pub span: Span,
}

/// What follows `else`
#[derive(Debug, Clone)]
pub enum ElseBranch {
    /// `else if ...`
    ElseIf(IfStmt),
    /// `else` with a plain block
    Else(Block),
}

/// `switch [init ;] [tag]` with clauses
#[derive(Debug, Clone)]
pub struct SwitchStmt {
    /// Optional `name := value ;` initializer
    pub init: Option<VarDeclStmt>,
    /// Tag expression; `None` makes this a tagless boolean switch
    pub tag: Option<Expr>,
    pub clauses: Vec<SwitchClause>,
    /// At most one, always last
    pub default: Option<DefaultClause>,
    pub span: Span,
}

/// `when expr[, expr] BLOCK`
#[derive(Debug, Clone)]
pub struct SwitchClause {
    pub exprs: Vec<Expr>,
    pub body: Block,
    pub span: Span,
}

/// `otherwise BLOCK`
#[derive(Debug, Clone)]
pub struct DefaultClause {
    pub body: Block,
    pub span: Span,
}

/// `for value in xs` / `for i, value in xs`
#[derive(Debug, Clone)]
pub struct ForRangeStmt {
    /// One binder (value) or two (index, value)
    pub binders: Vec<BindName>,
    pub iterable: Expr,
    pub body: Block,
    pub span: Span,
}

/// `for i from a to b` (half-open) / `for i from a through b` (inclusive)
#[derive(Debug, Clone)]
pub struct ForNumericStmt {
    pub binder: BindName,
    pub from: Expr,
    pub to: Expr,
    pub inclusive: bool,
    pub body: Block,
    pub span: Span,
}

/// `for cond` predicate loop
#[derive(Debug, Clone)]
pub struct ForCondStmt {
    pub cond: Expr,
    pub body: Block,
    pub span: Span,
}

/// `defer call`
#[derive(Debug, Clone)]
pub struct DeferStmt {
    pub call: Expr,
    pub span: Span,
}

/// `go call`
#[derive(Debug, Clone)]
pub struct GoStmt {
    pub call: Expr,
    pub span: Span,
}

/// `channel <- value`
#[derive(Debug, Clone)]
pub struct SendStmt {
    pub channel: Expr,
    pub value: Expr,
    pub span: Span,
}

/// `x++` / `x--`
#[derive(Debug, Clone)]
pub struct IncDecStmt {
    pub target: Expr,
    pub increment: bool,
    pub span: Span,
}

/// Expression statement
#[derive(Debug, Clone)]
pub struct ExprStmt {
    pub expr: Expr,
    pub span: Span,
}

// ============================================================================
// EXPRESSIONS
// ============================================================================

/// Expression
#[derive(Debug, Clone)]
pub enum Expr {
    /// Identifier reference
    Ident(IdentExpr),
    /// Integer literal
    Int(LitExpr),
    /// Float literal
    Float(LitExpr),
    /// Rune literal
    Rune(LitExpr),
    /// `true` / `false`
    Bool(BoolExpr),
    /// String literal, possibly interpolated
    Str(StrExpr),
    /// Binary operation
    Binary(BinaryExpr),
    /// Unary prefix operation
    Unary(UnaryExpr),
    /// `left |> call(...)`
    Pipe(PipeExpr),
    /// `primary onerr handler`
    Onerr(OnerrExpr),
    /// `callee(args...)`
    Call(CallExpr),
    /// `receiver.Method(args...)`
    MethodCall(MethodCallExpr),
    /// `object.field`
    Selector(SelectorExpr),
    /// `object[index]`
    Index(IndexExpr),
    /// `object[start:end]`
    Slice(SliceExpr),
    /// `Name{field: value, ...}`
    StructLit(StructLitExpr),
    /// `[a, b, c]`
    ListLit(ListLitExpr),
    /// `{key: value, ...}`
    MapLit(MapLitExpr),
    /// `<-channel` / `receive channel`
    Receive(ReceiveExpr),
    /// `expr as TYPE` (cast or assertion, decided by the analyzer)
    Cast(CastExpr),
    /// `reference expr` (address-of)
    Ref(RefExpr),
    /// `dereference expr`
    Deref(DerefExpr),
    /// `params => expr` / `params =>` block
    Lambda(LambdaExpr),
    /// `empty [TYPE]` zero value
    Empty(EmptyExpr),
    /// `discard` placeholder
    Discard(DiscardExpr),
    /// `error "message"` constructor
    ErrorNew(ErrorNewExpr),
    /// `make(TYPE, sizes...)`
    Make(MakeExpr),
    /// `close(channel)`
    Close(CloseExpr),
    /// `panic(message)`
    Panic(PanicExpr),
    /// `recover()`
    Recover(RecoverExpr),
    /// `this` inside a method body
    This(ThisExpr),
}

impl Expr {
    /// The span of the expression's first token
    pub fn span(&self) -> Span {
        match self {
            Expr::Ident(e) => e.span,
            Expr::Int(e) | Expr::Float(e) | Expr::Rune(e) => e.span,
            Expr::Bool(e) => e.span,
            Expr::Str(e) => e.span,
            Expr::Binary(e) => e.span,
            Expr::Unary(e) => e.span,
            Expr::Pipe(e) => e.span,
            Expr::Onerr(e) => e.span,
            Expr::Call(e) => e.span,
            Expr::MethodCall(e) => e.span,
            Expr::Selector(e) => e.span,
            Expr::Index(e) => e.span,
            Expr::Slice(e) => e.span,
            Expr::StructLit(e) => e.span,
            Expr::ListLit(e) => e.span,
            Expr::MapLit(e) => e.span,
            Expr::Receive(e) => e.span,
            Expr::Cast(e) => e.span,
            Expr::Ref(e) => e.span,
            Expr::Deref(e) => e.span,
            Expr::Lambda(e) => e.span,
            Expr::Empty(e) => e.span,
            Expr::Discard(e) => e.span,
            Expr::ErrorNew(e) => e.span,
            Expr::Make(e) => e.span,
            Expr::Close(e) => e.span,
            Expr::Panic(e) => e.span,
            Expr::Recover(e) => e.span,
            Expr::This(e) => e.span,
        }
    }

    /// The node id
    pub fn id(&self) -> NodeId {
        match self {
            Expr::Ident(e) => e.id,
            Expr::Int(e) | Expr::Float(e) | Expr::Rune(e) => e.id,
            Expr::Bool(e) => e.id,
            Expr::Str(e) => e.id,
            Expr::Binary(e) => e.id,
            Expr::Unary(e) => e.id,
            Expr::Pipe(e) => e.id,
            Expr::Onerr(e) => e.id,
            Expr::Call(e) => e.id,
            Expr::MethodCall(e) => e.id,
            Expr::Selector(e) => e.id,
            Expr::Index(e) => e.id,
            Expr::Slice(e) => e.id,
            Expr::StructLit(e) => e.id,
            Expr::ListLit(e) => e.id,
            Expr::MapLit(e) => e.id,
            Expr::Receive(e) => e.id,
            Expr::Cast(e) => e.id,
            Expr::Ref(e) => e.id,
            Expr::Deref(e) => e.id,
            Expr::Lambda(e) => e.id,
            Expr::Empty(e) => e.id,
            Expr::Discard(e) => e.id,
            Expr::ErrorNew(e) => e.id,
            Expr::Make(e) => e.id,
            Expr::Close(e) => e.id,
            Expr::Panic(e) => e.id,
            Expr::Recover(e) => e.id,
            Expr::This(e) => e.id,
        }
    }

    /// True for forms the right side of a pipe accepts
    pub fn is_callable_for_pipe(&self) -> bool {
        matches!(self, Expr::Call(_) | Expr::MethodCall(_) | Expr::Ident(_))
    }
}

/// Identifier reference
#[derive(Debug, Clone)]
pub struct IdentExpr {
    pub id: NodeId,
    pub name: Name,
    pub span: Span,
}

/// Integer, float, or rune literal; the text is kept verbatim
#[derive(Debug, Clone)]
pub struct LitExpr {
    pub id: NodeId,
    pub text: String,
    pub span: Span,
}

/// Boolean literal
#[derive(Debug, Clone)]
pub struct BoolExpr {
    pub id: NodeId,
    pub value: bool,
    pub span: Span,
}

/// String literal with interpolation parts
///
/// Parts alternate literal text and expressions; empty text parts are
/// valid spacers between adjacent expressions.
#[derive(Debug, Clone)]
pub struct StrExpr {
    pub id: NodeId,
    pub parts: Vec<StringPart>,
    pub span: Span,
}

/// One segment of an interpolated string
#[derive(Debug, Clone)]
pub enum StringPart {
    /// Literal text
    Text(String),
    /// A `{...}` expression segment
    Expr(Box<Expr>),
}

/// Binary operators, word and symbol forms collapsed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitOr,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
}

impl BinOp {
    /// Source-ish spelling for diagnostics
    pub fn as_str(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::BitOr => "|",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::Le => "<=",
            BinOp::Ge => ">=",
            BinOp::And => "and",
            BinOp::Or => "or",
        }
    }

    /// True for `+ - * / % |`
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod | BinOp::BitOr
        )
    }

    /// True for `== !=`
    pub fn is_equality(self) -> bool {
        matches!(self, BinOp::Eq | BinOp::Ne)
    }

    /// True for `< > <= >=`
    pub fn is_ordering(self) -> bool {
        matches!(self, BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge)
    }

    /// True for `and or`
    pub fn is_logical(self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }
}

/// Binary operation
#[derive(Debug, Clone)]
pub struct BinaryExpr {
    pub id: NodeId,
    pub op: BinOp,
    pub op_span: Span,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
    pub span: Span,
}

/// Unary prefix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    /// `-x`
    Neg,
    /// `!x` / `not x`
    Not,
}

/// Unary operation
#[derive(Debug, Clone)]
pub struct UnaryExpr {
    pub id: NodeId,
    pub op: UnOp,
    pub expr: Box<Expr>,
    pub span: Span,
}

/// Pipe: the left value becomes the first argument of the right call
#[derive(Debug, Clone)]
pub struct PipeExpr {
    pub id: NodeId,
    pub left: Box<Expr>,
    /// Always a call, method call, or identifier promoted to a
    /// zero-argument call
    pub right: Box<Expr>,
    pub span: Span,
}

/// Onerr: primary expression plus handler
#[derive(Debug, Clone)]
pub struct OnerrExpr {
    pub id: NodeId,
    pub primary: Box<Expr>,
    pub handler: OnerrHandler,
    pub span: Span,
}

/// The handler of an `onerr` expression
#[derive(Debug, Clone)]
pub enum OnerrHandler {
    /// `onerr return [values]`
    Return(ReturnStmt),
    /// `onerr panic(message)`
    Panic(Box<Expr>),
    /// `onerr discard` - swallow the error
    Discard(Span),
    /// Any other fallback expression
    Expr(Box<Expr>),
}

/// Function call
#[derive(Debug, Clone)]
pub struct CallExpr {
    pub id: NodeId,
    pub callee: Box<Expr>,
    pub args: Vec<Expr>,
    pub span: Span,
}

/// Method call
#[derive(Debug, Clone)]
pub struct MethodCallExpr {
    pub id: NodeId,
    pub receiver: Box<Expr>,
    pub method: Name,
    pub method_span: Span,
    pub args: Vec<Expr>,
    pub span: Span,
}

/// Field selection
#[derive(Debug, Clone)]
pub struct SelectorExpr {
    pub id: NodeId,
    pub object: Box<Expr>,
    pub field: Name,
    pub field_span: Span,
    pub span: Span,
}

/// Indexing
#[derive(Debug, Clone)]
pub struct IndexExpr {
    pub id: NodeId,
    pub object: Box<Expr>,
    pub index: Box<Expr>,
    pub span: Span,
}

/// Slicing; both bounds optional
#[derive(Debug, Clone)]
pub struct SliceExpr {
    pub id: NodeId,
    pub object: Box<Expr>,
    pub start: Option<Box<Expr>>,
    pub end: Option<Box<Expr>>,
    pub span: Span,
}

/// Struct literal with named fields
#[derive(Debug, Clone)]
pub struct StructLitExpr {
    pub id: NodeId,
    /// The named type being constructed
    pub ty: TypeExpr,
    pub fields: Vec<FieldInit>,
    pub span: Span,
}

/// One field initializer in a struct literal
#[derive(Debug, Clone)]
pub struct FieldInit {
    pub name: Name,
    pub value: Expr,
    pub span: Span,
}

/// List literal
#[derive(Debug, Clone)]
pub struct ListLitExpr {
    pub id: NodeId,
    pub elems: Vec<Expr>,
    pub span: Span,
}

/// Map literal
#[derive(Debug, Clone)]
pub struct MapLitExpr {
    pub id: NodeId,
    pub entries: Vec<(Expr, Expr)>,
    pub span: Span,
}

/// Channel receive
#[derive(Debug, Clone)]
pub struct ReceiveExpr {
    pub id: NodeId,
    pub channel: Box<Expr>,
    pub span: Span,
}

/// `expr as TYPE`
#[derive(Debug, Clone)]
pub struct CastExpr {
    pub id: NodeId,
    pub expr: Box<Expr>,
    pub ty: TypeExpr,
    pub span: Span,
}

/// `reference expr`
#[derive(Debug, Clone)]
pub struct RefExpr {
    pub id: NodeId,
    pub expr: Box<Expr>,
    pub span: Span,
}

/// `dereference expr`
#[derive(Debug, Clone)]
pub struct DerefExpr {
    pub id: NodeId,
    pub expr: Box<Expr>,
    pub span: Span,
}

/// Arrow lambda
#[derive(Debug, Clone)]
pub struct LambdaExpr {
    pub id: NodeId,
    pub params: Vec<LambdaParam>,
    pub body: LambdaBody,
    pub span: Span,
}

/// Lambda parameter; the type may be omitted and inferred at the call site
#[derive(Debug, Clone)]
pub struct LambdaParam {
    pub name: Name,
    pub ty: Option<TypeExpr>,
    pub span: Span,
}

/// A lambda has an expression body or a block body, never both
#[derive(Debug, Clone)]
pub enum LambdaBody {
    Expr(Box<Expr>),
    Block(Block),
}

/// `empty [TYPE]`
#[derive(Debug, Clone)]
pub struct EmptyExpr {
    pub id: NodeId,
    pub ty: Option<TypeExpr>,
    pub span: Span,
}

/// `discard`
#[derive(Debug, Clone)]
pub struct DiscardExpr {
    pub id: NodeId,
    pub span: Span,
}

/// `error "message"`
#[derive(Debug, Clone)]
pub struct ErrorNewExpr {
    pub id: NodeId,
    pub message: Box<Expr>,
    pub span: Span,
}

/// `make(TYPE, sizes...)`
#[derive(Debug, Clone)]
pub struct MakeExpr {
    pub id: NodeId,
    pub ty: TypeExpr,
    pub sizes: Vec<Expr>,
    pub span: Span,
}

/// `close(channel)`
#[derive(Debug, Clone)]
pub struct CloseExpr {
    pub id: NodeId,
    pub channel: Box<Expr>,
    pub span: Span,
}

/// `panic(message)`
#[derive(Debug, Clone)]
pub struct PanicExpr {
    pub id: NodeId,
    pub message: Box<Expr>,
    pub span: Span,
}

/// `recover()`
#[derive(Debug, Clone)]
pub struct RecoverExpr {
    pub id: NodeId,
    pub span: Span,
}

/// `this` - the receiver of the enclosing method
#[derive(Debug, Clone)]
pub struct ThisExpr {
    pub id: NodeId,
    pub span: Span,
}

// ============================================================================
// TYPE ANNOTATIONS
// ============================================================================

/// Built-in primitive types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveType {
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Float,
    Float32,
    Float64,
    String,
    Bool,
    Byte,
    Rune,
    Any,
    Error,
}

impl PrimitiveType {
    /// Map a spelled-out primitive name
    pub fn from_str(name: &str) -> Option<Self> {
        use PrimitiveType::*;
        Some(match name {
            "int" => Int,
            "int8" => Int8,
            "int16" => Int16,
            "int32" => Int32,
            "int64" => Int64,
            "float" => Float,
            "float32" => Float32,
            "float64" => Float64,
            "string" => String,
            "bool" => Bool,
            "byte" => Byte,
            "rune" => Rune,
            "any" => Any,
            _ => return None,
        })
    }

    /// Source spelling
    pub fn as_str(self) -> &'static str {
        use PrimitiveType::*;
        match self {
            Int => "int",
            Int8 => "int8",
            Int16 => "int16",
            Int32 => "int32",
            Int64 => "int64",
            Float => "float",
            Float32 => "float32",
            Float64 => "float64",
            String => "string",
            Bool => "bool",
            Byte => "byte",
            Rune => "rune",
            Any => "any",
            Error => "error",
        }
    }
}

/// Type annotation
#[derive(Debug, Clone)]
pub enum TypeExpr {
    /// `int`, `string`, `error`, ...
    Primitive(PrimitiveType, Span),
    /// User-defined name, optionally module-qualified
    Named(NamedType),
    /// `reference to T`
    Reference(Box<TypeExpr>, Span),
    /// `list of T`
    List(Box<TypeExpr>, Span),
    /// `map of K to V`
    Map(Box<TypeExpr>, Box<TypeExpr>, Span),
    /// `channel of T`
    Channel(Box<TypeExpr>, Span),
    /// `func(params) returns`
    Func(FuncType),
    /// `many T` variadic marker (final parameter position only)
    Variadic(Box<TypeExpr>, Span),
}

/// A named (possibly qualified) type
#[derive(Debug, Clone)]
pub struct NamedType {
    /// Qualifying module alias, e.g. `json` in `json.Value`
    pub module: Option<Name>,
    pub name: Name,
    pub span: Span,
}

/// Function type annotation
#[derive(Debug, Clone)]
pub struct FuncType {
    pub params: Vec<TypeExpr>,
    pub returns: Vec<TypeExpr>,
    pub span: Span,
}

impl TypeExpr {
    /// The annotation's span
    pub fn span(&self) -> Span {
        match self {
            TypeExpr::Primitive(_, span) => *span,
            TypeExpr::Named(n) => n.span,
            TypeExpr::Reference(_, span) => *span,
            TypeExpr::List(_, span) => *span,
            TypeExpr::Map(_, _, span) => *span,
            TypeExpr::Channel(_, span) => *span,
            TypeExpr::Func(f) => f.span,
            TypeExpr::Variadic(_, span) => *span,
        }
    }
}
