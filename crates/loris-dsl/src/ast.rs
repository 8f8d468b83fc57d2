use num::{BigInt, BigRational};

/// Source span for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// A spanned AST node.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// Top-level program = the sequence of declarations, in source order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub decls: Vec<Spanned<Decl>>,
}

/// A top-level declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    Type(TypeDecl),
    Const(ConstDecl),
    Node(NodeDecl),
}

/// Type declaration. `def = None` declares a free (abstract) type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDecl {
    pub name: String,
    pub def: Option<TypeExpr>,
    pub span: Span,
}

/// Constant declaration.
///
/// All three surface forms are covered: typed with a value, untyped with a
/// value (the type is inferred), and free (typed, no value).
#[derive(Debug, Clone, PartialEq)]
pub struct ConstDecl {
    pub name: String,
    pub ty: Option<TypeExpr>,
    pub value: Option<Expr>,
    pub span: Span,
}

/// Node declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDecl {
    pub name: String,
    /// Static parameters. Parametric nodes are rejected by the elaborator,
    /// so this must be empty.
    pub static_params: Vec<Spanned<String>>,
    pub inputs: Vec<VarGroup>,
    pub outputs: Vec<VarGroup>,
    pub contract: Contract,
    pub locals: Vec<LocalDecl>,
    pub body: Vec<Spanned<Statement>>,
}

/// Assume/guarantee contract attached to a node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Contract {
    pub requires: Vec<Expr>,
    pub ensures: Vec<Expr>,
}

/// A group of variables sharing one declared type, e.g. `x, y: int`.
#[derive(Debug, Clone, PartialEq)]
pub struct VarGroup {
    pub names: Vec<Spanned<String>>,
    pub ty: TypeExpr,
    pub is_const: bool,
    /// `Some` when the declaration carries a clock annotation. Only the base
    /// clock is supported, so a clocked declaration is rejected.
    pub clock: Option<Spanned<String>>,
    pub span: Span,
}

/// Local declaration inside a node: a variable group or a local constant.
#[derive(Debug, Clone, PartialEq)]
pub enum LocalDecl {
    Var(VarGroup),
    Const(ConstDecl),
}

/// Body statement of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `lhs, ... = e;`
    Equation {
        targets: Vec<Spanned<String>>,
        rhs: Expr,
    },
    Assert(Expr),
    /// Property annotation, optionally named.
    Property {
        name: Option<String>,
        expr: Expr,
    },
    /// Marks the node as the verification entry point.
    Main,
}

/// Source type expression.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    Bool,
    Int,
    Real,
    /// `subrange [low, high] of int`; both bounds must be constant integers.
    IntRange { low: Box<Expr>, high: Box<Expr> },
    Enum(Vec<Spanned<String>>),
    /// Reference to a declared (alias or free) type.
    Named(Spanned<String>),
    Record(Vec<RecordField>),
    Tuple(Vec<TypeExpr>),
    /// `elem ^ size`; the size must be a positive constant integer.
    Array { elem: Box<TypeExpr>, size: Box<Expr> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordField {
    pub name: Spanned<String>,
    pub ty: TypeExpr,
}

/// A spanned expression.
pub type Expr = Spanned<ExprKind>;

/// Expression forms.
///
/// The trailing group of variants covers operators the language grammar
/// admits but the elaborator rejects (`fby`, clock operators, slices,
/// concatenation, one-hot, recursive `with`, parametric instantiation).
/// Keeping them in the AST lets the rejection carry the exact source span.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    BoolLit(bool),
    IntLit(BigInt),
    RealLit(BigRational),
    Ident(String),
    /// `e.field`
    RecordProj {
        record: Box<Expr>,
        field: Spanned<String>,
    },
    /// `e[i]` with a constant index.
    IndexProj {
        target: Box<Expr>,
        index: Box<Expr>,
    },
    ToInt(Box<Expr>),
    ToReal(Box<Expr>),
    /// Parenthesized expression list; nested lists flatten into one tuple.
    List(Vec<Expr>),
    /// Explicit tuple constructor.
    Tuple(Vec<Expr>),
    /// `[e ; n]`
    ArrayInit {
        elem: Box<Expr>,
        size: Box<Expr>,
    },
    /// `T { field = e; ... }`
    RecordCtor {
        name: Spanned<String>,
        fields: Vec<(Spanned<String>, Expr)>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Ite {
        cond: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
    Pre(Box<Expr>),
    /// `a -> b`
    Arrow {
        init: Box<Expr>,
        step: Box<Expr>,
    },
    Call {
        node: Spanned<String>,
        args: Vec<Expr>,
    },
    /// `condact(c, f(args), defaults)`
    Condact {
        clock: Box<Expr>,
        node: Spanned<String>,
        args: Vec<Expr>,
        defaults: Vec<Expr>,
    },

    Fby(Vec<Expr>),
    When {
        expr: Box<Expr>,
        clock: Box<Expr>,
    },
    Current(Box<Expr>),
    ArraySlice {
        target: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
    },
    ArrayConcat {
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    OneHot(Vec<Expr>),
    With {
        cond: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
    ParametricCall {
        node: Spanned<String>,
        static_args: Vec<Expr>,
        args: Vec<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl std::fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnaryOp::Neg => write!(f, "-"),
            UnaryOp::Not => write!(f, "not"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Xor,
    Implies,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl std::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinaryOp::Add => write!(f, "+"),
            BinaryOp::Sub => write!(f, "-"),
            BinaryOp::Mul => write!(f, "*"),
            BinaryOp::Div => write!(f, "div"),
            BinaryOp::Mod => write!(f, "mod"),
            BinaryOp::And => write!(f, "and"),
            BinaryOp::Or => write!(f, "or"),
            BinaryOp::Xor => write!(f, "xor"),
            BinaryOp::Implies => write!(f, "=>"),
            BinaryOp::Eq => write!(f, "="),
            BinaryOp::Ne => write!(f, "<>"),
            BinaryOp::Lt => write!(f, "<"),
            BinaryOp::Le => write!(f, "<="),
            BinaryOp::Gt => write!(f, ">"),
            BinaryOp::Ge => write!(f, ">="),
        }
    }
}
