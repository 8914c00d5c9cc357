//! Owned expression tree for user-written getters and defaults.
//!
//! Lowered once from the syntax tree when a class is synthesized, so the
//! evaluator never touches parser state.

use super::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
    TypeOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    StrictEq,
    StrictNe,
    LooseEq,
    LooseNe,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    pub fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "+" => Self::Add,
            "-" => Self::Sub,
            "*" => Self::Mul,
            "/" => Self::Div,
            "%" => Self::Rem,
            "===" => Self::StrictEq,
            "!==" => Self::StrictNe,
            "==" => Self::LooseEq,
            "!=" => Self::LooseNe,
            "<" => Self::Lt,
            "<=" => Self::Le,
            ">" => Self::Gt,
            ">=" => Self::Ge,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Nullish,
}

impl LogicalOp {
    pub fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "&&" => Self::And,
            "||" => Self::Or,
            "??" => Self::Nullish,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    /// `quasis.len() == exprs.len() + 1`
    Template {
        quasis: Vec<String>,
        exprs: Vec<Expr>,
    },
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
    This,
    Ident(String),
    Member {
        object: Box<Expr>,
        property: String,
        optional: bool,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Unary {
        op: UnaryOp,
        arg: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    /// A construct outside the supported subset; fails only when evaluated.
    Unsupported(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Let { name: String, init: Option<Expr> },
    Expr(Expr),
    Return(Option<Expr>),
    If {
        test: Expr,
        consequent: Vec<Stmt>,
        alternate: Option<Vec<Stmt>>,
    },
    Block(Vec<Stmt>),
    Empty,
    Unsupported(String),
}

/// A zero-argument function body (getter, `default()` factory, method)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FunctionBody {
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
}

impl FunctionBody {
    /// Arrow function with an expression body
    pub fn returning(expr: Expr) -> Self {
        Self {
            params: Vec::new(),
            body: vec![Stmt::Return(Some(expr))],
        }
    }
}
