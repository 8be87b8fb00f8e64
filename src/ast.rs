use crate::error::Span;
use crate::value::Value;
use std::rc::Rc;

/// Top-level statements of one compiled source text. Built once per compile
/// and only ever read by the evaluator.
#[derive(Debug, Clone)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Expression {
        expr: Expr,
        span: Span,
    },
    Print {
        expr: Expr,
        newline: bool,
        span: Span,
    },
    /// `da5l(prompt);` in statement position; the line read is discarded.
    Input {
        keyword: String,
        prompt: Option<Expr>,
        span: Span,
    },
    /// `name = value;` as a whole statement.
    Assign {
        name: String,
        value: Expr,
        span: Span,
    },
    Block {
        statements: Vec<Stmt>,
        span: Span,
    },
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
        span: Span,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
        span: Span,
    },
    Function(Rc<FunctionDecl>),
    Return {
        value: Option<Expr>,
        span: Span,
    },
}

impl Stmt {
    pub fn span(&self) -> &Span {
        match self {
            Stmt::Expression { span, .. } => span,
            Stmt::Print { span, .. } => span,
            Stmt::Input { span, .. } => span,
            Stmt::Assign { span, .. } => span,
            Stmt::Block { span, .. } => span,
            Stmt::If { span, .. } => span,
            Stmt::While { span, .. } => span,
            Stmt::Function(decl) => &decl.span,
            Stmt::Return { span, .. } => span,
        }
    }

    pub fn line(&self) -> usize {
        self.span().line
    }
}

/// A named function. Shared between the tree and every closure created from it.
#[derive(Debug)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Literal {
        value: Value,
        span: Span,
    },
    Variable {
        name: String,
        span: Span,
    },
    Assign {
        name: String,
        value: Box<Expr>,
        span: Span,
    },
    Binary {
        left: Box<Expr>,
        operator: BinaryOp,
        right: Box<Expr>,
        span: Span,
    },
    Logical {
        left: Box<Expr>,
        operator: LogicalOp,
        right: Box<Expr>,
        span: Span,
    },
    Unary {
        operator: UnaryOp,
        operand: Box<Expr>,
        span: Span,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        span: Span,
    },
    Grouping {
        expr: Box<Expr>,
        span: Span,
    },
    Array {
        elements: Vec<Expr>,
        span: Span,
    },
    /// `object.name` or `object[index]`.
    Get {
        object: Box<Expr>,
        key: Accessor,
        span: Span,
    },
    /// `object.name = value` or `object[index] = value`.
    Set {
        object: Box<Expr>,
        key: Accessor,
        value: Box<Expr>,
        span: Span,
    },
}

#[derive(Debug, Clone)]
pub enum Accessor {
    Property(String),
    Index(Box<Expr>),
}

impl Expr {
    pub fn span(&self) -> &Span {
        match self {
            Expr::Literal { span, .. } => span,
            Expr::Variable { span, .. } => span,
            Expr::Assign { span, .. } => span,
            Expr::Binary { span, .. } => span,
            Expr::Logical { span, .. } => span,
            Expr::Unary { span, .. } => span,
            Expr::Call { span, .. } => span,
            Expr::Grouping { span, .. } => span,
            Expr::Array { span, .. } => span,
            Expr::Get { span, .. } => span,
            Expr::Set { span, .. } => span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}
