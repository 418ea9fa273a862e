#[derive(Clone, Debug, Default, PartialEq)]
pub struct Program(pub Vec<Stmt>);

/// The statements between a pair of braces, in source order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Block(pub Vec<Stmt>);

#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    Exit(Expr),
    Print(PrintArg),
    Let(String, Expr),
    Assign(String, Expr),
    If(Expr, Block, Option<Block>),
    While(Expr, Block),
    Call(String, Vec<Expr>),
    /// A named procedure with its parameter names. Parsed, but produces no code.
    Processor(String, Vec<String>, Block),
}

#[derive(Clone, Debug, PartialEq)]
pub enum PrintArg {
    Str(String),
    Expr(Expr),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOpKind {
    LogicalOr,
    LogicalAnd,
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    Add,
    Sub,
    Mul,
    Div,
}

impl BinOpKind {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinOpKind::LogicalOr => "||",
            BinOpKind::LogicalAnd => "&&",
            BinOpKind::Equal => "==",
            BinOpKind::NotEqual => "!=",
            BinOpKind::LessThan => "<",
            BinOpKind::LessEqual => "<=",
            BinOpKind::GreaterThan => ">",
            BinOpKind::GreaterEqual => ">=",
            BinOpKind::Add => "+",
            BinOpKind::Sub => "-",
            BinOpKind::Mul => "*",
            BinOpKind::Div => "/",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Num(i32),
    Bool(bool),
    Ident(String),
    Binary(BinOpKind, Box<Expr>, Box<Expr>),
    Unary(UnaryOp, Box<Expr>),
}

impl Expr {
    pub fn binary(kind: BinOpKind, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary(kind, Box::new(lhs), Box::new(rhs))
    }
}
