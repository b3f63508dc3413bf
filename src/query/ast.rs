use super::functions::Function;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Parsed query expression
#[derive(Debug, Clone, PartialEq)]
pub enum Ast {
    /// `@`, the current node
    Identity,
    Field(String),
    Subexpr(Box<Ast>, Box<Ast>),
    Index(i64),
    Slice {
        start: Option<i64>,
        stop: Option<i64>,
        step: Option<i64>,
    },
    /// Evaluate `rhs` against every element of the array `lhs` yields
    Projection { lhs: Box<Ast>, rhs: Box<Ast> },
    /// Evaluate `rhs` against every value of the object `lhs` yields
    ObjectProjection { lhs: Box<Ast>, rhs: Box<Ast> },
    Flatten(Box<Ast>),
    FilterProjection {
        lhs: Box<Ast>,
        predicate: Box<Ast>,
        rhs: Box<Ast>,
    },
    Comparison {
        op: Comparator,
        lhs: Box<Ast>,
        rhs: Box<Ast>,
    },
    And(Box<Ast>, Box<Ast>),
    Or(Box<Ast>, Box<Ast>),
    Not(Box<Ast>),
    Pipe(Box<Ast>, Box<Ast>),
    MultiList(Vec<Ast>),
    MultiHash(Vec<(String, Ast)>),
    Literal(Value),
    Call { function: Function, args: Vec<Ast> },
}
