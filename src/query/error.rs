use thiserror::Error;

/// Errors raised while compiling a query expression
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("syntax error at position {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("invalid literal at position {position}: {message}")]
    InvalidLiteral { position: usize, message: String },

    #[error("unknown function '{0}()'")]
    UnknownFunction(String),

    #[error("function {name}() takes {expected} argument(s), got {actual}")]
    Arity {
        name: String,
        expected: String,
        actual: usize,
    },
}

/// Errors raised while evaluating a compiled query against a value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("function {name}() expected argument {position} to be {expected}, got {actual}")]
    InvalidType {
        name: String,
        position: usize,
        expected: String,
        actual: String,
    },

    #[error("slice step cannot be 0")]
    ZeroStep,
}
