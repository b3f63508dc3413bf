//! Query expressions over JSON records
//!
//! This module implements the subset of JMESPath needed to select and filter
//! decoded access-log records. An expression is compiled once and can then be
//! evaluated against any number of values.
//!
//! # Syntax
//!
//! ```text
//! field / "quoted field"      Look up a key on the current object
//! a.b                         Sub-expression
//! [0] [-1] [1:10:2]           Index and slice
//! [*] *                       List and object projections
//! []                          Flatten one level
//! [?predicate]                Keep elements where predicate is truthy
//! == != < <= > >=             Comparisons (ordering only between numbers)
//! && || ! ( )                 Boolean logic and grouping
//! a | b                       Pipe, stops any running projection
//! [a, b] {k: a}               Multi-select list and hash
//! `json` 'raw string' @       Literals and the current node
//! length(@)                   Function call
//! ```
//!
//! # Examples
//!
//! ```text
//! [?elb_status_code > `299`]                         # Failed requests
//! [?starts_with(request, 'POST')].client.ip          # Clients sending POSTs
//! [?backend_processing_time > `1.0`].{t: timestamp, r: request}
//! [*].sent_bytes | sum(@)                            # Bytes sent per batch
//! ```

pub mod ast;
pub mod error;
pub mod eval;
pub mod functions;
pub mod lexer;
pub mod parser;

pub use ast::Ast;
pub use error::{CompileError, EvalError};
pub use functions::Function;

use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// A compiled, reusable query expression
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    expression: String,
    ast: Ast,
}

impl CompiledQuery {
    /// Compile an expression, validating syntax and function signatures
    pub fn compile(expression: &str) -> Result<Self, CompileError> {
        Ok(Self {
            expression: expression.to_string(),
            ast: parser::parse(expression)?,
        })
    }

    /// Evaluate the query against a value
    pub fn search(&self, data: &Value) -> Result<Value, EvalError> {
        eval::evaluate(&self.ast, data)
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn ast(&self) -> &Ast {
        &self.ast
    }
}

impl FromStr for CompiledQuery {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::compile(s)
    }
}

impl fmt::Display for CompiledQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expression)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_compile_once_search_many() {
        let query: CompiledQuery = "[?elb_status_code > `299`].elb".parse().unwrap();

        assert_eq!(
            query.search(&json!([{"elb_status_code": 503, "elb": "a"}])).unwrap(),
            json!(["a"])
        );
        assert_eq!(query.search(&json!([])).unwrap(), json!([]));
        assert_eq!(query.to_string(), "[?elb_status_code > `299`].elb");
    }

    #[test]
    fn test_compile_rejects_bad_syntax() {
        assert!(CompiledQuery::compile("[?").is_err());
    }
}
