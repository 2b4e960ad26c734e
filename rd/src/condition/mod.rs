//! Sandboxed condition language
//!
//! A condition is a small boolean expression over the watcher status and the
//! current time, for example:
//!
//! ```text
//! $status > 5
//! $status == open and now > date("2024-06-01")
//! $status < now - 15m
//! ```
//!
//! Operands are typed by precedence: a strict timestamp, then a number, then
//! a string. Comparing values of different types is an evaluation error.
//! The only names in scope are `$status` (or `status`), `now`, and the pure
//! helpers `date`, `seconds`, `minutes`, `hours`, `days`, `number` and `string`.

mod error;
mod eval;
mod lexer;
mod parser;
mod value;

use std::fmt;

use chrono::{DateTime, FixedOffset};
use tracing::debug;

pub use error::{EvaluationError, SyntaxError};
pub use value::{Comparator, Value, parse_timestamp};

use eval::Scope;
use parser::Expr;

/// A parsed, ready-to-evaluate condition
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    source: String,
    expr: Expr,
}

impl Condition {
    /// Parse a condition expression
    pub fn parse(source: &str) -> Result<Self, SyntaxError> {
        debug!(%source, "Condition::parse: called");
        if source.trim().is_empty() {
            return Err(SyntaxError::Empty);
        }

        let tokens = lexer::tokenize(source)?;
        let expr = parser::parse(&tokens, source.len())?;
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    /// The original expression text
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate against a status value (None when no status is available)
    pub fn evaluate(&self, status: Option<&str>, now: DateTime<FixedOffset>) -> Result<bool, EvaluationError> {
        let scope = Scope { status, now };
        let result = eval::evaluate(&self.expr, &scope).and_then(eval::truth);
        debug!(condition = %self.source, ?status, ?result, "Condition::evaluate: done");
        result
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
