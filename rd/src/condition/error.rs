//! Condition error types

use thiserror::Error;

/// A condition expression could not be parsed
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyntaxError {
    #[error("Condition is empty")]
    Empty,

    #[error("Unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },

    #[error("Unknown comparator '{op}' at offset {offset}")]
    UnknownComparator { op: String, offset: usize },

    #[error("Unterminated string literal starting at offset {offset}")]
    UnterminatedString { offset: usize },

    #[error("Expected {expected} at offset {offset}, found {found}")]
    Unexpected {
        expected: String,
        found: String,
        offset: usize,
    },

    #[error("Trailing input at offset {offset}: {found}")]
    TrailingInput { found: String, offset: usize },

    #[error("Comparisons cannot be chained (offset {offset})")]
    ChainedComparison { offset: usize },

    #[error("Unknown function '{name}'")]
    UnknownFunction { name: String },

    #[error("Function '{name}' takes {expected} argument(s), got {got}")]
    Arity { name: String, expected: usize, got: usize },
}

/// A parsed condition could not be evaluated against a status
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    #[error("No status available: {0}")]
    StatusUnavailable(String),

    #[error("Cannot compare {left} with {right} using '{op}'")]
    TypeMismatch {
        left: &'static str,
        right: &'static str,
        op: String,
    },

    #[error("Operator '{op}' is not defined for {kind}")]
    UnsupportedOperator { op: String, kind: &'static str },

    #[error("Cannot apply '{op}' to {left} and {right}")]
    Arithmetic {
        left: &'static str,
        right: &'static str,
        op: char,
    },

    #[error("'{value}' is not a valid {expected}")]
    Unparsable { value: String, expected: &'static str },

    #[error("Condition produced {0}, expected a boolean")]
    NotBoolean(&'static str),

    #[error("Timestamp arithmetic overflowed")]
    Overflow,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_mismatch_message() {
        let err = EvaluationError::TypeMismatch {
            left: "string",
            right: "timestamp",
            op: "<".to_string(),
        };

        let msg = err.to_string();
        assert!(msg.contains("string"));
        assert!(msg.contains("timestamp"));
        assert!(msg.contains('<'));
    }

    #[test]
    fn test_unknown_comparator_message() {
        let err = SyntaxError::UnknownComparator {
            op: "=>".to_string(),
            offset: 8,
        };
        assert_eq!(err.to_string(), "Unknown comparator '=>' at offset 8");
    }
}
