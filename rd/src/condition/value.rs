//! Runtime values and the operand typing policy
//!
//! Raw operands (the watcher status, bare words) are typed in order of
//! precedence: strict timestamp, then number, then string.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, TimeDelta, TimeZone};

use super::error::EvaluationError;

/// Naive datetime layouts accepted by strict timestamp parsing
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// A typed value produced while evaluating a condition
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Number(f64),
    Text(String),
    Timestamp(DateTime<FixedOffset>),
    Duration(TimeDelta),
}

impl Value {
    /// Type a raw operand: timestamp, then number, then string
    pub fn resolve(raw: &str) -> Self {
        let raw = raw.trim();
        if let Some(ts) = parse_timestamp(raw) {
            return Value::Timestamp(ts);
        }
        if let Some(n) = parse_number(raw) {
            return Value::Number(n);
        }
        Value::Text(raw.to_string())
    }

    /// Human-readable type name used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Text(_) => "string",
            Value::Timestamp(_) => "timestamp",
            Value::Duration(_) => "duration",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{}", s),
            Value::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
            Value::Duration(d) => write!(f, "{}s", d.num_seconds()),
        }
    }
}

/// Parse a timestamp under strict rules
///
/// Only complete dates are accepted; digit-only strings are never timestamps.
/// Values without an offset are interpreted in local time.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() || raw.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts);
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return local_timestamp(naive);
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .and_then(local_timestamp)
}

fn local_timestamp(naive: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|ts| ts.fixed_offset())
}

/// Parse a numeric literal: digits with an optional sign and fractional part
pub fn parse_number(raw: &str) -> Option<f64> {
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    let mut parts = digits.splitn(2, '.');
    let whole = parts.next()?;
    let valid_whole = !whole.is_empty() && whole.chars().all(|c| c.is_ascii_digit());
    let valid_frac = parts
        .next()
        .map(|frac| !frac.is_empty() && frac.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or(true);

    if valid_whole && valid_frac { raw.parse().ok() } else { None }
}

/// Comparison operators supported by the condition language
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
}

impl Comparator {
    /// Parse a comparator symbol
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "<" => Some(Comparator::Lt),
            ">" => Some(Comparator::Gt),
            "<=" => Some(Comparator::Le),
            ">=" => Some(Comparator::Ge),
            "==" => Some(Comparator::Eq),
            "!=" => Some(Comparator::Ne),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Comparator::Lt => "<",
            Comparator::Gt => ">",
            Comparator::Le => "<=",
            Comparator::Ge => ">=",
            Comparator::Eq => "==",
            Comparator::Ne => "!=",
        }
    }

    fn holds(&self, ordering: Ordering) -> bool {
        match self {
            Comparator::Lt => ordering == Ordering::Less,
            Comparator::Gt => ordering == Ordering::Greater,
            Comparator::Le => ordering != Ordering::Greater,
            Comparator::Ge => ordering != Ordering::Less,
            Comparator::Eq => ordering == Ordering::Equal,
            Comparator::Ne => ordering != Ordering::Equal,
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Compare two values of the same type
pub fn compare(left: &Value, op: Comparator, right: &Value) -> Result<bool, EvaluationError> {
    let ordering = match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
        (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
        (Value::Duration(a), Value::Duration(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => {
            return match op {
                Comparator::Eq => Ok(a == b),
                Comparator::Ne => Ok(a != b),
                _ => Err(EvaluationError::UnsupportedOperator {
                    op: op.symbol().to_string(),
                    kind: "boolean",
                }),
            };
        }
        _ => None,
    };

    ordering.map(|o| op.holds(o)).ok_or_else(|| EvaluationError::TypeMismatch {
        left: left.kind(),
        right: right.kind(),
        op: op.symbol().to_string(),
    })
}
