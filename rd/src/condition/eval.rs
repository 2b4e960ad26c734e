//! Evaluation of a parsed condition against a status and the current time

use chrono::{DateTime, FixedOffset, TimeDelta};

use super::error::EvaluationError;
use super::parser::{ArithOp, Expr, Function};
use super::value::{Value, compare, parse_number, parse_timestamp};

/// Names visible to a condition: the status and the current time, nothing else
#[derive(Debug, Clone)]
pub struct Scope<'a> {
    pub status: Option<&'a str>,
    pub now: DateTime<FixedOffset>,
}

pub fn evaluate(expr: &Expr, scope: &Scope<'_>) -> Result<Value, EvaluationError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Status => scope
            .status
            .map(Value::resolve)
            .ok_or_else(|| EvaluationError::StatusUnavailable("watcher returned no status".to_string())),
        Expr::Now => Ok(Value::Timestamp(scope.now)),
        Expr::Not(inner) => Ok(Value::Bool(!truth(evaluate(inner, scope)?)?)),
        Expr::And(left, right) => {
            if !truth(evaluate(left, scope)?)? {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(truth(evaluate(right, scope)?)?))
        }
        Expr::Or(left, right) => {
            if truth(evaluate(left, scope)?)? {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(truth(evaluate(right, scope)?)?))
        }
        Expr::Compare(left, op, right) => {
            let left = evaluate(left, scope)?;
            let right = evaluate(right, scope)?;
            compare(&left, *op, &right).map(Value::Bool)
        }
        Expr::Arith(left, op, right) => {
            let left = evaluate(left, scope)?;
            let right = evaluate(right, scope)?;
            arith(left, *op, right)
        }
        Expr::Call(function, args) => {
            let args = args
                .iter()
                .map(|arg| evaluate(arg, scope))
                .collect::<Result<Vec<_>, _>>()?;
            call(*function, args, scope)
        }
    }
}

/// Require a boolean
pub fn truth(value: Value) -> Result<bool, EvaluationError> {
    match value {
        Value::Bool(b) => Ok(b),
        other => Err(EvaluationError::NotBoolean(other.kind())),
    }
}

fn arith(left: Value, op: ArithOp, right: Value) -> Result<Value, EvaluationError> {
    let mismatch = |left: &Value, right: &Value| EvaluationError::Arithmetic {
        left: left.kind(),
        right: right.kind(),
        op: op.symbol(),
    };

    match (&left, op, &right) {
        (Value::Number(a), ArithOp::Add, Value::Number(b)) => Ok(Value::Number(a + b)),
        (Value::Number(a), ArithOp::Sub, Value::Number(b)) => Ok(Value::Number(a - b)),
        (Value::Timestamp(ts), ArithOp::Add, Value::Duration(d)) | (Value::Duration(d), ArithOp::Add, Value::Timestamp(ts)) => ts
            .checked_add_signed(*d)
            .map(Value::Timestamp)
            .ok_or(EvaluationError::Overflow),
        (Value::Timestamp(ts), ArithOp::Sub, Value::Duration(d)) => ts
            .checked_sub_signed(*d)
            .map(Value::Timestamp)
            .ok_or(EvaluationError::Overflow),
        (Value::Timestamp(a), ArithOp::Sub, Value::Timestamp(b)) => Ok(Value::Duration(a.signed_duration_since(*b))),
        (Value::Duration(a), ArithOp::Add, Value::Duration(b)) => {
            a.checked_add(b).map(Value::Duration).ok_or(EvaluationError::Overflow)
        }
        (Value::Duration(a), ArithOp::Sub, Value::Duration(b)) => {
            a.checked_sub(b).map(Value::Duration).ok_or(EvaluationError::Overflow)
        }
        _ => Err(mismatch(&left, &right)),
    }
}

fn call(function: Function, mut args: Vec<Value>, scope: &Scope<'_>) -> Result<Value, EvaluationError> {
    if function == Function::Now {
        return Ok(Value::Timestamp(scope.now));
    }

    // arity is checked by the parser
    let Some(arg) = args.pop() else {
        return Err(EvaluationError::Unparsable {
            value: String::new(),
            expected: "argument",
        });
    };

    match function {
        Function::Now => Ok(Value::Timestamp(scope.now)),
        Function::Date => match arg {
            Value::Timestamp(ts) => Ok(Value::Timestamp(ts)),
            other => {
                let raw = other.to_string();
                parse_timestamp(&raw)
                    .map(Value::Timestamp)
                    .ok_or(EvaluationError::Unparsable {
                        value: raw,
                        expected: "timestamp",
                    })
            }
        },
        Function::Seconds => duration(arg, 1_000.0),
        Function::Minutes => duration(arg, 60_000.0),
        Function::Hours => duration(arg, 3_600_000.0),
        Function::Days => duration(arg, 86_400_000.0),
        Function::Number => match arg {
            Value::Number(n) => Ok(Value::Number(n)),
            Value::Text(ref s) => parse_number(s).map(Value::Number).ok_or(EvaluationError::Unparsable {
                value: s.clone(),
                expected: "number",
            }),
            other => Err(EvaluationError::Unparsable {
                value: other.to_string(),
                expected: "number",
            }),
        },
        Function::String => Ok(Value::Text(arg.to_string())),
    }
}

fn duration(arg: Value, millis_per_unit: f64) -> Result<Value, EvaluationError> {
    let Value::Number(n) = arg else {
        return Err(EvaluationError::Unparsable {
            value: arg.to_string(),
            expected: "number",
        });
    };

    let millis = n * millis_per_unit;
    if !millis.is_finite() || millis.abs() > i64::MAX as f64 {
        return Err(EvaluationError::Overflow);
    }
    TimeDelta::try_milliseconds(millis as i64)
        .map(Value::Duration)
        .ok_or(EvaluationError::Overflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn scope(status: Option<&str>) -> Scope<'_> {
        let now = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 6, 1, 12, 0, 0)
            .unwrap();
        Scope { status, now }
    }

    #[test]
    fn test_status_unavailable() {
        let err = evaluate(&Expr::Status, &scope(None)).unwrap_err();
        assert!(matches!(err, EvaluationError::StatusUnavailable(_)));
    }

    #[test]
    fn test_timestamp_minus_duration() {
        let value = arith(
            Value::resolve("2024-06-01T12:00:00Z"),
            ArithOp::Sub,
            Value::Duration(TimeDelta::hours(1)),
        )
        .unwrap();
        assert_eq!(value, Value::resolve("2024-06-01T11:00:00Z"));
    }

    #[test]
    fn test_timestamp_difference() {
        let value = arith(
            Value::resolve("2024-06-01T12:00:00Z"),
            ArithOp::Sub,
            Value::resolve("2024-06-01T11:30:00Z"),
        )
        .unwrap();
        assert_eq!(value, Value::Duration(TimeDelta::minutes(30)));
    }

    #[test]
    fn test_arith_mismatch() {
        let err = arith(Value::Text("a".to_string()), ArithOp::Add, Value::Number(1.0)).unwrap_err();
        assert!(matches!(err, EvaluationError::Arithmetic { op: '+', .. }));
    }

    #[test]
    fn test_duration_helpers() {
        let s = scope(None);
        assert_eq!(
            call(Function::Minutes, vec![Value::Number(5.0)], &s).unwrap(),
            Value::Duration(TimeDelta::minutes(5))
        );
        assert_eq!(
            call(Function::Days, vec![Value::Number(0.5)], &s).unwrap(),
            Value::Duration(TimeDelta::hours(12))
        );
        assert!(call(Function::Hours, vec![Value::Text("x".to_string())], &s).is_err());
    }

    #[test]
    fn test_date_helper() {
        let s = scope(None);
        assert!(matches!(
            call(Function::Date, vec![Value::Text("2024-01-01 08:00:00".to_string())], &s),
            Ok(Value::Timestamp(_))
        ));
        assert!(matches!(
            call(Function::Date, vec![Value::Text("tomorrow".to_string())], &s),
            Err(EvaluationError::Unparsable { .. })
        ));
    }

    #[test]
    fn test_number_and_string_helpers() {
        let s = scope(None);
        assert_eq!(
            call(Function::String, vec![Value::Number(10.0)], &s).unwrap(),
            Value::Text("10".to_string())
        );
        assert_eq!(
            call(Function::Number, vec![Value::Text("42".to_string())], &s).unwrap(),
            Value::Number(42.0)
        );
    }

    #[test]
    fn test_truth_requires_boolean() {
        assert!(truth(Value::Bool(true)).unwrap());
        assert_eq!(
            truth(Value::Number(1.0)).unwrap_err(),
            EvaluationError::NotBoolean("number")
        );
    }
}
