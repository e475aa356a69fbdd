//! Ordering and equality over dynamic values.

use serde_json::Value;
use std::cmp::Ordering;

fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Numeric view of a value: numbers, numeric strings and booleans
#[must_use]
pub fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Loose equality: numbers compare numerically, including against numeric text
#[must_use]
pub fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Number(_), _) | (_, Value::Number(_)) | (Value::Bool(_), _) | (_, Value::Bool(_)) => {
            match (as_f64(left), as_f64(right)) {
                (Some(l), Some(r)) => l == r,
                _ => left == right,
            }
        }
        _ => left == right,
    }
}

/// Total ordering used by in-memory sorting and range filters
///
/// Null sorts first. Numbers (and numeric text compared against numbers) order
/// numerically, strings lexicographically; values of unrelated kinds order by kind.
#[must_use]
pub fn compare(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::String(l), Value::String(r)) => l.cmp(r),
        (Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) => {
            match (as_f64(left), as_f64(right)) {
                (Some(l), Some(r)) => l.partial_cmp(&r).unwrap_or(Ordering::Equal),
                _ => rank(left).cmp(&rank(right)),
            }
        }
        (Value::Number(_), Value::Number(_)) | (Value::Bool(_), Value::Bool(_)) => {
            match (as_f64(left), as_f64(right)) {
                (Some(l), Some(r)) => l.partial_cmp(&r).unwrap_or(Ordering::Equal),
                _ => Ordering::Equal,
            }
        }
        _ if rank(left) != rank(right) => rank(left).cmp(&rank(right)),
        _ => left.to_string().cmp(&right.to_string()),
    }
}
