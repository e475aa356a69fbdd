//! Comparison operators accepted by `where`-family predicates.

use crate::executor::OrmError;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// The fixed operator allow-list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Like,
}

impl Operator {
    /// SQL spelling of the operator
    pub fn as_sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "<>",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Like => "like",
        }
    }
}

impl FromStr for Operator {
    type Err = OrmError;

    /// Parse an operator, case-insensitively
    ///
    /// # Errors
    ///
    /// Returns `OrmError::UnsupportedOperator` for anything outside
    /// `=, <>, >, >=, <, <=, like`.
    fn from_str(op: &str) -> Result<Self, Self::Err> {
        match op.trim().to_ascii_lowercase().as_str() {
            "=" => Ok(Operator::Eq),
            "<>" => Ok(Operator::Ne),
            ">" => Ok(Operator::Gt),
            ">=" => Ok(Operator::Ge),
            "<" => Ok(Operator::Lt),
            "<=" => Ok(Operator::Le),
            "like" => Ok(Operator::Like),
            _ => Err(OrmError::UnsupportedOperator(op.to_string())),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// One entry of a mapping-form `where`
///
/// A plain value means equality; `Criterion::op` carries an explicit operator.
///
/// ```
/// use lifebuoy::Criterion;
/// use serde_json::json;
///
/// let entries = vec![
///     ("status", Criterion::from(json!("active"))),
///     ("age", Criterion::op(">=", json!(18))),
/// ];
/// # let _ = entries;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Criterion {
    Eq(Value),
    Cmp(String, Value),
}

impl Criterion {
    pub fn op(op: impl Into<String>, value: impl Into<Value>) -> Self {
        Criterion::Cmp(op.into(), value.into())
    }
}

impl From<Value> for Criterion {
    fn from(value: Value) -> Self {
        Criterion::Eq(value)
    }
}

impl From<&str> for Criterion {
    fn from(value: &str) -> Self {
        Criterion::Eq(Value::from(value))
    }
}

impl From<i64> for Criterion {
    fn from(value: i64) -> Self {
        Criterion::Eq(Value::from(value))
    }
}

impl From<bool> for Criterion {
    fn from(value: bool) -> Self {
        Criterion::Eq(Value::from(value))
    }
}
