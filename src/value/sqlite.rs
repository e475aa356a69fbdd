//! Binding values into, and decoding rows out of, the SQLite driver.

use crate::executor::Row;
use rusqlite::types::{ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::ToSql;
use serde_json::{Number, Value};

/// Borrowed parameter wrapper implementing `rusqlite::ToSql`
pub(crate) struct SqlParam<'a>(pub &'a Value);

impl ToSql for SqlParam<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self.0 {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Bool(b) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*b))),
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => ToSqlOutput::Owned(SqlValue::Integer(i)),
                (None, Some(f)) => ToSqlOutput::Owned(SqlValue::Real(f)),
                (None, None) => ToSqlOutput::Owned(SqlValue::Text(n.to_string())),
            },
            Value::String(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            structured @ (Value::Array(_) | Value::Object(_)) => {
                ToSqlOutput::Owned(SqlValue::Text(structured.to_string()))
            }
        })
    }
}

/// Decode one column of a driver row
pub(crate) fn value_from_ref(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
    }
}

/// Decode a full driver row using the statement's column names
pub(crate) fn row_from_driver(columns: &[String], row: &rusqlite::Row<'_>) -> rusqlite::Result<Row> {
    let mut decoded = Row::new();
    for (index, name) in columns.iter().enumerate() {
        decoded.insert(name.clone(), value_from_ref(row.get_ref(index)?));
    }
    Ok(decoded)
}
