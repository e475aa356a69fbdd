//! Value handling for records and bound parameters
//!
//! Every attribute of a [`Record`](crate::Record) and every bound parameter of a
//! rendered statement is a `serde_json::Value`. This module holds the conversions
//! between that representation and the persisted form:
//!
//! - **`to_bindable`** - structured values (arrays/objects) become their JSON string
//! - **`persisted_form`** - the string form used to compare snapshots
//! - **`link_key`** - the normalized key used to match related records in memory
//! - **`compare` / `loose_eq`** - ordering and equality for in-memory filtering
//!
//! The SQLite-specific binding and decoding lives in [`sqlite`].

mod compare;
pub(crate) mod sqlite;

pub use compare::{as_f64, compare, loose_eq};

use serde_json::Value;

/// Convert a value into the form it is bound with
///
/// Arrays and objects are serialized to their JSON text; scalars pass through.
#[must_use]
pub fn to_bindable(value: Value) -> Value {
    match value {
        Value::Array(_) | Value::Object(_) => Value::String(value.to_string()),
        other => other,
    }
}

/// The serialized (persisted) form of a value, or `None` for null
///
/// Two values are considered unchanged exactly when their persisted forms are equal.
/// Decoded JSON structures are never compared structurally.
#[must_use]
pub fn persisted_form(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(true) => Some("1".to_string()),
        Value::Bool(false) => Some("0".to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}

/// Normalized key used to match a linking column across two record sets
///
/// `1` and `"1"` produce the same key so an integer foreign key matches a primary
/// key returned as text. Null never links.
#[must_use]
pub fn link_key(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => Some(format!("{}", f as i64)),
            _ => Some(n.to_string()),
        },
        other => persisted_form(other),
    }
}

/// Decode a JSON-declared field from its stored text
///
/// Text that parses to an array or object is replaced by the decoded structure;
/// null and anything else is kept as stored.
#[must_use]
pub fn decode_json_field(value: Value) -> Value {
    match value {
        Value::String(text) => match serde_json::from_str::<Value>(&text) {
            Ok(decoded @ (Value::Array(_) | Value::Object(_))) => decoded,
            _ => Value::String(text),
        },
        other => other,
    }
}
