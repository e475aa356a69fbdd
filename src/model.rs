//! Records: named-field bags returned by queries.
//!
//! A [`Record`] holds its column values in column order, the relations attached
//! to it by eager or lazy loading, and (for records produced through a
//! [`ModelSchema`](crate::ModelSchema)) the schema binding and the persisted
//! snapshot used for dirty tracking.

use crate::active_model::{ModelSchema, Snapshot};
use crate::collection::Collection;
use crate::executor::{OrmError, Row};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// A relation attached to a record
#[derive(Debug, Clone, PartialEq)]
pub enum Related {
    /// `has_one` / `belongs_to`: the first match, if any
    One(Option<Box<Record>>),
    /// `has_many`: every match, in target query order
    Many(Collection),
}

impl Related {
    pub fn as_one(&self) -> Option<&Record> {
        match self {
            Related::One(record) => record.as_deref(),
            Related::Many(_) => None,
        }
    }

    pub fn as_many(&self) -> Option<&Collection> {
        match self {
            Related::Many(collection) => Some(collection),
            Related::One(_) => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Related::One(Some(record)) => record.to_json(),
            Related::One(None) => Value::Null,
            Related::Many(collection) => collection.to_json(),
        }
    }

    fn lookup(&self, path: &str) -> Option<Value> {
        match self {
            Related::One(record) => record.as_ref()?.lookup(path),
            Related::Many(collection) => {
                let (head, rest) = split_path(path);
                let record = collection.get(head.parse::<usize>().ok()?)?;
                match rest {
                    Some(rest) => record.lookup(rest),
                    None => Some(record.to_json()),
                }
            }
        }
    }
}

/// Conversion into an attribute map for writes and record construction
///
/// Implemented for `Row` (a `serde_json::Map`), JSON objects (`json!({...})`;
/// `null` is an empty map) and sequences of `(field, value)` pairs.
pub trait IntoAttributes {
    /// # Errors
    ///
    /// Returns `OrmError::Decode` for a JSON value that is not an object.
    fn into_attributes(self) -> Result<Row, OrmError>;
}

impl IntoAttributes for Row {
    fn into_attributes(self) -> Result<Row, OrmError> {
        Ok(self)
    }
}

impl IntoAttributes for Value {
    fn into_attributes(self) -> Result<Row, OrmError> {
        match self {
            Value::Object(map) => Ok(map),
            Value::Null => Ok(Map::new()),
            other => Err(OrmError::Decode(format!("expected an object of fields, got {other}"))),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> IntoAttributes for Vec<(K, V)> {
    fn into_attributes(self) -> Result<Row, OrmError> {
        Ok(self.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<K: Into<String>, V: Into<Value>, const N: usize> IntoAttributes for [(K, V); N] {
    fn into_attributes(self) -> Result<Row, OrmError> {
        Ok(self.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// A single result row
///
/// # Examples
///
/// ```
/// use lifebuoy::Record;
/// use serde_json::json;
///
/// let mut record = Record::from_json(json!({"id": 1, "profile": {"city": "Oslo"}})).unwrap();
/// assert_eq!(record.lookup("profile.city"), Some(json!("Oslo")));
///
/// record.set("name", "Alice");
/// assert_eq!(record.get("name"), Some(&json!("Alice")));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Record {
    pub(crate) attributes: Row,
    pub(crate) relations: IndexMap<String, Related>,
    pub(crate) schema: Option<ModelSchema>,
    pub(crate) snapshot: Option<Snapshot>,
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.attributes == other.attributes && self.relations == other.relations
    }
}

impl From<Row> for Record {
    fn from(attributes: Row) -> Self {
        Record::new(attributes)
    }
}

impl Record {
    /// A plain record, not bound to any model schema
    pub fn new(attributes: Row) -> Self {
        Self {
            attributes,
            ..Self::default()
        }
    }

    pub fn from_json(value: Value) -> Result<Self, OrmError> {
        Ok(Self::new(value.into_attributes()?))
    }

    /// Attribute value by exact name
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.attributes.get(field)
    }

    /// Attribute value by exact name, or by dotted path
    ///
    /// A path walks nested objects, array indices and attached relations:
    /// `"profile.city"`, `"tags.0"`, `"author.name"`, `"posts.0.title"`.
    pub fn lookup(&self, path: &str) -> Option<Value> {
        if let Some(value) = self.attributes.get(path) {
            return Some(value.clone());
        }
        if let Some(related) = self.relations.get(path) {
            return Some(related.to_json());
        }

        let (head, rest) = split_path(path);
        let rest = rest?;
        if let Some(value) = self.attributes.get(head) {
            return lookup_value(value, rest);
        }
        self.relations.get(head)?.lookup(rest)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.attributes.insert(field.into(), value.into());
        self
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.attributes.shift_remove(field)
    }

    pub fn attributes(&self) -> &Row {
        &self.attributes
    }

    pub fn into_attributes(self) -> Row {
        self.attributes
    }

    /// Relation attached under `name` (snake_case)
    pub fn relation(&self, name: &str) -> Option<&Related> {
        self.relations.get(name)
    }

    pub fn relations(&self) -> &IndexMap<String, Related> {
        &self.relations
    }

    pub fn set_relation(&mut self, name: impl Into<String>, related: Related) -> &mut Self {
        self.relations.insert(name.into(), related);
        self
    }

    /// Model schema this record is bound to
    pub fn schema(&self) -> Option<&ModelSchema> {
        self.schema.as_ref()
    }

    /// Whether the record was loaded from (or written to) storage
    pub fn is_persisted(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Attributes followed by attached relations, as one JSON object
    pub fn to_json(&self) -> Value {
        let mut object = self.attributes.clone();
        for (name, related) in &self.relations {
            object.insert(name.clone(), related.to_json());
        }
        Value::Object(object)
    }

    /// Deserialize the record (attributes and attached relations) into `T`
    ///
    /// # Errors
    ///
    /// Returns `OrmError::Decode` if the record does not match `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, OrmError> {
        Ok(serde_json::from_value(self.to_json())?)
    }
}

fn split_path(path: &str) -> (&str, Option<&str>) {
    match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    }
}

fn lookup_value(value: &Value, path: &str) -> Option<Value> {
    let (head, rest) = split_path(path);
    let child = match value {
        Value::Object(map) => map.get(head)?,
        Value::Array(items) => items.get(head.parse::<usize>().ok()?)?,
        _ => return None,
    };
    match rest {
        Some(rest) => lookup_value(child, rest),
        None => Some(child.clone()),
    }
}
