//! Ordered record containers.
//!
//! Query results and has-many relations both arrive as a [`Collection`]. Filtering,
//! sorting and transforming methods return a new collection and leave the source
//! untouched; only `push`, `unshift`, `pop`, `shift` and `each_mut` mutate in place.
//!
//! Field arguments accept dotted paths (see [`Record::lookup`]); a missing field
//! reads as null.

mod page;

pub use page::Page;

use crate::executor::OrmError;
use crate::model::{IntoAttributes, Record};
use crate::query::Operator;
use crate::value::{as_f64, compare, link_key, loose_eq};
use indexmap::IndexMap;
use rand::seq::SliceRandom;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::cmp::Ordering;
use std::ops::Index;

/// An ordered sequence of records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collection {
    items: Vec<Record>,
}

impl Collection {
    pub fn new(items: Vec<Record>) -> Self {
        Self { items }
    }

    /// Build plain records from JSON objects
    ///
    /// # Errors
    ///
    /// Returns `OrmError::Decode` if any element is not an object.
    pub fn from_json<I: IntoIterator<Item = Value>>(values: I) -> Result<Self, OrmError> {
        values
            .into_iter()
            .map(|value| Ok(Record::new(value.into_attributes()?)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.items.get(index)
    }

    pub fn items(&self) -> &[Record] {
        &self.items
    }

    pub fn into_items(self) -> Vec<Record> {
        self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.items.iter()
    }

    pub fn first(&self) -> Option<&Record> {
        self.items.first()
    }

    pub fn last(&self) -> Option<&Record> {
        self.items.last()
    }

    /// Remove and return the last record
    pub fn pop(&mut self) -> Option<Record> {
        self.items.pop()
    }

    /// Remove and return the first record
    pub fn shift(&mut self) -> Option<Record> {
        if self.items.is_empty() {
            None
        } else {
            Some(self.items.remove(0))
        }
    }

    /// A record chosen uniformly at random
    pub fn random(&self) -> Option<&Record> {
        self.items.choose(&mut rand::thread_rng())
    }

    pub fn push(&mut self, record: Record) -> &mut Self {
        self.items.push(record);
        self
    }

    /// Append a plain record built from attributes
    pub fn add(&mut self, data: impl IntoAttributes) -> Result<&mut Self, OrmError> {
        self.items.push(Record::new(data.into_attributes()?));
        Ok(self)
    }

    pub fn unshift(&mut self, record: Record) -> &mut Self {
        self.items.insert(0, record);
        self
    }

    /// The first `count` records
    pub fn take(&self, count: usize) -> Self {
        self.items.iter().take(count).cloned().collect()
    }

    pub fn filter<F>(&self, predicate: F) -> Self
    where
        F: Fn(&Record) -> bool,
    {
        self.items.iter().filter(|record| predicate(record)).cloned().collect()
    }

    /// Call `f` on every record and return the collection unchanged
    pub fn tap<F>(self, mut f: F) -> Self
    where
        F: FnMut(&Record),
    {
        self.items.iter().for_each(&mut f);
        self
    }

    /// A new collection of transformed records
    pub fn map<F>(&self, f: F) -> Self
    where
        F: FnMut(Record) -> Record,
    {
        self.items.iter().cloned().map(f).collect()
    }

    /// Mutate every record in place
    pub fn each_mut<F>(&mut self, f: F) -> &mut Self
    where
        F: FnMut(&mut Record),
    {
        self.items.iter_mut().for_each(f);
        self
    }

    /// Records without the given fields
    pub fn except<I, S>(&self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let fields: Vec<S> = fields.into_iter().collect();
        self.map(|mut record| {
            for field in &fields {
                record.remove(field.as_ref());
            }
            record
        })
    }

    /// Plain records holding only the given fields (missing ones as null)
    pub fn only<I, S>(&self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let fields: Vec<S> = fields.into_iter().collect();
        self.items
            .iter()
            .map(|record| {
                let attributes = fields
                    .iter()
                    .map(|field| (field.as_ref().to_string(), field_value(record, field.as_ref())))
                    .collect();
                Record::new(attributes)
            })
            .collect()
    }

    /// Value of `field` for every record
    pub fn pluck(&self, field: &str) -> Vec<Value> {
        self.items.iter().map(|record| field_value(record, field)).collect()
    }

    /// Values of `field` joined by `separator`; strings are joined unquoted, null as empty
    pub fn implode(&self, field: &str, separator: &str) -> String {
        self.pluck(field)
            .iter()
            .map(|value| match value {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(separator)
    }

    /// Whether any record's `field` loosely equals `value`
    pub fn contains(&self, field: &str, value: impl Into<Value>) -> bool {
        let value = value.into();
        self.items.iter().any(|record| loose_eq(&field_value(record, field), &value))
    }

    pub fn every<F>(&self, predicate: F) -> bool
    where
        F: Fn(&Record) -> bool,
    {
        self.items.iter().all(predicate)
    }

    /// Sum of `field` read as numbers; non-numeric values count as zero
    pub fn sum(&self, field: &str) -> f64 {
        self.items
            .iter()
            .map(|record| as_f64(&field_value(record, field)).unwrap_or(0.0))
            .sum()
    }

    /// Mean of `field`; `None` for an empty collection
    pub fn avg(&self, field: &str) -> Option<f64> {
        if self.items.is_empty() {
            return None;
        }
        Some(self.sum(field) / self.items.len() as f64)
    }

    pub fn shuffle(&self) -> Self {
        let mut items = self.items.clone();
        items.shuffle(&mut rand::thread_rng());
        Self::new(items)
    }

    /// Stable sort by a caller comparator
    pub fn sort_by<F>(&self, comparator: F) -> Self
    where
        F: FnMut(&Record, &Record) -> Ordering,
    {
        let mut items = self.items.clone();
        items.sort_by(comparator);
        Self::new(items)
    }

    /// Stable sort by `field`; records with equal keys keep their relative order
    pub fn sort_by_key(&self, field: &str, descending: bool) -> Self {
        self.sort_by(|left, right| {
            let ordering = compare(&field_value(left, field), &field_value(right, field));
            if descending {
                ordering.reverse()
            } else {
                ordering
            }
        })
    }

    /// Records grouped by the value of `field`, groups in first-seen order
    ///
    /// Numbers and numeric strings with the same value share a group; null keys
    /// group under `""`.
    pub fn group_by(&self, field: &str) -> IndexMap<String, Collection> {
        let mut groups: IndexMap<String, Collection> = IndexMap::new();
        for record in &self.items {
            let key = link_key(&field_value(record, field)).unwrap_or_default();
            groups.entry(key).or_default().items.push(record.clone());
        }
        groups
    }

    /// Records keyed by the value of `field`; a later record replaces an earlier one
    pub fn key_by(&self, field: &str) -> IndexMap<String, Record> {
        self.items
            .iter()
            .map(|record| {
                let key = link_key(&field_value(record, field)).unwrap_or_default();
                (key, record.clone())
            })
            .collect()
    }

    /// First record whose `field` loosely equals `value`
    pub fn find_by(&self, field: &str, value: impl Into<Value>) -> Option<&Record> {
        let value = value.into();
        self.items
            .iter()
            .find(|record| loose_eq(&field_value(record, field), &value))
    }

    /// Records whose `field` loosely equals `value` (null matches null)
    pub fn where_eq(&self, field: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.filter(|record| loose_eq(&field_value(record, field), &value))
    }

    /// Records matching `field <op> value`
    ///
    /// # Errors
    ///
    /// Returns `OrmError::UnsupportedOperator` for operators outside the allow-list
    /// and for `like`, which is not evaluated in memory.
    pub fn where_op(&self, field: &str, op: &str, value: impl Into<Value>) -> Result<Self, OrmError> {
        let operator: Operator = op.parse()?;
        let value = value.into();
        let accept = |ordering: Ordering| match operator {
            Operator::Gt => ordering == Ordering::Greater,
            Operator::Ge => ordering != Ordering::Less,
            Operator::Lt => ordering == Ordering::Less,
            Operator::Le => ordering != Ordering::Greater,
            _ => false,
        };

        match operator {
            Operator::Eq => Ok(self.where_eq(field, value)),
            Operator::Ne => Ok(self.filter(|record| !loose_eq(&field_value(record, field), &value))),
            Operator::Like => Err(OrmError::UnsupportedOperator(op.to_string())),
            _ => Ok(self.filter(|record| accept(compare(&field_value(record, field), &value)))),
        }
    }

    pub fn where_in<I, V>(&self, field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.filter(|record| {
            let current = field_value(record, field);
            values.iter().any(|value| loose_eq(&current, value))
        })
    }

    pub fn where_not_in<I, V>(&self, field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.filter(|record| {
            let current = field_value(record, field);
            !values.iter().any(|value| loose_eq(&current, value))
        })
    }

    /// Records with `min <= field <= max`
    pub fn where_between(&self, field: &str, min: impl Into<Value>, max: impl Into<Value>) -> Self {
        let (min, max) = (min.into(), max.into());
        self.filter(|record| {
            let current = field_value(record, field);
            compare(&current, &min) != Ordering::Less && compare(&current, &max) != Ordering::Greater
        })
    }

    /// Records with `field < min` or `field > max`
    pub fn where_not_between(&self, field: &str, min: impl Into<Value>, max: impl Into<Value>) -> Self {
        let (min, max) = (min.into(), max.into());
        self.filter(|record| {
            let current = field_value(record, field);
            compare(&current, &min) == Ordering::Less || compare(&current, &max) == Ordering::Greater
        })
    }

    /// Records whose string `field` contains `needle`
    pub fn where_str_contains(&self, field: &str, needle: &str) -> Self {
        self.filter(|record| match field_value(record, field) {
            Value::String(s) => s.contains(needle),
            Value::Null => false,
            other => other.to_string().contains(needle),
        })
    }

    /// Slice one page out of the records
    ///
    /// `page` below 1 is treated as 1 and `per_page` below 1 as 1.
    pub fn paginate(&self, per_page: u64, page: i64) -> Page {
        let per_page = per_page.max(1);
        let page = page.max(1) as u64;
        let offset = usize::try_from((page - 1).saturating_mul(per_page)).unwrap_or(usize::MAX);
        let items = self
            .items
            .iter()
            .skip(offset)
            .take(usize::try_from(per_page).unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Page::new(items, self.items.len() as u64, per_page, page)
    }

    /// Deserialize every record into `T`
    ///
    /// # Errors
    ///
    /// Returns `OrmError::Decode` for the first record that does not match `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<Vec<T>, OrmError> {
        self.items.iter().map(Record::deserialize::<T>).collect()
    }

    pub fn to_json(&self) -> Value {
        Value::Array(self.items.iter().map(Record::to_json).collect())
    }
}

fn field_value(record: &Record, field: &str) -> Value {
    record.lookup(field).unwrap_or(Value::Null)
}

impl Index<usize> for Collection {
    type Output = Record;

    fn index(&self, index: usize) -> &Record {
        &self.items[index]
    }
}

impl IntoIterator for Collection {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl FromIterator<Record> for Collection {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl From<Vec<Record>> for Collection {
    fn from(items: Vec<Record>) -> Self {
        Self::new(items)
    }
}
