//! Persistence operations on schema-bound records.

use crate::active_model::Snapshot;
use crate::executor::{OrmError, Row};
use crate::model::Record;
use crate::query::QueryBuilder;
use crate::value::to_bindable;
use serde_json::Value;

/// What [`Record::save`] did
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// The record was new; an INSERT ran and produced this primary key
    Inserted(Value),
    /// An UPDATE of the dirty fields ran, affecting this many rows
    Updated(u64),
    /// Nothing was dirty; no statement was issued
    Unchanged,
    /// The INSERT ran but the driver reported no row written
    NotInserted,
}

impl Record {
    /// Fields a `save` would write, in bindable form
    ///
    /// For a record that was never persisted this is every attribute. Attributes
    /// named like a declared or attached relation are never included.
    pub fn dirty_attributes(&self) -> Row {
        let excluded = |field: &str| {
            self.relations.contains_key(field)
                || self.schema.as_ref().is_some_and(|schema| schema.has_relation(field))
        };
        match &self.snapshot {
            Some(snapshot) => snapshot.diff(&self.attributes, excluded),
            None => self
                .attributes
                .iter()
                .filter(|(field, _)| !excluded(field.as_str()))
                .map(|(field, value)| (field.clone(), to_bindable(value.clone())))
                .collect(),
        }
    }

    /// Persist the record
    ///
    /// A new record is inserted and adopts the generated primary key. A persisted
    /// record issues one UPDATE containing only its dirty fields, or nothing at all
    /// when no field changed. Either way the snapshot is retaken afterwards, so a
    /// second `save` without changes is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `OrmError::NotPersistable` for a record without a schema (or a
    /// persisted record without a primary key value), and any error of the
    /// executed statement.
    pub fn save(&mut self) -> Result<SaveOutcome, OrmError> {
        let schema = self.schema.clone().ok_or(OrmError::NotPersistable)?;
        let primary_key = schema.primary_key().to_string();

        if self.snapshot.is_none() {
            let Some(inserted) = schema.query().insert(self.dirty_attributes())? else {
                return Ok(SaveOutcome::NotInserted);
            };
            let key = inserted.get(&primary_key).cloned().unwrap_or(Value::Null);
            if self.attributes.get(&primary_key).map_or(true, Value::is_null) {
                self.attributes.insert(primary_key, key.clone());
            }
            self.snapshot = Some(Snapshot::capture(&self.attributes));
            return Ok(SaveOutcome::Inserted(key));
        }

        let changes = self.dirty_attributes();
        if changes.is_empty() {
            return Ok(SaveOutcome::Unchanged);
        }

        let affected = self.scoped_to_self(&primary_key)?.update(changes)?;
        self.snapshot = Some(Snapshot::capture(&self.attributes));
        Ok(SaveOutcome::Updated(affected))
    }

    /// Delete the record's row; afterwards the record counts as not persisted
    ///
    /// # Errors
    ///
    /// Returns `OrmError::NotPersistable` for a record without a schema or without
    /// a primary key value.
    pub fn delete(&mut self) -> Result<u64, OrmError> {
        let schema = self.schema.as_ref().ok_or(OrmError::NotPersistable)?;
        let primary_key = schema.primary_key().to_string();
        let affected = self.scoped_to_self(&primary_key)?.delete()?;
        self.snapshot = None;
        Ok(affected)
    }

    /// A query on the record's model schema
    ///
    /// # Errors
    ///
    /// Returns `OrmError::NotPersistable` for a record without a schema.
    pub fn query(&self) -> Result<QueryBuilder, OrmError> {
        self.schema
            .as_ref()
            .map(|schema| schema.query())
            .ok_or(OrmError::NotPersistable)
    }

    fn scoped_to_self(&self, primary_key: &str) -> Result<QueryBuilder, OrmError> {
        let key = self
            .attributes
            .get(primary_key)
            .filter(|value| !value.is_null())
            .cloned()
            .ok_or(OrmError::NotPersistable)?;
        Ok(self.query()?.where_eq(primary_key, key))
    }
}
