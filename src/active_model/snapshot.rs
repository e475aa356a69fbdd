//! Persisted snapshots and dirty-attribute diffing.
//!
//! Current values and the snapshot are compared only in their persisted (string)
//! form, so a decoded JSON field that was rebuilt with the same content does not
//! count as changed.

use crate::executor::Row;
use crate::value::{persisted_form, to_bindable};
use std::collections::HashMap;

/// Persisted form of every attribute at load or last save
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    fields: HashMap<String, Option<String>>,
}

impl Snapshot {
    pub(crate) fn capture(attributes: &Row) -> Self {
        Self {
            fields: attributes
                .iter()
                .map(|(field, value)| (field.clone(), persisted_form(value)))
                .collect(),
        }
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Attributes whose persisted form differs from the snapshot, in bindable form
    ///
    /// Fields missing from the snapshot always count as changed. Fields for which
    /// `excluded` returns true are skipped.
    pub(crate) fn diff(&self, attributes: &Row, excluded: impl Fn(&str) -> bool) -> Row {
        attributes
            .iter()
            .filter(|(field, _)| !excluded(field.as_str()))
            .filter(|(field, value)| match self.fields.get(field.as_str()) {
                Some(original) => *original != persisted_form(value),
                None => true,
            })
            .map(|(field, value)| (field.clone(), to_bindable(value.clone())))
            .collect()
    }
}
