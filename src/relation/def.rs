//! Relation descriptors.
//!
//! A [`RelationDef`] names how an owning record type links to a target type and
//! produces the query that fetches the related rows, scoped either to one owning
//! record, to a batch of owning records, or to a correlated subquery over the
//! owning query's predicates.

use crate::active_model::ModelSchema;
use crate::executor::OrmError;
use crate::model::Record;
use crate::query::{Constraint, QueryBuilder};
use crate::value::link_key;
use heck::ToSnakeCase;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Relation cardinality and direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// `target.foreign_key = owner.owner_key`, first match
    HasOne,
    /// `target.foreign_key = owner.owner_key`, every match
    HasMany,
    /// `owner.foreign_key = target.owner_key`, first match
    BelongsTo,
}

/// A declared relation between two record types
#[derive(Clone)]
pub struct RelationDef {
    name: String,
    kind: RelationKind,
    target: fn() -> ModelSchema,
    foreign_key: String,
    owner_key: String,
    constraint: Option<Constraint>,
}

impl fmt::Debug for RelationDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationDef")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("foreign_key", &self.foreign_key)
            .field("owner_key", &self.owner_key)
            .field("constrained", &self.constraint.is_some())
            .finish()
    }
}

impl RelationDef {
    /// Declare a relation; `name` is normalized to snake_case
    ///
    /// `target` is called when the relation is resolved, so two schemas can refer
    /// to each other.
    pub fn new(
        kind: RelationKind,
        name: &str,
        target: fn() -> ModelSchema,
        foreign_key: &str,
        owner_key: &str,
    ) -> Self {
        Self {
            name: name.to_snake_case(),
            kind,
            target,
            foreign_key: foreign_key.to_string(),
            owner_key: owner_key.to_string(),
            constraint: None,
        }
    }

    pub fn has_one(name: &str, target: fn() -> ModelSchema, foreign_key: &str, owner_key: &str) -> Self {
        Self::new(RelationKind::HasOne, name, target, foreign_key, owner_key)
    }

    pub fn has_many(name: &str, target: fn() -> ModelSchema, foreign_key: &str, owner_key: &str) -> Self {
        Self::new(RelationKind::HasMany, name, target, foreign_key, owner_key)
    }

    pub fn belongs_to(name: &str, target: fn() -> ModelSchema, foreign_key: &str, owner_key: &str) -> Self {
        Self::new(RelationKind::BelongsTo, name, target, foreign_key, owner_key)
    }

    /// Default adjustment applied to every query this relation produces
    pub fn constrain<F>(mut self, constraint: F) -> Self
    where
        F: Fn(QueryBuilder) -> QueryBuilder + Send + Sync + 'static,
    {
        self.constraint = Some(Arc::new(constraint));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> RelationKind {
        self.kind
    }

    pub fn foreign_key(&self) -> &str {
        &self.foreign_key
    }

    pub fn owner_key(&self) -> &str {
        &self.owner_key
    }

    /// HasOne and BelongsTo resolve to at most one record
    pub fn is_single(&self) -> bool {
        !matches!(self.kind, RelationKind::HasMany)
    }

    /// `(owner-side field, target-side field)` of the link
    pub fn link_fields(&self) -> (&str, &str) {
        match self.kind {
            RelationKind::HasOne | RelationKind::HasMany => (self.owner_key.as_str(), self.foreign_key.as_str()),
            RelationKind::BelongsTo => (self.foreign_key.as_str(), self.owner_key.as_str()),
        }
    }

    /// The target schema
    ///
    /// # Errors
    ///
    /// Returns `OrmError::RelationTargetTypeInvalid` if the target has no table or
    /// no primary key.
    pub fn target(&self) -> Result<ModelSchema, OrmError> {
        let target = (self.target)();
        if !target.is_persistable() {
            return Err(OrmError::RelationTargetTypeInvalid(self.name.clone()));
        }
        Ok(target)
    }

    /// Target query for one owning record; `None` when the owner has no link value
    pub fn scoped_query(&self, owner: &Record) -> Result<Option<QueryBuilder>, OrmError> {
        let target = self.target()?;
        let (owner_field, target_field) = self.link_fields();
        let key = match owner.get(owner_field) {
            Some(value) if !value.is_null() => value.clone(),
            _ => return Ok(None),
        };
        Ok(Some(self.finish(target.query().where_eq(target_field, key))))
    }

    /// Target query for a batch of owning records: one `IN` over their distinct
    /// link values; `None` when no owner has a link value
    pub fn batch_query(&self, owners: &[Record]) -> Result<Option<QueryBuilder>, OrmError> {
        let target = self.target()?;
        let (owner_field, target_field) = self.link_fields();

        let mut seen = HashSet::new();
        let keys: Vec<Value> = owners
            .iter()
            .filter_map(|owner| owner.get(owner_field))
            .filter(|value| link_key(value).is_some_and(|key| seen.insert(key)))
            .cloned()
            .collect();
        if keys.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.finish(target.query().where_in(target_field, keys))))
    }

    /// Target query scoped by a correlated `EXISTS` over the owning query's table
    /// and predicates
    ///
    /// The owner side is always aliased inside the subquery so a relation from a
    /// table to itself still links outer and inner rows. An owner already using
    /// [`table_alias`](QueryBuilder::table_alias) keeps its alias.
    pub fn correlated_query(&self, owner_query: &QueryBuilder) -> Result<QueryBuilder, OrmError> {
        let target = self.target()?;
        let (owner_field, target_field) = self.link_fields();
        let (owner_from, owner_ref) = owner_scope(owner_query);

        let mut correlated = QueryBuilder::new()
            .table(owner_query.table.clone())
            .from_raw(owner_from)
            .select_raw("1")
            .where_raw(
                format!(
                    "{}.`{}` = {}.`{}`",
                    target.table(),
                    target_field,
                    owner_ref,
                    owner_field
                ),
                Vec::<Value>::new(),
            );
        correlated.wheres.extend(owner_query.wheres.iter().cloned());

        Ok(self.finish(target.query().where_exists(&correlated)))
    }

    fn finish(&self, query: QueryBuilder) -> QueryBuilder {
        match &self.constraint {
            Some(constraint) => constraint(query),
            None => query,
        }
    }
}

/// FROM expression and correlation name for the owner side of an `EXISTS`
fn owner_scope(owner_query: &QueryBuilder) -> (String, String) {
    let from = owner_query.from.as_deref().unwrap_or(&owner_query.table);
    match declared_alias(from) {
        Some(alias) => (from.to_string(), alias.to_string()),
        None => (format!("{from} as {OWNER_ALIAS}"), OWNER_ALIAS.to_string()),
    }
}

const OWNER_ALIAS: &str = "__owner";

/// Alias of a `<table> as <alias>` expression
fn declared_alias(from: &str) -> Option<&str> {
    let position = from.to_ascii_lowercase().rfind(" as ")?;
    let alias = from[position + 4..].trim();
    let plain = !alias.is_empty() && alias.chars().all(|c| c.is_alphanumeric() || c == '_');
    plain.then_some(alias)
}
