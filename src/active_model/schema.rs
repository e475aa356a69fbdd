//! Model schemas: the per-type configuration a model query is pre-filled from.

use crate::collection::Collection;
use crate::executor::{OrmError, Row};
use crate::model::{IntoAttributes, Record};
use crate::query::QueryBuilder;
use crate::relation::{RelationDef, RelationKind};
use crate::active_model::Snapshot;
use crate::value::decode_json_field;
use heck::ToSnakeCase;
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

struct SchemaInner {
    table: String,
    primary_key: String,
    connection: String,
    write_connection: String,
    json_fields: Vec<String>,
    relations: IndexMap<String, RelationDef>,
}

/// Table, primary key, connections, JSON fields and declared relations of one
/// record type
///
/// Cloning is cheap; clones share the same definition. Build one per record type,
/// typically in a `once_cell::sync::Lazy` static exposed through [`Entity`].
///
/// # Examples
///
/// ```no_run
/// use lifebuoy::{Entity, ModelSchema, OrmError};
/// use once_cell::sync::Lazy;
/// use serde_json::json;
///
/// struct User;
/// struct Post;
///
/// static USERS: Lazy<ModelSchema> = Lazy::new(|| {
///     ModelSchema::builder("users")
///         .json_fields(["settings"])
///         .has_many::<Post>("posts", "user_id", "id")
///         .build()
/// });
/// static POSTS: Lazy<ModelSchema> = Lazy::new(|| {
///     ModelSchema::builder("posts")
///         .belongs_to::<User>("author", "user_id", "id")
///         .build()
/// });
///
/// impl Entity for User {
///     fn schema() -> ModelSchema {
///         USERS.clone()
///     }
/// }
/// impl Entity for Post {
///     fn schema() -> ModelSchema {
///         POSTS.clone()
///     }
/// }
///
/// # fn main() -> Result<(), OrmError> {
/// let users = User::query().with(["posts"]).get()?;
/// let mut alice = User::find(1)?.expect("user 1");
/// alice.set("name", "Alice");
/// alice.save()?;
/// # let _ = users;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ModelSchema {
    inner: Arc<SchemaInner>,
}

impl fmt::Debug for ModelSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelSchema")
            .field("table", &self.inner.table)
            .field("primary_key", &self.inner.primary_key)
            .field("connection", &self.inner.connection)
            .field("relations", &self.inner.relations.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ModelSchema {
    pub fn builder(table: impl Into<String>) -> ModelSchemaBuilder {
        ModelSchemaBuilder::new(table)
    }

    pub fn table(&self) -> &str {
        &self.inner.table
    }

    pub fn primary_key(&self) -> &str {
        &self.inner.primary_key
    }

    pub fn connection(&self) -> &str {
        &self.inner.connection
    }

    pub fn write_connection(&self) -> &str {
        &self.inner.write_connection
    }

    pub fn json_fields(&self) -> &[String] {
        &self.inner.json_fields
    }

    pub fn is_json_field(&self, field: &str) -> bool {
        self.inner.json_fields.iter().any(|f| f == field)
    }

    /// Whether records of this schema can be written (table and primary key set)
    pub fn is_persistable(&self) -> bool {
        !self.inner.table.trim().is_empty() && !self.inner.primary_key.trim().is_empty()
    }

    /// Declared relation by name; `authorProfile` and `author_profile` are the same key
    pub fn relation(&self, name: &str) -> Option<&RelationDef> {
        self.inner.relations.get(&name.to_snake_case())
    }

    pub fn has_relation(&self, name: &str) -> bool {
        self.relation(name).is_some()
    }

    pub fn relation_names(&self) -> impl Iterator<Item = &str> {
        self.inner.relations.keys().map(String::as_str)
    }

    /// Whether two handles share one definition
    pub fn same_as(&self, other: &ModelSchema) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// A query against this schema's table whose results are bound records
    pub fn query(&self) -> QueryBuilder {
        QueryBuilder::for_schema(self.clone())
    }

    /// Insert a row and return it as a persisted record
    pub fn create(&self, data: impl IntoAttributes) -> Result<Option<Record>, OrmError> {
        self.query().insert(data)
    }

    /// Record by primary key
    pub fn find(&self, key: impl Into<Value>) -> Result<Option<Record>, OrmError> {
        self.query().find(key)
    }

    pub fn all(&self) -> Result<Collection, OrmError> {
        self.query().get()
    }

    /// An unsaved record bound to this schema; `save` inserts it
    pub fn new_record(&self, data: impl IntoAttributes) -> Result<Record, OrmError> {
        let attributes = self.decode(data.into_attributes()?);
        Ok(Record {
            attributes,
            schema: Some(self.clone()),
            ..Record::default()
        })
    }

    /// A persisted record built from stored values
    ///
    /// JSON fields are decoded and the snapshot is taken from the decoded values.
    pub fn hydrate(&self, row: Row) -> Record {
        let attributes = self.decode(row);
        let snapshot = Snapshot::capture(&attributes);
        Record {
            attributes,
            relations: IndexMap::new(),
            schema: Some(self.clone()),
            snapshot: Some(snapshot),
        }
    }

    fn decode(&self, mut attributes: Row) -> Row {
        if self.inner.json_fields.is_empty() {
            return attributes;
        }
        for (field, value) in attributes.iter_mut() {
            if self.is_json_field(field) {
                *value = decode_json_field(value.take());
            }
        }
        attributes
    }
}

/// Builder for [`ModelSchema`]
pub struct ModelSchemaBuilder {
    table: String,
    primary_key: String,
    connection: String,
    write_connection: String,
    json_fields: Vec<String>,
    relations: IndexMap<String, RelationDef>,
}

impl ModelSchemaBuilder {
    fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            primary_key: "id".to_string(),
            connection: String::new(),
            write_connection: String::new(),
            json_fields: Vec::new(),
            relations: IndexMap::new(),
        }
    }

    pub fn primary_key(mut self, primary_key: impl Into<String>) -> Self {
        self.primary_key = primary_key.into();
        self
    }

    pub fn connection(mut self, name: impl Into<String>) -> Self {
        self.connection = name.into();
        self
    }

    pub fn write_connection(mut self, name: impl Into<String>) -> Self {
        self.write_connection = name.into();
        self
    }

    /// Fields stored as JSON text and presented decoded
    pub fn json_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.json_fields.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Register a relation; a later registration under the same name replaces it
    pub fn relation(mut self, relation: RelationDef) -> Self {
        self.relations.insert(relation.name().to_string(), relation);
        self
    }

    /// `E.foreign_key` equals this record's `owner_key`; at most one match
    pub fn has_one<E: Entity>(self, name: &str, foreign_key: &str, owner_key: &str) -> Self {
        self.relation(RelationDef::new(RelationKind::HasOne, name, E::schema, foreign_key, owner_key))
    }

    /// `E.foreign_key` equals this record's `owner_key`; every match
    pub fn has_many<E: Entity>(self, name: &str, foreign_key: &str, owner_key: &str) -> Self {
        self.relation(RelationDef::new(RelationKind::HasMany, name, E::schema, foreign_key, owner_key))
    }

    /// This record's `foreign_key` equals `E.owner_key`
    pub fn belongs_to<E: Entity>(self, name: &str, foreign_key: &str, owner_key: &str) -> Self {
        self.relation(RelationDef::new(RelationKind::BelongsTo, name, E::schema, foreign_key, owner_key))
    }

    pub fn build(self) -> ModelSchema {
        ModelSchema {
            inner: Arc::new(SchemaInner {
                table: self.table,
                primary_key: self.primary_key,
                connection: self.connection,
                write_connection: self.write_connection,
                json_fields: self.json_fields,
                relations: self.relations,
            }),
        }
    }
}

/// A record type with a schema
///
/// Implementors only provide [`schema`](Entity::schema); the query helpers mirror
/// the ones on [`ModelSchema`].
pub trait Entity {
    fn schema() -> ModelSchema;

    fn query() -> QueryBuilder {
        Self::schema().query()
    }

    fn find(key: impl Into<Value>) -> Result<Option<Record>, OrmError> {
        Self::schema().find(key)
    }

    fn create(data: impl IntoAttributes) -> Result<Option<Record>, OrmError> {
        Self::schema().create(data)
    }

    fn all() -> Result<Collection, OrmError> {
        Self::schema().all()
    }

    fn new_record(data: impl IntoAttributes) -> Result<Record, OrmError> {
        Self::schema().new_record(data)
    }
}
