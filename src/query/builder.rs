//! Clause accumulation for [`QueryBuilder`].
//!
//! Builder methods consume the builder and return it with one more clause, so a
//! builder is a plain value: cloning it yields an independent query that can be
//! refined and executed separately (pagination counts rows on such a clone).
//!
//! Errors found while accumulating (an operator outside the allow-list) are held
//! in the builder and returned by the next terminal operation, before any
//! statement is rendered.

use crate::active_model::ModelSchema;
use crate::executor::OrmError;
use crate::query::operator::{Criterion, Operator};
use crate::query::render::format_field;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Caller-supplied adjustment applied to a relation query before it runs
pub type Constraint = Arc<dyn Fn(QueryBuilder) -> QueryBuilder + Send + Sync>;

/// How eager-loaded relations scope their target query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EagerStrategy {
    /// One `IN (...)` query per relation over the owner keys of the fetched parents
    #[default]
    Batch,
    /// One query per relation scoped by a correlated `EXISTS` over the parent predicates
    Exists,
}

/// A rendered predicate with its bound values
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Predicate {
    pub(crate) fragment: String,
    pub(crate) values: Vec<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Limit {
    Count(u64),
    Range { offset: u64, length: u64 },
}

/// A relation requested through `with`, possibly dotted (`posts.comments`)
#[derive(Clone)]
pub(crate) struct EagerRequest {
    pub(crate) path: String,
    pub(crate) constraint: Option<Constraint>,
}

impl fmt::Debug for EagerRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EagerRequest")
            .field("path", &self.path)
            .field("constrained", &self.constraint.is_some())
            .finish()
    }
}

/// Fluent query description against one table
///
/// # Examples
///
/// ```no_run
/// use lifebuoy::{table, OrmError};
///
/// # fn main() -> Result<(), OrmError> {
/// let adults = table("users")
///     .where_op("age", ">=", 18)
///     .where_in("status", ["active", "trial"])
///     .order_by_desc("created_at")
///     .limit(10)
///     .get()?;
/// # let _ = adults;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    pub(crate) table: String,
    pub(crate) from: Option<String>,
    pub(crate) schema: Option<ModelSchema>,
    pub(crate) connection: String,
    pub(crate) write_connection: String,
    pub(crate) primary_key: String,
    pub(crate) select_fields: Vec<String>,
    pub(crate) wheres: Vec<Predicate>,
    pub(crate) order_bys: Vec<String>,
    pub(crate) group_by: Option<String>,
    pub(crate) limit: Option<Limit>,
    pub(crate) eager: Vec<EagerRequest>,
    pub(crate) eager_strategy: EagerStrategy,
    pub(crate) error: Option<OrmError>,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryBuilder {
    /// An empty query on the default connection
    pub fn new() -> Self {
        Self {
            table: String::new(),
            from: None,
            schema: None,
            connection: String::new(),
            write_connection: String::new(),
            primary_key: "id".to_string(),
            select_fields: Vec::new(),
            wheres: Vec::new(),
            order_bys: Vec::new(),
            group_by: None,
            limit: None,
            eager: Vec::new(),
            eager_strategy: EagerStrategy::default(),
            error: None,
        }
    }

    /// A query pre-filled from a model schema: table, primary key, connections and
    /// the schema itself, so results come back as bound, snapshotted records.
    pub fn for_schema(schema: ModelSchema) -> Self {
        Self {
            table: schema.table().to_string(),
            connection: schema.connection().to_string(),
            write_connection: schema.write_connection().to_string(),
            primary_key: schema.primary_key().to_string(),
            schema: Some(schema),
            ..Self::new()
        }
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Read connection name (empty means the registry default)
    pub fn use_connection(mut self, name: impl Into<String>) -> Self {
        self.connection = name.into();
        self
    }

    /// Connection used for writes; falls back to the read connection when empty
    pub fn use_write_connection(mut self, name: impl Into<String>) -> Self {
        self.write_connection = name.into();
        self
    }

    pub fn primary_key(mut self, primary_key: impl Into<String>) -> Self {
        self.primary_key = primary_key.into();
        self
    }

    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.select_fields
            .extend(fields.into_iter().map(|field| format_field(field.as_ref())));
        self
    }

    /// Append a select expression verbatim (not quoted, not sanitized)
    pub fn select_raw(mut self, raw: impl Into<String>) -> Self {
        self.select_fields.push(raw.into());
        self
    }

    /// Replace the FROM target verbatim (not quoted, not sanitized)
    pub fn from_raw(mut self, raw: impl Into<String>) -> Self {
        self.from = Some(raw.into());
        self
    }

    /// Select from the table under an alias
    pub fn table_alias(self, alias: &str) -> Self {
        let from = format!("{} as {}", self.table, alias);
        self.from_raw(from)
    }

    /// `field = value`, or `field IS NULL` when the value is null
    pub fn where_eq(self, field: &str, value: impl Into<Value>) -> Self {
        self.where_cmp(field, Operator::Eq, value)
    }

    /// Predicate with an operator given as text
    ///
    /// An operator outside `=, <>, >, >=, <, <=, like` is recorded and returned as
    /// `OrmError::UnsupportedOperator` by the next terminal operation.
    pub fn where_op(mut self, field: &str, op: &str, value: impl Into<Value>) -> Self {
        match op.parse::<Operator>() {
            Ok(op) => self.where_cmp(field, op, value),
            Err(err) => {
                self.defer(err);
                self
            }
        }
    }

    /// Predicate with a typed operator
    ///
    /// A null value never binds: `=` (and every ordering operator) degrades to
    /// `IS NULL`, `<>` to `IS NOT NULL`.
    pub fn where_cmp(self, field: &str, op: Operator, value: impl Into<Value>) -> Self {
        let value = value.into();
        if value.is_null() {
            return match op {
                Operator::Ne => self.where_not_null(field),
                _ => self.where_null(field),
            };
        }
        let fragment = format!("{} {} ?", format_field(field), op.as_sql());
        self.push_where(fragment, vec![value])
    }

    /// Mapping form: one predicate per entry, in iteration order
    pub fn where_map<I, K, C>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, C)>,
        K: AsRef<str>,
        C: Into<Criterion>,
    {
        for (field, criterion) in entries {
            self = match criterion.into() {
                Criterion::Eq(value) => self.where_eq(field.as_ref(), value),
                Criterion::Cmp(op, value) => self.where_op(field.as_ref(), &op, value),
            };
        }
        self
    }

    pub fn where_null(self, field: &str) -> Self {
        let fragment = format!("{} IS NULL", format_field(field));
        self.push_where(fragment, Vec::new())
    }

    pub fn where_not_null(self, field: &str) -> Self {
        let fragment = format!("{} IS NOT NULL", format_field(field));
        self.push_where(fragment, Vec::new())
    }

    /// `field IN (?, ...)`; an empty list matches nothing
    pub fn where_in<I, V>(self, field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return self.push_where("0 = 1".to_string(), Vec::new());
        }
        let fragment = format!("{} IN ({})", format_field(field), placeholders(values.len()));
        self.push_where(fragment, values)
    }

    /// `field NOT IN (?, ...)`; an empty list matches everything
    pub fn where_not_in<I, V>(self, field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return self.push_where("1 = 1".to_string(), Vec::new());
        }
        let fragment = format!("{} NOT IN ({})", format_field(field), placeholders(values.len()));
        self.push_where(fragment, values)
    }

    pub fn where_between(self, field: &str, min: impl Into<Value>, max: impl Into<Value>) -> Self {
        let fragment = format!("{} BETWEEN ? AND ?", format_field(field));
        self.push_where(fragment, vec![min.into(), max.into()])
    }

    pub fn where_not_between(self, field: &str, min: impl Into<Value>, max: impl Into<Value>) -> Self {
        let fragment = format!("{} NOT BETWEEN ? AND ?", format_field(field));
        self.push_where(fragment, vec![min.into(), max.into()])
    }

    /// `EXISTS (<subquery>)`, binding the subquery's values in place
    pub fn where_exists(mut self, subquery: &QueryBuilder) -> Self {
        match subquery.build() {
            Ok(statement) => {
                let fragment = format!("EXISTS ({})", statement.sql);
                self.push_where(fragment, statement.values)
            }
            Err(err) => {
                self.defer(err);
                self
            }
        }
    }

    /// Append a predicate verbatim (not quoted, not sanitized) with its bound values
    pub fn where_raw<I, V>(self, fragment: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.push_where(fragment.into(), values)
    }

    pub fn order_by(mut self, field: &str) -> Self {
        self.order_bys.push(format_field(field));
        self
    }

    pub fn order_by_desc(mut self, field: &str) -> Self {
        self.order_bys.push(format!("{} DESC", format_field(field)));
        self
    }

    /// Replace the GROUP BY clause
    pub fn group_by<I, S>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.group_by_clause(fields, false)
    }

    pub fn group_by_with_rollup<I, S>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.group_by_clause(fields, true)
    }

    /// `LIMIT count`
    pub fn limit(mut self, count: u64) -> Self {
        self.limit = Some(Limit::Count(count));
        self
    }

    /// `LIMIT offset, length`; a zero length renders `LIMIT offset`
    pub fn limit_offset(mut self, offset: u64, length: u64) -> Self {
        self.limit = Some(if length == 0 {
            Limit::Count(offset)
        } else {
            Limit::Range { offset, length }
        });
        self
    }

    /// Request eager loading of relations by name
    ///
    /// Dotted names load nested relations (`"posts.comments"`). Names the result
    /// schema does not declare are skipped.
    pub fn with<I, S>(mut self, relations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.eager.extend(relations.into_iter().map(|path| EagerRequest {
            path: path.into(),
            constraint: None,
        }));
        self
    }

    /// Request eager loading of one relation with an adjustment applied to its
    /// target query before it runs (for a dotted name, the innermost relation's query)
    pub fn with_constrained<F>(mut self, relation: impl Into<String>, constraint: F) -> Self
    where
        F: Fn(QueryBuilder) -> QueryBuilder + Send + Sync + 'static,
    {
        self.eager.push(EagerRequest {
            path: relation.into(),
            constraint: Some(Arc::new(constraint)),
        });
        self
    }

    pub fn eager_strategy(mut self, strategy: EagerStrategy) -> Self {
        self.eager_strategy = strategy;
        self
    }

    /// Model schema the results are bound to, if any
    pub fn schema(&self) -> Option<&ModelSchema> {
        self.schema.as_ref()
    }

    pub(crate) fn with_requests(mut self, requests: Vec<EagerRequest>) -> Self {
        self.eager.extend(requests);
        self
    }

    pub(crate) fn read_connection(&self) -> &str {
        &self.connection
    }

    pub(crate) fn write_target(&self) -> &str {
        if self.write_connection.is_empty() {
            &self.connection
        } else {
            &self.write_connection
        }
    }

    pub(crate) fn check(&self) -> Result<(), OrmError> {
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn defer(&mut self, err: OrmError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    fn push_where(mut self, fragment: String, values: Vec<Value>) -> Self {
        self.wheres.push(Predicate { fragment, values });
        self
    }

    fn group_by_clause<I, S>(mut self, fields: I, with_rollup: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let fields: Vec<String> = fields.into_iter().map(|f| format_field(f.as_ref())).collect();
        let mut clause = format!("GROUP BY {}", fields.join(", "));
        if with_rollup {
            clause.push_str(" WITH ROLLUP");
        }
        self.group_by = Some(clause);
        self
    }
}

pub(crate) fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}
