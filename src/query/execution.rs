//! Terminal operations for [`QueryBuilder`].
//!
//! Each terminal renders one statement, executes it through the connection
//! registry and records it in the [`QueryLog`]. Reads with eager-load requests
//! issue one further statement per requested relation (see `relation::eager`).

use crate::collection::{Collection, Page};
use crate::executor::{OrmError, Row};
use crate::metrics::QueryLog;
use crate::model::{IntoAttributes, Record};
use crate::pool::ConnectionRegistry;
use crate::query::builder::QueryBuilder;
use crate::query::render::{format_field, Method, Statement};
use crate::relation::eager;
use crate::value::as_f64;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Instant;

/// Largest integer SQLite accepts in a `LIMIT` clause
const MAX_LIMIT: u64 = i64::MAX as u64;

impl QueryBuilder {
    /// Execute the SELECT and return every row as a record, with requested
    /// relations attached
    ///
    /// # Errors
    ///
    /// Returns a deferred builder error, `OrmError::ConnectionNotFound`, or the
    /// driver error of the query or of any eager-load query.
    pub fn get(self) -> Result<Collection, OrmError> {
        let statement = self.render(&Method::Select)?;
        let rows = self.run_read(&statement)?;
        self.materialize(rows)
    }

    /// [`get`](Self::get), deserializing each record into `T`
    pub fn get_as<T: DeserializeOwned>(self) -> Result<Vec<T>, OrmError> {
        self.get()?.deserialize()
    }

    /// First matching record, or `None` when nothing matches
    pub fn first(self) -> Result<Option<Record>, OrmError> {
        let mut records = self.limit(1).get()?;
        Ok(records.shift())
    }

    pub fn first_as<T: DeserializeOwned>(self) -> Result<Option<T>, OrmError> {
        self.first()?.map(|record| record.deserialize()).transpose()
    }

    /// Record whose primary key equals `key`
    pub fn find(self, key: impl Into<Value>) -> Result<Option<Record>, OrmError> {
        let primary_key = self.primary_key.clone();
        self.where_eq(&primary_key, key).first()
    }

    /// Number of matching rows
    pub fn count(self) -> Result<u64, OrmError> {
        let value = self.aggregate("COUNT(1) as count".to_string(), "count")?;
        Ok(value.as_u64().or_else(|| as_f64(&value).map(|f| f as u64)).unwrap_or(0))
    }

    /// Sum of `field` over matching rows; `0.0` when there are none
    pub fn sum(self, field: &str) -> Result<f64, OrmError> {
        let expr = format!("SUM({}) as sum", format_field(field));
        let value = self.aggregate(expr, "sum")?;
        Ok(as_f64(&value).unwrap_or(0.0))
    }

    /// Average of `field` over matching rows; `None` when there are none
    pub fn avg(self, field: &str) -> Result<Option<f64>, OrmError> {
        let expr = format!("AVG({}) as avg", format_field(field));
        let value = self.aggregate(expr, "avg")?;
        Ok(as_f64(&value))
    }

    /// Insert one row
    ///
    /// Returns the inserted record: the generated primary key followed by `data`.
    /// An explicit, non-null primary key in `data` is kept instead of the generated
    /// one. Returns `None` when the driver reports no row written.
    ///
    /// # Errors
    ///
    /// Returns `OrmError::EmptyWritePayload` before any statement is issued when
    /// `data` is empty.
    pub fn insert(self, data: impl IntoAttributes) -> Result<Option<Record>, OrmError> {
        self.check()?;
        let data = data.into_attributes()?;
        if data.is_empty() {
            return Err(OrmError::EmptyWritePayload("insert"));
        }

        let statement = self.render(&Method::Insert(data.clone()))?;
        let (affected, generated) = self.run_write(&statement, true)?;
        if affected == 0 {
            return Ok(None);
        }

        let key = match data.get(&self.primary_key) {
            Some(explicit) if !explicit.is_null() => explicit.clone(),
            _ => generated,
        };
        let mut attributes = Row::new();
        attributes.insert(self.primary_key.clone(), key);
        for (field, value) in data {
            if field != self.primary_key {
                attributes.insert(field, value);
            }
        }

        Ok(Some(match &self.schema {
            Some(schema) => schema.hydrate(attributes),
            None => Record::new(attributes),
        }))
    }

    /// Update matching rows (every row when no predicate was added); returns the
    /// number of rows affected
    ///
    /// # Errors
    ///
    /// Returns `OrmError::EmptyWritePayload` before any statement is issued when
    /// `data` is empty.
    pub fn update(self, data: impl IntoAttributes) -> Result<u64, OrmError> {
        self.check()?;
        let data = data.into_attributes()?;
        if data.is_empty() {
            return Err(OrmError::EmptyWritePayload("update"));
        }
        let statement = self.render(&Method::Update(data))?;
        Ok(self.run_write(&statement, false)?.0)
    }

    /// Delete matching rows (every row when no predicate was added); returns the
    /// number of rows affected
    pub fn delete(self) -> Result<u64, OrmError> {
        let statement = self.render(&Method::Delete)?;
        Ok(self.run_write(&statement, false)?.0)
    }

    /// One page of results plus the unpaged total
    ///
    /// `page` below 1 is treated as 1 and `per_page` below 1 as 1. The total is
    /// counted on a copy of the query before the limit is applied. Offset and
    /// page size saturate at the largest value SQLite accepts in `LIMIT`.
    pub fn paginate(self, per_page: u64, page: i64) -> Result<Page, OrmError> {
        let total = self.clone().count()?;
        let per_page = per_page.clamp(1, MAX_LIMIT);
        let page = page.max(1) as u64;
        let offset = (page - 1).saturating_mul(per_page).min(MAX_LIMIT);
        let items = self.limit_offset(offset, per_page).get()?;
        Ok(Page::new(items, total, per_page, page))
    }

    /// Turn fetched rows into records and resolve eager-load requests
    pub(crate) fn materialize(&self, rows: Vec<Row>) -> Result<Collection, OrmError> {
        let mut records: Vec<Record> = rows
            .into_iter()
            .map(|row| match &self.schema {
                Some(schema) => schema.hydrate(row),
                None => Record::new(row),
            })
            .collect();

        if !self.eager.is_empty() {
            eager::load_relations(self, &mut records)?;
        }
        Ok(Collection::new(records))
    }

    fn aggregate(mut self, expr: String, column: &str) -> Result<Value, OrmError> {
        self.select_fields = vec![expr];
        let statement = self.render(&Method::Select)?;
        let rows = self.run_read(&statement)?;
        Ok(rows
            .into_iter()
            .next()
            .and_then(|mut row| row.remove(column))
            .unwrap_or(Value::Null))
    }

    pub(crate) fn run_read(&self, statement: &Statement) -> Result<Vec<Row>, OrmError> {
        let connection = resolve_name(self.read_connection());
        let executor = ConnectionRegistry::acquire(&connection)?;

        log::debug!(
            "[{}] {} ({} bound value(s))",
            connection,
            statement.sql,
            statement.values.len()
        );
        let entry = QueryLog::record(&connection, &statement.sql, &statement.values);
        let started = Instant::now();
        let rows = executor.query_all(&statement.sql, &statement.values)?;
        QueryLog::record_cost(entry, started.elapsed());
        Ok(rows)
    }

    /// Execute a write; returns affected rows and, for inserts, the generated key
    pub(crate) fn run_write(&self, statement: &Statement, insert: bool) -> Result<(u64, Value), OrmError> {
        let connection = resolve_name(self.write_target());
        let executor = ConnectionRegistry::acquire(&connection)?;

        log::debug!(
            "[{}] {} ({} bound value(s))",
            connection,
            statement.sql,
            statement.values.len()
        );
        let entry = QueryLog::record(&connection, &statement.sql, &statement.values);
        let started = Instant::now();
        let outcome = if insert {
            executor.insert(&statement.sql, &statement.values)?
        } else {
            (executor.execute(&statement.sql, &statement.values)?, Value::Null)
        };
        QueryLog::record_cost(entry, started.elapsed());
        Ok(outcome)
    }
}

pub(crate) fn resolve_name(name: &str) -> String {
    if name.is_empty() {
        ConnectionRegistry::default_name()
    } else {
        name.to_string()
    }
}
