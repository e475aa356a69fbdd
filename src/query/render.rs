//! SQL rendering.
//!
//! Turns builder state plus a statement kind into exactly one SQL string with
//! positional `?` placeholders. Bound values are ordered write values first, then
//! predicate values, matching placeholder order in every statement kind.

use crate::executor::{OrmError, Row};
use crate::query::builder::{placeholders, Limit, QueryBuilder};
use crate::value::to_bindable;
use serde_json::Value;

/// A rendered statement and its bound values
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub values: Vec<Value>,
}

/// Statement kind selected by a terminal operation
#[derive(Debug, Clone)]
pub(crate) enum Method {
    Select,
    Insert(Row),
    Update(Row),
    Delete,
}

/// Quote a field reference
///
/// `name` renders as `` `name` ``, `posts.name` as ``posts.`name` `` and `*` is left
/// bare (`posts.*`).
pub(crate) fn format_field(field: &str) -> String {
    let (table, column) = match field.split_once('.') {
        Some((table, column)) => (Some(table), column),
        None => (None, field),
    };
    let column = if column == "*" {
        column.to_string()
    } else {
        format!("`{column}`")
    };
    match table {
        Some(table) if !table.is_empty() => format!("{table}.{column}"),
        _ => column,
    }
}

impl QueryBuilder {
    /// Render the SELECT statement this builder describes
    ///
    /// # Errors
    ///
    /// Returns the first error recorded while accumulating clauses.
    pub fn build(&self) -> Result<Statement, OrmError> {
        self.render(&Method::Select)
    }

    /// SQL text of [`build`](Self::build)
    pub fn to_sql(&self) -> Result<String, OrmError> {
        Ok(self.build()?.sql)
    }

    pub(crate) fn render(&self, method: &Method) -> Result<Statement, OrmError> {
        self.check()?;

        let table = self.from.as_deref().unwrap_or(&self.table);
        let mut values: Vec<Value> = Vec::new();
        let mut parts: Vec<String> = Vec::new();

        match method {
            Method::Select => {
                let select = if self.select_fields.is_empty() {
                    "*".to_string()
                } else {
                    self.select_fields.join(", ")
                };
                parts.push(format!("SELECT {select} FROM {table}"));
                if let Some(clause) = self.where_clause(&mut values) {
                    parts.push(clause);
                }
                if let Some(group_by) = &self.group_by {
                    parts.push(group_by.clone());
                }
                if !self.order_bys.is_empty() {
                    parts.push(format!("ORDER BY {}", self.order_bys.join(", ")));
                }
                if let Some(limit) = self.limit {
                    parts.push(match limit {
                        Limit::Count(count) => format!("LIMIT {count}"),
                        Limit::Range { offset, length } => format!("LIMIT {offset}, {length}"),
                    });
                }
            }
            Method::Insert(data) => {
                let fields: Vec<String> = data.keys().map(|key| format_field(key)).collect();
                values.extend(data.values().cloned().map(to_bindable));
                parts.push(format!(
                    "INSERT INTO {table} ({}) VALUES ({})",
                    fields.join(", "),
                    placeholders(fields.len())
                ));
            }
            Method::Update(data) => {
                let assignments: Vec<String> =
                    data.keys().map(|key| format!("{} = ?", format_field(key))).collect();
                values.extend(data.values().cloned().map(to_bindable));
                parts.push(format!("UPDATE {table} SET {}", assignments.join(", ")));
                if let Some(clause) = self.where_clause(&mut values) {
                    parts.push(clause);
                }
            }
            Method::Delete => {
                parts.push(format!("DELETE FROM {table}"));
                if let Some(clause) = self.where_clause(&mut values) {
                    parts.push(clause);
                }
            }
        }

        Ok(Statement {
            sql: parts.join(" "),
            values,
        })
    }

    fn where_clause(&self, values: &mut Vec<Value>) -> Option<String> {
        if self.wheres.is_empty() {
            return None;
        }
        let fragments: Vec<&str> = self.wheres.iter().map(|p| p.fragment.as_str()).collect();
        values.extend(self.wheres.iter().flat_map(|p| p.values.iter().cloned()));
        Some(format!("WHERE {}", fragments.join(" AND ")))
    }
}
