//! On-demand relation resolution for a single record.

use crate::executor::OrmError;
use crate::model::{Record, Related};
use crate::relation::def::RelationKind;

impl Record {
    /// Resolve a declared relation for this record with one query
    ///
    /// Returns `None` when the record's schema declares no relation under `name`.
    /// A record without a link value resolves to `Related::One(None)` or an empty
    /// collection without issuing a query. The result is returned, not attached;
    /// use [`load`](Record::load) to attach it.
    ///
    /// # Errors
    ///
    /// Returns `OrmError::NotPersistable` for a record without a schema,
    /// `OrmError::RelationTargetTypeInvalid` for a relation whose target is not
    /// persistable, and any error of the executed query.
    pub fn related(&self, name: &str) -> Result<Option<Related>, OrmError> {
        let schema = self.schema.as_ref().ok_or(OrmError::NotPersistable)?;
        let Some(relation) = schema.relation(name) else {
            return Ok(None);
        };

        let found = match relation.scoped_query(self)? {
            Some(query) => query.get()?,
            None => Default::default(),
        };

        Ok(Some(match relation.kind() {
            RelationKind::HasMany => Related::Many(found),
            RelationKind::HasOne | RelationKind::BelongsTo => {
                Related::One(found.into_iter().next().map(Box::new))
            }
        }))
    }

    /// Resolve a relation and attach it under its snake_case name
    ///
    /// Returns whether the relation exists.
    pub fn load(&mut self, name: &str) -> Result<bool, OrmError> {
        let Some(related) = self.related(name)? else {
            return Ok(false);
        };
        let key = self
            .schema
            .as_ref()
            .and_then(|schema| schema.relation(name))
            .map(|relation| relation.name().to_string())
            .unwrap_or_else(|| name.to_string());
        self.set_relation(key, related);
        Ok(true)
    }
}
