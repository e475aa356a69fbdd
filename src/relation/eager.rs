//! Eager loading.
//!
//! For every relation requested with `with`, one target query runs for the whole
//! parent result set, and the fetched rows are split onto the parents in memory by
//! their link values. Dotted requests (`posts.comments`) hand the remainder of the
//! path to the target query, so each nesting level costs one more query per
//! relation.

use crate::collection::Collection;
use crate::executor::OrmError;
use crate::model::{Record, Related};
use crate::query::builder::{EagerRequest, EagerStrategy};
use crate::query::{Constraint, QueryBuilder};
use crate::relation::def::{RelationDef, RelationKind};
use crate::value::link_key;
use heck::ToSnakeCase;
use indexmap::IndexMap;
use std::collections::HashMap;

#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

/// Requests sharing one top-level relation name
#[derive(Default)]
struct RequestGroup {
    constraints: Vec<Constraint>,
    nested: Vec<EagerRequest>,
}

fn group_requests(requests: &[EagerRequest]) -> IndexMap<String, RequestGroup> {
    let mut groups: IndexMap<String, RequestGroup> = IndexMap::new();
    for request in requests {
        let (head, rest) = match request.path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (request.path.as_str(), None),
        };
        let group = groups.entry(head.trim().to_snake_case()).or_default();
        match rest {
            Some(rest) => group.nested.push(EagerRequest {
                path: rest.to_string(),
                constraint: request.constraint.clone(),
            }),
            None => group.constraints.extend(request.constraint.clone()),
        }
    }
    groups
}

/// Resolve `query`'s eager-load requests onto `records`
///
/// Requests naming relations the result schema does not declare are skipped.
pub(crate) fn load_relations(query: &QueryBuilder, records: &mut [Record]) -> Result<(), OrmError> {
    let Some(schema) = query.schema() else {
        log::debug!("Skipping eager loads on {}: results are not bound to a model schema", query.table);
        return Ok(());
    };

    for (name, group) in group_requests(&query.eager) {
        let Some(relation) = schema.relation(&name) else {
            log::debug!("Skipping eager load of {} on {}: no such relation", name, schema.table());
            continue;
        };

        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::eager_load_span(relation.name(), records.len()).entered();

        let target_query = match query.eager_strategy {
            EagerStrategy::Batch => relation.batch_query(records)?,
            EagerStrategy::Exists if records.is_empty() => None,
            EagerStrategy::Exists => Some(relation.correlated_query(query)?),
        };

        let related = match target_query {
            Some(target_query) => group
                .constraints
                .iter()
                .fold(target_query, |q, constraint| constraint(q))
                .eager_strategy(query.eager_strategy)
                .with_requests(group.nested)
                .get()?,
            None => Collection::default(),
        };

        attach(relation, records, &related);
    }
    Ok(())
}

/// Split `related` onto the owners by link value
fn attach(relation: &RelationDef, owners: &mut [Record], related: &Collection) {
    let (owner_field, target_field) = relation.link_fields();

    let mut by_key: HashMap<String, Vec<&Record>> = HashMap::new();
    for candidate in related.iter() {
        if let Some(key) = candidate.get(target_field).and_then(link_key) {
            by_key.entry(key).or_default().push(candidate);
        }
    }

    for owner in owners.iter_mut() {
        let matches = owner
            .get(owner_field)
            .and_then(link_key)
            .and_then(|key| by_key.get(&key));

        let attached = match relation.kind() {
            RelationKind::HasMany => Related::Many(
                matches
                    .map(|found| found.iter().map(|record| (*record).clone()).collect())
                    .unwrap_or_default(),
            ),
            RelationKind::HasOne | RelationKind::BelongsTo => Related::One(
                matches
                    .and_then(|found| found.first())
                    .map(|record| Box::new((*record).clone())),
            ),
        };
        owner.set_relation(relation.name(), attached);
    }
}
