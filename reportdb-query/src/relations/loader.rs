//! Batched relation loading.
//!
//! Every include runs one query for all parent rows at once: the child rows
//! whose reference columns match any parent key (`IN` list, row-value `IN`
//! for composite keys). Children are then grouped by key, paginated per
//! parent and attached under the relation name. `_count` includes run one
//! grouped `COUNT(*)` per relation.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::QueryResult;
use crate::filter::{Filter, FilterValue};
use crate::meta::RelationMeta;
use crate::operations::{Projection, select_list, strip_hidden};
use crate::sql::{Scope, SqlBuilder, quote_identifier};
use crate::traits::{BoxFuture, QueryEngine, Row};
use crate::types::order_clause;

use super::include::IncludeSpec;

/// Key under which relation counts are attached.
pub const COUNT_KEY: &str = "_count";

/// Load `includes` and `counts` for `rows`, recursively.
pub(crate) fn load_relations<'a, E: QueryEngine>(
    engine: &'a E,
    rows: &'a mut [Row],
    includes: &'a [IncludeSpec],
    counts: &'a [&'static RelationMeta],
) -> BoxFuture<'a, QueryResult<()>> {
    Box::pin(async move {
        if rows.is_empty() {
            return Ok(());
        }
        for include in includes {
            load_include(engine, rows, include).await?;
        }
        for relation in counts {
            load_count(engine, rows, relation).await?;
        }
        Ok(())
    })
}

async fn load_include<E: QueryEngine>(engine: &E, rows: &mut [Row], include: &IncludeSpec) -> QueryResult<()> {
    let relation = include.relation;
    let target = relation.target;
    let keys = parent_keys(rows, relation.fields);

    let mut children_by_key: HashMap<String, Vec<Row>> = HashMap::new();
    if !keys.is_empty() {
        let projection = Projection {
            select: include.select.clone(),
            omit: Vec::new(),
            includes: include.includes.clone(),
            counts: include.counts.clone(),
        };
        let columns = projection.columns(target, relation.references)?;

        let filter = Filter::RowIn(
            relation.reference_columns.iter().map(|c| c.to_string()).collect(),
            keys.into_values().collect(),
        )
        .and_then(include.filter.clone());

        let scope = Scope::root(target.table);
        let mut builder = SqlBuilder::new();
        builder
            .push("SELECT ")
            .push(select_list(&columns.fields))
            .push(" FROM ")
            .push(scope.from_clause())
            .push(" WHERE ");
        filter.to_sql(&scope, &mut builder);
        builder.push(order_clause(&include.order_by, &scope));
        let statement = builder.build();

        debug!(relation = relation.name, model = relation.model, "Loading include");
        let mut children = engine.query(&statement.sql, statement.params).await?;
        load_relations(engine, &mut children, &include.includes, &include.counts).await?;

        for mut child in children {
            let Some(key) = row_key(&child, relation.references) else {
                continue;
            };
            strip_hidden(&mut child, &columns.hidden);
            children_by_key.entry(key).or_default().push(child);
        }
    }

    for row in rows.iter_mut() {
        let related = row_key(row, relation.fields)
            .and_then(|key| children_by_key.get(&key))
            .cloned()
            .unwrap_or_default();
        let related = include.paginate(related);
        let value = if relation.list {
            Value::Array(related.into_iter().map(Value::Object).collect())
        } else {
            related
                .into_iter()
                .next()
                .map(Value::Object)
                .unwrap_or(Value::Null)
        };
        row.insert(relation.name.to_string(), value);
    }
    Ok(())
}

async fn load_count<E: QueryEngine>(engine: &E, rows: &mut [Row], relation: &'static RelationMeta) -> QueryResult<()> {
    let keys = parent_keys(rows, relation.fields);

    let mut totals: HashMap<String, i64> = HashMap::new();
    if !keys.is_empty() {
        let scope = Scope::root(relation.target.table);
        let key_aliases: Vec<String> = (0..relation.reference_columns.len())
            .map(|i| format!("k{}", i))
            .collect();
        let grouped: Vec<String> = relation
            .reference_columns
            .iter()
            .map(|c| quote_identifier(c))
            .collect();
        let selected: Vec<String> = grouped
            .iter()
            .zip(&key_aliases)
            .map(|(col, alias)| format!("{} AS {}", col, quote_identifier(alias)))
            .collect();

        let filter = Filter::RowIn(
            relation.reference_columns.iter().map(|c| c.to_string()).collect(),
            keys.into_values().collect(),
        );
        let mut builder = SqlBuilder::new();
        builder.push(format!(
            "SELECT {}, COUNT(*) AS {} FROM {} WHERE ",
            selected.join(", "),
            quote_identifier(COUNT_KEY),
            scope.from_clause()
        ));
        filter.to_sql(&scope, &mut builder);
        builder.push(format!(" GROUP BY {}", grouped.join(", ")));
        let statement = builder.build();

        debug!(relation = relation.name, model = relation.model, "Counting relation");
        let aliases: Vec<&str> = key_aliases.iter().map(String::as_str).collect();
        for row in engine.query(&statement.sql, statement.params).await? {
            if let Some(key) = row_key(&row, &aliases) {
                let count = row.get(COUNT_KEY).and_then(Value::as_i64).unwrap_or(0);
                totals.insert(key, count);
            }
        }
    }

    for row in rows.iter_mut() {
        let count = row_key(row, relation.fields)
            .and_then(|key| totals.get(&key).copied())
            .unwrap_or(0);
        let entry = row
            .entry(COUNT_KEY.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(counts) = entry {
            counts.insert(relation.name.to_string(), Value::from(count));
        }
    }
    Ok(())
}

/// Distinct non-null key tuples of `fields` across `rows`, in first-seen order.
fn parent_keys(rows: &[Row], fields: &[&str]) -> IndexMap<String, Vec<FilterValue>> {
    let mut keys = IndexMap::new();
    for row in rows {
        if let Some(key) = row_key(row, fields) {
            keys.entry(key).or_insert_with(|| {
                fields
                    .iter()
                    .map(|f| row.get(*f).map(FilterValue::from_json).unwrap_or(FilterValue::Null))
                    .collect()
            });
        }
    }
    keys
}

/// Comparable encoding of the values of `fields`, or `None` if any is null.
fn row_key(row: &Row, fields: &[&str]) -> Option<String> {
    let mut values = Vec::with_capacity(fields.len());
    for field in fields {
        match row.get(*field) {
            None | Some(Value::Null) => return None,
            Some(value) => values.push(value.clone()),
        }
    }
    serde_json::to_string(&values).ok()
}
