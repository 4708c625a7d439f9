//! Execute object queries in memory, fetching objects through a [`Resolver`].

pub mod predicate;

use futures::future::{try_join_all, BoxFuture};
use futures::FutureExt;
use tracing::{info_span, Instrument};

use query_engine_metadata::metadata::{self, Cardinality};
use query_engine_models::{
    unqualified, Item, Operation, OrderDirection, Query, QueryResponse,
};

use crate::error::{Error, QueryError};

/// Fetches objects and the targets of their edges on behalf of the [`MemoryExecutor`].
#[async_trait::async_trait]
pub trait Resolver: Send + Sync {
    /// Fetch the object of a type with the given id, if there is one.
    async fn resolve_object(&self, object_type: &str, id: i64) -> Result<Option<Item>, Error>;

    /// The ids of the objects an edge reaches from an object.
    async fn resolve_edge(
        &self,
        object_type: &str,
        item: &Item,
        edge: &str,
    ) -> Result<Vec<i64>, Error>;

    /// The ids of every object of a type. Needed for queries without ids.
    async fn resolve_all(&self, object_type: &str) -> Result<Vec<i64>, Error> {
        Err(QueryError::NotSupported(format!("listing every object of type '{object_type}'")).into())
    }
}

/// An item of an intermediate result, with the object it was produced from.
#[derive(Debug, Clone)]
struct Row {
    item: Item,
    /// The resolved object behind the item, kept through projections and renames so edges can
    /// still be resolved from it. `None` once results are aggregated.
    source: Option<Item>,
}

impl Row {
    fn object(item: Item) -> Self {
        Row {
            source: Some(item.clone()),
            item,
        }
    }

    fn aggregate(item: Item) -> Self {
        Row { item, source: None }
    }
}

/// The intermediate result of a pipeline.
#[derive(Debug, Clone)]
struct Rows {
    rows: Vec<Row>,
    /// The type of the items, while they are still objects of one type.
    object_type: Option<String>,
}

impl Rows {
    fn into_items(self) -> Vec<Item> {
        self.rows.into_iter().map(|row| row.item).collect()
    }
}

/// Runs queries against a [`Resolver`].
#[derive(Debug)]
pub struct MemoryExecutor<'a, R> {
    metadata: &'a metadata::Metadata,
    resolver: &'a R,
    validate: bool,
}

impl<'a, R: Resolver> MemoryExecutor<'a, R> {
    pub fn new(metadata: &'a metadata::Metadata, resolver: &'a R) -> Self {
        MemoryExecutor {
            metadata,
            resolver,
            validate: false,
        }
    }

    /// Check every resolved object against the fields declared for its type.
    #[must_use]
    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    pub async fn execute(&self, query: &Query) -> Result<QueryResponse, Error> {
        let rows = self
            .execute_query(query)
            .instrument(info_span!("Execute query in memory"))
            .await?;
        tracing::info!(
            object_type = query.source.object_type(),
            results = rows.rows.len(),
            "executed query in memory"
        );
        Ok(QueryResponse(rows.into_items()))
    }

    fn execute_query<'q>(&'q self, query: &'q Query) -> BoxFuture<'q, Result<Rows, Error>> {
        async move {
            let object_type = query.source.object_type();
            let ids = match query.source.ids() {
                Some(ids) => ids.to_vec(),
                None => self.resolver.resolve_all(object_type).await?,
            };
            let rows = Rows {
                rows: self.resolve_objects(object_type, &ids).await?,
                object_type: Some(object_type.to_string()),
            };
            self.execute_pipeline(rows, &query.operations).await
        }
        .boxed()
    }

    async fn resolve_objects(&self, object_type: &str, ids: &[i64]) -> Result<Vec<Row>, Error> {
        let info = self
            .metadata
            .lookup_object_type(object_type)
            .ok_or_else(|| QueryError::ObjectTypeNotFound(object_type.to_string()))?;

        let resolved = try_join_all(
            ids.iter()
                .map(|id| self.resolver.resolve_object(object_type, *id)),
        )
        .await?;

        let mut rows = vec![];
        for (id, item) in ids.iter().zip(resolved) {
            let Some(item) = item else {
                tracing::debug!(object_type, id, "object not found");
                continue;
            };
            if self.validate {
                info.validate_object(&item.0)
                    .map_err(|error| QueryError::InvalidObject {
                        object_type: object_type.to_string(),
                        id: *id,
                        error,
                    })?;
            }
            rows.push(Row::object(item));
        }
        Ok(rows)
    }

    fn execute_pipeline<'q>(
        &'q self,
        mut rows: Rows,
        operations: &'q [Operation],
    ) -> BoxFuture<'q, Result<Rows, Error>> {
        async move {
            for operation in operations {
                rows = self.execute_operation(rows, operation).await?;
            }
            Ok(rows)
        }
        .boxed()
    }

    async fn execute_operation(&self, mut rows: Rows, operation: &Operation) -> Result<Rows, Error> {
        match operation {
            Operation::Project { fields } => {
                for row in &mut rows.rows {
                    row.item = project(&row.item, fields);
                }
            }
            Operation::Where { predicate } => {
                rows.rows
                    .retain(|row| predicate::evaluate(predicate, &row.item));
            }
            Operation::Take { count } => {
                rows.rows.truncate(usize::try_from(*count).unwrap_or(usize::MAX));
            }
            Operation::Skip { count } => {
                let count = usize::try_from(*count)
                    .unwrap_or(usize::MAX)
                    .min(rows.rows.len());
                rows.rows.drain(..count);
            }
            Operation::Count => {
                let mut count = Item::default();
                count.insert("count".to_string(), rows.rows.len().into());
                rows = aggregated(vec![count]);
            }
            Operation::Nest { key } => {
                let values = rows.into_items().into_iter().map(Item::into_value).collect();
                let mut nested = Item::default();
                nested.insert(key.clone(), serde_json::Value::Array(values));
                rows = aggregated(vec![nested]);
            }
            Operation::Let { old, new } => {
                for row in &mut rows.rows {
                    row.item = rename(std::mem::take(&mut row.item), old, new);
                }
            }
            Operation::OrderBy { key, direction } => {
                let key = unqualified(key);
                rows.rows.sort_by(|left, right| {
                    let ordering =
                        predicate::compare_values(left.item.get(key), right.item.get(key));
                    match direction {
                        OrderDirection::Asc => ordering,
                        OrderDirection::Desc => ordering.reverse(),
                    }
                });
            }
            Operation::GroupBy { key } => {
                rows = aggregated(group_by(rows.into_items(), unqualified(key)));
            }
            Operation::Edge { edge, operations } => {
                rows = self.execute_edge(rows, edge, operations).await?;
            }
            Operation::Union { queries } => {
                for query in queries {
                    let branch = self.execute_query(query).await?;
                    if branch.object_type != rows.object_type {
                        rows.object_type = None;
                    }
                    rows.rows.extend(branch.rows);
                }
            }
        }
        Ok(rows)
    }

    /// Attach to every item the objects an edge reaches from it, after `operations`.
    async fn execute_edge(
        &self,
        rows: Rows,
        edge_name: &str,
        operations: &[Operation],
    ) -> Result<Rows, Error> {
        let object_type = rows
            .object_type
            .as_deref()
            .ok_or_else(|| QueryError::EdgeFromAggregate(edge_name.to_string()))?;
        let edge = self
            .metadata
            .lookup_object_type(object_type)
            .and_then(|info| info.edges.get(edge_name))
            .ok_or_else(|| QueryError::EdgeNotFound {
                object_type: object_type.to_string(),
                edge: edge_name.to_string(),
            })?;

        let reached = try_join_all(rows.rows.iter().map(|row| async {
            let source = row
                .source
                .as_ref()
                .ok_or_else(|| QueryError::EdgeFromAggregate(edge_name.to_string()))?;
            let ids = self
                .resolver
                .resolve_edge(object_type, source, edge_name)
                .await?;
            let targets = Rows {
                rows: self.resolve_objects(&edge.target, &ids).await?,
                object_type: Some(edge.target.clone()),
            };
            let targets = self.execute_pipeline(targets, operations).await?;
            Ok::<_, Error>(targets.into_items())
        }))
        .instrument(info_span!("Resolve edge", edge = edge_name))
        .await?;

        let rows = rows
            .rows
            .into_iter()
            .zip(reached)
            .map(|(mut row, targets)| {
                let value = match edge.cardinality {
                    Cardinality::Many => {
                        serde_json::Value::Array(targets.into_iter().map(Item::into_value).collect())
                    }
                    Cardinality::One => targets
                        .into_iter()
                        .next()
                        .map_or(serde_json::Value::Null, Item::into_value),
                };
                row.item.insert(edge_name.to_string(), value);
                row
            })
            .collect();

        Ok(Rows {
            rows,
            object_type: Some(object_type.to_string()),
        })
    }
}

fn aggregated(items: Vec<Item>) -> Rows {
    Rows {
        rows: items.into_iter().map(Row::aggregate).collect(),
        object_type: None,
    }
}

/// Keep the listed fields, in order. Missing fields project to null.
fn project(item: &Item, fields: &[String]) -> Item {
    let mut projected = Item::default();
    for field in fields {
        let field = unqualified(field);
        let value = item.get(field).cloned().unwrap_or(serde_json::Value::Null);
        projected.insert(Item::output_key(field), value);
    }
    projected
}

/// Rename a field in place, keeping the field order.
fn rename(item: Item, old: &str, new: &str) -> Item {
    let old = Item::output_key(unqualified(old));
    let new = Item::output_key(unqualified(new));
    Item(
        item.0
            .into_iter()
            .map(|(key, value)| if key == old { (new.clone(), value) } else { (key, value) })
            .collect(),
    )
}

/// Sort by the key and emit one `{"key", "items"}` object per distinct key value.
fn group_by(mut items: Vec<Item>, key: &str) -> Vec<Item> {
    items.sort_by(|left, right| predicate::compare_values(left.get(key), right.get(key)));

    let mut groups: Vec<(serde_json::Value, Vec<serde_json::Value>)> = vec![];
    for item in items {
        let value = item.get(key).cloned().unwrap_or(serde_json::Value::Null);
        match groups.last_mut() {
            Some((last, members)) if *last == value => members.push(item.into_value()),
            _ => groups.push((value, vec![item.into_value()])),
        }
    }

    groups
        .into_iter()
        .map(|(value, members)| {
            let mut group = Item::default();
            group.insert("key".to_string(), value);
            group.insert("items".to_string(), serde_json::Value::Array(members));
            group
        })
        .collect()
}
