//! Type definitions of an object query.

use serde::{Deserialize, Deserializer, Serialize};

use crate::expression::Expression;

/// A query: a source collection of objects and a pipeline of operations applied to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub source: Source,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operations: Vec<Operation>,
}

/// Where the objects of a query come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Source {
    /// Objects of a mapped type. `None` ids means every object of the type.
    #[serde(rename_all = "camelCase")]
    Collection {
        object_type: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ids: Option<Vec<i64>>,
    },
}

/// A single step of a query pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    /// Keep only the listed fields of each object.
    Project { fields: Vec<String> },
    /// Keep objects satisfying the predicate.
    Where {
        #[serde(deserialize_with = "deserialize_predicate")]
        predicate: Expression,
    },
    /// Keep the first `count` objects.
    Take { count: u32 },
    /// Drop the first `count` objects.
    Skip { count: u32 },
    /// Replace the collection with a single `{"count": n}` object.
    Count,
    /// Replace the collection with a single object holding the collection under `key`.
    Nest { key: String },
    /// Rename a field of each object.
    Let { old: String, new: String },
    /// Stable sort by a field.
    OrderBy {
        key: String,
        #[serde(default)]
        direction: OrderDirection,
    },
    /// Sort by a field and gather consecutive objects sharing it into
    /// `{"key": k, "items": [...]}` groups.
    GroupBy { key: String },
    /// Traverse a named edge. `operations` apply to the objects reached from each parent and
    /// the result is attached to the parent under the edge name.
    Edge {
        edge: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        operations: Vec<Operation>,
    },
    /// Append the results of independent queries.
    Union { queries: Vec<Query> },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

impl Query {
    /// A query over every object of a type.
    pub fn collection(object_type: impl Into<String>) -> Self {
        Query {
            source: Source::Collection {
                object_type: object_type.into(),
                ids: None,
            },
            operations: vec![],
        }
    }

    /// A query over the objects of a type with the given ids.
    pub fn with_ids(object_type: impl Into<String>, ids: impl IntoIterator<Item = i64>) -> Self {
        Query {
            source: Source::Collection {
                object_type: object_type.into(),
                ids: Some(ids.into_iter().collect()),
            },
            operations: vec![],
        }
    }
}

impl Source {
    pub fn object_type(&self) -> &str {
        match self {
            Source::Collection { object_type, .. } => object_type,
        }
    }

    pub fn ids(&self) -> Option<&[i64]> {
        match self {
            Source::Collection { ids, .. } => ids.as_deref(),
        }
    }
}

impl Operation {
    /// Operations that turn the collection into a single object.
    pub fn is_aggregation(&self) -> bool {
        matches!(
            self,
            Operation::Count | Operation::Nest { .. } | Operation::GroupBy { .. }
        )
    }
}

/// Predicates in query files may be written as text or as an expression tree.
fn deserialize_predicate<'de, D>(deserializer: D) -> Result<Expression, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PredicateInput {
        Text(String),
        Tree(Expression),
    }

    match PredicateInput::deserialize(deserializer)? {
        PredicateInput::Text(text) => text.parse().map_err(serde::de::Error::custom),
        PredicateInput::Tree(expression) => Ok(expression),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::Literal;
    use query_engine_metadata::metadata::ComparisonOperator;
    use serde_json::json;

    #[test]
    fn predicates_deserialize_from_text() {
        let query: Query = serde_json::from_value(json!({
            "source": { "type": "collection", "objectType": "User", "ids": [1, 2] },
            "operations": [
                { "type": "where", "predicate": "user.age >= 16" },
                { "type": "order_by", "key": "age", "direction": "desc" },
                { "type": "edge", "edge": "friends", "operations": [ { "type": "take", "count": 3 } ] }
            ]
        }))
        .expect("query should deserialize");

        assert_eq!(query.source.object_type(), "User");
        assert_eq!(query.source.ids(), Some([1, 2].as_slice()));
        assert_eq!(
            query.operations[0],
            Operation::Where {
                predicate: Expression::BinaryComparison {
                    field: "age".into(),
                    operator: ComparisonOperator::GreaterThanOrEqualTo,
                    value: Literal::Integer(16),
                }
            }
        );
        assert_eq!(
            query.operations[1],
            Operation::OrderBy {
                key: "age".into(),
                direction: OrderDirection::Desc
            }
        );
        assert_eq!(
            query.operations[2],
            Operation::Edge {
                edge: "friends".into(),
                operations: vec![Operation::Take { count: 3 }]
            }
        );
    }

    #[test]
    fn malformed_text_predicate_is_a_deserialization_error() {
        let result = serde_json::from_value::<Operation>(json!({
            "type": "where",
            "predicate": "age >="
        }));
        assert!(result.is_err());
    }
}
