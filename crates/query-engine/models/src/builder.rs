//! Fluent construction of queries.

use crate::expression::Expression;
use crate::parse::ParseError;
use crate::query::{Operation, OrderDirection, Query};

/// Builds a [`Query`] one operation at a time.
///
/// [`QueryBuilder::edge`] opens a scope: operations added afterwards apply to the objects
/// reached through the edge, until [`QueryBuilder::parent`] closes the scope again.
///
/// ```
/// use query_engine_models::QueryBuilder;
///
/// let query = QueryBuilder::with_ids("User", [1])
///     .project(["id", "name"])
///     .edge("friends")
///     .take(3)
///     .parent()
///     .build();
/// assert_eq!(query.operations.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    query: Query,
    /// Open edge scopes, innermost last.
    scopes: Vec<(String, Vec<Operation>)>,
}

impl QueryBuilder {
    /// Start a query over every object of a type.
    pub fn new(object_type: impl Into<String>) -> Self {
        QueryBuilder {
            query: Query::collection(object_type),
            scopes: vec![],
        }
    }

    /// Start a query over the objects of a type with the given ids.
    pub fn with_ids(object_type: impl Into<String>, ids: impl IntoIterator<Item = i64>) -> Self {
        QueryBuilder {
            query: Query::with_ids(object_type, ids),
            scopes: vec![],
        }
    }

    fn push(mut self, operation: Operation) -> Self {
        match self.scopes.last_mut() {
            Some((_, operations)) => operations.push(operation),
            None => self.query.operations.push(operation),
        }
        self
    }

    #[must_use]
    pub fn project<S: Into<String>>(self, fields: impl IntoIterator<Item = S>) -> Self {
        self.push(Operation::Project {
            fields: fields.into_iter().map(Into::into).collect(),
        })
    }

    #[must_use]
    pub fn filter(self, predicate: Expression) -> Self {
        self.push(Operation::Where { predicate })
    }

    /// Filter by a textual predicate such as `user.age >= 16`.
    pub fn where_(self, predicate: &str) -> Result<Self, ParseError> {
        Ok(self.filter(predicate.parse()?))
    }

    #[must_use]
    pub fn take(self, count: u32) -> Self {
        self.push(Operation::Take { count })
    }

    #[must_use]
    pub fn skip(self, count: u32) -> Self {
        self.push(Operation::Skip { count })
    }

    #[must_use]
    pub fn count(self) -> Self {
        self.push(Operation::Count)
    }

    #[must_use]
    pub fn nest(self, key: impl Into<String>) -> Self {
        self.push(Operation::Nest { key: key.into() })
    }

    #[must_use]
    pub fn let_(self, old: impl Into<String>, new: impl Into<String>) -> Self {
        self.push(Operation::Let {
            old: old.into(),
            new: new.into(),
        })
    }

    #[must_use]
    pub fn order_by(self, key: impl Into<String>) -> Self {
        self.push(Operation::OrderBy {
            key: key.into(),
            direction: OrderDirection::Asc,
        })
    }

    #[must_use]
    pub fn order_by_desc(self, key: impl Into<String>) -> Self {
        self.push(Operation::OrderBy {
            key: key.into(),
            direction: OrderDirection::Desc,
        })
    }

    #[must_use]
    pub fn group_by(self, key: impl Into<String>) -> Self {
        self.push(Operation::GroupBy { key: key.into() })
    }

    #[must_use]
    pub fn union(self, query: Query) -> Self {
        self.push(Operation::Union {
            queries: vec![query],
        })
    }

    /// Traverse an edge. Following operations apply to the reached objects.
    #[must_use]
    pub fn edge(mut self, edge: impl Into<String>) -> Self {
        self.scopes.push((edge.into(), vec![]));
        self
    }

    /// Close the innermost edge scope. Without an open scope this does nothing.
    #[must_use]
    pub fn parent(mut self) -> Self {
        match self.scopes.pop() {
            Some((edge, operations)) => self.push(Operation::Edge { edge, operations }),
            None => self,
        }
    }

    /// Close any open scopes and return the query.
    pub fn build(mut self) -> Query {
        while !self.scopes.is_empty() {
            self = self.parent();
        }
        self.query
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    #[test]
    fn parent_closes_one_scope() {
        let query = QueryBuilder::with_ids("User", [1])
            .edge("friends")
            .edge("friends")
            .take(2)
            .parent()
            .project(["name"])
            .parent()
            .count()
            .build();

        assert_eq!(
            query.operations,
            vec![
                Operation::Edge {
                    edge: "friends".into(),
                    operations: vec![
                        Operation::Edge {
                            edge: "friends".into(),
                            operations: vec![Operation::Take { count: 2 }],
                        },
                        Operation::Project {
                            fields: vec!["name".into()]
                        },
                    ],
                },
                Operation::Count,
            ]
        );
    }

    #[test]
    fn build_closes_open_scopes() {
        let query = QueryBuilder::new("User")
            .edge("reviews")
            .edge("author")
            .build();
        assert_eq!(
            query.operations,
            vec![Operation::Edge {
                edge: "reviews".into(),
                operations: vec![Operation::Edge {
                    edge: "author".into(),
                    operations: vec![],
                }],
            }]
        );
    }

    #[test]
    fn parent_without_scope_is_ignored() {
        let query = QueryBuilder::new("User").parent().take(1).build();
        assert_eq!(query.operations, vec![Operation::Take { count: 1 }]);
    }

    #[test]
    fn textual_predicates_are_parsed() {
        assert!(QueryBuilder::new("User").where_("user.age >= 16").is_ok());
        assert!(QueryBuilder::new("User").where_("user.age >=").is_err());
    }
}
