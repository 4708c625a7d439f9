//! A deterministic object graph served through a [`Resolver`].
//!
//! User `n` is named `id{n}`, is 16, 17 or 18 years old depending on `n % 3`, befriends users
//! `3n`, `3n + 1` and `3n + 2` and wrote reviews `3n + 300` to `3n + 302`.

use std::sync::atomic::{AtomicUsize, Ordering};

use query_engine_execution::{Error, Resolver};
use query_engine_metadata::metadata::{
    EdgeInfo, EdgeJoin, Metadata, Nullable, ObjectTypeInfo, ScalarType,
};
use query_engine_models::Item;

const FIRST_REVIEW: i64 = 300;

/// The mapping of the graph onto `user`, `review` and `friendships` tables.
pub fn social_metadata() -> Metadata {
    Metadata::empty()
        .with_object_type(
            "User",
            ObjectTypeInfo::new("User")
                .with_field("id", ScalarType::Bigint, Nullable::NonNullable)
                .with_field("name", ScalarType::Text, Nullable::Nullable)
                .with_field("age", ScalarType::Integer, Nullable::Nullable)
                .with_edge(
                    "friends",
                    EdgeInfo::many(
                        "User",
                        EdgeJoin::through("friendships", "user_id", "friend_id"),
                    ),
                )
                .with_edge(
                    "reviews",
                    EdgeInfo::many("Review", EdgeJoin::columns([("id", "author_id")])),
                ),
        )
        .with_object_type(
            "Review",
            ObjectTypeInfo::new("Review")
                .with_field("id", ScalarType::Bigint, Nullable::NonNullable)
                .with_field("business", ScalarType::Text, Nullable::Nullable)
                .with_field("rating", ScalarType::Integer, Nullable::Nullable)
                .with_field("author_id", ScalarType::Bigint, Nullable::Nullable)
                .with_edge(
                    "author",
                    EdgeInfo::one("User", EdgeJoin::columns([("author_id", "id")])),
                ),
        )
}

/// Serves users with ids below `users` and the reviews they wrote.
#[derive(Debug)]
pub struct MockGraph {
    users: i64,
    resolved: AtomicUsize,
}

impl MockGraph {
    pub fn new(users: i64) -> Self {
        MockGraph {
            users,
            resolved: AtomicUsize::new(0),
        }
    }

    /// How many objects were resolved so far.
    pub fn resolved(&self) -> usize {
        self.resolved.load(Ordering::SeqCst)
    }

    pub fn user(id: i64) -> Item {
        let age = 16 + id % 3;
        item(serde_json::json!({
            "id": id,
            "name": format!("id{id}"),
            "age": age,
        }))
    }

    pub fn review(id: i64) -> Item {
        item(serde_json::json!({
            "id": id,
            "business": format!("business{id}"),
            "rating": 1 + id % 5,
            "author_id": (id - FIRST_REVIEW) / 3,
        }))
    }

    fn has_user(&self, id: i64) -> bool {
        (0..self.users).contains(&id)
    }

    fn has_review(&self, id: i64) -> bool {
        id >= FIRST_REVIEW && self.has_user((id - FIRST_REVIEW) / 3)
    }
}

fn item(value: serde_json::Value) -> Item {
    match value {
        serde_json::Value::Object(map) => Item::from_map(map),
        _ => Item::default(),
    }
}

fn id_of(item: &Item, field: &str) -> Result<i64, Error> {
    item.get(field)
        .and_then(serde_json::Value::as_i64)
        .ok_or_else(|| Error::Resolver(format!("the object has no integer '{field}'")))
}

#[async_trait::async_trait]
impl Resolver for MockGraph {
    async fn resolve_object(&self, object_type: &str, id: i64) -> Result<Option<Item>, Error> {
        let found = match object_type {
            "User" if self.has_user(id) => Some(Self::user(id)),
            "Review" if self.has_review(id) => Some(Self::review(id)),
            "User" | "Review" => None,
            other => return Err(Error::Resolver(format!("unknown object type '{other}'"))),
        };
        if found.is_some() {
            self.resolved.fetch_add(1, Ordering::SeqCst);
        }
        Ok(found)
    }

    async fn resolve_edge(
        &self,
        object_type: &str,
        item: &Item,
        edge: &str,
    ) -> Result<Vec<i64>, Error> {
        match (object_type, edge) {
            ("User", "friends") => {
                let id = id_of(item, "id")?;
                Ok((3 * id..3 * id + 3).collect())
            }
            ("User", "reviews") => {
                let id = id_of(item, "id")?;
                Ok((3 * id + FIRST_REVIEW..3 * id + FIRST_REVIEW + 3).collect())
            }
            ("Review", "author") => Ok(vec![id_of(item, "author_id")?]),
            _ => Err(Error::Resolver(format!(
                "unknown edge '{edge}' of object type '{object_type}'"
            ))),
        }
    }

    async fn resolve_all(&self, object_type: &str) -> Result<Vec<i64>, Error> {
        match object_type {
            "User" => Ok((0..self.users).collect()),
            "Review" => Ok((0..self.users)
                .flat_map(|user| 3 * user + FIRST_REVIEW..3 * user + FIRST_REVIEW + 3)
                .collect()),
            other => Err(Error::Resolver(format!("unknown object type '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn users_cycle_through_three_ages() {
        let ages = (0..4)
            .map(|id| MockGraph::user(id).get("age").cloned())
            .collect::<Vec<_>>();
        assert_eq!(
            ages,
            vec![
                Some(serde_json::json!(16)),
                Some(serde_json::json!(17)),
                Some(serde_json::json!(18)),
                Some(serde_json::json!(16)),
            ]
        );
    }
}
