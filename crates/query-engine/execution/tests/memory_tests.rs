//! Run object queries in memory against the mock social graph.

use serde_json::json;
use similar_asserts::assert_eq;

use query_engine_execution::{Error, MemoryExecutor, QueryError};
use query_engine_metadata::metadata::{Nullable, ObjectTypeInfo, ScalarType, ValidationError};
use query_engine_models::{Query, QueryBuilder};
use tests_common::{social_metadata, MockGraph};

async fn run(query: Query) -> Vec<serde_json::Value> {
    run_with(&MockGraph::new(100), query).await
}

async fn run_with(graph: &MockGraph, query: Query) -> Vec<serde_json::Value> {
    tests_common::init_logging();
    let metadata = social_metadata();
    MemoryExecutor::new(&metadata, graph)
        .execute(&query)
        .await
        .expect("query runs")
        .into_list()
}

async fn fail(query: Query) -> Error {
    let metadata = social_metadata();
    MemoryExecutor::new(&metadata, &MockGraph::new(100))
        .execute(&query)
        .await
        .expect_err("query fails")
}

#[tokio::test]
async fn project_fields() {
    let query = QueryBuilder::with_ids("User", [1, 2, 3])
        .project(["id", "name"])
        .build();
    assert_eq!(
        run(query).await,
        vec![
            json!({":id": 1, "name": "id1"}),
            json!({":id": 2, "name": "id2"}),
            json!({":id": 3, "name": "id3"}),
        ]
    );
}

#[tokio::test]
async fn unknown_ids_are_skipped() {
    let graph = MockGraph::new(10);
    let query = QueryBuilder::with_ids("User", [1, 42, 2])
        .project(["name"])
        .build();
    assert_eq!(
        run_with(&graph, query).await,
        vec![json!({"name": "id1"}), json!({"name": "id2"})]
    );
    assert_eq!(graph.resolved(), 2);
}

#[tokio::test]
async fn filter_then_take() {
    let query = QueryBuilder::with_ids("User", 0..6)
        .where_("user.age >= 17")
        .expect("valid predicate")
        .take(3)
        .project(["id"])
        .build();
    assert_eq!(
        run(query).await,
        vec![json!({":id": 1}), json!({":id": 2}), json!({":id": 4})]
    );
}

#[tokio::test]
async fn skip_then_take() {
    let query = QueryBuilder::with_ids("User", [1, 2, 3, 4])
        .skip(1)
        .take(2)
        .project(["id"])
        .build();
    assert_eq!(run(query).await, vec![json!({":id": 2}), json!({":id": 3})]);
}

#[tokio::test]
async fn order_descending_is_stable() {
    let query = QueryBuilder::with_ids("User", [0, 1, 2, 3])
        .order_by_desc("age")
        .project(["id"])
        .build();
    assert_eq!(
        run(query).await,
        vec![
            json!({":id": 2}),
            json!({":id": 1}),
            json!({":id": 0}),
            json!({":id": 3}),
        ]
    );
}

#[tokio::test]
async fn group_by_key() {
    let query = QueryBuilder::with_ids("User", 0..6)
        .project(["id", "age"])
        .group_by("age")
        .build();
    assert_eq!(
        run(query).await,
        vec![
            json!({"key": 16, "items": [{":id": 0, "age": 16}, {":id": 3, "age": 16}]}),
            json!({"key": 17, "items": [{":id": 1, "age": 17}, {":id": 4, "age": 17}]}),
            json!({"key": 18, "items": [{":id": 2, "age": 18}, {":id": 5, "age": 18}]}),
        ]
    );
}

#[tokio::test]
async fn count_matches() {
    let query = QueryBuilder::with_ids("User", 0..6)
        .where_("age == 16")
        .expect("valid predicate")
        .count()
        .build();
    assert_eq!(run(query).await, vec![json!({"count": 2})]);
}

#[tokio::test]
async fn count_every_object_without_ids() {
    let query = QueryBuilder::new("User")
        .where_("age == 18")
        .expect("valid predicate")
        .count()
        .build();
    assert_eq!(
        run_with(&MockGraph::new(9), query).await,
        vec![json!({"count": 3})]
    );
}

#[tokio::test]
async fn nest_under_a_key() {
    let query = QueryBuilder::with_ids("User", [1, 2])
        .project(["name"])
        .nest("users")
        .build();
    assert_eq!(
        run(query).await,
        vec![json!({"users": [{"name": "id1"}, {"name": "id2"}]})]
    );
}

#[tokio::test]
async fn let_renames_in_place() {
    let query = QueryBuilder::with_ids("User", [1])
        .project(["id", "name", "age"])
        .let_("name", "username")
        .build();
    let results = run(query).await;
    assert_eq!(results, vec![json!({":id": 1, "username": "id1", "age": 17})]);
    let keys: Vec<&String> = results[0].as_object().expect("an object").keys().collect();
    assert_eq!(keys, vec![":id", "username", "age"]);
}

#[tokio::test]
async fn edges_attach_reached_objects() {
    let query = QueryBuilder::with_ids("User", [1])
        .edge("friends")
        .project(["name"])
        .parent()
        .project(["name", "friends"])
        .build();
    assert_eq!(
        run(query).await,
        vec![json!({
            "name": "id1",
            "friends": [{"name": "id3"}, {"name": "id4"}, {"name": "id5"}],
        })]
    );
}

#[tokio::test]
async fn edges_resolve_from_projected_objects() {
    let friends = QueryBuilder::with_ids("User", [1])
        .project(["name"])
        .edge("friends")
        .project(["name"])
        .parent()
        .build();
    assert_eq!(
        run(friends).await,
        vec![json!({
            "name": "id1",
            "friends": [{"name": "id3"}, {"name": "id4"}, {"name": "id5"}],
        })]
    );

    let author = QueryBuilder::with_ids("Review", [301])
        .project(["rating"])
        .let_("rating", "stars")
        .edge("author")
        .project(["name"])
        .parent()
        .build();
    assert_eq!(
        run(author).await,
        vec![json!({"stars": 2, "author": {"name": "id0"}})]
    );
}

#[tokio::test]
async fn edges_nest() {
    let query = QueryBuilder::with_ids("User", [1])
        .edge("friends")
        .take(2)
        .edge("friends")
        .project(["id"])
        .parent()
        .project(["id", "friends"])
        .parent()
        .project(["id", "friends"])
        .build();
    assert_eq!(
        run(query).await,
        vec![json!({
            ":id": 1,
            "friends": [
                {":id": 3, "friends": [{":id": 9}, {":id": 10}, {":id": 11}]},
                {":id": 4, "friends": [{":id": 12}, {":id": 13}, {":id": 14}]},
            ],
        })]
    );
}

#[tokio::test]
async fn sibling_edges_branch() {
    let query = QueryBuilder::with_ids("User", [1])
        .edge("friends")
        .take(1)
        .project(["name"])
        .parent()
        .edge("reviews")
        .project(["id"])
        .parent()
        .project(["friends", "reviews"])
        .build();
    assert_eq!(
        run(query).await,
        vec![json!({
            "friends": [{"name": "id3"}],
            "reviews": [{":id": 303}, {":id": 304}, {":id": 305}],
        })]
    );
}

#[tokio::test]
async fn single_edges_attach_one_object() {
    let query = QueryBuilder::with_ids("Review", [301])
        .edge("author")
        .project(["name"])
        .parent()
        .project(["rating", "author"])
        .build();
    assert_eq!(
        run(query).await,
        vec![json!({"rating": 2, "author": {"name": "id0"}})]
    );
}

#[tokio::test]
async fn filter_reached_objects() {
    let query = QueryBuilder::with_ids("User", [2])
        .edge("reviews")
        .where_("rating > 2")
        .expect("valid predicate")
        .project(["id", "rating"])
        .parent()
        .project(["reviews"])
        .build();
    assert_eq!(
        run(query).await,
        vec![json!({"reviews": [{":id": 307, "rating": 3}, {":id": 308, "rating": 4}]})]
    );
}

#[tokio::test]
async fn union_concatenates() {
    let query = QueryBuilder::with_ids("User", [1])
        .project(["name"])
        .union(
            QueryBuilder::with_ids("Review", [300])
                .project(["business"])
                .build(),
        )
        .build();
    assert_eq!(
        run(query).await,
        vec![json!({"name": "id1"}), json!({"business": "business300"})]
    );
}

#[tokio::test]
async fn results_key_by_identity() {
    let metadata = social_metadata();
    let graph = MockGraph::new(100);
    let response = MemoryExecutor::new(&metadata, &graph)
        .execute(&QueryBuilder::with_ids("User", [5, 7]).project(["id", "name"]).build())
        .await
        .expect("query runs");
    let dict = response.into_dict();
    assert_eq!(dict.keys().collect::<Vec<_>>(), vec!["5", "7"]);
    assert_eq!(dict["7"], json!({":id": 7, "name": "id7"}));
}

#[tokio::test]
async fn edges_from_aggregates_are_rejected() {
    let query = QueryBuilder::with_ids("User", [1])
        .count()
        .edge("friends")
        .build();
    assert_eq!(
        fail(query).await.to_string(),
        "cannot traverse edge 'friends' from aggregated results"
    );
}

#[tokio::test]
async fn unknown_edges_are_rejected() {
    let query = QueryBuilder::with_ids("User", [1]).edge("enemies").build();
    assert!(matches!(
        fail(query).await,
        Error::Query(QueryError::EdgeNotFound { object_type, edge })
            if object_type == "User" && edge == "enemies"
    ));
}

#[tokio::test]
async fn unknown_object_types_are_rejected() {
    let query = QueryBuilder::with_ids("Business", [1]).build();
    assert!(matches!(
        fail(query).await,
        Error::Query(QueryError::ObjectTypeNotFound(object_type)) if object_type == "Business"
    ));
}

#[tokio::test]
async fn validation_reports_mismatched_objects() {
    let metadata = social_metadata().with_object_type(
        "User",
        ObjectTypeInfo::new("User")
            .with_field("id", ScalarType::Bigint, Nullable::NonNullable)
            .with_field("name", ScalarType::Integer, Nullable::NonNullable),
    );
    let graph = MockGraph::new(10);
    let query = QueryBuilder::with_ids("User", [4]).build();

    let unchecked = MemoryExecutor::new(&metadata, &graph).execute(&query).await;
    assert!(unchecked.is_ok());

    let error = MemoryExecutor::new(&metadata, &graph)
        .with_validation(true)
        .execute(&query)
        .await
        .expect_err("name holds a string");
    assert!(matches!(
        error,
        Error::Query(QueryError::InvalidObject {
            id: 4,
            error: ValidationError::WrongType { ref field, .. },
            ..
        }) if field == "name"
    ));
}
