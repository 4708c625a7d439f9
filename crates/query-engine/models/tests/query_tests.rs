//! Queries read from JSON files behave like queries built in code.

use similar_asserts::assert_eq;

use query_engine_models::{Query, QueryBuilder};

const QUERY: &str = r#"{
  "source": { "type": "collection", "objectType": "User", "ids": [1, 2] },
  "operations": [
    { "type": "where", "predicate": "user.age >= 16 and not (name == 'id3')" },
    {
      "type": "edge",
      "edge": "friends",
      "operations": [
        { "type": "take", "count": 2 },
        { "type": "let", "old": "name", "new": "friend" }
      ]
    },
    { "type": "order_by", "key": "age", "direction": "desc" }
  ]
}"#;

#[test]
fn json_queries_match_built_queries() {
    let parsed: Query = serde_json::from_str(QUERY).expect("query parses");
    let built = QueryBuilder::with_ids("User", [1, 2])
        .where_("user.age >= 16 and not (name == 'id3')")
        .expect("valid predicate")
        .edge("friends")
        .take(2)
        .let_("name", "friend")
        .parent()
        .order_by_desc("age")
        .build();
    assert_eq!(parsed, built);
}

#[test]
fn json_queries_dump_as_trees() {
    let parsed: Query = serde_json::from_str(QUERY).expect("query parses");
    insta::assert_snapshot!(parsed.dump(), @r"
ORDER_BY age DESC
    EDGE friends
        LET name -> friend
            TAKE 2
                PARENT
        WHERE age >= 16 and not name == 'id3'
            LEAF User [1, 2]
");
}
