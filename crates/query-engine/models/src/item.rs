//! Object results.

use query_engine_metadata::metadata::{ID_KEY, TYPE_KEY};
use serde::{Deserialize, Serialize};

/// A single object in a query result: a JSON object whose identity lives under `:id` and
/// whose type tag lives under `:type`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Item(pub serde_json::Map<String, serde_json::Value>);

impl Item {
    /// Build an item from a map, storing `id` as `:id` and `_type` as `:type`.
    pub fn from_map(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Item(
            map.into_iter()
                .map(|(key, value)| (normalize_key(key), value))
                .collect(),
        )
    }

    /// Normalize the identity keys of every object in a JSON value, recursively.
    pub fn normalize_value(value: serde_json::Value) -> serde_json::Value {
        match value {
            serde_json::Value::Object(map) => serde_json::Value::Object(
                map.into_iter()
                    .map(|(key, value)| (normalize_key(key), Self::normalize_value(value)))
                    .collect(),
            ),
            serde_json::Value::Array(values) => serde_json::Value::Array(
                values.into_iter().map(Self::normalize_value).collect(),
            ),
            other => other,
        }
    }

    pub fn id(&self) -> Option<&serde_json::Value> {
        self.0.get(ID_KEY)
    }

    pub fn object_type(&self) -> Option<&str> {
        self.0.get(TYPE_KEY).and_then(serde_json::Value::as_str)
    }

    /// Look up a field. `id` and `:id` both name the identity.
    pub fn get(&self, field: &str) -> Option<&serde_json::Value> {
        self.0.get(field).or_else(|| match field {
            "id" => self.0.get(ID_KEY),
            ID_KEY => self.0.get("id"),
            _ => None,
        })
    }

    /// The key under which a projected or renamed field is stored.
    pub fn output_key(field: &str) -> String {
        normalize_key(field.to_string())
    }

    pub fn insert(&mut self, key: String, value: serde_json::Value) {
        self.0.insert(key, value);
    }

    pub fn into_value(self) -> serde_json::Value {
        serde_json::Value::Object(self.0)
    }
}

fn normalize_key(key: String) -> String {
    match key.as_str() {
        "id" => ID_KEY.to_string(),
        "_type" => TYPE_KEY.to_string(),
        _ => key,
    }
}

/// Items with identities are equal when their identities are; otherwise they compare as maps.
impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        match (self.id(), other.id()) {
            (Some(left), Some(right)) => left == right,
            _ => self.0 == other.0,
        }
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for Item {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Item::from_map(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(value: serde_json::Value) -> Item {
        match value {
            serde_json::Value::Object(map) => Item::from_map(map),
            other => panic!("expected an object, got {other}"),
        }
    }

    #[test]
    fn identity_keys_are_normalized() {
        let user = item(json!({"id": 7, "_type": "User", "name": "id7"}));
        assert_eq!(user.id(), Some(&json!(7)));
        assert_eq!(user.object_type(), Some("User"));
        assert_eq!(user.get("id"), Some(&json!(7)));
        assert!(user.0.get("id").is_none());
    }

    #[test]
    fn items_with_ids_compare_by_id() {
        assert_eq!(
            item(json!({"id": 1, "name": "a"})),
            item(json!({"id": 1, "name": "b"}))
        );
        assert_ne!(item(json!({"count": 1})), item(json!({"count": 2})));
    }

    #[test]
    fn nested_values_are_normalized() {
        let value = Item::normalize_value(json!([{"id": 1, "friends": [{"id": 2}]}]));
        assert_eq!(value, json!([{":id": 1, "friends": [{":id": 2}]}]));
    }
}
