//! The result of running a query.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::item::Item;

/// The objects a query produced, in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryResponse(pub Vec<Item>);

impl QueryResponse {
    /// Build a response from a JSON array of objects, normalizing identity keys.
    /// Anything that is not an object is dropped.
    pub fn from_json_rows(rows: serde_json::Value) -> Self {
        match Item::normalize_value(rows) {
            serde_json::Value::Array(values) => QueryResponse(
                values
                    .into_iter()
                    .filter_map(|value| match value {
                        serde_json::Value::Object(map) => Some(Item(map)),
                        _ => None,
                    })
                    .collect(),
            ),
            serde_json::Value::Object(map) => QueryResponse(vec![Item(map)]),
            _ => QueryResponse::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_list(self) -> Vec<serde_json::Value> {
        self.0.into_iter().map(Item::into_value).collect()
    }

    /// Key every object by its identity. Objects without one are left out.
    pub fn into_dict(self) -> IndexMap<String, serde_json::Value> {
        self.0
            .into_iter()
            .filter_map(|item| {
                let key = match item.id()? {
                    serde_json::Value::String(id) => id.clone(),
                    id => id.to_string(),
                };
                Some((key, item.into_value()))
            })
            .collect()
    }
}
