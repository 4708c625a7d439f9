//! Metadata information regarding the mapped object types and the tables backing them.

pub mod database;
pub mod object_types;
pub mod validation;

// re-export without modules
pub use database::*;
pub use object_types::*;
pub use validation::ValidationError;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Metadata information.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default)]
    pub object_types: ObjectTypes,
}

impl Metadata {
    pub fn empty() -> Self {
        Metadata {
            object_types: ObjectTypes::empty(),
        }
    }

    #[must_use]
    pub fn with_object_type(mut self, name: &str, info: ObjectTypeInfo) -> Self {
        self.object_types.0.insert(name.to_string(), info);
        self
    }

    pub fn lookup_object_type(&self, name: &str) -> Option<&ObjectTypeInfo> {
        self.object_types.0.get(name)
    }
}
