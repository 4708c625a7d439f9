//! Mapped object types: their fields, edges, and the relations backing them.

use std::collections::BTreeMap;

use convert_case::{Case, Casing};
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::database::{Nullable, ScalarType};

/// Key under which an object's identity is stored in object results.
pub const ID_KEY: &str = ":id";
/// Key under which an object's type tag is stored in object results.
pub const TYPE_KEY: &str = ":type";

const DEFAULT_ID_FIELD: &str = "id";

/// Mapping from an object type name to its information.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct ObjectTypes(pub BTreeMap<String, ObjectTypeInfo>);

impl ObjectTypes {
    pub fn empty() -> Self {
        ObjectTypes(BTreeMap::new())
    }
}

/// Information about a mapped object type and the table that stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObjectTypeInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_name: Option<String>,
    pub table_name: String,
    /// Node label used for graph query output. Defaults to the type name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default = "default_id_field")]
    pub id_field: String,
    pub fields: IndexMap<String, FieldInfo>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub edges: IndexMap<String, EdgeInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_id_field() -> String {
    DEFAULT_ID_FIELD.to_string()
}

/// Information about a single field of an object type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldInfo {
    pub column_name: String,
    pub r#type: ScalarType,
    #[serde(default)]
    pub nullable: Nullable,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// How many objects an edge reaches from a single source object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    One,
    Many,
}

/// A named relationship from one object type to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EdgeInfo {
    pub target: String,
    pub cardinality: Cardinality,
    pub join: EdgeJoin,
    /// Relationship type used for graph query output. Defaults to the upper-cased edge name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The relational shape of an edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EdgeJoin {
    /// Source fields equal target fields.
    #[serde(rename_all = "camelCase")]
    Columns {
        column_mapping: IndexMap<String, String>,
    },
    /// An association table holding pairs of source and target ids.
    #[serde(rename_all = "camelCase")]
    Through {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        schema_name: Option<String>,
        table_name: String,
        source_column: String,
        target_column: String,
    },
}

impl ObjectTypeInfo {
    /// A type stored in a table named after it, with no fields yet.
    pub fn new(type_name: &str) -> Self {
        ObjectTypeInfo {
            schema_name: None,
            table_name: type_name.to_case(Case::Snake),
            label: None,
            id_field: default_id_field(),
            fields: IndexMap::new(),
            edges: IndexMap::new(),
            description: None,
        }
    }

    #[must_use]
    pub fn with_table(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }

    #[must_use]
    pub fn with_field(mut self, name: &str, r#type: ScalarType, nullable: Nullable) -> Self {
        self.fields.insert(
            name.to_string(),
            FieldInfo {
                column_name: name.to_string(),
                r#type,
                nullable,
                description: None,
            },
        );
        self
    }

    #[must_use]
    pub fn with_edge(mut self, name: &str, edge: EdgeInfo) -> Self {
        self.edges.insert(name.to_string(), edge);
        self
    }

    /// Look up a field by the name used in queries. `:id` names the identity field.
    pub fn lookup_field(&self, name: &str) -> Option<(&str, &FieldInfo)> {
        let name = if name == ID_KEY {
            self.id_field.as_str()
        } else {
            name
        };
        self.fields
            .get_key_value(name)
            .map(|(name, info)| (name.as_str(), info))
    }

    pub fn id_field_info(&self) -> Option<&FieldInfo> {
        self.fields.get(&self.id_field)
    }

    /// The label for graph output.
    pub fn label<'a>(&'a self, type_name: &'a str) -> &'a str {
        self.label.as_deref().unwrap_or(type_name)
    }
}

impl EdgeInfo {
    pub fn many(target: &str, join: EdgeJoin) -> Self {
        EdgeInfo {
            target: target.to_string(),
            cardinality: Cardinality::Many,
            join,
            relationship_type: None,
            description: None,
        }
    }

    pub fn one(target: &str, join: EdgeJoin) -> Self {
        EdgeInfo {
            target: target.to_string(),
            cardinality: Cardinality::One,
            join,
            relationship_type: None,
            description: None,
        }
    }

    /// The relationship type for graph output.
    pub fn relationship_type(&self, edge_name: &str) -> String {
        self.relationship_type
            .clone()
            .unwrap_or_else(|| edge_name.to_case(Case::UpperSnake))
    }
}

impl EdgeJoin {
    /// Join on pairs of (source field, target field).
    pub fn columns<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        EdgeJoin::Columns {
            column_mapping: pairs
                .into_iter()
                .map(|(source, target)| (source.to_string(), target.to_string()))
                .collect(),
        }
    }

    pub fn through(table_name: &str, source_column: &str, target_column: &str) -> Self {
        EdgeJoin::Through {
            schema_name: None,
            table_name: table_name.to_string(),
            source_column: source_column.to_string(),
            target_column: target_column.to_string(),
        }
    }
}
