//! Helpers shared by the translators: metadata lookups and alias generation.

use std::collections::BTreeMap;

use query_engine_metadata::metadata;
use query_engine_sql::sql;

use super::error::Error;

/// Static information about the mapped object types.
#[derive(Debug, Clone, Copy)]
pub struct Env<'a> {
    metadata: &'a metadata::Metadata,
}

/// An edge together with the object type it leads to.
#[derive(Debug, Clone, Copy)]
pub struct EdgeAndTarget<'a> {
    pub edge: &'a metadata::EdgeInfo,
    pub target_name: &'a str,
    pub target: &'a metadata::ObjectTypeInfo,
}

impl<'a> Env<'a> {
    pub fn new(metadata: &'a metadata::Metadata) -> Env<'a> {
        Env { metadata }
    }

    /// Lookup an object type's information in the metadata.
    pub fn lookup_object_type(&self, name: &str) -> Result<&'a metadata::ObjectTypeInfo, Error> {
        self.metadata
            .lookup_object_type(name)
            .ok_or_else(|| Error::ObjectTypeNotFound(name.to_string()))
    }

    /// Lookup an edge of an object type, and the type it reaches.
    pub fn lookup_edge(&self, object_type: &str, edge: &str) -> Result<EdgeAndTarget<'a>, Error> {
        let info = self.lookup_object_type(object_type)?;
        let edge_info = info.edges.get(edge).ok_or_else(|| Error::EdgeNotFound {
            object_type: object_type.to_string(),
            edge: edge.to_string(),
        })?;
        let (target_name, target) = self
            .metadata
            .object_types
            .0
            .get_key_value(&edge_info.target)
            .ok_or_else(|| Error::ObjectTypeNotFound(edge_info.target.clone()))?;
        Ok(EdgeAndTarget {
            edge: edge_info,
            target_name,
            target,
        })
    }
}

/// Stateful information changed throughout the translation process.
#[derive(Debug, Default)]
pub struct State {
    /// How many aliases were handed out per name.
    aliases: BTreeMap<String, u64>,
}

impl State {
    pub fn new() -> State {
        State::default()
    }

    /// Create a table alias unique within the query. The first alias of a name is the name
    /// itself; later ones are numbered.
    pub fn make_table_alias(&mut self, name: &str) -> sql::ast::TableAlias {
        let counter = self.aliases.entry(name.to_string()).or_insert(0);
        let unique_index = *counter;
        *counter += 1;
        sql::ast::TableAlias {
            unique_index,
            name: name.to_string(),
        }
    }
}

/// Reference a table of an object type by its schema-qualified name.
pub fn table_reference(info: &metadata::ObjectTypeInfo) -> sql::ast::TableReference {
    sql::ast::TableReference::DBTable {
        schema: info.schema_name.clone(),
        table: info.table_name.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_are_numbered_per_name() {
        let mut state = State::new();
        let names = ["user", "user", "t", "user"]
            .into_iter()
            .map(|name| {
                let alias = state.make_table_alias(name);
                (alias.name, alias.unique_index)
            })
            .collect::<Vec<_>>();
        assert_eq!(
            names,
            vec![
                ("user".to_string(), 0),
                ("user".to_string(), 1),
                ("t".to_string(), 0),
                ("user".to_string(), 2),
            ]
        );
    }
}
