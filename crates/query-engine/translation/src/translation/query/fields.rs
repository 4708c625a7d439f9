//! The output columns of a select, and resolving field references against them.

use query_engine_metadata::metadata::{self, ScalarType, ID_KEY};
use query_engine_models::unqualified;
use query_engine_sql::sql;

use super::root::CurrentSelect;
use crate::translation::error::Error;
use crate::translation::helpers::Env;

/// The output alias of the identity field. Results are keyed on it.
pub const ID_ALIAS: &str = "id";

/// A column of the current select, as the query sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputColumn {
    /// The field name queries use.
    pub name: String,
    pub alias: sql::ast::ColumnAlias,
    pub expression: sql::ast::Expression,
    /// Unknown for edges and aggregates.
    pub scalar_type: Option<ScalarType>,
    pub is_id: bool,
}

impl OutputColumn {
    /// A column produced by an expression and named after it.
    pub fn computed(name: &str, expression: sql::ast::Expression) -> Self {
        OutputColumn {
            name: name.to_string(),
            alias: sql::helpers::make_column_alias(name),
            expression,
            scalar_type: None,
            is_id: false,
        }
    }

    /// Whether a field reference names this column. `id` and `:id` name the identity.
    pub fn answers_to(&self, field: &str) -> bool {
        self.name == field || (self.is_id && (field == ID_KEY || field == ID_ALIAS))
    }

    /// The same column, read through the alias of the select that contains it.
    pub fn through(&self, table: &sql::ast::TableReference) -> Self {
        OutputColumn {
            expression: sql::ast::Expression::ColumnReference(
                sql::ast::ColumnReference::AliasedColumn {
                    table: table.clone(),
                    column: self.alias.clone(),
                },
            ),
            ..self.clone()
        }
    }
}

/// Every field of an object type, read from the given table.
pub fn object_columns(
    info: &metadata::ObjectTypeInfo,
    table: &sql::ast::TableReference,
) -> Vec<OutputColumn> {
    info.fields
        .iter()
        .map(|(name, field)| {
            let is_id = *name == info.id_field;
            let alias = if is_id { ID_ALIAS } else { name.as_str() };
            let (alias, expression) = sql::helpers::make_column(
                table.clone(),
                field.column_name.clone(),
                sql::helpers::make_column_alias(alias),
            );
            OutputColumn {
                name: name.clone(),
                alias,
                expression,
                scalar_type: Some(field.r#type),
                is_id,
            }
        })
        .collect()
}

/// A field reference resolved against the current select.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedField {
    pub expression: sql::ast::Expression,
    pub scalar_type: Option<ScalarType>,
}

/// Resolve a field reference. Output columns come first; while the select still reads
/// straight from the object table, the table's other fields are visible too.
pub fn lookup_field(
    env: &Env,
    current: &CurrentSelect,
    field: &str,
) -> Result<ResolvedField, Error> {
    let field = unqualified(field);

    if let Some(column) = current.columns.iter().find(|column| column.answers_to(field)) {
        return Ok(ResolvedField {
            expression: column.expression.clone(),
            scalar_type: column.scalar_type,
        });
    }

    if let (Some(table), Some(object_type)) = (&current.base, &current.object_type) {
        let info = env.lookup_object_type(object_type)?;
        let name = if field == ID_ALIAS { ID_KEY } else { field };
        if let Some((_, field_info)) = info.lookup_field(name) {
            return Ok(ResolvedField {
                expression: sql::ast::Expression::ColumnReference(
                    sql::ast::ColumnReference::TableColumn {
                        table: table.clone(),
                        name: field_info.column_name.clone(),
                    },
                ),
                scalar_type: Some(field_info.r#type),
            });
        }
    }

    Err(Error::FieldNotFound {
        field: field.to_string(),
        scope: scope_name(current.object_type.as_deref()),
    })
}

/// Describe where a field was looked up, for error messages.
pub fn scope_name(object_type: Option<&str>) -> String {
    match object_type {
        Some(object_type) => format!("object type '{object_type}'"),
        None => "the query results".to_string(),
    }
}
