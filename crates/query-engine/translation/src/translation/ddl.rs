//! Derive `CREATE TABLE` statements from the mapped object types.

use query_engine_metadata::metadata::{self, Cardinality, EdgeJoin, Nullable, ID_KEY};
use query_engine_sql::sql;

use super::error::Error;
use super::helpers::{self, Env};
use super::query::fields::scope_name;

/// The DDL statements creating every table the metadata maps, ordered so that tables are
/// created before the tables referencing them. Foreign keys closing a reference cycle are
/// added by trailing `ALTER TABLE` statements.
pub fn translate(metadata: &metadata::Metadata) -> Result<Vec<sql::string::DDL>, Error> {
    let (tables, foreign_keys) = create_tables(metadata)?;
    let statements = tables
        .iter()
        .map(sql::ddl::CreateTable::to_ddl)
        .chain(foreign_keys.iter().map(sql::ddl::AddForeignKey::to_ddl))
        .collect::<Vec<_>>();
    tracing::debug!(tables = statements.len(), "generated DDL");
    Ok(statements)
}

/// One table per object type, followed by one association table per distinct `Through` edge,
/// and the foreign keys that have to be added once every table exists.
pub fn create_tables(
    metadata: &metadata::Metadata,
) -> Result<(Vec<sql::ddl::CreateTable>, Vec<sql::ddl::AddForeignKey>), Error> {
    let env = Env::new(metadata);

    let mut tables = vec![];
    for (name, info) in &metadata.object_types.0 {
        tables.push(object_table(env, name, info)?);
    }

    let mut associations: Vec<sql::ddl::CreateTable> = vec![];
    for (name, info) in &metadata.object_types.0 {
        for (edge_name, edge) in &info.edges {
            if let Some(table) = association_table(env, name, info, edge_name, edge)? {
                if !associations.iter().any(|existing| existing.table == table.table) {
                    associations.push(table);
                }
            }
        }
    }

    let (mut ordered, deferred) = dependency_order(tables);
    ordered.extend(associations);
    Ok((ordered, deferred))
}

fn id_column<'a>(
    name: &str,
    info: &'a metadata::ObjectTypeInfo,
) -> Result<&'a metadata::FieldInfo, Error> {
    info.id_field_info().ok_or_else(|| Error::FieldNotFound {
        field: info.id_field.clone(),
        scope: scope_name(Some(name)),
    })
}

fn object_table(
    env: Env,
    name: &str,
    info: &metadata::ObjectTypeInfo,
) -> Result<sql::ddl::CreateTable, Error> {
    let id = id_column(name, info)?;

    let columns = info
        .fields
        .iter()
        .map(|(field, field_info)| sql::ddl::ColumnDefinition {
            name: field_info.column_name.clone(),
            r#type: sql::ast::ScalarType(field_info.r#type.sql_name().to_string()),
            not_null: field_info.nullable == Nullable::NonNullable || *field == info.id_field,
        })
        .collect();

    let mut foreign_keys = vec![];
    for (edge_name, edge) in &info.edges {
        let EdgeJoin::Columns { column_mapping } = &edge.join else {
            continue;
        };
        if edge.cardinality != Cardinality::One {
            continue;
        }
        let target = env.lookup_edge(name, edge_name)?;
        let target_id = &target.target.id_field;
        let references_id = column_mapping
            .values()
            .all(|field| field == target_id || field == ID_KEY);
        if column_mapping.len() != 1 || !references_id {
            continue;
        }

        let columns = column_mapping
            .keys()
            .map(|field| {
                info.lookup_field(field)
                    .map(|(_, field_info)| field_info.column_name.clone())
                    .ok_or_else(|| Error::FieldNotFound {
                        field: field.clone(),
                        scope: scope_name(Some(name)),
                    })
            })
            .collect::<Result<Vec<_>, Error>>()?;
        let referenced = id_column(target.target_name, target.target)?;

        foreign_keys.push(sql::ddl::ForeignKey {
            columns,
            references: helpers::table_reference(target.target),
            referenced_columns: vec![referenced.column_name.clone()],
        });
    }

    Ok(sql::ddl::CreateTable {
        table: helpers::table_reference(info),
        columns,
        primary_key: vec![id.column_name.clone()],
        foreign_keys,
    })
}

fn association_table(
    env: Env,
    name: &str,
    info: &metadata::ObjectTypeInfo,
    edge_name: &str,
    edge: &metadata::EdgeInfo,
) -> Result<Option<sql::ddl::CreateTable>, Error> {
    let EdgeJoin::Through {
        schema_name,
        table_name,
        source_column,
        target_column,
    } = &edge.join
    else {
        return Ok(None);
    };

    let target = env.lookup_edge(name, edge_name)?;
    let source_id = id_column(name, info)?;
    let target_id = id_column(target.target_name, target.target)?;

    let column = |column: &str, id: &metadata::FieldInfo| sql::ddl::ColumnDefinition {
        name: column.to_string(),
        r#type: sql::ast::ScalarType(id.r#type.sql_name().to_string()),
        not_null: true,
    };

    Ok(Some(sql::ddl::CreateTable {
        table: sql::ast::TableReference::DBTable {
            schema: schema_name.clone(),
            table: table_name.clone(),
        },
        columns: vec![column(source_column, source_id), column(target_column, target_id)],
        primary_key: vec![source_column.clone(), target_column.clone()],
        foreign_keys: vec![
            sql::ddl::ForeignKey {
                columns: vec![source_column.clone()],
                references: helpers::table_reference(info),
                referenced_columns: vec![source_id.column_name.clone()],
            },
            sql::ddl::ForeignKey {
                columns: vec![target_column.clone()],
                references: helpers::table_reference(target.target),
                referenced_columns: vec![target_id.column_name.clone()],
            },
        ],
    }))
}

fn waits_on(
    remaining: &[sql::ddl::CreateTable],
    table: &sql::ddl::CreateTable,
    foreign_key: &sql::ddl::ForeignKey,
) -> bool {
    foreign_key.references != table.table
        && remaining
            .iter()
            .any(|other| other.table == foreign_key.references)
}

/// Order tables so every table comes after the tables its foreign keys reference. When the
/// remaining tables reference each other in a cycle, the first of them is created without
/// the keys to the others, which are returned to be added afterwards.
fn dependency_order(
    mut remaining: Vec<sql::ddl::CreateTable>,
) -> (Vec<sql::ddl::CreateTable>, Vec<sql::ddl::AddForeignKey>) {
    let mut ordered = vec![];
    let mut deferred = vec![];
    while !remaining.is_empty() {
        let ready = remaining.iter().position(|table| {
            table
                .foreign_keys
                .iter()
                .all(|foreign_key| !waits_on(&remaining, table, foreign_key))
        });
        let table = match ready {
            Some(index) => remaining.remove(index),
            None => {
                let mut table = remaining.remove(0);
                let (pending, declared): (Vec<_>, Vec<_>) = std::mem::take(&mut table.foreign_keys)
                    .into_iter()
                    .partition(|foreign_key| waits_on(&remaining, &table, foreign_key));
                table.foreign_keys = declared;
                deferred.extend(pending.into_iter().map(|foreign_key| sql::ddl::AddForeignKey {
                    table: table.table.clone(),
                    foreign_key,
                }));
                table
            }
        };
        ordered.push(table);
    }
    (ordered, deferred)
}
