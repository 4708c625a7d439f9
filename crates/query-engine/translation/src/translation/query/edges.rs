//! Translate edge traversals into correlated subqueries.

use query_engine_metadata::metadata::{self, Cardinality, EdgeJoin, ID_KEY};
use query_engine_models::Operation;
use query_engine_sql::sql;

use super::fields::{self, OutputColumn};
use super::root::{self, CurrentSelect};
use crate::translation::error::Error;
use crate::translation::helpers::{Env, State};

/// How the objects reached through an edge relate to the parent row.
#[derive(Debug, Clone, PartialEq)]
pub enum Correlation {
    /// Pairs of (target field, parent expression) that must be equal.
    Columns(Vec<(String, sql::ast::Expression)>),
    /// A row in an association table links the parent to the target.
    Through {
        table: sql::ast::TableReference,
        table_name: String,
        source_column: String,
        target_column: String,
        parent_id: sql::ast::Expression,
    },
}

/// Translate an edge into a column holding, per parent row, the reached objects after
/// `operations`: a JSON array for `Many` edges, a JSON object or null for `One` edges.
pub fn translate_edge(
    env: &Env,
    state: &mut State,
    current: &CurrentSelect,
    edge_name: &str,
    operations: &[Operation],
) -> Result<OutputColumn, Error> {
    let object_type = current.object_type.as_deref().ok_or_else(|| {
        Error::NotSupported(format!("traversing edge '{edge_name}' from aggregated results"))
    })?;
    let edge = env.lookup_edge(object_type, edge_name)?;

    let correlation = match &edge.edge.join {
        EdgeJoin::Columns { column_mapping } => Correlation::Columns(
            column_mapping
                .iter()
                .map(|(source, target)| {
                    Ok((
                        target.clone(),
                        fields::lookup_field(env, current, source)?.expression,
                    ))
                })
                .collect::<Result<Vec<_>, Error>>()?,
        ),
        EdgeJoin::Through {
            schema_name,
            table_name,
            source_column,
            target_column,
        } => Correlation::Through {
            table: sql::ast::TableReference::DBTable {
                schema: schema_name.clone(),
                table: table_name.clone(),
            },
            table_name: table_name.clone(),
            source_column: source_column.clone(),
            target_column: target_column.clone(),
            parent_id: fields::lookup_field(env, current, ID_KEY)?.expression,
        },
    };

    let mut nested = root::translate_pipeline(
        env,
        state,
        edge.target_name,
        None,
        Some(&correlation),
        operations,
    )?;

    let alias = state.make_table_alias(edge_name);
    let table = sql::ast::TableReference::AliasedTable(alias.clone());
    let expression = match edge.edge.cardinality {
        Cardinality::Many => sql::helpers::json_agg_rows(table),
        Cardinality::One => {
            nested = root::translate_operation(env, state, nested, &Operation::Take { count: 1 })?;
            sql::ast::Expression::RowToJson(table)
        }
    };

    let mut select = sql::helpers::simple_select(vec![(
        sql::helpers::make_column_alias(edge_name),
        expression,
    )]);
    select.from = Some(sql::ast::From::Select {
        select: Box::new(nested.finish()),
        alias,
    });

    Ok(OutputColumn::computed(
        edge_name,
        sql::ast::Expression::CorrelatedSubSelect(Box::new(select)),
    ))
}

/// The condition tying rows of the target table to the parent row.
pub fn correlate(
    state: &mut State,
    correlation: &Correlation,
    target_name: &str,
    target: &metadata::ObjectTypeInfo,
    target_table: &sql::ast::TableReference,
) -> Result<sql::ast::Expression, Error> {
    let target_column = |field: &str| {
        target
            .lookup_field(field)
            .map(|(_, info)| {
                sql::ast::Expression::ColumnReference(sql::ast::ColumnReference::TableColumn {
                    table: target_table.clone(),
                    name: info.column_name.clone(),
                })
            })
            .ok_or_else(|| Error::FieldNotFound {
                field: field.to_string(),
                scope: fields::scope_name(Some(target_name)),
            })
    };

    match correlation {
        Correlation::Columns(pairs) => pairs.iter().try_fold(
            sql::helpers::true_expr(),
            |acc, (target_field, parent)| {
                Ok(sql::helpers::and(
                    acc,
                    equals(target_column(target_field)?, parent.clone()),
                ))
            },
        ),
        Correlation::Through {
            table,
            table_name,
            source_column,
            target_column: association_target,
            parent_id,
        } => {
            let alias = state.make_table_alias(table_name);
            let association = sql::ast::TableReference::AliasedTable(alias.clone());
            let association_column = |name: &str| {
                sql::ast::Expression::ColumnReference(sql::ast::ColumnReference::TableColumn {
                    table: association.clone(),
                    name: name.to_string(),
                })
            };
            let condition = sql::helpers::and(
                equals(association_column(association_target), target_column(ID_KEY)?),
                equals(association_column(source_column), parent_id.clone()),
            );
            Ok(sql::ast::Expression::Exists {
                select: Box::new(sql::helpers::select_one(
                    sql::ast::From::Table {
                        reference: table.clone(),
                        alias,
                    },
                    condition,
                )),
            })
        }
    }
}

fn equals(left: sql::ast::Expression, right: sql::ast::Expression) -> sql::ast::Expression {
    sql::ast::Expression::BinaryOperation {
        left: Box::new(left),
        operator: sql::ast::BinaryOperator("=".to_string()),
        right: Box::new(right),
    }
}
