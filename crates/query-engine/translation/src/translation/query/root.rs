//! Fold the operations of a query into a select, wrapping it as a subquery whenever the next
//! operation cannot be merged into it.

use query_engine_metadata::metadata::ID_KEY;
use query_engine_models::{unqualified, Operation, Query};
use query_engine_sql::sql;

use super::edges::{self, Correlation};
use super::fields::{self, OutputColumn, ID_ALIAS};
use super::{aggregates, filtering, sorting};
use crate::translation::error::Error;
use crate::translation::helpers::{self, Env, State};

/// The select being built, along with what the query knows about its rows.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentSelect {
    /// The select, without its select list. See [`CurrentSelect::finish`].
    pub select: sql::ast::Select,
    pub columns: Vec<OutputColumn>,
    /// The alias of the relation this select reads from.
    pub table: sql::ast::TableReference,
    /// Set while the select reads straight from an object table.
    pub base: Option<sql::ast::TableReference>,
    /// The object type of the rows, while they are still objects of one type.
    pub object_type: Option<String>,
    /// Set once the rows were aggregated or renamed; further clauses need a wrapper.
    pub sealed: bool,
}

impl CurrentSelect {
    pub fn is_limited(&self) -> bool {
        self.select.limit.limit.is_some() || self.select.limit.offset.is_some()
    }

    pub fn table_reference(&self) -> sql::ast::TableReference {
        self.table.clone()
    }

    /// The select with its output columns.
    pub fn finish(mut self) -> sql::ast::Select {
        self.select.select_list = sql::ast::SelectList::SelectList(
            self.columns
                .into_iter()
                .map(|column| (column.alias, column.expression))
                .collect(),
        );
        self.select
    }

    /// Nest this select as a subquery of a new select over the same columns.
    #[must_use]
    pub fn wrap(self, state: &mut State) -> CurrentSelect {
        let alias = state.make_table_alias("t");
        let table = sql::ast::TableReference::AliasedTable(alias.clone());
        let columns = self
            .columns
            .iter()
            .map(|column| column.through(&table))
            .collect();
        let object_type = self.object_type.clone();

        let mut select = sql::helpers::simple_select(vec![]);
        select.from = Some(sql::ast::From::Select {
            select: Box::new(self.finish()),
            alias,
        });

        CurrentSelect {
            select,
            columns,
            table,
            base: None,
            object_type,
            sealed: false,
        }
    }

    fn wrap_if(self, state: &mut State, condition: bool) -> CurrentSelect {
        if condition {
            self.wrap(state)
        } else {
            self
        }
    }
}

/// Translate a query into a select with one output row per result object.
pub fn translate_query(env: &Env, state: &mut State, query: &Query) -> Result<CurrentSelect, Error> {
    translate_pipeline(
        env,
        state,
        query.source.object_type(),
        query.source.ids(),
        None,
        &query.operations,
    )
}

/// Translate a source followed by operations. A correlation restricts the source to the
/// objects reached from a parent row.
pub fn translate_pipeline(
    env: &Env,
    state: &mut State,
    object_type: &str,
    ids: Option<&[i64]>,
    correlation: Option<&Correlation>,
    operations: &[Operation],
) -> Result<CurrentSelect, Error> {
    let mut current = translate_leaf(env, state, object_type, ids, correlation)?;
    for operation in operations {
        current = translate_operation(env, state, current, operation)?;
    }
    Ok(current)
}

fn translate_leaf(
    env: &Env,
    state: &mut State,
    object_type: &str,
    ids: Option<&[i64]>,
    correlation: Option<&Correlation>,
) -> Result<CurrentSelect, Error> {
    let info = env.lookup_object_type(object_type)?;
    let alias = state.make_table_alias(&info.table_name);
    let table = sql::ast::TableReference::AliasedTable(alias.clone());

    let mut where_ = match correlation {
        None => sql::helpers::true_expr(),
        Some(correlation) => edges::correlate(state, correlation, object_type, info, &table)?,
    };

    if let Some(ids) = ids {
        let condition = if ids.is_empty() {
            sql::helpers::false_expr()
        } else {
            let (_, id_field) = info.lookup_field(ID_KEY).ok_or_else(|| Error::FieldNotFound {
                field: info.id_field.clone(),
                scope: fields::scope_name(Some(object_type)),
            })?;
            sql::ast::Expression::BinaryArrayOperation {
                left: Box::new(sql::ast::Expression::ColumnReference(
                    sql::ast::ColumnReference::TableColumn {
                        table: table.clone(),
                        name: id_field.column_name.clone(),
                    },
                )),
                operator: sql::ast::BinaryArrayOperator::In,
                right: ids
                    .iter()
                    .map(|id| sql::ast::Expression::Value(sql::ast::Value::Int8(*id)))
                    .collect(),
            }
        };
        where_ = sql::helpers::and(where_, condition);
    }

    let mut select = sql::helpers::simple_select(vec![]);
    select.from = Some(sql::ast::From::Table {
        reference: helpers::table_reference(info),
        alias,
    });
    select.where_ = sql::ast::Where(where_);

    Ok(CurrentSelect {
        select,
        columns: fields::object_columns(info, &table),
        base: Some(table.clone()),
        table,
        object_type: Some(object_type.to_string()),
        sealed: false,
    })
}

/// Apply one operation to the current select.
pub fn translate_operation(
    env: &Env,
    state: &mut State,
    current: CurrentSelect,
    operation: &Operation,
) -> Result<CurrentSelect, Error> {
    match operation {
        Operation::Project { fields } => translate_project(current, fields),
        Operation::Where { predicate } => {
            let needs_wrap = current.is_limited() || current.sealed;
            let mut current = current.wrap_if(state, needs_wrap);
            let condition = filtering::translate_expression(env, &current, predicate)?;
            let sql::ast::Where(existing) = current.select.where_;
            current.select.where_ = sql::ast::Where(sql::helpers::and(existing, condition));
            Ok(current)
        }
        Operation::Take { count } => {
            let needs_wrap = current.select.limit.limit.is_some() || current.sealed;
            let mut current = current.wrap_if(state, needs_wrap);
            current.select.limit.limit = Some(*count);
            Ok(current)
        }
        Operation::Skip { count } => {
            let needs_wrap = current.select.limit.limit.is_some() || current.sealed;
            let mut current = current.wrap_if(state, needs_wrap);
            let offset = current.select.limit.offset.unwrap_or(0);
            current.select.limit.offset = Some(offset.saturating_add(*count));
            Ok(current)
        }
        Operation::Count => Ok(aggregates::translate_count(state, current)),
        Operation::Nest { key } => Ok(aggregates::translate_nest(state, current, key)),
        Operation::Let { old, new } => translate_let(current, old, new),
        Operation::OrderBy { key, direction } => {
            let needs_wrap = current.is_limited() || current.sealed;
            let mut current = current.wrap_if(state, needs_wrap);
            sorting::translate_order_by(env, &mut current, key, *direction)?;
            Ok(current)
        }
        Operation::GroupBy { key } => sorting::translate_group_by(env, state, current, key),
        Operation::Edge { edge, operations } => {
            let needs_wrap = current.sealed;
            let mut current = current.wrap_if(state, needs_wrap);
            let column = edges::translate_edge(env, state, &current, edge, operations)?;
            current.columns.retain(|existing| existing.name != column.name);
            current.columns.push(column);
            Ok(current)
        }
        Operation::Union { queries } => translate_union(env, state, current, queries),
    }
}

/// Keep only the listed fields, in the listed order.
fn translate_project(mut current: CurrentSelect, fields: &[String]) -> Result<CurrentSelect, Error> {
    let mut columns: Vec<OutputColumn> = vec![];
    for field in fields {
        let field = unqualified(field);
        let column = current
            .columns
            .iter()
            .find(|column| column.answers_to(field))
            .cloned()
            .ok_or_else(|| Error::FieldNotFound {
                field: field.to_string(),
                scope: fields::scope_name(current.object_type.as_deref()),
            })?;
        if !columns.iter().any(|existing| existing.alias == column.alias) {
            columns.push(column);
        }
    }
    current.columns = columns;
    Ok(current)
}

/// Rename an output field.
fn translate_let(mut current: CurrentSelect, old: &str, new: &str) -> Result<CurrentSelect, Error> {
    let old = unqualified(old);
    let new = unqualified(new);
    let scope = fields::scope_name(current.object_type.as_deref());
    let column = current
        .columns
        .iter_mut()
        .find(|column| column.answers_to(old))
        .ok_or_else(|| Error::FieldNotFound {
            field: old.to_string(),
            scope,
        })?;

    column.is_id = new == ID_KEY || new == ID_ALIAS;
    column.name = new.to_string();
    column.alias = sql::helpers::make_column_alias(if column.is_id { ID_ALIAS } else { new });
    current.sealed = true;
    Ok(current)
}

/// Append the rows of independent queries producing the same fields.
fn translate_union(
    env: &Env,
    state: &mut State,
    current: CurrentSelect,
    queries: &[Query],
) -> Result<CurrentSelect, Error> {
    let column_names = |columns: &[OutputColumn]| {
        columns
            .iter()
            .map(|column| column.alias.name.clone())
            .collect::<Vec<_>>()
    };
    let expected = column_names(&current.columns);
    let first_columns = current.columns.clone();
    let mut object_type = current.object_type.clone();

    let mut selects = vec![current.finish()];
    for query in queries {
        let branch = translate_query(env, state, query)?;
        let found = column_names(&branch.columns);
        if found != expected {
            return Err(Error::UnionShapeMismatch { expected, found });
        }
        if branch.object_type != object_type {
            object_type = None;
        }
        selects.push(branch.finish());
    }

    let alias = state.make_table_alias("t");
    let table = sql::ast::TableReference::AliasedTable(alias.clone());
    let mut select = sql::helpers::simple_select(vec![]);
    select.from = Some(sql::ast::From::Union { selects, alias });

    Ok(CurrentSelect {
        select,
        columns: first_columns
            .iter()
            .map(|column| column.through(&table))
            .collect(),
        table,
        base: None,
        object_type,
        sealed: false,
    })
}
