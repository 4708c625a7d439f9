//! Translate an object query to SQL.

pub mod aggregates;
pub mod edges;
pub mod fields;
pub mod filtering;
pub mod root;
pub mod sorting;
pub mod values;

use query_engine_metadata::metadata;
use query_engine_models as models;
use query_engine_sql::sql;

use crate::translation::error::Error;
use crate::translation::helpers::{Env, State};

/// Translate a query to an execution plan whose single row holds every result object in one
/// JSON array.
pub fn translate(
    metadata: &metadata::Metadata,
    query: &models::Query,
) -> Result<sql::execution_plan::ExecutionPlan<sql::execution_plan::Query>, Error> {
    let env = Env::new(metadata);
    let mut state = State::new();
    let select = root::translate_query(&env, &mut state, query)?.finish();
    let universe = sql::execution_plan::universe(select, state.make_table_alias("universe"));

    // log and return
    tracing::debug!("SQL AST: {:?}", universe);
    Ok(sql::execution_plan::simple_query_execution_plan(
        query.source.object_type().to_string(),
        universe,
    ))
}

/// Translate a query to a select returning one row per result object.
pub fn translate_select(
    metadata: &metadata::Metadata,
    query: &models::Query,
) -> Result<sql::ast::Select, Error> {
    let env = Env::new(metadata);
    let mut state = State::new();
    let select = root::translate_query(&env, &mut state, query)?.finish();
    tracing::debug!("SQL AST: {:?}", select);
    Ok(select)
}
