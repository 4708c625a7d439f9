//! Execute an execution plan against a PostgreSQL database.

use sqlx::Row;
use tracing::{info_span, Instrument};

use query_engine_models::QueryResponse;
use query_engine_sql::sql;

use crate::error::Error;
use crate::metrics::Metrics;

/// Execute a query against postgres.
pub async fn execute(
    pool: &sqlx::PgPool,
    metrics: &Metrics,
    plan: sql::execution_plan::ExecutionPlan<sql::execution_plan::Query>,
) -> Result<QueryResponse, Error> {
    let query = plan.query.query_sql();

    tracing::info!(
        root_field = plan.query.root_field,
        generated_sql = query.sql,
        params = ?&query.params,
    );

    let timer = metrics.query_execution_time.start_timer();
    let result = build_query_with_params(&query)
        .fetch_one(pool)
        .instrument(info_span!("Database request"))
        .await;
    timer.observe_duration();

    let row = result.map_err(|error| {
        metrics.error_total.inc();
        Error::DB(error)
    })?;
    // the single column holds every result object
    let rows: serde_json::Value = row.try_get(0)?;

    let response = async { QueryResponse::from_json_rows(rows) }
        .instrument(info_span!("Create response"))
        .await;

    // assuming query succeeded, increment counter
    metrics.query_total.inc();

    Ok(response)
}

/// Convert a query to an EXPLAIN query and execute it against postgres.
/// Returns the formatted SQL and the query plan.
pub async fn explain(
    pool: &sqlx::PgPool,
    metrics: &Metrics,
    plan: sql::execution_plan::ExecutionPlan<sql::execution_plan::Query>,
) -> Result<(String, String), Error> {
    let query = plan.query.explain_query_sql();

    tracing::info!(
        generated_sql = query.sql,
        params = ?&query.params,
    );

    let rows: Vec<sqlx::postgres::PgRow> = build_query_with_params(&query)
        .fetch_all(pool)
        .instrument(info_span!("Database request"))
        .await
        .map_err(|error| {
            metrics.error_total.inc();
            Error::DB(error)
        })?;

    let mut results: Vec<String> = vec![];
    for row in rows {
        results.push(row.try_get(0)?);
    }

    let pretty = sql::execution_plan::pretty(&plan.query.query_sql().sql);
    metrics.explain_total.inc();

    Ok((pretty, results.join("\n")))
}

/// Create a SQLx query based on our SQL query and bind our parameters to it.
fn build_query_with_params(
    query: &sql::string::SQL,
) -> sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments> {
    query
        .params
        .iter()
        .fold(sqlx::query(query.sql.as_str()), |sqlx_query, param| match param {
            sql::string::Param::String(s) => sqlx_query.bind(s),
        })
}
