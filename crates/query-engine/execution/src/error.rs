//! Errors for query execution.

use query_engine_metadata::metadata::ValidationError;
use thiserror::Error;

/// Errors raised while executing a query.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Query(#[from] QueryError),
    /// A resolver failed to fetch an object or an edge.
    #[error("resolver error: {0}")]
    Resolver(String),
    #[error("database error: {0}")]
    DB(#[from] sqlx::Error),
    #[error("metrics error: {0}")]
    PrometheusError(#[from] prometheus::Error),
}

/// A query that cannot run against the objects it reaches.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error("object type '{0}' not found")]
    ObjectTypeNotFound(String),
    #[error("edge '{edge}' not found on object type '{object_type}'")]
    EdgeNotFound { object_type: String, edge: String },
    #[error("object {id} of type '{object_type}' is invalid: {error}")]
    InvalidObject {
        object_type: String,
        id: i64,
        error: ValidationError,
    },
    #[error("cannot traverse edge '{0}' from aggregated results")]
    EdgeFromAggregate(String),
    #[error("{0} is not supported")]
    NotSupported(String),
}
