//! Errors for query translation.

use query_engine_metadata::metadata::{ComparisonOperator, ScalarType};
use thiserror::Error;

/// A type for translation errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("object type '{0}' not found")]
    ObjectTypeNotFound(String),
    #[error("field '{field}' not found in {scope}")]
    FieldNotFound { field: String, scope: String },
    #[error("edge '{edge}' not found on object type '{object_type}'")]
    EdgeNotFound { object_type: String, edge: String },
    #[error("value {value} does not match type {expected} of field '{field}'")]
    TypeMismatch {
        field: String,
        expected: ScalarType,
        value: String,
    },
    #[error("operator '{operator}' is not supported on field '{field}' of type {scalar_type}")]
    OperatorNotSupported {
        field: String,
        operator: ComparisonOperator,
        scalar_type: ScalarType,
    },
    #[error("union branches produce different fields: expected {expected:?}, found {found:?}")]
    UnionShapeMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },
    #[error("{0} is not supported")]
    NotSupported(String),
}
