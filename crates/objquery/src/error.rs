//! Errors surfaced by the [`Engine`](crate::Engine).

use thiserror::Error;

use crate::state::InitializationError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("translation error: {0}")]
    Translation(#[from] query_engine_translation::translation::error::Error),
    #[error("execution error: {0}")]
    Execution(#[from] query_engine_execution::Error),
    #[error("{0}")]
    Initialization(#[from] InitializationError),
    #[error("the engine is not connected to a database")]
    NotConnected,
}
