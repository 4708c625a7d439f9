//! Object queries over mapped object types: build them with [`QueryBuilder`], translate them
//! to SQL, Malloy or Cypher, and run them in memory or against PostgreSQL through an
//! [`Engine`].

pub mod engine;
pub mod error;
pub mod state;

pub use engine::Engine;
pub use error::Error;

pub use objquery_configuration as configuration;
pub use query_engine_execution::{MemoryExecutor, Resolver};
pub use query_engine_metadata::metadata;
pub use query_engine_models::{
    Expression, Item, Literal, Operation, OrderDirection, Query, QueryBuilder, QueryResponse,
};
