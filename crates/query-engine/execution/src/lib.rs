//! Query execution: in memory against user-supplied resolvers, or against a PostgreSQL
//! database through the translated SQL.

pub mod error;
pub mod memory;
pub mod metrics;
pub mod postgres;

pub use error::{Error, QueryError};
pub use memory::{MemoryExecutor, Resolver};
