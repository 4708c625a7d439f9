//! Exports the SQL AST types and the low-level string representation of a SQL query type.

pub mod ast;
pub mod convert;
pub mod ddl;
pub mod execution_plan;
pub mod helpers;
pub mod string;
