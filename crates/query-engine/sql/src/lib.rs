//! SQL AST, its conversion to parameterized SQL text, and the execution plan wrapping it.

pub mod sql;
