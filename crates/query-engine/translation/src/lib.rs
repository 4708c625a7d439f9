//! Translate object queries to SQL, Malloy and Cypher, and mapped object types to DDL.

pub mod translation;
