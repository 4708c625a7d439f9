//! Translate object queries and mapped object types into the text of other query languages.

pub mod cypher;
pub mod ddl;
pub mod error;
pub mod helpers;
pub mod malloy;
pub mod query;
