//! The object query model: queries over collections of mapped objects, the predicates they
//! filter with, and the object results they produce.

pub mod builder;
pub mod dump;
pub mod expression;
pub mod item;
pub mod parse;
pub mod query;
pub mod response;

pub use builder::QueryBuilder;
pub use expression::{unqualified, Expression, Literal};
pub use item::Item;
pub use parse::ParseError;
pub use query::{Operation, OrderDirection, Query, Source};
pub use response::QueryResponse;
