//! Describe the SQL execution plan of a query.

use super::ast;
use super::helpers;
use super::string;

/// Definition of an execution plan to be run against the database.
#[derive(Debug)]
pub struct ExecutionPlan<Query> {
    pub query: Query,
}

/// A query returning a single JSON array of objects in a column named `universe`.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// The object type the query starts from.
    pub root_field: String,
    pub query: ast::Select,
}

impl Query {
    /// Extract the query component as SQL.
    pub fn query_sql(&self) -> string::SQL {
        helpers::select_to_sql(&self.query)
    }

    pub fn explain_query_sql(&self) -> string::SQL {
        helpers::explain_to_sql(&ast::Explain::Select(&self.query))
    }
}

/// An execution plan for a query starting from the given object type.
pub fn simple_query_execution_plan(root_field: String, query: ast::Select) -> ExecutionPlan<Query> {
    ExecutionPlan {
        query: Query { root_field, query },
    }
}

/// Aggregate every row of a select into one JSON array:
/// `SELECT coalesce(json_agg(row_to_json("universe")), '[]') AS "universe" FROM (<select>) AS "universe"`.
pub fn universe(select: ast::Select, alias: ast::TableAlias) -> ast::Select {
    let table = ast::TableReference::AliasedTable(alias.clone());
    let mut universe = helpers::simple_select(vec![(
        helpers::make_column_alias("universe"),
        helpers::json_agg_rows(table),
    )]);
    universe.from = Some(ast::From::Select {
        select: Box::new(select),
        alias,
    });
    universe
}

/// Indent SQL text for reading.
pub fn pretty(sql: &str) -> String {
    sqlformat::format(
        sql,
        &sqlformat::QueryParams::None,
        sqlformat::FormatOptions::default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    #[test]
    fn universe_wraps_the_select() {
        let (alias, expr) = helpers::make_column(
            ast::TableReference::DBTable {
                schema: None,
                table: "user".to_string(),
            },
            "id".to_string(),
            helpers::make_column_alias("id"),
        );
        let mut inner = helpers::simple_select(vec![(alias, expr)]);
        inner.from = Some(ast::From::Table {
            reference: ast::TableReference::DBTable {
                schema: None,
                table: "user".to_string(),
            },
            alias: ast::TableAlias {
                unique_index: 0,
                name: "user".to_string(),
            },
        });
        let plan = simple_query_execution_plan(
            "User".to_string(),
            universe(
                inner,
                ast::TableAlias {
                    unique_index: 0,
                    name: "universe".to_string(),
                },
            ),
        );

        assert_eq!(
            plan.query.query_sql().sql,
            r#"SELECT coalesce(json_agg(row_to_json("universe")), '[]') AS "universe" FROM (SELECT "user"."id" AS "id" FROM "user" AS "user") AS "universe""#
        );
        assert!(plan
            .query
            .explain_query_sql()
            .sql
            .starts_with("EXPLAIN SELECT coalesce("));
    }
}
