//! Constructors for the shapes of `sql::ast` the translation builds over and over.

use super::ast::*;
use super::string::SQL;

// Conditions //

/// `true`. A `WHERE true` is not rendered.
pub fn true_expr() -> Expression {
    Expression::Value(Value::Bool(true))
}

pub fn false_expr() -> Expression {
    Expression::Value(Value::Bool(false))
}

/// Conjoin two conditions, dropping a `true` on either side.
pub fn and(left: Expression, right: Expression) -> Expression {
    match (left, right) {
        (left, right) if left == true_expr() => right,
        (left, right) if right == true_expr() => left,
        (left, right) => Expression::And {
            left: Box::new(left),
            right: Box::new(right),
        },
    }
}

// Columns //

/// A select list entry reading `table.name` as `alias`.
pub fn make_column(
    table: TableReference,
    name: String,
    alias: ColumnAlias,
) -> (ColumnAlias, Expression) {
    (
        alias,
        Expression::ColumnReference(ColumnReference::TableColumn { table, name }),
    )
}

pub fn make_column_alias(name: impl Into<String>) -> ColumnAlias {
    ColumnAlias { name: name.into() }
}

// JSON //

/// `coalesce(json_agg(row_to_json(table)), '[]')`: every row of a table as one JSON array,
/// empty rather than null when there are no rows.
pub fn json_agg_rows(table: TableReference) -> Expression {
    Expression::FunctionCall {
        function: Function::Coalesce,
        args: vec![json_agg(table), Expression::Value(Value::EmptyJsonArray)],
    }
}

pub fn json_agg(table: TableReference) -> Expression {
    Expression::FunctionCall {
        function: Function::JsonAgg,
        args: vec![Expression::RowToJson(table)],
    }
}

// Selects //

pub fn no_ordering() -> OrderBy {
    OrderBy { elements: vec![] }
}

fn select(select_list: SelectList, from: Option<From>, where_: Expression) -> Select {
    Select {
        select_list,
        from,
        where_: Where(where_),
        group_by: GroupBy { elements: vec![] },
        order_by: no_ordering(),
        limit: Limit {
            limit: None,
            offset: None,
        },
    }
}

/// A select of the given list with every other clause empty.
pub fn simple_select(select_list: Vec<(ColumnAlias, Expression)>) -> Select {
    select(SelectList::SelectList(select_list), None, true_expr())
}

/// `SELECT 1 FROM ... WHERE ...`, the body of an `EXISTS`.
pub fn select_one(from: From, where_: Expression) -> Select {
    select(SelectList::Select1, Some(from), where_)
}

pub fn select_to_sql(select: &Select) -> SQL {
    let mut sql = SQL::new();
    select.to_sql(&mut sql);
    sql
}

pub fn explain_to_sql(explain: &Explain) -> SQL {
    let mut sql = SQL::new();
    explain.to_sql(&mut sql);
    sql
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn and_drops_true() {
        let x = Expression::Value(Value::Int8(1));
        assert_eq!(and(true_expr(), x.clone()), x);
        assert_eq!(and(x.clone(), true_expr()), x);
        assert!(matches!(and(x.clone(), x), Expression::And { .. }));
    }

    #[test]
    fn exists_bodies_select_one() {
        let from = From::Table {
            reference: TableReference::DBTable {
                schema: None,
                table: "friendships".to_string(),
            },
            alias: TableAlias {
                unique_index: 0,
                name: "friendships".to_string(),
            },
        };
        assert_eq!(
            select_to_sql(&select_one(from, false_expr())).sql,
            r#"SELECT 1 FROM "friendships" AS "friendships" WHERE false"#
        );
    }
}
