//! Render a SQL AST as SQL text with parameters.

use super::ast::*;
use super::helpers;
use super::string::*;

fn comma_separated<T>(sql: &mut SQL, items: &[T], mut render: impl FnMut(&T, &mut SQL)) {
    for (index, item) in items.iter().enumerate() {
        if index > 0 {
            sql.append_syntax(", ");
        }
        render(item, sql);
    }
}

/// Render `(...)` around whatever `inner` appends.
fn parenthesized(sql: &mut SQL, inner: impl FnOnce(&mut SQL)) {
    sql.append_syntax("(");
    inner(sql);
    sql.append_syntax(")");
}

/// Render `name(args...)`.
fn call(sql: &mut SQL, name: &str, args: &[Expression]) {
    sql.append_syntax(name);
    parenthesized(sql, |sql| comma_separated(sql, args, Expression::to_sql));
}

fn aliased(sql: &mut SQL, alias: &TableAlias, inner: impl FnOnce(&mut SQL)) {
    inner(sql);
    sql.append_syntax(" AS ");
    alias.to_sql(sql);
}

impl Explain<'_> {
    pub fn to_sql(&self, sql: &mut SQL) {
        let Explain::Select(select) = self;
        sql.append_syntax("EXPLAIN ");
        select.to_sql(sql);
    }
}

impl Select {
    pub fn to_sql(&self, sql: &mut SQL) {
        sql.append_syntax("SELECT ");
        self.select_list.to_sql(sql);
        if let Some(from) = &self.from {
            sql.append_syntax(" FROM ");
            from.to_sql(sql);
        }
        self.where_.to_sql(sql);
        self.group_by.to_sql(sql);
        self.order_by.to_sql(sql);
        self.limit.to_sql(sql);
    }
}

impl SelectList {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            SelectList::SelectList(columns) => comma_separated(sql, columns, |(alias, expression), sql| {
                expression.to_sql(sql);
                sql.append_syntax(" AS ");
                alias.to_sql(sql);
            }),
            SelectList::Select1 => sql.append_syntax("1"),
        }
    }
}

impl From {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            From::Table { reference, alias } => aliased(sql, alias, |sql| reference.to_sql(sql)),
            From::Select { select, alias } => {
                aliased(sql, alias, |sql| parenthesized(sql, |sql| select.to_sql(sql)));
            }
            From::Union { selects, alias } => aliased(sql, alias, |sql| {
                parenthesized(sql, |sql| {
                    for (index, select) in selects.iter().enumerate() {
                        if index > 0 {
                            sql.append_syntax(" UNION ALL ");
                        }
                        parenthesized(sql, |sql| select.to_sql(sql));
                    }
                });
            }),
        }
    }
}

impl Where {
    pub fn to_sql(&self, sql: &mut SQL) {
        if self.0 != helpers::true_expr() {
            sql.append_syntax(" WHERE ");
            self.0.to_sql(sql);
        }
    }
}

impl GroupBy {
    pub fn to_sql(&self, sql: &mut SQL) {
        if !self.elements.is_empty() {
            sql.append_syntax(" GROUP BY ");
            comma_separated(sql, &self.elements, Expression::to_sql);
        }
    }
}

impl OrderBy {
    pub fn to_sql(&self, sql: &mut SQL) {
        if !self.elements.is_empty() {
            sql.append_syntax(" ORDER BY ");
            comma_separated(sql, &self.elements, |element, sql| {
                element.target.to_sql(sql);
                sql.append_syntax(match element.direction {
                    OrderByDirection::Asc => " ASC",
                    OrderByDirection::Desc => " DESC",
                });
            });
        }
    }
}

impl Limit {
    pub fn to_sql(&self, sql: &mut SQL) {
        for (keyword, value) in [(" LIMIT ", self.limit), (" OFFSET ", self.offset)] {
            if let Some(value) = value {
                sql.append_syntax(keyword);
                sql.append_syntax(&value.to_string());
            }
        }
    }
}

impl Expression {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            Expression::ColumnReference(column) => column.to_sql(sql),
            Expression::Value(value) => value.to_sql(sql),
            Expression::And { left, right } => parenthesized(sql, |sql| {
                left.to_sql(sql);
                sql.append_syntax(" AND ");
                right.to_sql(sql);
            }),
            Expression::Or { left, right } => parenthesized(sql, |sql| {
                left.to_sql(sql);
                sql.append_syntax(" OR ");
                right.to_sql(sql);
            }),
            Expression::Not(expression) => {
                sql.append_syntax("NOT ");
                expression.to_sql(sql);
            }
            Expression::BinaryOperation {
                left,
                operator: BinaryOperator(operator),
                right,
            } => parenthesized(sql, |sql| {
                left.to_sql(sql);
                sql.append_syntax(&format!(" {operator} "));
                right.to_sql(sql);
            }),
            Expression::BinaryArrayOperation {
                left,
                operator: BinaryArrayOperator::In,
                right,
            } => parenthesized(sql, |sql| {
                left.to_sql(sql);
                sql.append_syntax(" IN ");
                parenthesized(sql, |sql| comma_separated(sql, right, Expression::to_sql));
            }),
            Expression::UnaryOperation {
                expression,
                operator: UnaryOperator::IsNull,
            } => parenthesized(sql, |sql| {
                expression.to_sql(sql);
                sql.append_syntax(" IS NULL");
            }),
            Expression::FunctionCall { function, args } => {
                let name = match function {
                    Function::Coalesce => "coalesce",
                    Function::JsonAgg => "json_agg",
                };
                call(sql, name, args);
            }
            Expression::Exists { select } => {
                sql.append_syntax("EXISTS ");
                parenthesized(sql, |sql| select.to_sql(sql));
            }
            Expression::CorrelatedSubSelect(select) => parenthesized(sql, |sql| select.to_sql(sql)),
            Expression::RowToJson(table) => {
                sql.append_syntax("row_to_json");
                parenthesized(sql, |sql| table.to_sql(sql));
            }
            Expression::Cast { expression, r#type } => {
                sql.append_syntax("CAST");
                parenthesized(sql, |sql| {
                    expression.to_sql(sql);
                    sql.append_syntax(" AS ");
                    r#type.to_sql(sql);
                });
            }
            Expression::Count(CountType::Star) => sql.append_syntax("COUNT(*)"),
        }
    }
}

impl Value {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            Value::Int8(i) => sql.append_syntax(&i.to_string()),
            Value::Float8(f) => sql.append_syntax(&format!("{f:?}")),
            Value::Bool(b) => sql.append_syntax(if *b { "true" } else { "false" }),
            Value::String(s) => sql.append_param(Param::String(s.clone())),
            Value::Null => sql.append_syntax("NULL"),
            Value::EmptyJsonArray => sql.append_syntax("'[]'"),
        }
    }
}

impl ScalarType {
    pub fn to_sql(&self, sql: &mut SQL) {
        sql.append_syntax(&self.0);
    }
}

impl TableReference {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            TableReference::DBTable { schema, table } => {
                if let Some(schema) = schema {
                    sql.append_identifier(schema);
                    sql.append_syntax(".");
                }
                sql.append_identifier(table);
            }
            TableReference::AliasedTable(alias) => alias.to_sql(sql),
        }
    }
}

impl TableAlias {
    /// The first alias of a name is the name itself. Later ones get a numeric suffix.
    pub fn to_sql(&self, sql: &mut SQL) {
        match self.unique_index {
            0 => sql.append_identifier(&self.name),
            index => sql.append_identifier(&format!("{}_{index}", self.name)),
        }
    }
}

impl ColumnReference {
    pub fn to_sql(&self, sql: &mut SQL) {
        let (table, name) = match self {
            ColumnReference::TableColumn { table, name } => (table, name),
            ColumnReference::AliasedColumn { table, column } => (table, &column.name),
        };
        table.to_sql(sql);
        sql.append_syntax(".");
        sql.append_identifier(name);
    }
}

impl ColumnAlias {
    pub fn to_sql(&self, sql: &mut SQL) {
        sql.append_identifier(&self.name);
    }
}

#[cfg(test)]
mod tests {
    use super::super::helpers::*;
    use super::*;
    use similar_asserts::assert_eq;

    fn user_table() -> (TableReference, TableAlias) {
        (
            TableReference::DBTable {
                schema: None,
                table: "user".to_string(),
            },
            TableAlias {
                unique_index: 0,
                name: "user".to_string(),
            },
        )
    }

    #[test]
    fn select_with_every_clause() {
        let (reference, alias) = user_table();
        let table = TableReference::AliasedTable(alias.clone());
        let (_, age) = make_column(table.clone(), "age".to_string(), make_column_alias("age"));

        let mut select = simple_select(vec![
            make_column(table.clone(), "id".to_string(), make_column_alias("id")),
            make_column(table.clone(), "name".to_string(), make_column_alias("name")),
        ]);
        select.from = Some(From::Table { reference, alias });
        select.where_ = Where(Expression::BinaryOperation {
            left: Box::new(age.clone()),
            operator: BinaryOperator(">=".to_string()),
            right: Box::new(Expression::Value(Value::Int8(16))),
        });
        select.order_by = OrderBy {
            elements: vec![OrderByElement {
                target: age,
                direction: OrderByDirection::Asc,
            }],
        };
        select.limit = Limit {
            limit: Some(3),
            offset: Some(1),
        };

        let sql = select_to_sql(&select);
        assert_eq!(
            sql.sql,
            r#"SELECT "user"."id" AS "id", "user"."name" AS "name" FROM "user" AS "user" WHERE ("user"."age" >= 16) ORDER BY "user"."age" ASC LIMIT 3 OFFSET 1"#
        );
        assert!(sql.params.is_empty());
    }

    #[test]
    fn strings_become_parameters() {
        let mut sql = SQL::new();
        Expression::BinaryArrayOperation {
            left: Box::new(Expression::Value(Value::String("a".to_string()))),
            operator: BinaryArrayOperator::In,
            right: vec![
                Expression::Value(Value::String("a".to_string())),
                Expression::Value(Value::Null),
            ],
        }
        .to_sql(&mut sql);
        assert_eq!(sql.sql, "($1 IN ($2, NULL))");
        assert_eq!(
            sql.params,
            vec![Param::String("a".to_string()), Param::String("a".to_string())]
        );
    }

    #[test]
    fn repeated_aliases_are_numbered() {
        let mut sql = SQL::new();
        TableAlias {
            unique_index: 2,
            name: "user".to_string(),
        }
        .to_sql(&mut sql);
        assert_eq!(sql.sql, r#""user_2""#);
    }

    #[test]
    fn unions_are_parenthesized() {
        let from = From::Union {
            selects: vec![simple_select(vec![]), simple_select(vec![])],
            alias: TableAlias {
                unique_index: 0,
                name: "t".to_string(),
            },
        };
        let mut sql = SQL::new();
        from.to_sql(&mut sql);
        assert_eq!(sql.sql, r#"((SELECT ) UNION ALL (SELECT )) AS "t""#);
    }
}
