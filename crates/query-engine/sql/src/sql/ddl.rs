//! Table definitions and their conversion to DDL statements.

use super::ast::{ScalarType, TableReference};
use super::string::{DDL, SQL};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTable {
    pub table: TableReference,
    pub columns: Vec<ColumnDefinition>,
    pub primary_key: Vec<String>,
    pub foreign_keys: Vec<ForeignKey>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub name: String,
    pub r#type: ScalarType,
    pub not_null: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub columns: Vec<String>,
    pub references: TableReference,
    pub referenced_columns: Vec<String>,
}

/// `ALTER TABLE ... ADD FOREIGN KEY ...`, for a key that cannot be declared with its table
/// because the referenced table is created later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddForeignKey {
    pub table: TableReference,
    pub foreign_key: ForeignKey,
}

fn identifier_list(sql: &mut SQL, names: &[String]) {
    sql.append_syntax("(");
    for (index, name) in names.iter().enumerate() {
        if index > 0 {
            sql.append_syntax(", ");
        }
        sql.append_identifier(name);
    }
    sql.append_syntax(")");
}

impl CreateTable {
    pub fn to_sql(&self, sql: &mut SQL) {
        sql.append_syntax("CREATE TABLE ");
        self.table.to_sql(sql);
        sql.append_syntax(" (");

        let mut first = true;
        let mut separator = |sql: &mut SQL| {
            if !first {
                sql.append_syntax(", ");
            }
            first = false;
        };

        for column in &self.columns {
            separator(sql);
            column.to_sql(sql);
        }
        if !self.primary_key.is_empty() {
            separator(sql);
            sql.append_syntax("PRIMARY KEY ");
            identifier_list(sql, &self.primary_key);
        }
        for foreign_key in &self.foreign_keys {
            separator(sql);
            foreign_key.to_sql(sql);
        }
        sql.append_syntax(")");
    }

    pub fn to_ddl(&self) -> DDL {
        let mut sql = SQL::new();
        self.to_sql(&mut sql);
        DDL(sql)
    }
}

impl AddForeignKey {
    pub fn to_sql(&self, sql: &mut SQL) {
        sql.append_syntax("ALTER TABLE ");
        self.table.to_sql(sql);
        sql.append_syntax(" ADD ");
        self.foreign_key.to_sql(sql);
    }

    pub fn to_ddl(&self) -> DDL {
        let mut sql = SQL::new();
        self.to_sql(&mut sql);
        DDL(sql)
    }
}

impl ColumnDefinition {
    pub fn to_sql(&self, sql: &mut SQL) {
        sql.append_identifier(&self.name);
        sql.append_syntax(" ");
        self.r#type.to_sql(sql);
        if self.not_null {
            sql.append_syntax(" NOT NULL");
        }
    }
}

impl ForeignKey {
    pub fn to_sql(&self, sql: &mut SQL) {
        sql.append_syntax("FOREIGN KEY ");
        identifier_list(sql, &self.columns);
        sql.append_syntax(" REFERENCES ");
        self.references.to_sql(sql);
        sql.append_syntax(" ");
        identifier_list(sql, &self.referenced_columns);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    #[test]
    fn create_table_with_keys() {
        let user = TableReference::DBTable {
            schema: None,
            table: "user".to_string(),
        };
        let review = CreateTable {
            table: TableReference::DBTable {
                schema: Some("public".to_string()),
                table: "review".to_string(),
            },
            columns: vec![
                ColumnDefinition {
                    name: "id".to_string(),
                    r#type: ScalarType("bigint".to_string()),
                    not_null: true,
                },
                ColumnDefinition {
                    name: "author_id".to_string(),
                    r#type: ScalarType("bigint".to_string()),
                    not_null: false,
                },
            ],
            primary_key: vec!["id".to_string()],
            foreign_keys: vec![ForeignKey {
                columns: vec!["author_id".to_string()],
                references: user,
                referenced_columns: vec!["id".to_string()],
            }],
        };

        assert_eq!(
            review.to_ddl().0.sql,
            r#"CREATE TABLE "public"."review" ("id" bigint NOT NULL, "author_id" bigint, PRIMARY KEY ("id"), FOREIGN KEY ("author_id") REFERENCES "user" ("id"))"#
        );
    }

    #[test]
    fn foreign_keys_added_later() {
        let statement = AddForeignKey {
            table: TableReference::DBTable {
                schema: None,
                table: "account".to_string(),
            },
            foreign_key: ForeignKey {
                columns: vec!["profile_id".to_string()],
                references: TableReference::DBTable {
                    schema: None,
                    table: "profile".to_string(),
                },
                referenced_columns: vec!["id".to_string()],
            },
        };

        assert_eq!(
            statement.to_ddl().0.sql,
            r#"ALTER TABLE "account" ADD FOREIGN KEY ("profile_id") REFERENCES "profile" ("id")"#
        );
    }
}
