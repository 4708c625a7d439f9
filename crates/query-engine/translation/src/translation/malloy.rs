//! Translate an object query to a Malloy `run:` statement.
//!
//! Each stage of the pipeline collects clauses until an operation arrives whose meaning would
//! change if it joined the stage (a filter after a limit, say); that operation opens a new
//! `-> { }` stage reading the output of the previous one.

use std::fmt::Write;

use query_engine_metadata::metadata::{self, ComparisonOperator, ID_KEY};
use query_engine_models::{unqualified, Expression, Literal, Operation, OrderDirection, Query};

use super::error::Error;
use super::helpers::Env;

const INDENT: &str = "  ";

#[derive(Debug, Clone, PartialEq)]
enum Clause {
    Select(Vec<String>),
    Where(String),
    OrderBy(Vec<String>),
    Limit(u32),
    Count,
}

#[derive(Debug, Default)]
struct Stage {
    clauses: Vec<Clause>,
}

impl Stage {
    fn has(&self, predicate: impl Fn(&Clause) -> bool) -> bool {
        self.clauses.iter().any(predicate)
    }

    fn has_select(&self) -> bool {
        self.has(|clause| matches!(clause, Clause::Select(_)))
    }

    fn has_limit(&self) -> bool {
        self.has(|clause| matches!(clause, Clause::Limit(_)))
    }

    fn is_aggregated(&self) -> bool {
        self.has(|clause| matches!(clause, Clause::Count))
    }
}

/// Translation state: the stages so far and the fields visible to the next operation.
struct Translation<'a> {
    object_type: &'a str,
    info: &'a metadata::ObjectTypeInfo,
    stages: Vec<Stage>,
    /// The output fields of the current stage.
    fields: Vec<String>,
    /// Set after a rename; the new name is only visible to the next stage.
    renamed: bool,
}

/// Translate a query into Malloy text run against the given connection.
pub fn translate(
    metadata: &metadata::Metadata,
    query: &Query,
    connection: &str,
) -> Result<String, Error> {
    let env = Env::new(metadata);
    let object_type = query.source.object_type();
    let info = env.lookup_object_type(object_type)?;

    let mut translation = Translation {
        object_type,
        info,
        stages: vec![Stage::default()],
        fields: info
            .fields
            .values()
            .map(|field| field.column_name.clone())
            .collect(),
        renamed: false,
    };

    if let Some(ids) = query.source.ids() {
        let id = translation.field(ID_KEY)?;
        let condition = if ids.is_empty() {
            "false".to_string()
        } else {
            let ids = ids.iter().map(ToString::to_string).collect::<Vec<_>>();
            format!("{id} = {}", ids.join(" | "))
        };
        translation.push(Clause::Where(condition));
    }

    for operation in &query.operations {
        translation.translate_operation(operation)?;
    }

    let table = match &info.schema_name {
        Some(schema) => format!("{schema}.{}", info.table_name),
        None => info.table_name.clone(),
    };
    let mut malloy = format!("run: {connection}.table('{table}') -> ");
    for (index, stage) in translation.stages.iter().enumerate() {
        if index > 0 {
            malloy.push_str(" -> ");
        }
        malloy.push_str("{\n");
        for clause in &stage.clauses {
            malloy.push_str(INDENT);
            write_clause(&mut malloy, clause);
            malloy.push('\n');
        }
        malloy.push('}');
    }

    tracing::debug!(malloy, "generated Malloy");
    Ok(malloy)
}

fn write_clause(out: &mut String, clause: &Clause) {
    // writing to a String cannot fail
    let _ = match clause {
        Clause::Select(fields) => write!(out, "select: {}", fields.join(", ")),
        Clause::Where(condition) => write!(out, "where: {condition}"),
        Clause::OrderBy(keys) => write!(out, "order_by: {}", keys.join(", ")),
        Clause::Limit(count) => write!(out, "limit: {count}"),
        Clause::Count => write!(out, "aggregate: count is count()"),
    };
}

impl Translation<'_> {
    fn stage(&self) -> &Stage {
        &self.stages[self.stages.len() - 1]
    }

    fn push(&mut self, clause: Clause) {
        let last = self.stages.len() - 1;
        self.stages[last].clauses.push(clause);
    }

    /// Start a new stage when the current one fails the condition or a rename is pending.
    fn next_stage_if(&mut self, condition: impl Fn(&Stage) -> bool) {
        if condition(self.stage()) || self.renamed {
            self.stages.push(Stage::default());
            self.renamed = false;
        }
    }

    fn is_first_stage(&self) -> bool {
        self.stages.len() == 1
    }

    /// Resolve a field reference to the name Malloy knows it by. The first stage sees every
    /// column of the table; later stages see the output of the previous one.
    fn field(&self, reference: &str) -> Result<String, Error> {
        let name = unqualified(reference);
        let name = if name == "id" { ID_KEY } else { name };

        if self.is_first_stage() {
            if let Some((_, field)) = self.info.lookup_field(name) {
                return Ok(field.column_name.clone());
            }
        }

        let name = if name == ID_KEY {
            self.info
                .id_field_info()
                .map_or(self.info.id_field.as_str(), |field| field.column_name.as_str())
        } else {
            name
        };
        if self.fields.iter().any(|field| field == name) {
            Ok(name.to_string())
        } else {
            Err(Error::FieldNotFound {
                field: unqualified(reference).to_string(),
                scope: format!("object type '{}'", self.object_type),
            })
        }
    }

    fn translate_operation(&mut self, operation: &Operation) -> Result<(), Error> {
        match operation {
            Operation::Project { fields } => {
                self.next_stage_if(|stage| stage.has_select() || stage.is_aggregated());
                let fields = fields
                    .iter()
                    .map(|field| self.field(field))
                    .collect::<Result<Vec<_>, Error>>()?;
                self.fields.clone_from(&fields);
                self.push(Clause::Select(fields));
            }
            Operation::Where { predicate } => {
                self.next_stage_if(|stage| stage.has_limit() || stage.is_aggregated());
                let condition = self.expression(predicate)?;
                self.push(Clause::Where(condition));
            }
            Operation::OrderBy { key, direction } => {
                self.next_stage_if(|stage| stage.has_limit() || stage.is_aggregated());
                let mut key = self.field(key)?;
                if *direction == OrderDirection::Desc {
                    key.push_str(" desc");
                }
                let last = self.stages.len() - 1;
                let existing = self.stages[last]
                    .clauses
                    .iter_mut()
                    .find_map(|clause| match clause {
                        Clause::OrderBy(keys) => Some(keys),
                        _ => None,
                    });
                match existing {
                    Some(keys) => keys.insert(0, key),
                    None => self.push(Clause::OrderBy(vec![key])),
                }
            }
            Operation::Take { count } => {
                self.next_stage_if(|stage| stage.has_limit() || stage.is_aggregated());
                self.push(Clause::Limit(*count));
            }
            Operation::Count => {
                self.next_stage_if(|stage| {
                    stage.has_select() || stage.has_limit() || stage.is_aggregated()
                });
                let last = self.stages.len() - 1;
                self.stages[last]
                    .clauses
                    .retain(|clause| !matches!(clause, Clause::OrderBy(_)));
                self.push(Clause::Count);
                self.fields = vec!["count".to_string()];
            }
            Operation::Let { old, new } => {
                self.next_stage_if(|stage| stage.is_aggregated());
                let old = self.field(old)?;
                let new = unqualified(new).to_string();
                let renamed = format!("{new} is {old}");

                let last = self.stages.len() - 1;
                let select = self.stages[last]
                    .clauses
                    .iter_mut()
                    .find_map(|clause| match clause {
                        Clause::Select(fields) => Some(fields),
                        _ => None,
                    });
                match select {
                    Some(fields) => {
                        for field in fields.iter_mut().filter(|field| **field == old) {
                            field.clone_from(&renamed);
                        }
                    }
                    None => {
                        let fields = self
                            .fields
                            .iter()
                            .map(|field| {
                                if *field == old {
                                    renamed.clone()
                                } else {
                                    field.clone()
                                }
                            })
                            .collect();
                        self.push(Clause::Select(fields));
                    }
                }
                for field in self.fields.iter_mut().filter(|field| **field == old) {
                    field.clone_from(&new);
                }
                self.renamed = true;
            }
            Operation::Skip { .. } => return Err(unsupported("skip")),
            Operation::Nest { .. } => return Err(unsupported("nest")),
            Operation::GroupBy { .. } => return Err(unsupported("group_by")),
            Operation::Edge { .. } => return Err(unsupported("edge traversal")),
            Operation::Union { .. } => return Err(unsupported("union")),
        }
        Ok(())
    }

    fn expression(&self, expression: &Expression) -> Result<String, Error> {
        match expression {
            Expression::And { expressions } if expressions.is_empty() => Ok("true".to_string()),
            Expression::Or { expressions } if expressions.is_empty() => Ok("false".to_string()),
            Expression::And { expressions } => self.joined(expressions, " and "),
            Expression::Or { expressions } => self.joined(expressions, " or "),
            Expression::Not { expression } => Ok(format!("not ({})", self.expression(expression)?)),
            Expression::BinaryComparison {
                field,
                operator,
                value: Literal::Null,
            } => {
                let field = self.field(field)?;
                match operator {
                    ComparisonOperator::Equals => Ok(format!("{field} is null")),
                    ComparisonOperator::NotEquals => Ok(format!("{field} is not null")),
                    _ => Err(Error::NotSupported(format!(
                        "comparing '{field}' with null using '{operator}'"
                    ))),
                }
            }
            Expression::BinaryComparison {
                field,
                operator,
                value,
            } => Ok(format!(
                "{} {} {}",
                self.field(field)?,
                malloy_operator(*operator),
                literal(value)
            )),
            Expression::In { values, .. } if values.is_empty() => Ok("false".to_string()),
            Expression::In { field, values } => {
                let values = values.iter().map(literal).collect::<Vec<_>>();
                Ok(format!("{} = {}", self.field(field)?, values.join(" | ")))
            }
            Expression::IsNull { field } => Ok(format!("{} is null", self.field(field)?)),
        }
    }

    fn joined(&self, expressions: &[Expression], separator: &str) -> Result<String, Error> {
        let parts = expressions
            .iter()
            .map(|expression| {
                let text = self.expression(expression)?;
                Ok(match expression {
                    Expression::And { .. } | Expression::Or { .. } => format!("({text})"),
                    _ => text,
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;
        Ok(parts.join(separator))
    }
}

fn unsupported(operation: &str) -> Error {
    Error::NotSupported(format!("{operation} in Malloy output"))
}

fn malloy_operator(operator: ComparisonOperator) -> &'static str {
    match operator {
        ComparisonOperator::Equals => "=",
        ComparisonOperator::NotEquals => "!=",
        other => other.symbol(),
    }
}

fn literal(value: &Literal) -> String {
    match value {
        Literal::String(s) => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use query_engine_metadata::metadata::{Metadata, Nullable, ObjectTypeInfo, ScalarType};
    use query_engine_models::QueryBuilder;
    use similar_asserts::assert_eq;

    fn metadata() -> Metadata {
        Metadata::empty().with_object_type(
            "User",
            ObjectTypeInfo::new("User")
                .with_field("id", ScalarType::Bigint, Nullable::NonNullable)
                .with_field("name", ScalarType::Text, Nullable::Nullable)
                .with_field("age", ScalarType::Integer, Nullable::Nullable),
        )
    }

    #[test]
    fn project_where_order_take() {
        let query = QueryBuilder::with_ids("User", 1..10)
            .project([":id", "name"])
            .where_("user.age >= 16")
            .expect("valid predicate")
            .order_by("user.age")
            .take(3)
            .build();

        assert_eq!(
            translate(&metadata(), &query, "duckdb").expect("translates"),
            "\
run: duckdb.table('user') -> {
  where: id = 1 | 2 | 3 | 4 | 5 | 6 | 7 | 8 | 9
  select: id, name
  where: age >= 16
  order_by: age
  limit: 3
}"
        );
    }

    #[test]
    fn filters_after_limits_start_a_stage() {
        let query = QueryBuilder::new("User")
            .order_by_desc("age")
            .take(10)
            .where_("name == 'id1' or age < 17")
            .expect("valid predicate")
            .count()
            .build();

        assert_eq!(
            translate(&metadata(), &query, "duckdb").expect("translates"),
            "\
run: duckdb.table('user') -> {
  order_by: age desc
  limit: 10
} -> {
  where: name = 'id1' or age < 17
  aggregate: count is count()
}"
        );
    }

    #[test]
    fn renames_select_every_field() {
        let query = QueryBuilder::new("User")
            .let_("name", "label")
            .project(["label"])
            .build();

        assert_eq!(
            translate(&metadata(), &query, "duckdb").expect("translates"),
            "\
run: duckdb.table('user') -> {
  select: id, label is name, age
} -> {
  select: label
}"
        );
    }

    #[test]
    fn edges_are_not_supported() {
        let query = QueryBuilder::new("User").edge("friends").build();
        assert_eq!(
            translate(&metadata(), &query, "duckdb"),
            Err(Error::NotSupported(
                "edge traversal in Malloy output".to_string()
            ))
        );
    }
}
