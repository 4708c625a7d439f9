//! Translate predicates into SQL conditions.

use query_engine_metadata::metadata::ComparisonOperator;
use query_engine_models::{Expression, Literal};
use query_engine_sql::sql;

use super::fields::{self, ResolvedField};
use super::root::CurrentSelect;
use super::values;
use crate::translation::error::Error;
use crate::translation::helpers::Env;

/// Translate a predicate over the rows of the current select.
pub fn translate_expression(
    env: &Env,
    current: &CurrentSelect,
    expression: &Expression,
) -> Result<sql::ast::Expression, Error> {
    match expression {
        Expression::And { expressions } => expressions
            .iter()
            .map(|expression| translate_expression(env, current, expression))
            .try_fold(sql::helpers::true_expr(), |acc, expression| {
                Ok(sql::helpers::and(acc, expression?))
            }),
        Expression::Or { expressions } => {
            let mut translated = expressions
                .iter()
                .map(|expression| translate_expression(env, current, expression));
            match translated.next() {
                None => Ok(sql::helpers::false_expr()),
                Some(first) => translated.try_fold(first?, |acc, expression| {
                    Ok(sql::ast::Expression::Or {
                        left: Box::new(acc),
                        right: Box::new(expression?),
                    })
                }),
            }
        }
        Expression::Not { expression } => Ok(sql::ast::Expression::Not(Box::new(
            translate_expression(env, current, expression)?,
        ))),
        Expression::BinaryComparison {
            field,
            operator,
            value: Literal::Null,
        } => {
            let resolved = fields::lookup_field(env, current, field)?;
            match operator {
                ComparisonOperator::Equals => Ok(is_null(resolved)),
                ComparisonOperator::NotEquals => {
                    Ok(sql::ast::Expression::Not(Box::new(is_null(resolved))))
                }
                _ => Err(Error::NotSupported(format!(
                    "comparing '{field}' with null using '{operator}'"
                ))),
            }
        }
        Expression::BinaryComparison {
            field,
            operator,
            value,
        } => {
            let resolved = fields::lookup_field(env, current, field)?;
            check_operator(field, *operator, &resolved)?;
            Ok(sql::ast::Expression::BinaryOperation {
                left: Box::new(resolved.expression),
                operator: sql::ast::BinaryOperator(sql_operator(*operator).to_string()),
                right: Box::new(values::translate_literal(
                    field,
                    resolved.scalar_type,
                    value,
                )?),
            })
        }
        Expression::In { field, values } => {
            let resolved = fields::lookup_field(env, current, field)?;
            check_operator(field, ComparisonOperator::Equals, &resolved)?;
            if values.is_empty() {
                return Ok(sql::helpers::false_expr());
            }
            let right = values
                .iter()
                .map(|value| values::translate_literal(field, resolved.scalar_type, value))
                .collect::<Result<Vec<_>, Error>>()?;
            Ok(sql::ast::Expression::BinaryArrayOperation {
                left: Box::new(resolved.expression),
                operator: sql::ast::BinaryArrayOperator::In,
                right,
            })
        }
        Expression::IsNull { field } => Ok(is_null(fields::lookup_field(env, current, field)?)),
    }
}

fn is_null(resolved: ResolvedField) -> sql::ast::Expression {
    sql::ast::Expression::UnaryOperation {
        expression: Box::new(resolved.expression),
        operator: sql::ast::UnaryOperator::IsNull,
    }
}

fn check_operator(
    field: &str,
    operator: ComparisonOperator,
    resolved: &ResolvedField,
) -> Result<(), Error> {
    match resolved.scalar_type {
        Some(scalar_type) if !scalar_type.comparison_operators().contains(&operator) => {
            Err(Error::OperatorNotSupported {
                field: field.to_string(),
                operator,
                scalar_type,
            })
        }
        _ => Ok(()),
    }
}

/// The SQL spelling of a comparison operator.
pub fn sql_operator(operator: ComparisonOperator) -> &'static str {
    match operator {
        ComparisonOperator::Equals => "=",
        ComparisonOperator::NotEquals => "<>",
        ComparisonOperator::LessThan => "<",
        ComparisonOperator::LessThanOrEqualTo => "<=",
        ComparisonOperator::GreaterThan => ">",
        ComparisonOperator::GreaterThanOrEqualTo => ">=",
    }
}
