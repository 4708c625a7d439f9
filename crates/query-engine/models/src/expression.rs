//! Predicate expressions over object fields.

use std::fmt;
use std::str::FromStr;

use query_engine_metadata::metadata::ComparisonOperator;
use serde::{Deserialize, Serialize};

use crate::parse::{self, ParseError};

/// A boolean predicate over the fields of a single object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Expression {
    And {
        expressions: Vec<Expression>,
    },
    Or {
        expressions: Vec<Expression>,
    },
    Not {
        expression: Box<Expression>,
    },
    /// Compare a field against a literal.
    BinaryComparison {
        field: String,
        operator: ComparisonOperator,
        value: Literal,
    },
    /// The field equals one of the literals.
    In {
        field: String,
        values: Vec<Literal>,
    },
    IsNull {
        field: String,
    },
}

/// A literal value appearing in a predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl Expression {
    pub fn compare(field: &str, operator: ComparisonOperator, value: impl Into<Literal>) -> Self {
        Expression::BinaryComparison {
            field: field.to_string(),
            operator,
            value: value.into(),
        }
    }

    pub fn is_in<L: Into<Literal>>(field: &str, values: impl IntoIterator<Item = L>) -> Self {
        Expression::In {
            field: field.to_string(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_null(field: &str) -> Self {
        Expression::IsNull {
            field: field.to_string(),
        }
    }

    #[must_use]
    pub fn negate(self) -> Self {
        Expression::Not {
            expression: Box::new(self),
        }
    }

    /// Conjunction of two expressions, flattening nested conjunctions.
    #[must_use]
    pub fn and(self, other: Expression) -> Self {
        let mut expressions = match self {
            Expression::And { expressions } => expressions,
            other => vec![other],
        };
        match other {
            Expression::And {
                expressions: others,
            } => expressions.extend(others),
            other => expressions.push(other),
        }
        Expression::And { expressions }
    }

    fn is_compound(&self) -> bool {
        matches!(self, Expression::And { .. } | Expression::Or { .. })
    }
}

/// The field a reference names without its object variable prefix: `user.age` names `age`.
pub fn unqualified(reference: &str) -> &str {
    reference
        .split_once('.')
        .map_or(reference, |(_variable, field)| field)
}

impl Literal {
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Literal::Null => serde_json::Value::Null,
            Literal::Bool(b) => serde_json::Value::Bool(*b),
            Literal::Integer(i) => serde_json::Value::from(*i),
            Literal::Float(f) => serde_json::Value::from(*f),
            Literal::String(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Integer(value)
    }
}

impl From<i32> for Literal {
    fn from(value: i32) -> Self {
        Literal::Integer(value.into())
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Literal::Float(value)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Bool(value)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::String(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::String(value)
    }
}

impl FromStr for Expression {
    type Err = ParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        parse::parse_predicate(text)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => f.write_str("null"),
            Literal::Bool(b) => write!(f, "{b}"),
            Literal::Integer(i) => write!(f, "{i}"),
            Literal::Float(x) => write!(f, "{x:?}"),
            Literal::String(s) => write!(f, "'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
        }
    }
}

/// Renders predicate text that parses back to the same expression.
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::And { expressions } => write_joined(f, expressions, " and "),
            Expression::Or { expressions } => write_joined(f, expressions, " or "),
            Expression::Not { expression } if expression.is_compound() => {
                write!(f, "not ({expression})")
            }
            Expression::Not { expression } => write!(f, "not {expression}"),
            Expression::BinaryComparison {
                field,
                operator,
                value,
            } => write!(f, "{field} {operator} {value}"),
            Expression::In { field, values } => {
                write!(f, "{field} in (")?;
                for (index, value) in values.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str(")")
            }
            Expression::IsNull { field } => write!(f, "{field} == null"),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, expressions: &[Expression], separator: &str) -> fmt::Result {
    for (index, expression) in expressions.iter().enumerate() {
        if index > 0 {
            f.write_str(separator)?;
        }
        if expression.is_compound() {
            write!(f, "({expression})")?;
        } else {
            write!(f, "{expression}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_parenthesizes_nested_connectives() {
        let expression = Expression::Or {
            expressions: vec![
                Expression::compare("age", ComparisonOperator::LessThan, 16)
                    .and(Expression::compare("name", ComparisonOperator::NotEquals, "it's")),
                Expression::is_null("age").negate(),
            ],
        };
        assert_eq!(
            expression.to_string(),
            r"(age < 16 and name != 'it\'s') or not age == null"
        );
    }

    #[test]
    fn display_output_parses_back() {
        let expression = Expression::compare("score", ComparisonOperator::GreaterThan, 2.0)
            .and(Expression::is_in("id", [1, 2, 3]))
            .and(
                Expression::Or {
                    expressions: vec![
                        Expression::compare("active", ComparisonOperator::Equals, true),
                        Expression::is_null("name"),
                    ],
                }
                .negate(),
            );
        let reparsed: Expression = expression.to_string().parse().expect("valid predicate");
        assert_eq!(reparsed, expression);
    }
}
