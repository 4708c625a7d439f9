//! Handle the translation of literal values.

use query_engine_metadata::metadata::ScalarType;
use query_engine_models::Literal;
use query_engine_sql::sql;

use crate::translation::error::Error;

/// Convert a literal compared against a field into a SQL expression, checking it against the
/// field's type when the type is known.
pub fn translate_literal(
    field: &str,
    scalar_type: Option<ScalarType>,
    literal: &Literal,
) -> Result<sql::ast::Expression, Error> {
    if let Literal::Float(float) = literal {
        if !float.is_finite() {
            return Err(Error::NotSupported(format!(
                "the non-finite number {float} in a comparison with '{field}'"
            )));
        }
    }

    let value = match (scalar_type, literal) {
        (_, Literal::Null) => sql::ast::Value::Null,

        // untyped columns take any literal
        (None, Literal::Bool(b)) => sql::ast::Value::Bool(*b),
        (None, Literal::Integer(i)) => sql::ast::Value::Int8(*i),
        (None, Literal::Float(f)) => sql::ast::Value::Float8(*f),
        (None, Literal::String(s)) => sql::ast::Value::String(s.clone()),

        (Some(ScalarType::Boolean), Literal::Bool(b)) => sql::ast::Value::Bool(*b),

        // numbers
        (Some(t), Literal::Integer(i)) if t.is_integer() || t.is_float() => {
            sql::ast::Value::Int8(*i)
        }
        (Some(t), Literal::Float(f)) if t.is_float() => sql::ast::Value::Float8(*f),

        // strings
        (Some(ScalarType::Text | ScalarType::CharacterVarying), Literal::String(s)) => {
            sql::ast::Value::String(s.clone())
        }
        (Some(t), Literal::String(s)) if t.is_string_encoded() => {
            return Ok(sql::ast::Expression::Cast {
                expression: Box::new(sql::ast::Expression::Value(sql::ast::Value::String(
                    s.clone(),
                ))),
                r#type: sql::ast::ScalarType(t.sql_name().to_string()),
            });
        }

        (Some(expected), _) => {
            return Err(Error::TypeMismatch {
                field: field.to_string(),
                expected,
                value: literal.to_string(),
            })
        }
    };
    Ok(sql::ast::Expression::Value(value))
}
