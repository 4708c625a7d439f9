//! Check objects against the declared fields of their type.

use thiserror::Error;

use super::database::{Nullable, ScalarType};
use super::object_types::{ObjectTypeInfo, ID_KEY};

/// Reasons an object does not fit its declared type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("required field '{0}' is missing")]
    MissingField(String),
    #[error("field '{0}' is not nullable but holds null")]
    UnexpectedNull(String),
    #[error("field '{field}' should hold a {expected} value, found {found}")]
    WrongType {
        field: String,
        expected: ScalarType,
        found: &'static str,
    },
}

impl ObjectTypeInfo {
    /// Check that every non-nullable field is present and every present field holds a value
    /// of the right JSON kind. Keys that do not name a field are ignored.
    pub fn validate_object(
        &self,
        object: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), ValidationError> {
        for (name, field) in &self.fields {
            let value = if *name == self.id_field {
                object.get(ID_KEY).or_else(|| object.get(name))
            } else {
                object.get(name)
            };
            match value {
                None => {
                    if field.nullable == Nullable::NonNullable {
                        return Err(ValidationError::MissingField(name.clone()));
                    }
                }
                Some(serde_json::Value::Null) => {
                    if field.nullable == Nullable::NonNullable {
                        return Err(ValidationError::UnexpectedNull(name.clone()));
                    }
                }
                Some(value) => {
                    if !value_fits(field.r#type, value) {
                        return Err(ValidationError::WrongType {
                            field: name.clone(),
                            expected: field.r#type,
                            found: json_kind(value),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

fn value_fits(scalar_type: ScalarType, value: &serde_json::Value) -> bool {
    match scalar_type {
        ScalarType::Boolean => value.is_boolean(),
        ScalarType::Smallint | ScalarType::Integer | ScalarType::Bigint => {
            value.is_i64() || value.is_u64()
        }
        ScalarType::Real | ScalarType::DoublePrecision | ScalarType::Numeric => value.is_number(),
        ScalarType::Json => true,
        ScalarType::Text
        | ScalarType::CharacterVarying
        | ScalarType::Date
        | ScalarType::Time
        | ScalarType::Timestamp
        | ScalarType::Timestamptz
        | ScalarType::Uuid
        | ScalarType::Bytea => value.is_string(),
    }
}

/// The JSON kind of a value, for error messages.
pub fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user() -> ObjectTypeInfo {
        ObjectTypeInfo::new("User")
            .with_field("id", ScalarType::Bigint, Nullable::NonNullable)
            .with_field("name", ScalarType::Text, Nullable::NonNullable)
            .with_field("age", ScalarType::Integer, Nullable::Nullable)
    }

    fn object(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        match value {
            serde_json::Value::Object(map) => map,
            other => panic!("expected an object, got {other}"),
        }
    }

    #[test]
    fn accepts_identity_key_and_missing_nullable_fields() {
        let result = user().validate_object(&object(json!({":id": 1, "name": "id1"})));
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn rejects_missing_required_field() {
        let result = user().validate_object(&object(json!({"id": 1})));
        assert_eq!(result, Err(ValidationError::MissingField("name".into())));
    }

    #[test]
    fn rejects_null_in_required_field() {
        let result = user().validate_object(&object(json!({"id": 1, "name": null})));
        assert_eq!(result, Err(ValidationError::UnexpectedNull("name".into())));
    }

    #[test]
    fn rejects_fractional_integer() {
        let result =
            user().validate_object(&object(json!({"id": 1, "name": "id1", "age": 16.5})));
        assert_eq!(
            result,
            Err(ValidationError::WrongType {
                field: "age".into(),
                expected: ScalarType::Integer,
                found: "number",
            })
        );
    }
}
