//! Evaluate predicates and orderings over object results.

use std::cmp::Ordering;

use query_engine_metadata::metadata::ComparisonOperator;
use query_engine_models::{unqualified, Expression, Item, Literal};

/// Does the item satisfy the predicate?
///
/// A missing field reads as null. Comparing null, or values of different kinds, with anything
/// but an explicit null check is false.
pub fn evaluate(expression: &Expression, item: &Item) -> bool {
    match expression {
        Expression::And { expressions } => expressions.iter().all(|e| evaluate(e, item)),
        Expression::Or { expressions } => expressions.iter().any(|e| evaluate(e, item)),
        Expression::Not { expression } => !evaluate(expression, item),
        Expression::BinaryComparison {
            field,
            operator,
            value,
        } => compare_field(item, field, *operator, value),
        Expression::In { field, values } => values
            .iter()
            .any(|value| compare_field(item, field, ComparisonOperator::Equals, value)),
        Expression::IsNull { field } => is_null(field_value(item, field)),
    }
}

fn field_value<'a>(item: &'a Item, field: &str) -> Option<&'a serde_json::Value> {
    item.get(unqualified(field))
}

fn is_null(value: Option<&serde_json::Value>) -> bool {
    matches!(value, None | Some(serde_json::Value::Null))
}

fn compare_field(item: &Item, field: &str, operator: ComparisonOperator, literal: &Literal) -> bool {
    let value = field_value(item, field);
    if *literal == Literal::Null {
        return match operator {
            ComparisonOperator::Equals => is_null(value),
            ComparisonOperator::NotEquals => !is_null(value),
            _ => false,
        };
    }
    let Some(ordering) = value.and_then(|value| compare_literal(value, literal)) else {
        return false;
    };
    match operator {
        ComparisonOperator::Equals => ordering == Ordering::Equal,
        ComparisonOperator::NotEquals => ordering != Ordering::Equal,
        ComparisonOperator::LessThan => ordering == Ordering::Less,
        ComparisonOperator::LessThanOrEqualTo => ordering != Ordering::Greater,
        ComparisonOperator::GreaterThan => ordering == Ordering::Greater,
        ComparisonOperator::GreaterThanOrEqualTo => ordering != Ordering::Less,
    }
}

/// Order a value against a literal of the same kind. `None` when the kinds differ.
fn compare_literal(value: &serde_json::Value, literal: &Literal) -> Option<Ordering> {
    match (value, literal) {
        (serde_json::Value::Bool(left), Literal::Bool(right)) => Some(left.cmp(right)),
        (serde_json::Value::String(left), Literal::String(right)) => Some(left.as_str().cmp(right)),
        (serde_json::Value::Number(left), Literal::Integer(right)) => match left.as_i64() {
            Some(left) => Some(left.cmp(right)),
            #[allow(clippy::cast_precision_loss)]
            None => left.as_f64()?.partial_cmp(&(*right as f64)),
        },
        (serde_json::Value::Number(left), Literal::Float(right)) => left.as_f64()?.partial_cmp(right),
        _ => None,
    }
}

fn kind_rank(value: Option<&serde_json::Value>) -> u8 {
    match value {
        Some(serde_json::Value::Bool(_)) => 0,
        Some(serde_json::Value::Number(_)) => 1,
        Some(serde_json::Value::String(_)) => 2,
        Some(serde_json::Value::Array(_)) => 3,
        Some(serde_json::Value::Object(_)) => 4,
        None | Some(serde_json::Value::Null) => 5,
    }
}

/// Total order used for sorting and grouping: booleans, numbers, strings, arrays, objects,
/// then nulls and missing values.
pub fn compare_values(left: Option<&serde_json::Value>, right: Option<&serde_json::Value>) -> Ordering {
    match (left, right) {
        (Some(serde_json::Value::Bool(l)), Some(serde_json::Value::Bool(r))) => l.cmp(r),
        (Some(serde_json::Value::Number(l)), Some(serde_json::Value::Number(r))) => {
            match (l.as_i64(), r.as_i64()) {
                (Some(l), Some(r)) => l.cmp(&r),
                _ => l
                    .as_f64()
                    .partial_cmp(&r.as_f64())
                    .unwrap_or(Ordering::Equal),
            }
        }
        (Some(serde_json::Value::String(l)), Some(serde_json::Value::String(r))) => l.cmp(r),
        _ => kind_rank(left).cmp(&kind_rank(right)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user() -> Item {
        match json!({"id": 3, "name": "id3", "age": 16, "score": 2.5, "nickname": null}) {
            serde_json::Value::Object(map) => Item::from_map(map),
            _ => unreachable!(),
        }
    }

    fn holds(predicate: &str) -> bool {
        evaluate(&predicate.parse().expect("valid predicate"), &user())
    }

    #[test]
    fn comparisons() {
        assert!(holds("user.age >= 16"));
        assert!(!holds("user.age > 16"));
        assert!(holds("age == 16 and name != 'id4'"));
        assert!(holds("score < 3"));
        assert!(holds("id in (1, 2, 3)"));
        assert!(holds(":id == 3"));
    }

    #[test]
    fn nulls_and_mismatches() {
        assert!(holds("nickname == null"));
        assert!(holds("missing == null"));
        assert!(!holds("nickname != null"));
        assert!(!holds("nickname < 3"));
        assert!(!holds("name > 3"));
        assert!(!holds("name == 3"));
        assert!(holds("not (name == 3)"));
    }

    #[test]
    fn ordering_puts_nulls_last() {
        let mut values = vec![
            Some(json!(null)),
            Some(json!("b")),
            None,
            Some(json!(2)),
            Some(json!(true)),
            Some(json!(1.5)),
        ];
        values.sort_by(|l, r| compare_values(l.as_ref(), r.as_ref()));
        assert_eq!(
            values,
            vec![
                Some(json!(true)),
                Some(json!(1.5)),
                Some(json!(2)),
                Some(json!("b")),
                Some(json!(null)),
                None,
            ]
        );
    }
}
