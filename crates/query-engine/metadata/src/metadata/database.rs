//! Scalar types and comparison operators understood by the engine.

use std::collections::BTreeSet;
use std::fmt;

use enum_iterator::Sequence;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The scalar types a mapped field may have.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Sequence, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    Boolean,
    Smallint,
    Integer,
    Bigint,
    Real,
    #[serde(rename = "double precision")]
    DoublePrecision,
    Numeric,
    Text,
    #[serde(rename = "character varying")]
    CharacterVarying,
    Date,
    Time,
    Timestamp,
    Timestamptz,
    Uuid,
    Json,
    Bytea,
}

impl ScalarType {
    const EQUALITY_OPERATORS: &'static [ComparisonOperator] =
        &[ComparisonOperator::Equals, ComparisonOperator::NotEquals];

    const ORDERING_OPERATORS: &'static [ComparisonOperator] = &[
        ComparisonOperator::LessThan,
        ComparisonOperator::LessThanOrEqualTo,
        ComparisonOperator::GreaterThan,
        ComparisonOperator::GreaterThanOrEqualTo,
    ];

    /// Returns the complete set of comparison operators for the given type.
    pub fn comparison_operators(&self) -> BTreeSet<ComparisonOperator> {
        let mut operators = BTreeSet::from_iter(Self::EQUALITY_OPERATORS.iter().copied());
        operators.extend(match self {
            ScalarType::Boolean | ScalarType::Json | ScalarType::Bytea => [].iter(),
            _ => Self::ORDERING_OPERATORS.iter(),
        });
        operators
    }

    /// The name of the type as written in SQL.
    pub fn sql_name(&self) -> &'static str {
        match self {
            ScalarType::Boolean => "boolean",
            ScalarType::Smallint => "smallint",
            ScalarType::Integer => "integer",
            ScalarType::Bigint => "bigint",
            ScalarType::Real => "real",
            ScalarType::DoublePrecision => "double precision",
            ScalarType::Numeric => "numeric",
            ScalarType::Text => "text",
            ScalarType::CharacterVarying => "character varying",
            ScalarType::Date => "date",
            ScalarType::Time => "time",
            ScalarType::Timestamp => "timestamp",
            ScalarType::Timestamptz => "timestamptz",
            ScalarType::Uuid => "uuid",
            ScalarType::Json => "json",
            ScalarType::Bytea => "bytea",
        }
    }

    /// Integer types accept only integral literals.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            ScalarType::Smallint | ScalarType::Integer | ScalarType::Bigint
        )
    }

    pub fn is_float(&self) -> bool {
        matches!(
            self,
            ScalarType::Real | ScalarType::DoublePrecision | ScalarType::Numeric
        )
    }

    /// Types whose values are written as strings but need a cast on the database side.
    pub fn is_string_encoded(&self) -> bool {
        matches!(
            self,
            ScalarType::Date
                | ScalarType::Time
                | ScalarType::Timestamp
                | ScalarType::Timestamptz
                | ScalarType::Uuid
        )
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_name())
    }
}

/// The complete list of supported binary comparison operators.
/// Not all of these are supported for every type.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Sequence,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOperator {
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
}

impl ComparisonOperator {
    /// The symbol used for the operator in predicate text.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Equals => "==",
            Self::NotEquals => "!=",
            Self::LessThan => "<",
            Self::LessThanOrEqualTo => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqualTo => ">=",
        }
    }

    /// Parse an operator symbol as it appears in predicate text.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        enum_iterator::all::<Self>().find(|operator| operator.symbol() == symbol)
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Can this field contain null values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum Nullable {
    #[default]
    Nullable,
    NonNullable,
}
