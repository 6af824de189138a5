//! Rule operators
//!
//! Every operator is described by one entry of a compile-time checked table:
//! the column types it applies to, and the comparator plus negation it is
//! compiled to. The compiler never emits a native negative comparator for a
//! negated operator; it compiles the positive comparator and wraps the fully
//! nested condition in `_not`.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::column::Column;
use super::schema::{ColumnType, Schema};
use crate::utils::pattern::LikeShape;

/// Operator of a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operator {
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    StartsWith,
    StartsNotWith,
    Contains,
    NotContains,
    EndsWith,
    NotEndsWith,
    Empty,
    NotEmpty,
    True,
    False,
}

/// Comparator sent to the query engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    Ilike(LikeShape),
    IsNull,
}

impl Comparator {
    /// Query-engine spelling of the comparator
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "_eq",
            Self::Neq => "_neq",
            Self::Lt => "_lt",
            Self::Lte => "_lte",
            Self::Gt => "_gt",
            Self::Gte => "_gte",
            Self::Ilike(_) => "_ilike",
            Self::IsNull => "_is_null",
        }
    }
}

const ORDERED: &[ColumnType] = &[
    ColumnType::Integer,
    ColumnType::Rating,
    ColumnType::Float,
    ColumnType::Date,
    ColumnType::DateTime,
    ColumnType::Time,
];

const EQUATABLE: &[ColumnType] = &[
    ColumnType::String,
    ColumnType::Integer,
    ColumnType::Rating,
    ColumnType::Float,
    ColumnType::Enum,
    ColumnType::Date,
    ColumnType::DateTime,
    ColumnType::Time,
];

const NULLABLE: &[ColumnType] = &[
    ColumnType::String,
    ColumnType::Integer,
    ColumnType::Rating,
    ColumnType::Float,
    ColumnType::Enum,
    ColumnType::Date,
    ColumnType::DateTime,
    ColumnType::Time,
    ColumnType::Photo,
];

const TEXTUAL: &[ColumnType] = &[ColumnType::String];

const BOOLEAN: &[ColumnType] = &[ColumnType::Boolean];

/// Table entry of an operator
#[derive(Debug, Clone, Copy)]
pub struct OperatorSpec {
    pub suitable_types: &'static [ColumnType],
    pub negate: bool,
}

impl Operator {
    pub const ALL: [Operator; 16] = [
        Self::Equal,
        Self::NotEqual,
        Self::Less,
        Self::LessOrEqual,
        Self::Greater,
        Self::GreaterOrEqual,
        Self::StartsWith,
        Self::StartsNotWith,
        Self::Contains,
        Self::NotContains,
        Self::EndsWith,
        Self::NotEndsWith,
        Self::Empty,
        Self::NotEmpty,
        Self::True,
        Self::False,
    ];

    pub fn spec(&self) -> OperatorSpec {
        let (suitable_types, negate) = match self {
            Self::Equal => (EQUATABLE, false),
            Self::NotEqual => (EQUATABLE, true),
            Self::Less | Self::LessOrEqual | Self::Greater | Self::GreaterOrEqual => {
                (ORDERED, false)
            }
            Self::StartsWith | Self::Contains | Self::EndsWith => (TEXTUAL, false),
            Self::StartsNotWith | Self::NotContains | Self::NotEndsWith => (TEXTUAL, true),
            Self::Empty => (NULLABLE, true),
            Self::NotEmpty => (NULLABLE, false),
            Self::True => (BOOLEAN, false),
            Self::False => (BOOLEAN, true),
        };
        OperatorSpec {
            suitable_types,
            negate,
        }
    }

    /// Positive comparator this operator compiles to for a column type
    pub fn comparator(&self, column_type: ColumnType) -> Comparator {
        match self {
            Self::Equal | Self::NotEqual | Self::True | Self::False => Comparator::Eq,
            Self::Less => Comparator::Lt,
            Self::LessOrEqual => Comparator::Lte,
            Self::Greater => Comparator::Gt,
            Self::GreaterOrEqual => Comparator::Gte,
            Self::StartsWith | Self::StartsNotWith => Comparator::Ilike(LikeShape::Prefix),
            Self::Contains | Self::NotContains => Comparator::Ilike(LikeShape::Infix),
            Self::EndsWith | Self::NotEndsWith => Comparator::Ilike(LikeShape::Suffix),
            Self::Empty | Self::NotEmpty => match column_type {
                ColumnType::String => Comparator::Neq,
                _ => Comparator::IsNull,
            },
        }
    }

    pub fn negates(&self) -> bool {
        self.spec().negate
    }

    pub fn suitable_types(&self) -> &'static [ColumnType] {
        self.spec().suitable_types
    }

    /// Whether this operator may be used against a column with `schema`
    pub fn is_valid(&self, schema: &Schema) -> bool {
        if !self.suitable_types().contains(&schema.column_type()) {
            return false;
        }
        if schema.column_type() == ColumnType::String
            && matches!(self, Self::Empty | Self::NotEmpty)
        {
            return schema.allow_empty();
        }
        true
    }

    /// Whether an editor should offer this operator for `column`
    ///
    /// Attribute columns only accept operators that compile without negation;
    /// `False` is compiled positively against the boolean value column.
    pub fn is_available_for(&self, column: &Column) -> bool {
        let Some(schema) = column.schema.as_ref() else {
            return false;
        };
        if !self.is_valid(schema) {
            return false;
        }
        !column.is_attribute() || !self.negates() || *self == Self::False
    }

    /// Empty / not-empty operators take no term
    pub fn is_emptiness_check(&self) -> bool {
        matches!(self, Self::Empty | Self::NotEmpty)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equal => "equal",
            Self::NotEqual => "notEqual",
            Self::Less => "less",
            Self::LessOrEqual => "lessOrEqual",
            Self::Greater => "greater",
            Self::GreaterOrEqual => "greaterOrEqual",
            Self::StartsWith => "startsWith",
            Self::StartsNotWith => "startsNotWith",
            Self::Contains => "contains",
            Self::NotContains => "notContains",
            Self::EndsWith => "endsWith",
            Self::NotEndsWith => "notEndsWith",
            Self::Empty => "empty",
            Self::NotEmpty => "notEmpty",
            Self::True => "true",
            Self::False => "false",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string_schema(allow_empty: bool) -> Schema {
        Schema::of(ColumnType::String, allow_empty)
    }

    #[test]
    fn test_negation_table() {
        let negated: Vec<_> = Operator::ALL.iter().filter(|o| o.negates()).collect();
        assert_eq!(
            negated,
            vec![
                &Operator::NotEqual,
                &Operator::StartsNotWith,
                &Operator::NotContains,
                &Operator::NotEndsWith,
                &Operator::Empty,
                &Operator::False,
            ]
        );
    }

    #[test]
    fn test_comparators() {
        assert_eq!(Operator::NotEqual.comparator(ColumnType::Integer), Comparator::Eq);
        assert_eq!(
            Operator::StartsNotWith.comparator(ColumnType::String),
            Comparator::Ilike(LikeShape::Prefix)
        );
        assert_eq!(Operator::Empty.comparator(ColumnType::String), Comparator::Neq);
        assert_eq!(Operator::Empty.comparator(ColumnType::Date), Comparator::IsNull);
        assert_eq!(Operator::False.comparator(ColumnType::Boolean), Comparator::Eq);
        assert_eq!(Comparator::Ilike(LikeShape::Suffix).as_str(), "_ilike");
    }

    #[test]
    fn test_is_valid_by_type() {
        assert!(Operator::Less.is_valid(&Schema::of(ColumnType::Rating, false)));
        assert!(!Operator::Less.is_valid(&string_schema(false)));
        assert!(!Operator::Contains.is_valid(&Schema::of(ColumnType::Integer, false)));
        assert!(Operator::True.is_valid(&Schema::of(ColumnType::Boolean, false)));
        assert!(!Operator::Equal.is_valid(&Schema::of(ColumnType::Photo, false)));
        assert!(Operator::NotEmpty.is_valid(&Schema::of(ColumnType::Photo, false)));
    }

    #[test]
    fn test_string_emptiness_requires_allow_empty() {
        assert!(!Operator::Empty.is_valid(&string_schema(false)));
        assert!(!Operator::NotEmpty.is_valid(&string_schema(false)));
        assert!(Operator::Empty.is_valid(&string_schema(true)));
        // non-string columns ignore the flag
        assert!(Operator::Empty.is_valid(&Schema::of(ColumnType::Integer, false)));
    }

    #[test]
    fn test_available_for_attribute_columns() {
        let attribute = Column::new("attributes", "5", string_schema(true));
        assert!(Operator::Equal.is_available_for(&attribute));
        assert!(Operator::NotEmpty.is_available_for(&attribute));
        assert!(!Operator::NotEqual.is_available_for(&attribute));
        assert!(!Operator::NotContains.is_available_for(&attribute));
        assert!(!Operator::Empty.is_available_for(&attribute));

        let flag = Column::new("attributes", "6", Schema::of(ColumnType::Boolean, false));
        assert!(Operator::False.is_available_for(&flag));

        let plain = Column::new("cultivars", "name", string_schema(true));
        assert!(Operator::NotEqual.is_available_for(&plain));
    }

    #[test]
    fn test_operator_serde() {
        let json = serde_json::to_string(&Operator::StartsNotWith).unwrap();
        assert_eq!(json, r#""startsNotWith""#);
        let op: Operator = serde_json::from_str(r#""greaterOrEqual""#).unwrap();
        assert_eq!(op, Operator::GreaterOrEqual);
        for op in Operator::ALL {
            let json = serde_json::to_string(&op).unwrap();
            assert_eq!(json, format!("\"{}\"", op));
        }
    }
}
