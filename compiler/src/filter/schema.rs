//! Column type system
//!
//! Closed set of semantic column types. Each type carries its own validation
//! schema shape and an allow-empty flag.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Semantic type of a filterable column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnType {
    String,
    Integer,
    Rating,
    Float,
    Boolean,
    Enum,
    Date,
    DateTime,
    Time,
    Photo,
}

impl ColumnType {
    pub const ALL: [ColumnType; 10] = [
        Self::String,
        Self::Integer,
        Self::Rating,
        Self::Float,
        Self::Boolean,
        Self::Enum,
        Self::Date,
        Self::DateTime,
        Self::Time,
        Self::Photo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Rating => "rating",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Enum => "enum",
            Self::Date => "date",
            Self::DateTime => "dateTime",
            Self::Time => "time",
            Self::Photo => "photo",
        }
    }

    /// GraphQL scalar used when a term of this type is bound as a variable
    pub fn graphql_type(&self) -> &'static str {
        match self {
            Self::String | Self::Enum | Self::Photo => "String",
            Self::Integer | Self::Rating => "Int",
            Self::Float => "float8",
            Self::Boolean => "Boolean",
            Self::Date => "date",
            Self::DateTime => "timestamptz",
            Self::Time => "time",
        }
    }

    /// Typed value column of an attribution row holding values of this type
    pub fn attribution_value_field(&self) -> &'static str {
        match self {
            Self::Integer | Self::Rating => "integer_value",
            Self::Float => "float_value",
            Self::String | Self::Enum | Self::Time | Self::Photo => "text_value",
            Self::Boolean => "boolean_value",
            Self::Date | Self::DateTime => "date_value",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Validation schema of a column, one shape per column type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum Schema {
    String {
        #[serde(default)]
        allow_empty: bool,
        min_length: Option<usize>,
        max_length: Option<usize>,
        pattern: Option<String>,
    },
    Integer {
        #[serde(default)]
        allow_empty: bool,
        min: Option<i64>,
        max: Option<i64>,
        step: Option<i64>,
    },
    Rating {
        #[serde(default)]
        allow_empty: bool,
        #[serde(default = "default_rating_min")]
        min: i64,
        #[serde(default = "default_rating_max")]
        max: i64,
    },
    Float {
        #[serde(default)]
        allow_empty: bool,
        min: Option<f64>,
        max: Option<f64>,
        step: Option<f64>,
    },
    Boolean {
        #[serde(default)]
        allow_empty: bool,
    },
    Enum {
        #[serde(default)]
        allow_empty: bool,
        values: Vec<String>,
    },
    Date {
        #[serde(default)]
        allow_empty: bool,
    },
    DateTime {
        #[serde(default)]
        allow_empty: bool,
    },
    Time {
        #[serde(default)]
        allow_empty: bool,
    },
    Photo {
        #[serde(default)]
        allow_empty: bool,
    },
}

fn default_rating_min() -> i64 {
    1
}

fn default_rating_max() -> i64 {
    9
}

impl Schema {
    pub fn column_type(&self) -> ColumnType {
        match self {
            Self::String { .. } => ColumnType::String,
            Self::Integer { .. } => ColumnType::Integer,
            Self::Rating { .. } => ColumnType::Rating,
            Self::Float { .. } => ColumnType::Float,
            Self::Boolean { .. } => ColumnType::Boolean,
            Self::Enum { .. } => ColumnType::Enum,
            Self::Date { .. } => ColumnType::Date,
            Self::DateTime { .. } => ColumnType::DateTime,
            Self::Time { .. } => ColumnType::Time,
            Self::Photo { .. } => ColumnType::Photo,
        }
    }

    pub fn allow_empty(&self) -> bool {
        match self {
            Self::String { allow_empty, .. }
            | Self::Integer { allow_empty, .. }
            | Self::Rating { allow_empty, .. }
            | Self::Float { allow_empty, .. }
            | Self::Boolean { allow_empty }
            | Self::Enum { allow_empty, .. }
            | Self::Date { allow_empty }
            | Self::DateTime { allow_empty }
            | Self::Time { allow_empty }
            | Self::Photo { allow_empty } => *allow_empty,
        }
    }

    /// Unconstrained schema of the given type
    pub fn of(column_type: ColumnType, allow_empty: bool) -> Self {
        match column_type {
            ColumnType::String => Self::String {
                allow_empty,
                min_length: None,
                max_length: None,
                pattern: None,
            },
            ColumnType::Integer => Self::Integer {
                allow_empty,
                min: None,
                max: None,
                step: None,
            },
            ColumnType::Rating => Self::Rating {
                allow_empty,
                min: default_rating_min(),
                max: default_rating_max(),
            },
            ColumnType::Float => Self::Float {
                allow_empty,
                min: None,
                max: None,
                step: None,
            },
            ColumnType::Boolean => Self::Boolean { allow_empty },
            ColumnType::Enum => Self::Enum {
                allow_empty,
                values: Vec::new(),
            },
            ColumnType::Date => Self::Date { allow_empty },
            ColumnType::DateTime => Self::DateTime { allow_empty },
            ColumnType::Time => Self::Time { allow_empty },
            ColumnType::Photo => Self::Photo { allow_empty },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_serde_tagged() {
        let json = r#"{"type": "string", "allowEmpty": true, "maxLength": 45}"#;
        let schema: Schema = serde_json::from_str(json).unwrap();
        assert_eq!(
            schema,
            Schema::String {
                allow_empty: true,
                min_length: None,
                max_length: Some(45),
                pattern: None,
            }
        );
        assert_eq!(schema.column_type(), ColumnType::String);
        assert!(schema.allow_empty());
    }

    #[test]
    fn test_schema_allow_empty_defaults_false() {
        let json = r#"{"type": "rating", "min": 1, "max": 5}"#;
        let schema: Schema = serde_json::from_str(json).unwrap();
        assert_eq!(schema.column_type(), ColumnType::Rating);
        assert!(!schema.allow_empty());
    }

    #[test]
    fn test_rating_bounds_default() {
        let schema: Schema = serde_json::from_str(r#"{"type": "rating"}"#).unwrap();
        assert_eq!(schema, Schema::of(ColumnType::Rating, false));
        assert_eq!(
            schema,
            Schema::Rating {
                allow_empty: false,
                min: 1,
                max: 9,
            }
        );

        let schema: Schema = serde_json::from_str(r#"{"type": "rating", "max": 5}"#).unwrap();
        assert!(matches!(schema, Schema::Rating { min: 1, max: 5, .. }));
    }

    #[test]
    fn test_schema_date_time_tag() {
        let schema: Schema = serde_json::from_str(r#"{"type": "dateTime"}"#).unwrap();
        assert_eq!(schema.column_type(), ColumnType::DateTime);
        assert_eq!(ColumnType::DateTime.to_string(), "dateTime");
    }

    #[test]
    fn test_schema_of_matches_type() {
        for column_type in ColumnType::ALL {
            assert_eq!(Schema::of(column_type, false).column_type(), column_type);
        }
    }

    #[test]
    fn test_graphql_types() {
        assert_eq!(ColumnType::Rating.graphql_type(), "Int");
        assert_eq!(ColumnType::Float.graphql_type(), "float8");
        assert_eq!(ColumnType::DateTime.graphql_type(), "timestamptz");
    }

    #[test]
    fn test_attribution_value_fields() {
        assert_eq!(ColumnType::Rating.attribution_value_field(), "integer_value");
        assert_eq!(ColumnType::Enum.attribution_value_field(), "text_value");
        assert_eq!(ColumnType::DateTime.attribution_value_field(), "date_value");
    }
}
