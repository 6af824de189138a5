//! Rule terms
//!
//! A term is the literal a rule compares against, kept as the string the user
//! typed. It is validated against the column schema and converted into a
//! typed JSON value only when bound as a query variable.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::FilterError;
use super::schema::Schema;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATE_TIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"];
const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M"];
const FLOAT_STEP_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Term(String);

impl Term {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn value(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_valid(&self, schema: &Schema) -> bool {
        self.parse(schema).is_ok()
    }

    /// Validate against `schema` and convert into the JSON value to bind
    ///
    /// An allowed empty term parses to `null`.
    pub fn parse(&self, schema: &Schema) -> Result<Value, FilterError> {
        if self.is_empty() {
            return if schema.allow_empty() {
                Ok(Value::Null)
            } else {
                Err(FilterError::incomplete("term must not be empty"))
            };
        }

        let raw = self.0.as_str();
        match schema {
            Schema::String {
                min_length,
                max_length,
                pattern,
                ..
            } => {
                let length = raw.chars().count();
                if min_length.is_some_and(|min| length < min) {
                    return Err(FilterError::incomplete(format!(
                        "term shorter than {} characters",
                        min_length.unwrap_or_default()
                    )));
                }
                if max_length.is_some_and(|max| length > max) {
                    return Err(FilterError::incomplete(format!(
                        "term longer than {} characters",
                        max_length.unwrap_or_default()
                    )));
                }
                if let Some(pattern) = pattern {
                    let regex = Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| {
                        FilterError::incomplete(format!("invalid schema pattern: {}", e))
                    })?;
                    if !regex.is_match(raw) {
                        return Err(FilterError::incomplete(format!(
                            "term does not match pattern {}",
                            pattern
                        )));
                    }
                }
                Ok(Value::String(raw.to_string()))
            }
            Schema::Integer { min, max, step, .. } => {
                let value = parse_integer(raw)?;
                check_range(value as f64, min.map(|m| m as f64), max.map(|m| m as f64))?;
                if let Some(step) = step.filter(|s| *s > 0) {
                    let base = min.unwrap_or(0);
                    if (value - base) % step != 0 {
                        return Err(FilterError::incomplete(format!(
                            "term is not a multiple of {} from {}",
                            step, base
                        )));
                    }
                }
                Ok(Value::from(value))
            }
            Schema::Rating { min, max, .. } => {
                let value = parse_integer(raw)?;
                check_range(value as f64, Some(*min as f64), Some(*max as f64))?;
                Ok(Value::from(value))
            }
            Schema::Float { min, max, step, .. } => {
                let value: f64 = raw
                    .trim()
                    .parse()
                    .ok()
                    .filter(|v: &f64| v.is_finite())
                    .ok_or_else(|| FilterError::incomplete("term is not a number"))?;
                check_range(value, *min, *max)?;
                if let Some(step) = step.filter(|s| *s > 0.0) {
                    let steps = (value - min.unwrap_or(0.0)) / step;
                    if (steps - steps.round()).abs() > FLOAT_STEP_TOLERANCE {
                        return Err(FilterError::incomplete(format!(
                            "term is not a multiple of {}",
                            step
                        )));
                    }
                }
                Ok(Value::from(value))
            }
            Schema::Boolean { .. } => match raw {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(FilterError::incomplete("term is not a boolean")),
            },
            Schema::Enum { values, .. } => {
                if !values.is_empty() && !values.iter().any(|v| v == raw) {
                    return Err(FilterError::incomplete(format!(
                        "term is not one of {}",
                        values.join(", ")
                    )));
                }
                Ok(Value::String(raw.to_string()))
            }
            Schema::Date { .. } => NaiveDate::parse_from_str(raw, DATE_FORMAT)
                .map(|d| Value::String(d.format(DATE_FORMAT).to_string()))
                .map_err(|_| FilterError::incomplete("term is not a date (YYYY-MM-DD)")),
            Schema::DateTime { .. } => parse_date_time(raw)
                .ok_or_else(|| FilterError::incomplete("term is not a date and time")),
            Schema::Time { .. } => TIME_FORMATS
                .iter()
                .find_map(|f| NaiveTime::parse_from_str(raw, f).ok())
                .map(|t| Value::String(t.format("%H:%M:%S").to_string()))
                .ok_or_else(|| FilterError::incomplete("term is not a time (HH:MM[:SS])")),
            Schema::Photo { .. } => Ok(Value::String(raw.to_string())),
        }
    }
}

impl From<&str> for Term {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

fn parse_integer(raw: &str) -> Result<i64, FilterError> {
    raw.trim()
        .parse()
        .map_err(|_| FilterError::incomplete("term is not an integer"))
}

fn check_range(value: f64, min: Option<f64>, max: Option<f64>) -> Result<(), FilterError> {
    if let Some(min) = min
        && value < min
    {
        return Err(FilterError::incomplete(format!("term is below {}", min)));
    }
    if let Some(max) = max
        && value > max
    {
        return Err(FilterError::incomplete(format!("term is above {}", max)));
    }
    Ok(())
}

fn parse_date_time(raw: &str) -> Option<Value> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(Value::String(dt.to_rfc3339()));
    }
    DATE_TIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
        .map(|dt| Value::String(dt.format("%Y-%m-%dT%H:%M:%S").to_string()))
}
