//! Boolean expressions in the query engine's input-object syntax
//!
//! A [`Condition`] renders as GraphQL input text with variables referenced by
//! name (`{name: {_eq: $v0}}`). [`Condition::to_value`] renders the same shape
//! as JSON with the bound values inlined, which is what tests and the CLI's
//! `--inline` flag inspect.

use std::fmt;

use serde_json::{Map, Value, json};

use super::variables::QueryVariables;
use crate::filter::Comparator;

/// Right-hand side of a field comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Bound variable name, without `$`
    Variable(String),
    Bool(bool),
    Int(i64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
    /// Condition on the rows of a related table
    Relation {
        name: String,
        inner: Box<Condition>,
    },
    Field {
        name: String,
        comparator: Comparator,
        operand: Operand,
    },
    /// Number of related rows matching `filter` equals `count`
    Count {
        aggregate: String,
        filter: Box<Condition>,
        count: i64,
    },
}

impl Condition {
    pub fn field(name: impl Into<String>, comparator: Comparator, operand: Operand) -> Self {
        Self::Field {
            name: name.into(),
            comparator,
            operand,
        }
    }

    pub fn relation(name: impl Into<String>, inner: Condition) -> Self {
        Self::Relation {
            name: name.into(),
            inner: Box::new(inner),
        }
    }

    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// JSON form with every variable replaced by its bound value
    pub fn to_value(&self, variables: &QueryVariables) -> Value {
        match self {
            Self::And(items) => json!({ "_and": Self::values(items, variables) }),
            Self::Or(items) => json!({ "_or": Self::values(items, variables) }),
            Self::Not(inner) => json!({ "_not": inner.to_value(variables) }),
            Self::Relation { name, inner } => single(name, inner.to_value(variables)),
            Self::Field {
                name,
                comparator,
                operand,
            } => {
                let operand = match operand {
                    Operand::Variable(var) => variables.get(var).cloned().unwrap_or(Value::Null),
                    Operand::Bool(value) => Value::Bool(*value),
                    Operand::Int(value) => Value::from(*value),
                };
                single(name, single(comparator.as_str(), operand))
            }
            Self::Count {
                aggregate,
                filter,
                count,
            } => single(
                aggregate,
                json!({
                    "count": {
                        "predicate": { "_eq": count },
                        "filter": filter.to_value(variables),
                    }
                }),
            ),
        }
    }

    fn values(items: &[Condition], variables: &QueryVariables) -> Vec<Value> {
        items.iter().map(|c| c.to_value(variables)).collect()
    }
}

fn single(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Value::Object(map)
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Variable(name) => write!(f, "${}", name),
            Self::Bool(value) => write!(f, "{}", value),
            Self::Int(value) => write!(f, "{}", value),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, key: &str, items: &[Condition]) -> fmt::Result {
    write!(f, "{{{}: [", key)?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    write!(f, "]}}")
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And(items) => write_list(f, "_and", items),
            Self::Or(items) => write_list(f, "_or", items),
            Self::Not(inner) => write!(f, "{{_not: {}}}", inner),
            Self::Relation { name, inner } => write!(f, "{{{}: {}}}", name, inner),
            Self::Field {
                name,
                comparator,
                operand,
            } => write!(f, "{{{}: {{{}: {}}}}}", name, comparator.as_str(), operand),
            Self::Count {
                aggregate,
                filter,
                count,
            } => write!(
                f,
                "{{{}: {{count: {{predicate: {{_eq: {}}}, filter: {}}}}}}}",
                aggregate, count, filter
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::pattern::LikeShape;

    #[test]
    fn test_render_nested_not() {
        let mut variables = QueryVariables::new();
        let var = variables.bind("String", json!("Ga"));
        let condition = Condition::And(vec![
            Condition::relation(
                "lot",
                Condition::field(
                    "name",
                    Comparator::Ilike(LikeShape::Prefix),
                    Operand::Variable(var),
                ),
            )
            .negate(),
        ]);

        assert_eq!(
            condition.to_string(),
            "{_and: [{_not: {lot: {name: {_ilike: $v0}}}}]}"
        );
        assert_eq!(
            condition.to_value(&variables),
            json!({"_and": [{"_not": {"lot": {"name": {"_ilike": "Ga"}}}}]})
        );
    }

    #[test]
    fn test_render_inline_operands() {
        let condition = Condition::Or(vec![
            Condition::field("is_active", Comparator::Eq, Operand::Bool(true)),
            Condition::field("attribute_id", Comparator::Eq, Operand::Int(7)),
        ]);
        assert_eq!(
            condition.to_string(),
            "{_or: [{is_active: {_eq: true}}, {attribute_id: {_eq: 7}}]}"
        );
    }

    #[test]
    fn test_render_count() {
        let condition = Condition::Count {
            aggregate: "attributions_aggregate".to_string(),
            filter: Box::new(Condition::And(vec![Condition::field(
                "attribute_id",
                Comparator::Eq,
                Operand::Int(123),
            )])),
            count: 0,
        };
        assert_eq!(
            condition.to_string(),
            "{attributions_aggregate: {count: {predicate: {_eq: 0}, filter: {_and: [{attribute_id: {_eq: 123}}]}}}}"
        );
        assert_eq!(
            condition.to_value(&QueryVariables::new()),
            json!({"attributions_aggregate": {"count": {
                "predicate": {"_eq": 0},
                "filter": {"_and": [{"attribute_id": {"_eq": 123}}]}
            }}})
        );
    }
}
