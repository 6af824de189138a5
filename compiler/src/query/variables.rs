//! Bound query variables
//!
//! Each compilation owns one [`QueryVariables`]; names are `$v0`, `$v1`, ...
//! in binding order and are never reused, even for equal literals.

use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct QueryVariable {
    pub name: String,
    pub graphql_type: &'static str,
    pub value: Value,
}

#[derive(Debug, Clone, Default)]
pub struct QueryVariables {
    bound: Vec<QueryVariable>,
}

impl QueryVariables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a literal and return its variable name (without `$`)
    pub fn bind(&mut self, graphql_type: &'static str, value: Value) -> String {
        let name = format!("v{}", self.bound.len());
        self.bound.push(QueryVariable {
            name: name.clone(),
            graphql_type,
            value,
        });
        name
    }

    pub fn len(&self) -> usize {
        self.bound.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bound.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bound.iter().find(|v| v.name == name).map(|v| &v.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueryVariable> {
        self.bound.iter()
    }

    /// Operation header declarations, e.g. `$v0: String, $v1: Int`
    pub fn declarations(&self) -> String {
        self.bound
            .iter()
            .map(|v| format!("${}: {}", v.name, v.graphql_type))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.bound.into_iter().map(|v| (v.name, v.value)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bind_never_deduplicates() {
        let mut variables = QueryVariables::new();
        assert_eq!(variables.bind("String", json!("a")), "v0");
        assert_eq!(variables.bind("String", json!("a")), "v1");
        assert_eq!(variables.len(), 2);
        assert_eq!(variables.get("v1"), Some(&json!("a")));
        assert_eq!(variables.get("v2"), None);
    }

    #[test]
    fn test_declarations() {
        let mut variables = QueryVariables::new();
        assert_eq!(variables.declarations(), "");
        variables.bind("String", json!("x"));
        variables.bind("Int", json!(3));
        assert_eq!(variables.declarations(), "$v0: String, $v1: Int");
    }

    #[test]
    fn test_into_map_keeps_order() {
        let mut variables = QueryVariables::new();
        for i in 0..12 {
            variables.bind("Int", json!(i));
        }
        let keys: Vec<_> = variables.into_map().keys().cloned().collect();
        assert_eq!(keys.first().map(String::as_str), Some("v0"));
        assert_eq!(keys.last().map(String::as_str), Some("v11"));
        assert_eq!(keys.len(), 12);
    }

    #[test]
    fn test_separate_compilations_have_separate_counters() {
        let mut first = QueryVariables::new();
        let mut second = QueryVariables::new();
        first.bind("Int", json!(1));
        assert_eq!(second.bind("Int", json!(2)), "v0");
    }
}
