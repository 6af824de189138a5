//! Naming convention between table paths and GraphQL fields
//!
//! The primary key is always `id`. A relation segment of a column path is a
//! table name; the GraphQL relation field is its snake-cased singular form
//! (`lots` → `lot`, `plantGroups` → `plant_group`).

use convert_case::{Case, Casing};

/// Primary key field of every table
pub const PRIMARY_KEY: &str = "id";

/// Whether `s` is a valid GraphQL name (`[_A-Za-z][_0-9A-Za-z]*`)
pub fn is_graphql_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

/// GraphQL relation field for a table segment of a column path
pub fn relation_name(table: &str) -> String {
    let snake = table.to_case(Case::Snake);
    match snake.rsplit_once('_') {
        Some((head, last)) => format!("{}_{}", head, singularize(last)),
        None => singularize(&snake),
    }
}

/// Operation name for a query rooted at `base_table` (`plant_groups` → `PlantGroups`)
pub fn operation_name(base_table: &str) -> String {
    base_table.to_case(Case::Pascal)
}

/// Singular form of a lowercase English word
pub fn singularize(word: &str) -> String {
    if word.len() > 3 && word.ends_with("ies") {
        return format!("{}y", &word[..word.len() - 3]);
    }
    for suffix in ["sses", "shes", "ches", "xes", "zes"] {
        if word.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }
    if word.ends_with("ss") || word.ends_with("us") || word.ends_with("is") {
        return word.to_string();
    }
    match word.strip_suffix('s') {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => word.to_string(),
    }
}
