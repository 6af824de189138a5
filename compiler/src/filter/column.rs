//! Column references and the column catalog
//!
//! A column is identified by a table path and a field name. The table path is
//! a dot-separated list of tables starting at the base table
//! (`cultivars.lots`), or the pseudo table `attributes` for dynamic
//! attribute columns, whose field name is the attribute id.

use serde::{Deserialize, Serialize};

use super::schema::{ColumnType, Schema};
use crate::utils::naming::is_graphql_name;

/// Pseudo table of dynamic attribute columns
pub const ATTRIBUTES_TABLE: &str = "attributes";

/// Persisted reference to a column
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnRef {
    pub table_name: String,
    pub table_column_name: String,
}

impl ColumnRef {
    pub fn new(table_name: impl Into<String>, table_column_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            table_column_name: table_column_name.into(),
        }
    }

    pub fn is_attribute(&self) -> bool {
        self.table_name == ATTRIBUTES_TABLE
    }
}

/// A comparable field with its (possibly unresolved) validation schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub table_name: String,
    pub table_column_name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub schema: Option<Schema>,
}

impl Column {
    pub fn new(
        table_name: impl Into<String>,
        table_column_name: impl Into<String>,
        schema: Schema,
    ) -> Self {
        let table_column_name = table_column_name.into();
        Self {
            table_name: table_name.into(),
            label: table_column_name.clone(),
            table_column_name,
            schema: Some(schema),
        }
    }

    /// Column known only by reference; never valid until resolved
    pub fn unresolved(column_ref: &ColumnRef) -> Self {
        Self {
            table_name: column_ref.table_name.clone(),
            table_column_name: column_ref.table_column_name.clone(),
            label: column_ref.table_column_name.clone(),
            schema: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn column_ref(&self) -> ColumnRef {
        ColumnRef::new(&self.table_name, &self.table_column_name)
    }

    pub fn is_attribute(&self) -> bool {
        self.table_name == ATTRIBUTES_TABLE
    }

    /// Attribute id of an attribute column
    pub fn attribute_id(&self) -> Option<i64> {
        if !self.is_attribute() {
            return None;
        }
        self.table_column_name.parse().ok()
    }

    /// Tables of the path, base table first
    pub fn table_segments(&self) -> Vec<&str> {
        self.table_name.split('.').collect()
    }

    /// Resolved schema with names that are safe to place in query text
    pub fn is_valid(&self) -> bool {
        if self.schema.is_none() {
            return false;
        }
        if self.is_attribute() {
            return self.attribute_id().is_some();
        }
        is_graphql_name(&self.table_column_name)
            && self.table_segments().iter().all(|s| is_graphql_name(s))
    }

    pub fn allow_empty_term(&self) -> bool {
        self.schema.as_ref().is_some_and(Schema::allow_empty)
    }

    pub fn column_type(&self) -> Option<ColumnType> {
        self.schema.as_ref().map(Schema::column_type)
    }
}

/// Column definitions supplied by the caller for one or more base tables
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnCatalog {
    columns: Vec<Column>,
}

impl ColumnCatalog {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn get(&self, column_ref: &ColumnRef) -> Option<&Column> {
        self.columns.iter().find(|c| {
            c.table_name == column_ref.table_name
                && c.table_column_name == column_ref.table_column_name
        })
    }

    /// Resolve a reference; unknown references yield an unresolved column
    pub fn resolve(&self, column_ref: &ColumnRef) -> Column {
        match self.get(column_ref) {
            Some(column) => column.clone(),
            None => {
                tracing::trace!(
                    table = %column_ref.table_name,
                    column = %column_ref.table_column_name,
                    "Column not found in catalog"
                );
                Column::unresolved(column_ref)
            }
        }
    }

    /// Columns reachable from `base_table`, attribute columns included
    pub fn for_base_table<'a>(&'a self, base_table: &'a str) -> impl Iterator<Item = &'a Column> {
        self.columns.iter().filter(move |c| {
            c.is_attribute() || c.table_segments().first() == Some(&base_table)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name_column() -> Column {
        Column::new("cultivars", "name", Schema::of(ColumnType::String, false))
    }

    #[test]
    fn test_attribute_column() {
        let column = Column::new("attributes", "123", Schema::of(ColumnType::Integer, false));
        assert!(column.is_attribute());
        assert_eq!(column.attribute_id(), Some(123));
        assert!(column.is_valid());

        let broken = Column::new("attributes", "abc", Schema::of(ColumnType::Integer, false));
        assert!(!broken.is_valid());
    }

    #[test]
    fn test_unresolved_column_is_invalid() {
        let column = Column::unresolved(&ColumnRef::new("cultivars", "name"));
        assert!(!column.is_valid());
        assert!(!column.allow_empty_term());
        assert_eq!(column.column_type(), None);
    }

    #[test]
    fn test_column_rejects_unsafe_names() {
        let column = Column::new(
            "cultivars",
            "name } evil {",
            Schema::of(ColumnType::String, false),
        );
        assert!(!column.is_valid());

        let column = Column::new("cultivars.lo ts", "name", Schema::of(ColumnType::String, false));
        assert!(!column.is_valid());
    }

    #[test]
    fn test_table_segments() {
        let column = Column::new(
            "plants.plant_groups.cultivars",
            "name",
            Schema::of(ColumnType::String, false),
        );
        assert_eq!(column.table_segments(), vec!["plants", "plant_groups", "cultivars"]);
    }

    #[test]
    fn test_catalog_resolve() {
        let catalog = ColumnCatalog::new(vec![name_column()]);
        let resolved = catalog.resolve(&ColumnRef::new("cultivars", "name"));
        assert!(resolved.is_valid());

        let missing = catalog.resolve(&ColumnRef::new("cultivars", "acronym"));
        assert!(!missing.is_valid());
        assert_eq!(missing.table_column_name, "acronym");
    }

    #[test]
    fn test_catalog_from_json() {
        let json = r#"[
            {"tableName": "cultivars", "tableColumnName": "name", "label": "Name",
             "schema": {"type": "string", "maxLength": 45}},
            {"tableName": "cultivars.lots", "tableColumnName": "name"}
        ]"#;
        let catalog = ColumnCatalog::from_json(json).unwrap();
        assert_eq!(catalog.columns().len(), 2);
        assert_eq!(catalog.columns()[0].label, "Name");
        assert!(catalog.columns()[1].schema.is_none());
    }

    #[test]
    fn test_catalog_for_base_table() {
        let catalog = ColumnCatalog::new(vec![
            name_column(),
            Column::new("lots", "name", Schema::of(ColumnType::String, false)),
            Column::new("attributes", "7", Schema::of(ColumnType::Float, false)),
        ]);
        let names: Vec<_> = catalog
            .for_base_table("cultivars")
            .map(|c| c.table_name.as_str())
            .collect();
        assert_eq!(names, vec!["cultivars", "attributes"]);
    }
}
