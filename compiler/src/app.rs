//! Core application

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::core::cli::{self, Commands};
use crate::core::config::AppConfig;
use crate::core::constants::{APP_NAME_LOWER, ENV_LOG};
use crate::filter::{ColumnCatalog, ColumnRef, FilterTree, SerializedNode};
use crate::query::{Pagination, QueryCompiler};

/// Input of the `compile` command
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub base_filter: SerializedNode,
    #[serde(default)]
    pub attribute_filter: Option<SerializedNode>,
    #[serde(default)]
    pub columns: Vec<ColumnRef>,
    #[serde(default)]
    pub pagination: Pagination,
}

pub struct CoreApp {
    pub config: AppConfig,
    pub compiler: QueryCompiler,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let (cli_config, command) = cli::parse();
        tracing::trace!(command = ?command, "Parsed command");

        let config = AppConfig::load(&cli_config)?;
        let app = Self {
            compiler: QueryCompiler::new(config.compiler.clone()),
            config,
        };

        let output = match command {
            Commands::Compile {
                catalog,
                request,
                inline,
            } => app.handle_compile(&catalog, &request, inline)?,
            Commands::Validate { catalog, filter } => app.handle_validate(&catalog, &filter)?,
            Commands::Simplify { catalog, filter } => app.handle_simplify(&catalog, &filter)?,
        };
        app.print(&output)
    }

    fn init_logging() {
        let default_filter = format!("info,{}=info", APP_NAME_LOWER);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    pub fn handle_compile(&self, catalog: &Path, request: &Path, inline: bool) -> Result<Value> {
        let catalog = load_catalog(catalog)?;
        let content = read_file(request)?;
        let request: QueryRequest = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse request file: {}", request.display()))?;

        let base = FilterTree::from_serialized(&request.base_filter, &catalog)?;
        let attributes = request
            .attribute_filter
            .as_ref()
            .map(|node| FilterTree::from_serialized(node, &catalog))
            .transpose()?;

        let compiled = self.compiler.compile(
            &base,
            attributes.as_ref(),
            &request.columns,
            &request.pagination,
        )?;
        if !compiled.complete {
            tracing::warn!("Some rules are incomplete or invalid and were left out of the query");
        }

        let mut output = serde_json::to_value(&compiled)?;
        if inline {
            let (condition, variables) = self.compiler.compile_where(&base, attributes.as_ref())?;
            let inlined = condition
                .map(|c| c.to_value(&variables))
                .unwrap_or(Value::Null);
            if let Value::Object(map) = &mut output {
                map.insert("where".to_string(), inlined);
            }
        }
        Ok(output)
    }

    pub fn handle_validate(&self, catalog: &Path, filter: &Path) -> Result<Value> {
        let tree = load_tree(catalog, filter)?;
        let rules: Vec<Value> = tree
            .rules()
            .into_iter()
            .map(|rule| {
                json!({
                    "column": rule.column.as_ref().map(|c| c.column_ref()),
                    "operator": rule.operator,
                    "term": rule.term,
                    "valid": rule.is_valid(),
                })
            })
            .collect();
        let valid = tree.is_valid();
        tracing::debug!(rules = rules.len(), valid, "Validated filter");
        Ok(json!({
            "baseTable": tree.base_table(),
            "valid": valid,
            "rules": rules,
        }))
    }

    pub fn handle_simplify(&self, catalog: &Path, filter: &Path) -> Result<Value> {
        let mut tree = load_tree(catalog, filter)?;
        if tree.is_simplifiable() {
            tree.simplify()?;
        }
        Ok(serde_json::to_value(tree.to_serialized())?)
    }

    fn print(&self, output: &Value) -> Result<()> {
        let text = if self.config.output.pretty {
            serde_json::to_string_pretty(output)?
        } else {
            serde_json::to_string(output)?
        };
        println!("{}", text);
        Ok(())
    }
}

fn read_file(path: &Path) -> Result<String> {
    tracing::debug!(path = %path.display(), "Reading input file");
    fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path.display()))
}

fn load_catalog(path: &Path) -> Result<ColumnCatalog> {
    let content = read_file(path)?;
    let catalog = ColumnCatalog::from_json(&content)
        .with_context(|| format!("Failed to parse column catalog: {}", path.display()))?;
    tracing::debug!(columns = catalog.columns().len(), "Column catalog loaded");
    Ok(catalog)
}

fn load_tree(catalog: &Path, filter: &Path) -> Result<FilterTree> {
    let catalog = load_catalog(catalog)?;
    let content = read_file(filter)?;
    FilterTree::from_json(&content, &catalog)
        .with_context(|| format!("Failed to load filter: {}", filter.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::CompilerOptions;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CATALOG: &str = r#"[
        {"tableName": "cultivars", "tableColumnName": "name", "schema": {"type": "string"}},
        {"tableName": "cultivars.lots", "tableColumnName": "name",
         "schema": {"type": "string", "allowEmpty": true}},
        {"tableName": "attributes", "tableColumnName": "123", "schema": {"type": "integer"}}
    ]"#;

    fn temp(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn app() -> CoreApp {
        let config = AppConfig {
            compiler: CompilerOptions::default(),
            output: crate::core::OutputConfig { pretty: false },
        };
        CoreApp {
            compiler: QueryCompiler::new(config.compiler.clone()),
            config,
        }
    }

    #[test]
    fn test_handle_compile() {
        let catalog = temp(CATALOG);
        let request = temp(
            r#"{
                "baseFilter": {"baseTable": "cultivars", "childrensConjunction": "and", "children": [
                    {"column": {"tableName": "cultivars.lots", "tableColumnName": "name"},
                     "operator": {"value": "notEqual"}, "term": {"value": ""}}
                ]},
                "columns": [{"tableName": "cultivars", "tableColumnName": "name"}],
                "pagination": {"page": 10, "rowsPerPage": 10}
            }"#,
        );

        let output = app()
            .handle_compile(catalog.path(), request.path(), true)
            .unwrap();
        let query = output["query"].as_str().unwrap();
        assert!(query.starts_with("query Cultivars($v0: String) {"));
        assert!(query.contains("limit: 10, offset: 90, order_by: {id: asc}"));
        assert_eq!(output["variables"], json!({"v0": ""}));
        assert_eq!(
            output["where"],
            json!({"_and": [{"_not": {"lot": {"_or": [
                {"name": {"_is_null": true}},
                {"name": {"_eq": ""}}
            ]}}}]})
        );
        assert!(output.get("complete").is_none());
    }

    #[test]
    fn test_handle_compile_rejects_bad_request() {
        let catalog = temp(CATALOG);
        let request = temp(r#"{"columns": []}"#);
        let err = app()
            .handle_compile(catalog.path(), request.path(), false)
            .unwrap_err();
        assert!(err.to_string().contains("Failed to parse request file"));
    }

    #[test]
    fn test_handle_validate() {
        let catalog = temp(CATALOG);
        let filter = temp(
            r#"{"baseTable": "cultivars", "childrensConjunction": "or", "children": [
                {"column": {"tableName": "cultivars", "tableColumnName": "name"},
                 "operator": {"value": "contains"}, "term": {"value": "Ga"}},
                {"column": {"tableName": "cultivars", "tableColumnName": "name"},
                 "operator": {"value": "contains"}}
            ]}"#,
        );
        let output = app().handle_validate(catalog.path(), filter.path()).unwrap();
        assert_eq!(output["valid"], json!(false));
        assert_eq!(output["rules"][0]["valid"], json!(true));
        assert_eq!(output["rules"][1]["valid"], json!(false));
        assert_eq!(output["rules"][0]["operator"], json!("contains"));
    }

    #[test]
    fn test_handle_simplify() {
        let catalog = temp(CATALOG);
        let filter = temp(
            r#"{"baseTable": "cultivars", "childrensConjunction": "and", "children": [
                {"childrensConjunction": "or", "children": [
                    {"column": {"tableName": "cultivars", "tableColumnName": "name"},
                     "operator": {"value": "equal"}, "term": {"value": "Gala"}}
                ]}
            ]}"#,
        );
        let output = app().handle_simplify(catalog.path(), filter.path()).unwrap();
        assert_eq!(
            output,
            json!({"baseTable": "cultivars", "childrensConjunction": "and", "children": [
                {"column": {"tableName": "cultivars", "tableColumnName": "name"},
                 "operator": {"value": "equal"}, "term": {"value": "Gala"}}
            ]})
        );
    }

    #[test]
    fn test_missing_catalog() {
        let filter = temp("{}");
        let err = app()
            .handle_validate(Path::new("/nonexistent/columns.json"), filter.path())
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read file"));
    }
}
