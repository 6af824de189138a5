use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::query::CompilerOptions;
use crate::utils::file::expand_path;
use crate::utils::naming::is_graphql_name;

use super::cli::CliConfig;
use super::constants::{
    APP_DOT_FOLDER, CONFIG_FILE_NAME, DEFAULT_ATTRIBUTION_RELATION, DEFAULT_ATTRIBUTION_TABLE,
    DEFAULT_ROWS_PER_PAGE,
};

// =============================================================================
// File Config Structs (for JSON parsing)
// =============================================================================

/// Compiler section of a config file
#[derive(Debug, Default, Deserialize)]
pub struct CompilerFileConfig {
    pub rows_per_page: Option<u32>,
    pub attribution_relation: Option<String>,
    pub attribution_table: Option<String>,
    pub unpaginated_tables: Option<Vec<String>>,
}

/// Output section of a config file
#[derive(Debug, Default, Deserialize)]
pub struct OutputFileConfig {
    pub pretty: Option<bool>,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub compiler: Option<CompilerFileConfig>,
    pub output: Option<OutputFileConfig>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::trace!(config = ?config, "Parsed config file");
        Ok(config)
    }

    /// Unknown top-level keys, comma separated
    fn unknown_fields(&self) -> Option<String> {
        match &self.extra {
            serde_json::Value::Object(map) if !map.is_empty() => Some(
                map.keys()
                    .map(|k| k.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            _ => None,
        }
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        if let Some(keys) = self.unknown_fields() {
            tracing::warn!(fields = %keys, "Unknown fields in config file (possible typos)");
        }
    }

    /// Merge another FileConfig into this one (other takes precedence)
    fn merge(&mut self, other: FileConfig) {
        if let Some(compiler) = other.compiler {
            let current = self
                .compiler
                .get_or_insert_with(CompilerFileConfig::default);
            if compiler.rows_per_page.is_some() {
                tracing::trace!(
                    rows_per_page = ?compiler.rows_per_page,
                    "Merging compiler.rows_per_page"
                );
                current.rows_per_page = compiler.rows_per_page;
            }
            if compiler.attribution_relation.is_some() {
                tracing::trace!(
                    relation = ?compiler.attribution_relation,
                    "Merging compiler.attribution_relation"
                );
                current.attribution_relation = compiler.attribution_relation;
            }
            if compiler.attribution_table.is_some() {
                tracing::trace!(
                    table = ?compiler.attribution_table,
                    "Merging compiler.attribution_table"
                );
                current.attribution_table = compiler.attribution_table;
            }
            if compiler.unpaginated_tables.is_some() {
                tracing::trace!(
                    tables = ?compiler.unpaginated_tables,
                    "Merging compiler.unpaginated_tables"
                );
                current.unpaginated_tables = compiler.unpaginated_tables;
            }
        }

        if let Some(output) = other.output {
            let current = self.output.get_or_insert_with(OutputFileConfig::default);
            if output.pretty.is_some() {
                tracing::trace!(pretty = ?output.pretty, "Merging output.pretty");
                current.pretty = output.pretty;
            }
        }
    }
}

// =============================================================================
// Resolved Config
// =============================================================================

/// Output formatting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    pub pretty: bool,
}

/// Final application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub compiler: CompilerOptions,
    pub output: OutputConfig,
}

impl AppConfig {
    /// Load configuration: defaults, profile file, local or `--config` file, CLI/env
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading application configuration");
        tracing::trace!(cli = ?cli, "CLI config");

        let mut file_config = FileConfig::default();
        let mut found_configs: Vec<String> = Vec::new();

        // 1. Profile dir (~/.breedql/breedql.json), skipped if missing
        if let Some(profile_path) = get_profile_config_path()
            && profile_path.exists()
        {
            let profile_config = FileConfig::load_from_file(&profile_path)?;
            profile_config.warn_unknown_fields();
            file_config.merge(profile_config);
            found_configs.push(profile_path.display().to_string());
        }

        // 2. CLI-specified path OR local directory
        let overlay_path = if let Some(ref path) = cli.config {
            let expanded = expand_path(&path.to_string_lossy());
            if !expanded.exists() {
                anyhow::bail!("Config file not found: {}", expanded.display());
            }
            Some(expanded)
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        if let Some(path) = overlay_path {
            let overlay_config = FileConfig::load_from_file(&path)?;
            overlay_config.warn_unknown_fields();
            file_config.merge(overlay_config);
            found_configs.push(path.display().to_string());
        }

        tracing::debug!(configs = ?found_configs, "Config files loaded");

        // 3. Layer: defaults -> file config -> CLI/env overrides
        let file_compiler = file_config.compiler.unwrap_or_default();
        let file_output = file_config.output.unwrap_or_default();

        let attribution_table = file_compiler
            .attribution_table
            .unwrap_or_else(|| DEFAULT_ATTRIBUTION_TABLE.to_string());
        let compiler = CompilerOptions {
            rows_per_page: cli
                .rows_per_page
                .or(file_compiler.rows_per_page)
                .unwrap_or(DEFAULT_ROWS_PER_PAGE),
            attribution_relation: file_compiler
                .attribution_relation
                .unwrap_or_else(|| DEFAULT_ATTRIBUTION_RELATION.to_string()),
            unpaginated_tables: file_compiler
                .unpaginated_tables
                .unwrap_or_else(|| vec![attribution_table.clone()]),
            attribution_table,
        };
        let output = OutputConfig {
            pretty: cli.pretty.or(file_output.pretty).unwrap_or(true),
        };

        let config = Self { compiler, output };
        config.validate()?;
        tracing::debug!(
            rows_per_page = config.compiler.rows_per_page,
            attribution_relation = %config.compiler.attribution_relation,
            "Configuration loaded"
        );
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.compiler.rows_per_page == 0 {
            anyhow::bail!("Configuration error: compiler.rows_per_page must be greater than 0");
        }
        if !is_graphql_name(&self.compiler.attribution_relation) {
            anyhow::bail!(
                "Configuration error: compiler.attribution_relation '{}' is not a valid name",
                self.compiler.attribution_relation
            );
        }
        if !is_graphql_name(&self.compiler.attribution_table) {
            anyhow::bail!(
                "Configuration error: compiler.attribution_table '{}' is not a valid name",
                self.compiler.attribution_table
            );
        }
        if let Some(table) = self
            .compiler
            .unpaginated_tables
            .iter()
            .find(|t| !is_graphql_name(t))
        {
            anyhow::bail!(
                "Configuration error: compiler.unpaginated_tables entry '{}' is not a valid name",
                table
            );
        }
        Ok(())
    }
}

/// Get the profile config path (~/.breedql/breedql.json)
fn get_profile_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(APP_DOT_FOLDER).join(CONFIG_FILE_NAME))
}
