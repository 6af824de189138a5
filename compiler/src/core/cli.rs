use clap::{Parser, Subcommand};

use std::path::PathBuf;

use super::constants::{ENV_CONFIG, ENV_ROWS_PER_PAGE};

#[derive(Parser)]
#[command(name = "breedql")]
#[command(version, about = "Filter tree to GraphQL query compiler", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// Default rows per page
    #[arg(long, global = true, env = ENV_ROWS_PER_PAGE)]
    pub rows_per_page: Option<u32>,

    /// Pretty-print JSON output
    #[arg(long, global = true, conflicts_with = "compact")]
    pub pretty: bool,

    /// Print JSON output on a single line
    #[arg(long, global = true)]
    pub compact: bool,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Compile a query request into query text and variables
    Compile {
        /// Column catalog (JSON list of columns)
        #[arg(long)]
        catalog: PathBuf,

        /// Request file: {baseFilter, attributeFilter?, columns, pagination?}
        #[arg(long)]
        request: PathBuf,

        /// Also print the where condition with variables inlined
        #[arg(long)]
        inline: bool,
    },
    /// Report the validity of every rule of a persisted filter
    Validate {
        /// Column catalog (JSON list of columns)
        #[arg(long)]
        catalog: PathBuf,

        /// Persisted filter tree
        #[arg(long)]
        filter: PathBuf,
    },
    /// Print a persisted filter with redundant groups collapsed
    Simplify {
        /// Column catalog (JSON list of columns)
        #[arg(long)]
        catalog: PathBuf,

        /// Persisted filter tree
        #[arg(long)]
        filter: PathBuf,
    },
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub config: Option<PathBuf>,
    pub rows_per_page: Option<u32>,
    pub pretty: Option<bool>,
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Commands) {
    let cli = Cli::parse();
    let config = CliConfig {
        config: cli.config,
        rows_per_page: cli.rows_per_page,
        pretty: match (cli.pretty, cli.compact) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        },
    };
    (config, cli.command)
}
