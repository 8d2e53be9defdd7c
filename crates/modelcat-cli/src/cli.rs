//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use modelcat_domain::EntityKind;
use std::path::PathBuf;

/// Modelcat - Extract model catalogue records from free text.
#[derive(Debug, Parser)]
#[command(name = "modelcat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path (default: ~/.modelcat/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// More log output (-v debug for modelcat crates, -vv debug everywhere)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Upstream API key
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
    /// Quiet format (keys only)
    Quiet,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Extract and validate one entity from free text
    Submit(SubmitArgs),

    /// Process every pending feed item once
    RunBatch(RunBatchArgs),

    /// Inspect the processing ledger
    Ledger(LedgerArgs),

    /// Show or initialise the configuration file
    Config(ConfigArgs),
}

/// Arguments for the submit command.
#[derive(Debug, Parser)]
pub struct SubmitArgs {
    /// Text to extract from
    pub text: Option<String>,

    /// Read the text from a file
    #[arg(short = 'i', long, conflicts_with = "text")]
    pub file: Option<PathBuf>,

    /// Read the text from stdin
    #[arg(long, conflicts_with_all = ["text", "file"])]
    pub stdin: bool,

    /// Entity kind to extract (default from config)
    #[arg(short, long, value_enum)]
    pub kind: Option<KindArg>,

    /// Write the entity to the record store
    #[arg(long)]
    pub save: bool,
}

/// Arguments for the run-batch command.
#[derive(Debug, Parser)]
pub struct RunBatchArgs {
    /// Read items from a JSON or JSON lines file instead of the configured feed
    #[arg(long, conflicts_with = "feed_url")]
    pub feed_file: Option<PathBuf>,

    /// Read items from an RSS or Atom URL instead of the configured feed
    #[arg(long)]
    pub feed_url: Option<String>,

    /// Override max_concurrency
    #[arg(short = 'j', long)]
    pub concurrency: Option<usize>,

    /// Use in-memory record store and ledger; nothing is persisted
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for ledger inspection.
#[derive(Debug, Parser)]
pub struct LedgerArgs {
    #[command(subcommand)]
    pub action: LedgerAction,
}

/// Ledger inspection actions.
#[derive(Debug, Subcommand)]
pub enum LedgerAction {
    /// Most recent entries
    Recent {
        /// Maximum number of entries
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Every entry for one source key
    Show {
        /// Source key
        key: String,
    },

    /// Entry counts per outcome
    Counts,
}

/// Arguments for configuration management.
#[derive(Debug, Parser)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Entity kind argument.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum KindArg {
    /// AI model
    Model,
    /// Benchmark definition
    Benchmark,
    /// Model score on a benchmark
    BenchmarkResult,
    /// Published opinion about a model
    Opinion,
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
            CliFormat::Quiet => crate::config::OutputFormat::Quiet,
        }
    }
}

impl From<KindArg> for EntityKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Model => EntityKind::Model,
            KindArg::Benchmark => EntityKind::Benchmark,
            KindArg::BenchmarkResult => EntityKind::BenchmarkResult,
            KindArg::Opinion => EntityKind::Opinion,
        }
    }
}
