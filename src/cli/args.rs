//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    add::AddArgs, completions::CompletionsArgs, import::ImportArgs, init::InitArgs,
    list::ListArgs, migrate::MigrateArgs, show::ShowArgs, stats::StatsArgs, verify::VerifyArgs,
};

#[derive(Parser)]
#[command(name = "ait")]
#[command(author, version, about = "Asset Inventory Toolkit")]
#[command(long_about = "Asset Inventory Toolkit: import fixed-asset spreadsheets into a registry, verify scanned assets and reconcile SQLite and Postgres copies of the registry.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Workspace root (default: auto-detect by finding .ait/)
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,

    /// Registry location, overriding configuration (sqlite:PATH, PATH or postgres://...)
    #[arg(long, global = true)]
    pub database: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new inventory workspace
    Init(InitArgs),

    /// Import a spreadsheet export into the registry
    Import(ImportArgs),

    /// Copy every record from one registry into another
    Migrate(MigrateArgs),

    /// Show one asset by code
    Show(ShowArgs),

    /// Mark a scanned asset as physically verified
    Verify(VerifyArgs),

    /// Register a scanned code that is not in the registry
    Add(AddArgs),

    /// List assets
    List(ListArgs),

    /// Registry counts
    Stats(StatsArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Automatically detect based on context (detail view for show, table for list)
    #[default]
    Auto,
    /// YAML format (full fidelity)
    Yaml,
    /// Tab-separated values (for piping)
    Tsv,
    /// JSON format (for programming)
    Json,
    /// CSV format (for spreadsheets)
    Csv,
    /// Markdown tables
    Md,
    /// Just codes, one per line
    Id,
}
