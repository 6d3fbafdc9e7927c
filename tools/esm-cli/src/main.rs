//! esm - inspect ESM/ESP plugin files
//!
//! # Commands
//!
//! - `esm stats <file>` - Record counts per type, skipped records and warnings
//! - `esm packages <file>` - Behavior packages and travel destinations of every actor
//! - `esm strings <table>` - Entries of a `.strings`/`.dlstrings`/`.ilstrings` file
//!
//! # Reader configuration
//!
//! `--config <file>` loads a TOML file:
//!
//! ```toml
//! dialect = "legacy"        # skip header sniffing
//! on_record_error = "skip"  # keep going past broken records
//! localized = false
//! keep_unknown_records = true
//! ```

mod packages;
mod stats;
mod strings;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use nether_esm::{EsmFile, EsmReader, ReadStats, ReaderConfig, StringTableMap};

/// Inspect ESM/ESP plugin files
#[derive(Parser)]
#[command(name = "esm")]
#[command(about = "Inspect ESM/ESP plugin files and string tables")]
#[command(version)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print record counts per type, skipped records and warnings
    Stats(stats::StatsArgs),

    /// List behavior packages and travel destinations of each actor
    Packages(packages::PackagesArgs),

    /// Print the entries of a string table file
    Strings(strings::StringsArgs),
}

/// Input options shared by the commands that read a plugin
#[derive(Args)]
pub struct ReadArgs {
    /// Plugin or master file (.esp/.esm)
    pub file: PathBuf,

    /// Reader configuration (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// String table for localized files
    #[arg(long)]
    pub strings: Option<PathBuf>,
}

impl ReadArgs {
    /// Load the configuration and string table, then read the file
    pub fn read(&self) -> Result<(EsmFile, ReadStats)> {
        let config = match &self.config {
            Some(path) => ReaderConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => ReaderConfig::default(),
        };

        let table = match &self.strings {
            Some(path) => Some(load_table(path)?),
            None => None,
        };
        let reader = match &table {
            Some(table) => EsmReader::with_strings(config, table),
            None => EsmReader::new(config),
        };
        reader
            .read_file(&self.file)
            .with_context(|| format!("Failed to read {}", self.file.display()))
    }
}

pub fn load_table(path: &Path) -> Result<StringTableMap> {
    StringTableMap::load(path)
        .with_context(|| format!("Failed to load string table {}", path.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Stats(args) => stats::execute(args),
        Commands::Packages(args) => packages::execute(args),
        Commands::Strings(args) => strings::execute(args),
    }
}
