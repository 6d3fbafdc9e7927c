//! Stats command - record counts per type

use anyhow::{Context, Result};
use clap::Args;
use nether_esm::{Dialect, ReadStats};
use serde::Serialize;

use crate::ReadArgs;

/// Arguments for the stats command
#[derive(Args)]
pub struct StatsArgs {
    #[command(flatten)]
    pub input: ReadArgs,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    file: String,
    dialect: Dialect,
    master: bool,
    localized: bool,
    #[serde(flatten)]
    stats: &'a ReadStats,
}

/// Execute the stats command
pub fn execute(args: StatsArgs) -> Result<()> {
    let (file, stats) = args.input.read()?;
    let report = Report {
        file: args.input.file.display().to_string(),
        dialect: file.dialect,
        master: file.header.is_master(),
        localized: file.localized,
        stats: &stats,
    };

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{}", json);
        return Ok(());
    }

    println!("=== {} ===", report.file);
    println!(
        "  Dialect: {:?}{}{}",
        report.dialect,
        if report.master { ", master" } else { "" },
        if report.localized { ", localized" } else { "" }
    );
    println!("  Records: {}", stats.records_total);
    if stats.groups > 0 {
        println!("  Groups: {}", stats.groups);
    }
    for (tag, count) in &stats.records_by_tag {
        println!("    {:<4} {:>8}", tag, count);
    }
    if stats.records_skipped > 0 {
        println!("  Skipped: {}", stats.records_skipped);
    }
    if stats.records_dropped > 0 {
        println!("  Dropped: {}", stats.records_dropped);
    }
    if !stats.warnings.is_empty() {
        println!("  Warnings: {}", stats.warnings.len());
        for warning in &stats.warnings {
            println!("    {}", warning);
        }
    }
    Ok(())
}
