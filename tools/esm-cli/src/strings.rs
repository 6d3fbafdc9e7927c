//! Strings command - dump a string table

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use nether_esm::StringTable;

/// Arguments for the strings command
#[derive(Args)]
pub struct StringsArgs {
    /// String table file (.strings, .dlstrings or .ilstrings)
    pub table: PathBuf,

    /// Print only this index (decimal or 0x-prefixed hex)
    #[arg(long, value_parser = parse_index)]
    pub index: Option<u32>,

    /// Print the entries as a JSON object
    #[arg(long)]
    pub json: bool,
}

fn parse_index(text: &str) -> std::result::Result<u32, String> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|e| format!("invalid string index '{}': {}", text, e))
}

/// Execute the strings command
pub fn execute(args: StringsArgs) -> Result<()> {
    let table = crate::load_table(&args.table)?;

    if let Some(index) = args.index {
        let text = table
            .get_string(index)
            .with_context(|| format!("No string with index {:#010X}", index))?;
        println!("{}", text);
        return Ok(());
    }

    let entries = table.sorted();
    if args.json {
        let map: serde_json::Map<String, serde_json::Value> = entries
            .iter()
            .map(|(id, text)| (format!("{:#010X}", id), serde_json::Value::from(*text)))
            .collect();
        let json = serde_json::to_string_pretty(&map).context("Failed to serialize table")?;
        println!("{}", json);
        return Ok(());
    }

    for (id, text) in &entries {
        println!("{:#010X}  {}", id, text);
    }
    println!();
    println!("{} strings", entries.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_index() {
        assert_eq!(parse_index("42"), Ok(42));
        assert_eq!(parse_index("0x1F"), Ok(31));
        assert_eq!(parse_index("0XFF"), Ok(255));
        assert!(parse_index("ruby").is_err());
    }
}
