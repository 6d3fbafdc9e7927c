//! Packages command - behavior packages of every actor in file order

use anyhow::Result;
use clap::Args;
use nether_esm::{BehaviorPackage, Destination, Record};

use crate::ReadArgs;

/// Arguments for the packages command
#[derive(Args)]
pub struct PackagesArgs {
    #[command(flatten)]
    pub input: ReadArgs,

    /// Only show actors whose id contains this text (case-insensitive)
    #[arg(long)]
    pub filter: Option<String>,
}

/// One-line description of a package
fn describe(package: &BehaviorPackage) -> String {
    let detail = match package {
        BehaviorPackage::Wander(w) => format!(
            "distance {}, duration {}h, time {}",
            w.distance, w.duration, w.time_of_day
        ),
        BehaviorPackage::Travel(t) => format!("to ({:.0}, {:.0}, {:.0})", t.x, t.y, t.z),
        BehaviorPackage::Follow(f) | BehaviorPackage::Escort(f) => format!(
            "{} to ({:.0}, {:.0}, {:.0}), duration {}h",
            f.target, f.x, f.y, f.z, f.duration
        ),
        BehaviorPackage::Activate(a) => a.target.clone(),
    };
    match package.cell_name() {
        Some(cell) => format!("{:<8} {} in \"{}\"", package.kind(), detail, cell),
        None => format!("{:<8} {}", package.kind(), detail),
    }
}

fn describe_destination(destination: &Destination) -> String {
    let [x, y, z] = destination.position;
    match &destination.cell_name {
        Some(cell) => format!("\"{}\" ({:.0}, {:.0}, {:.0})", cell, x, y, z),
        None => format!("exterior ({:.0}, {:.0}, {:.0})", x, y, z),
    }
}

/// Execute the packages command
pub fn execute(args: PackagesArgs) -> Result<()> {
    let (file, stats) = args.input.read()?;
    let filter = args.filter.map(|f| f.to_lowercase());

    let mut actors = 0;
    for record in file.records() {
        let (Some(packages), Some(destinations)) = (record.packages(), record.destinations()) else {
            continue;
        };
        let id = record.id().unwrap_or_default();
        if filter
            .as_ref()
            .is_some_and(|f| !id.to_lowercase().contains(f.as_str()))
        {
            continue;
        }
        if packages.is_empty() && destinations.is_empty() {
            continue;
        }

        actors += 1;
        let kind = match record {
            Record::Npc(_) => "NPC",
            _ => "creature",
        };
        println!("{} ({})", id, kind);
        for (i, package) in packages.iter().enumerate() {
            println!("  [{}] {}", i, describe(package));
        }
        for destination in destinations {
            println!("  travel {}", describe_destination(destination));
        }
    }

    println!();
    println!(
        "{} actors with packages, {} records read, {} skipped",
        actors, stats.records_total, stats.records_skipped
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nether_esm::{Activate, FollowEscort, Wander};

    #[test]
    fn test_describe_follow_with_cell() {
        let package = BehaviorPackage::Follow(FollowEscort {
            x: 10.0,
            y: -20.0,
            duration: 12,
            target: "player".to_string(),
            cell_name: Some("Balmora".to_string()),
            ..Default::default()
        });
        assert_eq!(
            describe(&package),
            "follow   player to (10, -20, 0), duration 12h in \"Balmora\""
        );
    }

    #[test]
    fn test_describe_without_cell() {
        let wander = BehaviorPackage::Wander(Wander {
            distance: 512,
            duration: 5,
            ..Default::default()
        });
        assert_eq!(describe(&wander), "wander   distance 512, duration 5h, time 0");

        let activate = BehaviorPackage::Activate(Activate {
            target: "door".to_string(),
            reset: 1,
        });
        assert_eq!(describe(&activate), "activate door");
    }

    #[test]
    fn test_describe_destination() {
        let interior = Destination {
            position: [1.0, 2.0, 3.0],
            cell_name: Some("Vivec, Arena".to_string()),
            ..Default::default()
        };
        assert_eq!(describe_destination(&interior), "\"Vivec, Arena\" (1, 2, 3)");
        assert_eq!(
            describe_destination(&Destination::default()),
            "exterior (0, 0, 0)"
        );
    }
}
