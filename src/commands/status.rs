//! Read-only drift report: each declared destination against the live
//! server. Nothing here mutates CUPS.

use anyhow::{Context as AnyhowContext, Result};
use colored::Colorize;
use cupskit::{Client, LiveState, TargetState};

use crate::Context;
use crate::cli::StatusArgs;
use crate::manifest::{self, Manifest};
use crate::ui;

pub fn run(ctx: &Context, args: &StatusArgs) -> Result<()> {
    let path = manifest::resolve_path(args.file.as_deref())?;
    let manifest = Manifest::load(&path)?;
    log::debug!(
        "loaded {} declarations from {}",
        manifest.destinations.len(),
        path.display()
    );

    if manifest.destinations.is_empty() {
        ui::warn("Manifest declares no destinations");
        return Ok(());
    }

    let client = Client::new().context("CUPS command-line tools are not available")?;

    ui::header("Destination Status");
    if !ctx.quiet {
        ui::kv("manifest", &path.display().to_string());
        println!();
    }

    let mut drifted = 0usize;
    for entry in &manifest.destinations {
        let (icon, verdict) = match entry.state {
            TargetState::Present => {
                let live = client
                    .check(&entry.spec)
                    .with_context(|| format!("Could not check {}", entry.spec.name))?;
                match live {
                    LiveState::Matched => ("✓".green(), "in sync".normal()),
                    LiveState::Mismatched => {
                        drifted += 1;
                        ("⚠".yellow(), "drifted".yellow())
                    }
                    LiveState::Absent => {
                        drifted += 1;
                        ("✗".red(), "missing".red())
                    }
                }
            }
            TargetState::Absent => {
                if client.exists(&entry.spec.name)? {
                    drifted += 1;
                    ("⚠".yellow(), "still installed".yellow())
                } else {
                    ("✓".green(), "absent".normal())
                }
            }
        };

        println!(
            "  {} {} {} {}",
            icon,
            entry.spec.name.bold(),
            format!("({})", entry.spec.kind).dimmed(),
            verdict
        );

        if !ctx.quiet && entry.state == TargetState::Present {
            if let Some(uri) = &entry.spec.uri {
                ui::dim(&format!("    {uri}"));
            }
            if !entry.spec.members.is_empty() {
                ui::dim(&format!("    members: {}", entry.spec.members.join(", ")));
            }
        }
    }

    println!();
    if drifted == 0 {
        ui::success("Everything matches the manifest");
    } else {
        ui::warn(&format!(
            "{} of {} destinations out of sync",
            drifted,
            manifest.destinations.len()
        ));
    }

    Ok(())
}
