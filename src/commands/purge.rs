//! Delete every destination the server reports, printers and classes
//! alike. Destructive, so it prompts unless `--yes` is given.

use anyhow::{Context as AnyhowContext, Result};
use colored::Colorize;
use cupskit::{Client, PurgeOutcome};

use crate::Context;
use crate::cli::PurgeArgs;
use crate::ui;

pub fn run(ctx: &Context, args: &PurgeArgs) -> Result<()> {
    let client = Client::new().context("CUPS command-line tools are not available")?;

    let names = client
        .destinations()
        .context("Could not list destinations")?;
    if names.is_empty() {
        if args.json {
            let outcome = PurgeOutcome {
                removed: Vec::new(),
                changed: false,
                stdout: None,
                stderr: None,
            };
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        } else {
            ui::info("No destinations installed");
        }
        return Ok(());
    }

    if !args.json {
        ui::warn(&format!(
            "About to delete {} destinations: {}",
            names.len(),
            names.join(", ")
        ));
    }
    confirm(args.yes)?;

    let outcome = client.purge().context("Could not purge destinations")?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    ui::success(&format!("Purged {} destinations", outcome.removed.len()));
    if !ctx.quiet
        && let Some(stderr) = &outcome.stderr
    {
        println!("{}", ui::indent(stderr, "      ").yellow());
    }

    Ok(())
}

/// Ask before deleting everything, unless `--yes` was given.
pub(crate) fn confirm(yes: bool) -> Result<()> {
    if yes {
        return Ok(());
    }

    let confirmed = dialoguer::Confirm::new()
        .with_prompt("Delete every existing CUPS destination?")
        .default(false)
        .interact()
        .context("Failed to read confirmation")?;

    if !confirmed {
        anyhow::bail!("Purge declined");
    }

    Ok(())
}
