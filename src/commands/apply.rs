//! Converge the live server to the manifest: delete-and-rebuild drifted
//! destinations, install missing ones, remove the ones declared absent.

use anyhow::{Context as AnyhowContext, Result};
use colored::Colorize;
use cupskit::{Client, LiveState, PurgeOutcome, ReconcileOutcome, TargetState};

use crate::Context;
use crate::cli::ApplyArgs;
use crate::manifest::{self, Manifest};
use crate::ui;

pub fn run(ctx: &Context, args: &ApplyArgs) -> Result<()> {
    let path = manifest::resolve_path(args.file.as_deref())?;
    let manifest = Manifest::load(&path)?;
    log::debug!(
        "loaded {} declarations from {}",
        manifest.destinations.len(),
        path.display()
    );

    if manifest.destinations.is_empty() && !args.purge {
        ui::warn("Manifest declares no destinations; nothing to apply");
        return Ok(());
    }

    let client = Client::new().context("CUPS command-line tools are not available")?;

    if args.dry_run {
        return preview(&client, &manifest, args);
    }

    if !args.json {
        ui::header("Applying Manifest");
    }

    // A requested purge runs before any declaration is applied.
    let purge_outcome = if args.purge {
        super::purge::confirm(args.yes)?;
        let outcome = client
            .purge()
            .context("Could not purge existing destinations")?;
        if !args.json {
            report_purge(&outcome, ctx);
        }
        Some(outcome)
    } else {
        None
    };

    let mut outcomes: Vec<ReconcileOutcome> = Vec::with_capacity(manifest.destinations.len());
    let mut changed = 0usize;
    for entry in &manifest.destinations {
        let outcome = match entry.state {
            TargetState::Present => client.ensure(&entry.spec),
            TargetState::Absent => client.remove(&entry.spec),
        }
        .with_context(|| format!("Could not reconcile {}", entry.spec.name))?;

        if outcome.changed {
            changed += 1;
        }
        if !args.json {
            report_outcome(&outcome, ctx);
        }
        outcomes.push(outcome);
    }

    if args.json {
        let payload = serde_json::json!({
            "purge": purge_outcome,
            "results": outcomes,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    // A purge-only invocation ends with the purge report.
    if manifest.destinations.is_empty() {
        return Ok(());
    }

    println!();
    if changed == 0 {
        ui::success("Live state already matches the manifest");
    } else {
        ui::success(&format!(
            "{} of {} destinations changed",
            changed,
            manifest.destinations.len()
        ));
    }

    Ok(())
}

// ============================================================================
// Reporting
// ============================================================================

fn report_outcome(outcome: &ReconcileOutcome, ctx: &Context) {
    let verdict = match (outcome.state, outcome.changed) {
        (TargetState::Present, true) => "converged".green(),
        (TargetState::Present, false) => "in sync".normal(),
        (TargetState::Absent, true) => "deleted".green(),
        (TargetState::Absent, false) => "absent".normal(),
    };
    println!(
        "  {} {} {} {}",
        "✓".green(),
        outcome.name.bold(),
        format!("({})", outcome.kind).dimmed(),
        verdict
    );

    if ctx.verbose > 0
        && let Some(stdout) = &outcome.stdout
    {
        println!("{}", ui::indent(stdout, "      ").dimmed());
    }
    if !ctx.quiet
        && let Some(stderr) = &outcome.stderr
    {
        println!("{}", ui::indent(stderr, "      ").yellow());
    }
}

fn report_purge(outcome: &PurgeOutcome, ctx: &Context) {
    if outcome.removed.is_empty() {
        ui::info("No destinations to purge");
        return;
    }
    ui::info(&format!(
        "Purged {} destinations: {}",
        outcome.removed.len(),
        outcome.removed.join(", ")
    ));
    if !ctx.quiet
        && let Some(stderr) = &outcome.stderr
    {
        println!("{}", ui::indent(stderr, "      ").yellow());
    }
}

// ============================================================================
// Dry Run
// ============================================================================

fn preview(client: &Client, manifest: &Manifest, args: &ApplyArgs) -> Result<()> {
    ui::header("Applying Manifest");
    ui::warn("Dry run - no changes will be made");
    println!();

    if args.purge {
        let doomed = client
            .destinations()
            .context("Could not list destinations")?;
        if doomed.is_empty() {
            ui::dim("purge: no destinations installed");
        } else {
            println!("  {} purge would delete: {}", "→".cyan(), doomed.join(", "));
        }
    }

    for entry in &manifest.destinations {
        let action = match entry.state {
            TargetState::Present => {
                // A purge deletes everything first, so every declaration
                // would be a fresh install.
                let live = if args.purge {
                    LiveState::Absent
                } else {
                    client
                        .check(&entry.spec)
                        .with_context(|| format!("Could not check {}", entry.spec.name))?
                };
                match live {
                    LiveState::Matched => "unchanged",
                    LiveState::Mismatched => "update",
                    LiveState::Absent => "install",
                }
            }
            TargetState::Absent => {
                if !args.purge && client.exists(&entry.spec.name)? {
                    "delete"
                } else {
                    "unchanged"
                }
            }
        };
        println!("  {} {} {}", "→".cyan(), entry.spec.name, action.dimmed());
    }

    Ok(())
}
