use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cupsync")]
#[command(version)]
#[command(about = "Declarative management of CUPS printers and classes", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Report drift between the manifest and live CUPS state
    Status(StatusArgs),

    /// Converge live CUPS state to the manifest
    Apply(ApplyArgs),

    /// Delete every destination the server reports
    Purge(PurgeArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Status
// ============================================================================

#[derive(Parser)]
pub struct StatusArgs {
    /// Manifest file (defaults to ~/.config/cupsync/destinations.toml)
    #[arg(short, long, env = "CUPSYNC_MANIFEST")]
    pub file: Option<PathBuf>,
}

// ============================================================================
// Apply
// ============================================================================

#[derive(Parser)]
pub struct ApplyArgs {
    /// Manifest file (defaults to ~/.config/cupsync/destinations.toml)
    #[arg(short, long, env = "CUPSYNC_MANIFEST")]
    pub file: Option<PathBuf>,

    /// Delete every existing destination before applying the manifest
    #[arg(long)]
    pub purge: bool,

    /// Show what would change without mutating the server
    #[arg(short, long)]
    pub dry_run: bool,

    /// Skip confirmation prompts
    #[arg(short, long)]
    pub yes: bool,

    /// Print outcome records as JSON instead of the report
    #[arg(long)]
    pub json: bool,
}

// ============================================================================
// Purge
// ============================================================================

#[derive(Parser)]
pub struct PurgeArgs {
    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Print the outcome record as JSON instead of the report
    #[arg(long)]
    pub json: bool,
}
