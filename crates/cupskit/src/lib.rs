//! # cupskit
//!
//! Declarative management of CUPS print destinations.
//!
//! This crate provides functionality for:
//! - Declaring printers and classes as desired state
//! - Reading live destination state via `lpstat`, `lpoptions` and `lpinfo`
//! - Comparing a declaration against what is actually installed
//! - Converging with the minimal `lpadmin` command sequence
//!
//! ## Example
//!
//! ```no_run
//! use cupskit::{Client, DestinationSpec};
//!
//! // Create a client
//! let client = Client::new().expect("CUPS not available");
//!
//! // Declare a printer
//! let printer = DestinationSpec::printer("front-desk")
//!     .with_uri("ipp://10.0.0.31/ipp/print")
//!     .with_location("Reception")
//!     .with_info("Front Desk Printer");
//!
//! // Converge: install, rebuild or leave alone as needed
//! let outcome = client.ensure(&printer).expect("reconciliation failed");
//! if outcome.changed {
//!     println!("{} converged", outcome.name);
//! }
//! ```
//!
//! ## Reconciliation model
//!
//! A declaration is compared against live state field by field. Any
//! checkable mismatch tears the destination down and rebuilds it, because
//! `lpadmin` has no in-place edit for identity-defining attributes like
//! the device URI or the driver. Attributes CUPS cannot report back
//! (supply polling, job quotas, operation policies) are reasserted on
//! every pass instead of compared. Running the same declaration twice
//! issues no mutating command the second time and reports
//! `changed = false`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod compare;
pub mod error;
pub mod parse;
pub mod reconcile;
pub mod runner;
pub mod state;
pub mod types;

#[cfg(test)]
mod testutil;

pub use error::{Error, ErrorCategory, Result};
pub use runner::{CommandOutput, CommandRunner, SystemRunner};
pub use types::{
    DestinationKind, DestinationSpec, DriverEntry, DriverMode, LiveState, PurgeOutcome,
    ReconcileOutcome, TargetState, VendorOption,
};

use reconcile::Reconciler;
use state::StateReader;
use std::collections::BTreeMap;

/// High-level client for CUPS destination management.
///
/// The client wraps a command runner and exposes the reconciliation
/// operations: converge a declaration, remove a destination, observe
/// drift, and purge everything.
pub struct Client {
    runner: Box<dyn CommandRunner>,
}

impl Client {
    /// Create a client talking to the local CUPS scheduler.
    ///
    /// Returns an error if the scheduler cannot be reached.
    pub fn new() -> Result<Self> {
        let runner = SystemRunner::new()?;
        Ok(Self {
            runner: Box::new(runner),
        })
    }

    /// Create a client with a custom command runner (useful for testing).
    pub fn with_runner(runner: Box<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    // =========================================================================
    // Reconciliation
    // =========================================================================

    /// Converge a destination to its declared configuration.
    pub fn ensure(&self, spec: &DestinationSpec) -> Result<ReconcileOutcome> {
        Reconciler::new(self.runner.as_ref(), spec.clone()).ensure_present()
    }

    /// Remove a destination. Removing one that is already gone is a
    /// no-op, not an error.
    pub fn remove(&self, spec: &DestinationSpec) -> Result<ReconcileOutcome> {
        Reconciler::new(self.runner.as_ref(), spec.clone()).ensure_absent()
    }

    /// Delete every destination the scheduler currently reports.
    pub fn purge(&self) -> Result<PurgeOutcome> {
        reconcile::purge_all(self.runner.as_ref())
    }

    // =========================================================================
    // Observation
    // =========================================================================

    /// Observe where a declaration stands without mutating anything.
    pub fn check(&self, spec: &DestinationSpec) -> Result<LiveState> {
        let spec = spec.clone().normalized();
        spec.validate(TargetState::Present)?;
        let reader = StateReader::new(self.runner.as_ref());
        compare::observe(&reader, &spec)
    }

    /// Whether a destination with the given name exists.
    pub fn exists(&self, name: &str) -> Result<bool> {
        StateReader::new(self.runner.as_ref()).exists(name)
    }

    /// The names of every destination the scheduler reports.
    pub fn destinations(&self) -> Result<Vec<String>> {
        StateReader::new(self.runner.as_ref()).all_destinations()
    }

    /// The driver catalog, keyed by model name as `lpinfo -m` reports it.
    pub fn drivers(&self) -> Result<BTreeMap<String, DriverEntry>> {
        StateReader::new(self.runner.as_ref()).installed_drivers()
    }
}
