//! Read-only queries against the live CUPS state.
//!
//! [`StateReader`] is a thin borrow over a [`CommandRunner`]: every method
//! issues a fresh query and hands the text to the parsers in
//! [`crate::parse`]. Nothing is cached — reconciliation depends on
//! observing the effect of the previous mutation, so a stale snapshot
//! would be worse than a slow one.

use crate::error::{Error, Result};
use crate::parse;
use crate::runner::CommandRunner;
use crate::types::{DriverEntry, VendorOption};
use std::collections::BTreeMap;

/// Read-only projection of live destination state.
pub struct StateReader<'r> {
    runner: &'r dyn CommandRunner,
}

impl<'r> StateReader<'r> {
    /// Create a reader over the given runner.
    pub fn new(runner: &'r dyn CommandRunner) -> Self {
        Self { runner }
    }

    /// Whether a destination with this name exists.
    ///
    /// Takes the name per call so the reconciler can probe class members
    /// with the same reader it probes the class with.
    pub fn exists(&self, name: &str) -> Result<bool> {
        let output = self.runner.run("lpstat", &["-p", name])?;
        Ok(output.success())
    }

    /// Current option set of a destination, per `lpoptions -p`.
    pub fn cups_options(&self, name: &str) -> Result<BTreeMap<String, Option<String>>> {
        let output = self.runner.run("lpoptions", &["-p", name])?;
        parse::parse_option_list(&output.stdout)
    }

    /// Driver-specific options of a printer with their current
    /// selections, per `lpoptions -p -l`.
    pub fn vendor_options(&self, name: &str) -> Result<BTreeMap<String, VendorOption>> {
        let output = self.runner.run("lpoptions", &["-p", name, "-l"])?;
        parse::parse_vendor_options(&output.stdout)
    }

    /// Current member list of a class, in reported order.
    ///
    /// An error stream from this query is fatal: silently treating it as
    /// "no members" would tear the class down on the next comparison.
    pub fn class_members(&self, name: &str) -> Result<Vec<String>> {
        let output = self.runner.run("lpstat", &["-c", name])?;
        if !output.stderr.trim().is_empty() {
            return Err(Error::QueryFailed {
                name: name.to_string(),
                stderr: output.stderr.trim().to_string(),
            });
        }
        parse::parse_member_list(&output.stdout)
    }

    /// The driver catalog installed on this system, per `lpinfo -l -m`.
    pub fn installed_drivers(&self) -> Result<BTreeMap<String, DriverEntry>> {
        let output = self.runner.run("lpinfo", &["-l", "-m"])?;
        parse::parse_driver_catalog(&output.stdout)
    }

    /// Names of every existing destination, per `lpstat -a`.
    ///
    /// A nonzero status is the tool's way of reporting that none exist,
    /// not an error.
    pub fn all_destinations(&self) -> Result<Vec<String>> {
        let output = self.runner.run("lpstat", &["-a"])?;
        if !output.success() {
            return Ok(Vec::new());
        }
        Ok(parse::parse_destination_list(&output.stdout))
    }
}
