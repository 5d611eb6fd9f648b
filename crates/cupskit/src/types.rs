//! Core types for destination reconciliation.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Kind of CUPS destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DestinationKind {
    /// A single print queue
    #[default]
    Printer,
    /// A named group of printers
    Class,
}

impl DestinationKind {
    /// Get the manifest/reporting name for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            DestinationKind::Printer => "printer",
            DestinationKind::Class => "class",
        }
    }
}

impl std::fmt::Display for DestinationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a printer's driver reference is resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverMode {
    /// `model` names an entry in the driver catalog (`lpinfo -m`)
    #[default]
    Model,
    /// `model` is a path to a PPD file passed straight to the tool
    Ppd,
}

impl DriverMode {
    /// Get the manifest name for this mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverMode::Model => "model",
            DriverMode::Ppd => "ppd",
        }
    }
}

/// Desired lifecycle state for a destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetState {
    /// The destination should exist and match its declaration
    #[default]
    Present,
    /// The destination should not exist
    Absent,
}

impl TargetState {
    /// Get the manifest/reporting name for this state.
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetState::Present => "present",
            TargetState::Absent => "absent",
        }
    }
}

impl std::fmt::Display for TargetState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A declared destination: the complete desired configuration of one
/// printer or class.
///
/// All fields other than `name` are optional in a manifest; `kind`
/// defaults to [`DestinationKind::Printer`], so a pure-delete declaration
/// may omit it. The supply-reporting flags, job limits and access policy
/// are write-only from the tool's perspective: CUPS exposes no read path
/// for them, so declared values are reasserted on every run and absent
/// values are never touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DestinationSpec {
    /// Destination name (the queue name passed to `-p`)
    pub name: String,
    /// Printer or class
    pub kind: DestinationKind,
    /// Connection URI (`-v`); required for printers, illegal for classes.
    /// A value without a scheme separator is normalized to `lpd://<value>/`.
    pub uri: Option<String>,
    /// How `model` is interpreted
    pub driver: DriverMode,
    /// Driver catalog name or PPD file path; `"raw"` or absent means a raw
    /// queue with no driver bound
    pub model: Option<String>,
    /// Whether the destination accepts and prints jobs (`-E`)
    pub enabled: bool,
    /// Whether the destination is shared on the network
    pub shared: bool,
    /// Whether this destination becomes the server default (`-d`)
    #[serde(rename = "default")]
    pub is_default: bool,
    /// Human-readable description (`-D`); CUPS falls back to the name
    pub info: Option<String>,
    /// Physical location (`-L`)
    pub location: Option<String>,
    /// Operation policy to bind (`printer-op-policy`); write-only
    pub policy: Option<String>,
    /// Complete member list for a class, in add order; not a delta
    pub members: Vec<String>,
    /// Report supply levels over IPP (`cupsIPPSupplies`); write-only
    pub report_ipp_supply_levels: Option<bool>,
    /// Report supply levels over SNMP (`cupsSNMPSupplies`); write-only
    pub report_snmp_supply_levels: Option<bool>,
    /// Per-job size limit in kilobytes (`job-k-limit`); write-only
    pub job_kb_limit: Option<u32>,
    /// Per-job page limit (`job-page-limit`); write-only
    pub job_page_limit: Option<u32>,
    /// Quota accounting period in seconds (`job-quota-period`); write-only
    pub job_quota_period: Option<u32>,
    /// Driver-specific options (PPD defaults), compared as a subset of the
    /// live option set
    pub options: BTreeMap<String, String>,
}

impl Default for DestinationSpec {
    fn default() -> Self {
        Self {
            name: String::new(),
            kind: DestinationKind::Printer,
            uri: None,
            driver: DriverMode::Model,
            model: None,
            enabled: true,
            shared: false,
            is_default: false,
            info: None,
            location: None,
            policy: None,
            members: Vec::new(),
            report_ipp_supply_levels: None,
            report_snmp_supply_levels: None,
            job_kb_limit: None,
            job_page_limit: None,
            job_quota_period: None,
            options: BTreeMap::new(),
        }
    }
}

impl DestinationSpec {
    /// Create a declaration with the given name and kind.
    pub fn new(name: impl Into<String>, kind: DestinationKind) -> Self {
        Self {
            name: name.into(),
            kind,
            ..Self::default()
        }
    }

    /// Create a printer declaration.
    pub fn printer(name: impl Into<String>) -> Self {
        Self::new(name, DestinationKind::Printer)
    }

    /// Create a class declaration.
    pub fn class(name: impl Into<String>) -> Self {
        Self::new(name, DestinationKind::Class)
    }

    /// Set the connection URI.
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Set a driver catalog model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.driver = DriverMode::Model;
        self.model = Some(model.into());
        self
    }

    /// Set a PPD driver file path.
    pub fn with_ppd(mut self, path: impl Into<String>) -> Self {
        self.driver = DriverMode::Ppd;
        self.model = Some(path.into());
        self
    }

    /// Set the description.
    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = Some(info.into());
        self
    }

    /// Set the location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Set the operation policy.
    pub fn with_policy(mut self, policy: impl Into<String>) -> Self {
        self.policy = Some(policy.into());
        self
    }

    /// Add a class member.
    pub fn with_member(mut self, member: impl Into<String>) -> Self {
        self.members.push(member.into());
        self
    }

    /// Add a driver-specific option.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Whether this declaration describes a raw queue with no driver bound.
    pub fn is_raw_queue(&self) -> bool {
        self.driver == DriverMode::Model && self.model.as_deref().is_none_or(|m| m == "raw")
    }

    /// Return a cleaned copy of this declaration: string fields trimmed,
    /// fields that are empty after trimming treated as undeclared, and the
    /// URI rewritten to `lpd://<value>/` when it carries no scheme
    /// separator.
    ///
    /// The engine normalizes every declaration on entry, so callers only
    /// need this directly when they want to inspect the effective values.
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.uri = clean(self.uri).map(|uri| {
            if uri.contains(":/") {
                uri
            } else {
                format!("lpd://{uri}/")
            }
        });
        self.model = clean(self.model);
        self.info = clean(self.info);
        self.location = clean(self.location);
        self.policy = clean(self.policy);
        self.members = self
            .members
            .into_iter()
            .map(|m| m.trim().to_string())
            .collect();
        self
    }

    /// Check that this declaration is structurally valid for the requested
    /// lifecycle state. No commands are issued by validation.
    pub fn validate(&self, target: TargetState) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::invalid_spec("destination name must not be empty"));
        }

        if target == TargetState::Absent {
            return Ok(());
        }

        match self.kind {
            DestinationKind::Printer => {
                if self.uri.is_none() {
                    return Err(Error::MissingUri {
                        name: self.name.clone(),
                    });
                }
                if self.driver == DriverMode::Ppd && self.model.is_none() {
                    return Err(Error::invalid_spec(format!(
                        "printer '{}' selects a PPD driver but names no driver file",
                        self.name
                    )));
                }
            }
            DestinationKind::Class => {
                if self.uri.is_some() {
                    return Err(Error::invalid_spec(format!(
                        "class '{}' must not declare a connection URI",
                        self.name
                    )));
                }
                if self.members.is_empty() {
                    return Err(Error::EmptyClass {
                        name: self.name.clone(),
                    });
                }
                if self.members.iter().any(|m| m.trim().is_empty()) {
                    return Err(Error::invalid_spec(format!(
                        "class '{}' declares an empty member name",
                        self.name
                    )));
                }
            }
        }

        for (field, value) in [
            ("job_kb_limit", self.job_kb_limit),
            ("job_page_limit", self.job_page_limit),
            ("job_quota_period", self.job_quota_period),
        ] {
            if value == Some(0) {
                return Err(Error::invalid_spec(format!(
                    "{field} must be a positive integer"
                )));
            }
        }

        Ok(())
    }
}

/// One entry in the driver catalog reported by `lpinfo -l -m`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverEntry {
    /// Catalog name (the value passed to `lpadmin -m`)
    pub name: String,
    /// Human-readable make and model, as CUPS will report it once installed
    pub make_and_model: Option<String>,
    /// Language of the driver's strings
    pub natural_language: Option<String>,
    /// IEEE-1284 device ID, when the driver carries one
    pub device_id: Option<String>,
}

/// A driver-specific option with its current selection, as reported by
/// `lpoptions -l`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorOption {
    /// Currently selected value, if the tool marked one
    pub current: Option<String>,
    /// Human-readable option label
    pub label: String,
    /// Every value the option accepts, in reported order
    pub values: Vec<String>,
}

/// Observed relationship between a declaration and live state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LiveState {
    /// The destination does not exist
    Absent,
    /// The destination exists but differs from its declaration
    Mismatched,
    /// The destination already satisfies its declaration
    Matched,
}

impl LiveState {
    /// Get the reporting name for this state.
    pub fn as_str(&self) -> &'static str {
        match self {
            LiveState::Absent => "absent",
            LiveState::Mismatched => "mismatched",
            LiveState::Matched => "matched",
        }
    }
}

impl std::fmt::Display for LiveState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of one reconciliation pass for one destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileOutcome {
    /// The requested lifecycle state
    pub state: TargetState,
    /// The declared kind
    pub kind: DestinationKind,
    /// The destination name
    pub name: String,
    /// Whether at least one mutating command was issued
    pub changed: bool,
    /// Accumulated standard output of every issued command, when non-empty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    /// Accumulated error output of every issued command, when non-empty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
}

/// Result of a purge pass over every existing destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeOutcome {
    /// Names deleted, in enumeration order
    pub removed: Vec<String>,
    /// Whether any delete command was issued
    pub changed: bool,
    /// Accumulated standard output of the delete commands, when non-empty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    /// Accumulated error output of the delete commands, when non-empty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
}

fn clean(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
