//! Comparison of declared configuration against live state.
//!
//! Two separable verdicts exist for printers: the settings comparison
//! (URI, driver, location, shared flag, description) decides whether a
//! printer must be torn down and rebuilt, while the driver-option subset
//! check only decides whether one options-set command is needed. Classes
//! have a single verdict covering their options and membership.
//!
//! Callers are expected to hand in normalized, validated declarations.

use crate::error::{Error, Result};
use crate::state::StateReader;
use crate::types::{DestinationKind, DestinationSpec, DriverMode, LiveState};
use std::collections::BTreeMap;

/// Make-and-model string CUPS reports for a queue with no driver bound.
pub const RAW_QUEUE_MODEL: &str = "Remote Printer";

/// Resolve the make-and-model string a live printer must report to
/// satisfy the declaration.
///
/// Raw queues resolve to the fixed [`RAW_QUEUE_MODEL`] sentinel. A PPD
/// file driver resolves to `None`: the string cannot be known without
/// installing the file, so the comparison is skipped. A named catalog
/// model must resolve through the installed driver catalog or the whole
/// operation fails.
pub fn resolve_make_and_model(
    reader: &StateReader<'_>,
    spec: &DestinationSpec,
) -> Result<Option<String>> {
    match (spec.driver, spec.model.as_deref()) {
        (DriverMode::Ppd, _) => Ok(None),
        (DriverMode::Model, None | Some("raw")) => Ok(Some(RAW_QUEUE_MODEL.to_string())),
        (DriverMode::Model, Some(model)) => {
            let drivers = reader.installed_drivers()?;
            drivers
                .get(model)
                .and_then(|entry| entry.make_and_model.clone())
                .map(Some)
                .ok_or_else(|| Error::UnknownModel {
                    model: model.to_string(),
                })
        }
    }
}

/// Build the option map a live printer must carry, keyed the way
/// `lpoptions` reports it.
///
/// `printer-info` falls back to the printer name, which is what CUPS
/// itself does when no description is set. An undeclared location stays
/// in the map with an empty expected value: the live object must then
/// report the bare flag, not some other location.
pub fn expected_printer_options(
    reader: &StateReader<'_>,
    spec: &DestinationSpec,
) -> Result<BTreeMap<String, Option<String>>> {
    let mut expected = BTreeMap::new();
    expected.insert("device-uri".to_string(), spec.uri.clone());
    if let Some(model) = resolve_make_and_model(reader, spec)? {
        expected.insert("printer-make-and-model".to_string(), Some(model));
    }
    expected.insert("printer-location".to_string(), spec.location.clone());
    expected.insert(
        "printer-is-shared".to_string(),
        Some(bool_word(spec.shared).to_string()),
    );
    expected.insert(
        "printer-info".to_string(),
        Some(spec.info.clone().unwrap_or_else(|| spec.name.clone())),
    );
    Ok(expected)
}

/// Whether a live printer's settings satisfy the declaration.
///
/// Every expected key must be present with an exactly-equal value; a
/// missing key is a mismatch. This is the verdict that triggers
/// delete-before-install.
pub fn printer_settings_match(reader: &StateReader<'_>, spec: &DestinationSpec) -> Result<bool> {
    let expected = expected_printer_options(reader, spec)?;
    let live = reader.cups_options(&spec.name)?;
    Ok(subset_matches(&expected, &live))
}

/// Whether every declared driver-specific option is currently selected.
///
/// This is a subset check: live options the declaration does not mention
/// never count as drift. An empty declaration is satisfied without
/// querying anything.
pub fn vendor_options_match(reader: &StateReader<'_>, spec: &DestinationSpec) -> Result<bool> {
    if spec.options.is_empty() {
        return Ok(true);
    }
    let live = reader.vendor_options(&spec.name)?;
    Ok(spec.options.iter().all(|(key, want)| {
        live.get(key)
            .is_some_and(|option| option.current.as_deref() == Some(want.as_str()))
    }))
}

/// Whether a live class satisfies the declaration.
///
/// Checks the option subset first and only queries membership when the
/// options already match, so an option mismatch never depends on the
/// membership query succeeding. Membership comparison is
/// order-insensitive.
pub fn class_settings_match(reader: &StateReader<'_>, spec: &DestinationSpec) -> Result<bool> {
    let mut expected = BTreeMap::new();
    expected.insert("printer-location".to_string(), spec.location.clone());
    if let Some(info) = &spec.info {
        expected.insert("printer-info".to_string(), Some(info.clone()));
    }

    let live = reader.cups_options(&spec.name)?;
    if !subset_matches(&expected, &live) {
        return Ok(false);
    }

    let mut declared = spec.members.clone();
    declared.sort();
    let mut live_members = reader.class_members(&spec.name)?;
    live_members.sort();
    Ok(declared == live_members)
}

/// Observe where a declaration stands against live state.
pub fn observe(reader: &StateReader<'_>, spec: &DestinationSpec) -> Result<LiveState> {
    if !reader.exists(&spec.name)? {
        return Ok(LiveState::Absent);
    }
    let matched = match spec.kind {
        DestinationKind::Printer => {
            printer_settings_match(reader, spec)? && vendor_options_match(reader, spec)?
        }
        DestinationKind::Class => class_settings_match(reader, spec)?,
    };
    Ok(if matched {
        LiveState::Matched
    } else {
        LiveState::Mismatched
    })
}

/// The word `lpadmin -o printer-is-shared=` expects for a flag.
pub(crate) fn bool_word(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

fn subset_matches(
    expected: &BTreeMap<String, Option<String>>,
    live: &BTreeMap<String, Option<String>>,
) -> bool {
    expected.iter().all(|(key, want)| live.get(key) == Some(want))
}
