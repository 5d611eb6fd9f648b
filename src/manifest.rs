use anyhow::{Context, Result};
use cupskit::{DestinationSpec, DriverMode, TargetState};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Get the default manifest path
pub fn default_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home
        .join(".config")
        .join("cupsync")
        .join("destinations.toml"))
}

/// Resolve the manifest path: an explicit override (with `~` expanded)
/// or the default location.
pub fn resolve_path(overridden: Option<&Path>) -> Result<PathBuf> {
    match overridden {
        Some(path) => {
            let raw = path.to_string_lossy();
            Ok(PathBuf::from(shellexpand::tilde(raw.as_ref()).as_ref()))
        }
        None => default_path(),
    }
}

// ============================================================================
// Manifest
// ============================================================================

/// The declared destination set, applied in file order.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default, rename = "destination")]
    pub destinations: Vec<Entry>,
}

/// One declared destination plus its lifecycle verb.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    /// `present` (the default) or `absent`
    #[serde(default)]
    pub state: TargetState,
    #[serde(flatten)]
    pub spec: DestinationSpec,
}

impl Manifest {
    /// Load a manifest file. The format follows the extension: `.json`
    /// parses as JSON, anything else as TOML.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let mut manifest: Manifest = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&content)
                .with_context(|| format!("Invalid JSON manifest: {}", path.display()))?,
            _ => toml::from_str(&content)
                .with_context(|| format!("Invalid TOML manifest: {}", path.display()))?,
        };
        for entry in &mut manifest.destinations {
            expand_driver_path(&mut entry.spec);
        }
        Ok(manifest)
    }
}

/// PPD file paths may be declared with a leading `~`.
fn expand_driver_path(spec: &mut DestinationSpec) {
    if spec.driver == DriverMode::Ppd {
        if let Some(model) = spec.model.take() {
            spec.model = Some(shellexpand::tilde(&model).into_owned());
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
