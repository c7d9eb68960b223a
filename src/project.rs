use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// VRM meta fields written into the exported avatar.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaOverride {
    /// Overwrite existing meta. Files without meta always receive these fields.
    pub enabled: bool,
    pub name: Option<String>,
    pub version: Option<String>,
    pub author: Option<String>,
}

impl Default for MetaOverride {
    fn default() -> Self {
        Self {
            enabled: true,
            name: None,
            version: None,
            author: None,
        }
    }
}

/// Persisted export settings used by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Rebuild the canonical skeleton. When off, the avatar only gets its
    /// meta applied and is written back unchanged otherwise.
    pub denormalize: bool,
    pub meta: MetaOverride,
    /// Write a JSON report next to the output file.
    pub write_report: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            denormalize: true,
            meta: MetaOverride::default(),
            write_report: false,
        }
    }
}

/// Save export settings to a JSON file.
pub fn save_export_settings(path: &Path, settings: &ExportSettings) -> Result<()> {
    let content = serde_json::to_string_pretty(settings)
        .context("failed to serialize export settings as JSON")?;
    fs::write(path, content)
        .with_context(|| format!("failed to save export settings: {}", path.display()))?;
    Ok(())
}

/// Load export settings from a JSON file.
pub fn load_export_settings(path: &Path) -> Result<ExportSettings> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to load export settings: {}", path.display()))?;
    let settings: ExportSettings =
        serde_json::from_str(&content).context("failed to parse export settings JSON")?;
    Ok(settings)
}
