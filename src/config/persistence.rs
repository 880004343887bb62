use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use super::Settings;

/// Read settings from a JSON file. Missing sections and fields fall back to
/// their defaults.
pub fn load_settings(file_path: &Path) -> Result<Settings> {
    if !file_path.exists() {
        return Err(anyhow::anyhow!("Settings file does not exist: {:?}", file_path));
    }

    let json_data = fs::read_to_string(file_path)
        .with_context(|| format!("Failed to read settings file: {:?}", file_path))?;

    let settings: Settings = serde_json::from_str(&json_data)
        .with_context(|| format!("Failed to parse settings JSON from file: {:?}", file_path))?;

    tracing::info!("Settings loaded from {:?}", file_path);
    Ok(settings)
}
