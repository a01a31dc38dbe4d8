use anyhow::{Context, Result};
use std::path::PathBuf;

/// Centralized path management for shortsmith

/// Get the shortsmith config directory
pub fn shortsmith_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .context("Unable to determine user config directory")?
        .join("shortsmith");

    std::fs::create_dir_all(&config_dir)
        .with_context(|| format!("creating config directory at {}", config_dir.display()))?;

    Ok(config_dir)
}
