//! `config.toml`: the engine configuration document.

use std::fs;
use std::path::Path;

use hyphae_core::EngineConfig;

use crate::document::write_atomic;
use crate::error::{Result, StoreError};

/// Parse and validate. A missing file is an error here.
pub fn load_config(path: &Path) -> Result<EngineConfig> {
    let text = fs::read_to_string(path)?;
    let config: EngineConfig = toml::from_str(&text)?;
    config.validate()?;
    Ok(config)
}

/// Defaults when the file is missing; defaults plus a warning when it is
/// malformed or fails validation.
pub fn load_config_or_default(path: &Path) -> EngineConfig {
    match load_config(path) {
        Ok(config) => config,
        Err(StoreError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            EngineConfig::default()
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), "config rejected, using defaults: {e}");
            EngineConfig::default()
        }
    }
}

pub fn save_config(path: &Path, config: &EngineConfig) -> Result<()> {
    let text = toml::to_string_pretty(config)?;
    write_atomic(path, text.as_bytes())
}
