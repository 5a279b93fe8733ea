//! Persisted host options

use anyhow::Context;
use n64_config::N64Options;
use std::fs;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "n64-config.toml";

/// Read options from a TOML file, falling back to defaults if the file is missing or invalid.
pub fn load_options<P: AsRef<Path>>(path: P) -> N64Options {
    let path = path.as_ref();
    let Ok(config_str) = fs::read_to_string(path) else {
        log::info!("No config at '{}', using default options", path.display());
        return N64Options::default();
    };

    toml::from_str(&config_str).unwrap_or_else(|err| {
        log::error!("Error deserializing options from '{}': {err}", path.display());
        N64Options::default()
    })
}

pub fn save_options<P: AsRef<Path>>(path: P, options: &N64Options) -> anyhow::Result<()> {
    let path = path.as_ref();
    let config_str = toml::to_string_pretty(options)?;
    fs::write(path, config_str)
        .with_context(|| format!("Error writing options to '{}'", path.display()))?;

    Ok(())
}
