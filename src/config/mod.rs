mod types;

pub use types::*;

use anyhow::{Context, Result};
use convertible_ffmpeg::PresetTable;
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./convertible.toml",
        "~/.config/convertible/config.toml",
        "/etc/convertible/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Build the preset table described by `config`.
pub fn preset_table(config: &Config) -> Result<PresetTable> {
    PresetTable::new(config.presets.clone()).context("Invalid preset configuration")
}

/// Validate configuration
fn validate_config(config: &Config) -> Result<()> {
    preset_table(config)?;

    for (tool, path) in [
        ("ffmpeg", config.tools.ffmpeg_path.as_deref()),
        ("ffprobe", config.tools.ffprobe_path.as_deref()),
    ] {
        if let Some(path) = path {
            if !path.exists() {
                tracing::warn!("Configured {} path does not exist: {:?}", tool, path);
            }
        }
    }

    Ok(())
}
