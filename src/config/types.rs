use convertible_ffmpeg::{Preset, ToolsConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Custom presets, keyed by name. Built-in names are reserved.
    #[serde(default)]
    pub presets: BTreeMap<String, Preset>,
}
