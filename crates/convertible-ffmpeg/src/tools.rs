//! External tool detection and configuration.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

/// Where to find ffmpeg/ffprobe and how long a run may take.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Explicit ffmpeg executable; falls back to `PATH` if it does not exist.
    pub ffmpeg_path: Option<PathBuf>,

    /// Explicit ffprobe executable; falls back to `PATH` if it does not exist.
    pub ffprobe_path: Option<PathBuf>,

    /// Kill a run after this many seconds. `0` disables the limit.
    pub timeout_secs: u64,
}

impl ToolsConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

/// Information about an external tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    /// Name of the tool.
    pub name: String,
    /// Whether the tool is available.
    pub available: bool,
    /// First line of the version output, if available.
    pub version: Option<String>,
    /// Path to the tool executable.
    pub path: Option<PathBuf>,
}

/// Check a tool by running it with `version_arg`.
pub fn check_tool_with_arg(name: &str, program: &Path, version_arg: &str) -> ToolInfo {
    let result = Command::new(program).arg(version_arg).output();

    match result {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .map(|s| s.to_string());

            let path = which::which(program).ok();

            ToolInfo {
                name: name.to_string(),
                available: true,
                version,
                path,
            }
        }
        _ => ToolInfo {
            name: name.to_string(),
            available: false,
            version: None,
            path: None,
        },
    }
}

/// Check ffmpeg and ffprobe, honoring configured paths.
pub fn check_tools(config: &ToolsConfig) -> Vec<ToolInfo> {
    [
        ("ffmpeg", config.ffmpeg_path.as_deref()),
        ("ffprobe", config.ffprobe_path.as_deref()),
    ]
    .into_iter()
    .map(|(name, configured)| {
        let program = get_tool_path(name, configured).unwrap_or_else(|_| PathBuf::from(name));
        check_tool_with_arg(name, &program, "-version")
    })
    .collect()
}

/// Require that a tool is available, returning its path.
///
/// # Errors
///
/// Returns an error if the tool is not found.
pub fn require_tool(name: &str) -> Result<PathBuf> {
    which::which(name).map_err(|_| Error::tool_not_found(name))
}

/// Get the path to a tool, preferring a configured path over PATH lookup.
pub fn get_tool_path(name: &str, config_path: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = config_path {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        tracing::warn!("configured {name} path {:?} does not exist; searching PATH", path);
    }

    require_tool(name)
}
