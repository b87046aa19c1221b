//! Duration probing with ffprobe.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::process::ToolCommand;
use crate::{Error, Result};

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

/// Return the duration of `source` in seconds.
pub async fn probe_duration(
    ffprobe: &Path,
    source: &Path,
    timeout: Option<Duration>,
) -> Result<f64> {
    let output = ToolCommand::new(PathBuf::from(ffprobe))
        .args(["-v", "quiet", "-print_format", "json", "-show_format"])
        .arg(source.to_string_lossy())
        .timeout(timeout)
        .execute()
        .await?;

    parse_duration(&output.stdout)
}

fn parse_duration(json: &str) -> Result<f64> {
    let parsed: FfprobeOutput = serde_json::from_str(json)
        .map_err(|e| Error::execution(format!("failed to parse ffprobe output: {e}")))?;

    parsed
        .format
        .duration
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|d| *d > 0.0)
        .ok_or_else(|| Error::execution("ffprobe reported no duration"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_format_duration() {
        let json = r#"{"format": {"filename": "in.mp4", "duration": "62.500000"}}"#;
        assert_eq!(parse_duration(json).unwrap(), 62.5);
    }

    #[test]
    fn missing_duration_is_an_error() {
        let json = r#"{"format": {"filename": "in.mp4"}}"#;
        assert!(parse_duration(json).is_err());
        assert!(parse_duration("not json").is_err());
    }
}
