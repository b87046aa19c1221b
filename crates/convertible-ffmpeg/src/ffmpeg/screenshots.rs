//! Screenshot planning: timemarks and output filenames.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::parser::parse_timestamp;
use crate::request::ScreenshotSpec;
use crate::{Error, Result};

const DEFAULT_FILENAME: &str = "tn.png";

/// Upper bound on `count`; each shot is an extra ffmpeg output.
pub const MAX_SCREENSHOTS: u32 = 1000;

/// A position in the input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Timemark {
    Seconds(f64),
    /// Percentage of the input duration.
    Percent(f64),
}

impl FromStr for Timemark {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = || Error::InvalidInput(format!("invalid timemark: {s:?}"));
        match s.strip_suffix('%') {
            Some(pct) => {
                let pct: f64 = pct.trim().parse().map_err(|_| invalid())?;
                if !(0.0..=100.0).contains(&pct) {
                    return Err(invalid());
                }
                Ok(Self::Percent(pct))
            }
            None => parse_timestamp(s).map(Self::Seconds).ok_or_else(invalid),
        }
    }
}

/// One frame to extract.
#[derive(Debug, Clone, PartialEq)]
pub struct Screenshot {
    pub seconds: f64,
    pub path: PathBuf,
}

/// Timemarks requested by `spec`: the explicit ones, or `count` evenly
/// spaced percentages.
pub fn timemarks(spec: &ScreenshotSpec) -> Result<Vec<Timemark>> {
    if !spec.timemarks.is_empty() {
        return spec.timemarks.iter().map(|t| t.parse()).collect();
    }
    let count = spec.count.unwrap_or(1);
    if count == 0 {
        return Err(Error::InvalidInput("screenshot count must be positive".into()));
    }
    if count > MAX_SCREENSHOTS {
        return Err(Error::InvalidInput(format!(
            "screenshot count {count} exceeds the limit of {MAX_SCREENSHOTS}"
        )));
    }
    let slots = f64::from(count) + 1.0;
    Ok((1..=count)
        .map(|i| Timemark::Percent(f64::from(i) * 100.0 / slots))
        .collect())
}

/// Whether resolving `marks` requires the input duration.
pub fn needs_duration(marks: &[Timemark]) -> bool {
    marks.iter().any(|m| matches!(m, Timemark::Percent(_)))
}

/// Turn timemarks into seconds and output paths.
pub fn plan(
    spec: &ScreenshotSpec,
    marks: &[Timemark],
    duration: Option<f64>,
    source: &Path,
) -> Result<Vec<Screenshot>> {
    let seconds = marks
        .iter()
        .map(|mark| match (mark, duration) {
            (Timemark::Seconds(s), _) => Ok(*s),
            (Timemark::Percent(p), Some(d)) => Ok(d * p / 100.0),
            (Timemark::Percent(_), None) => Err(Error::InvalidInput(
                "percentage timemarks need a known input duration".into(),
            )),
        })
        .collect::<Result<Vec<f64>>>()?;

    let pattern = spec.filename.as_deref().unwrap_or(DEFAULT_FILENAME);
    let basename = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let folder = spec.folder.clone().unwrap_or_default();

    Ok(filenames(pattern, &seconds, &basename)
        .into_iter()
        .zip(seconds)
        .map(|(name, seconds)| Screenshot {
            seconds,
            path: folder.join(name),
        })
        .collect())
}

/// Expand a filename pattern for each shot.
///
/// `%i` is the 1-based index, `%s` the position in seconds and `%b` the
/// source basename. Several shots without `%i`/`%s` get `_%i` before the
/// extension; a pattern without extension gets `.png`.
pub fn filenames(pattern: &str, seconds: &[f64], basename: &str) -> Vec<String> {
    let mut pattern = pattern.to_string();
    if Path::new(&pattern).extension().is_none() {
        pattern.push_str(".png");
    }
    if seconds.len() > 1 && !pattern.contains("%i") && !pattern.contains("%s") {
        let dot = pattern.rfind('.').unwrap_or(pattern.len());
        pattern.insert_str(dot, "_%i");
    }

    seconds
        .iter()
        .enumerate()
        .map(|(i, secs)| {
            pattern
                .replace("%i", &(i + 1).to_string())
                .replace("%s", &format_seconds(*secs))
                .replace("%b", basename)
        })
        .collect()
}

/// Seconds without trailing zeros (`12.5`, `10`).
pub fn format_seconds(secs: f64) -> String {
    let s = format!("{secs:.3}");
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}
