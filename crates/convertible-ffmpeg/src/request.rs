//! Transcode request types.
//!
//! A [`TranscodeRequest`] is a one-shot value object: it is built by the
//! caller, handed to a strategy, and consumed by that single call.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWrite;

use crate::{Error, Result};

/// A writable byte sink that receives the engine's output stream.
pub type OutputSink = Box<dyn AsyncWrite + Send + Unpin>;

/// Where the transcoded media goes.
pub enum Destination {
    /// Write to a file; the container is inferred from the extension unless
    /// an output format is given.
    Path(PathBuf),
    /// Stream into a writer. Requires an explicit output format.
    Sink(OutputSink),
}

impl Destination {
    /// Wrap any async writer as a sink destination.
    pub fn sink(writer: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        Self::Sink(Box::new(writer))
    }

    pub fn is_sink(&self) -> bool {
        matches!(self, Self::Sink(_))
    }
}

impl fmt::Debug for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Sink(_) => f.write_str("Sink(..)"),
        }
    }
}

impl From<PathBuf> for Destination {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for Destination {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<&str> for Destination {
    fn from(path: &str) -> Self {
        Self::Path(PathBuf::from(path))
    }
}

/// A bitrate as understood by ffmpeg.
///
/// Numbers are kilobits per second (`128` and `"128"` both become `"128k"`);
/// strings with a unit are passed through verbatim (`"1000k"`, `"2M"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BitrateRepr", into = "String")]
pub struct Bitrate(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum BitrateRepr {
    Kilobits(u32),
    Verbatim(String),
}

impl From<BitrateRepr> for Bitrate {
    fn from(repr: BitrateRepr) -> Self {
        match repr {
            BitrateRepr::Kilobits(k) => Self::from(k),
            BitrateRepr::Verbatim(s) => Self::from(s),
        }
    }
}

impl From<u32> for Bitrate {
    fn from(kilobits: u32) -> Self {
        Self(format!("{kilobits}k"))
    }
}

impl From<&str> for Bitrate {
    fn from(s: &str) -> Self {
        match s.trim().parse::<u32>() {
            Ok(kilobits) => Self::from(kilobits),
            Err(_) => Self(s.to_string()),
        }
    }
}

impl From<String> for Bitrate {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<Bitrate> for String {
    fn from(b: Bitrate) -> Self {
        b.0
    }
}

impl Bitrate {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Bitrate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Thumbnail extraction settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScreenshotSpec {
    /// Number of evenly spaced shots, used when `timemarks` is empty.
    pub count: Option<u32>,
    /// Explicit positions: seconds, `HH:MM:SS(.ms)`, or `N%`.
    pub timemarks: Vec<String>,
    /// Filename pattern (`%i` index, `%s` seconds, `%b` source basename).
    pub filename: Option<String>,
    /// Target directory; defaults to the working directory.
    pub folder: Option<PathBuf>,
    /// Size descriptor such as `320x?`.
    pub size: Option<String>,
}

/// Individual encoding options.
///
/// Every field is presence-based: `Some(0)` is applied like any other value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TranscodeOptions {
    pub audio_codec: Option<String>,
    pub audio_bitrate: Option<Bitrate>,
    pub audio_channels: Option<u32>,
    pub audio_frequency: Option<u32>,
    pub video_codec: Option<String>,
    pub video_bitrate: Option<Bitrate>,
    pub frame_rate: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub aspect_ratio: Option<String>,
    pub screenshots: Option<ScreenshotSpec>,
    pub output_format: Option<String>,
}

impl TranscodeOptions {
    /// Two-dimensional size descriptor (`WxH`), with `?` standing in for an
    /// unconstrained dimension. `None` when neither dimension is set.
    pub fn size_descriptor(&self) -> Option<String> {
        if self.width.is_none() && self.height.is_none() {
            return None;
        }
        let dim = |d: Option<u32>| d.map_or_else(|| "?".to_string(), |v| v.to_string());
        Some(format!("{}x{}", dim(self.width), dim(self.height)))
    }
}

/// A single transcoding job.
#[derive(Debug, Default)]
pub struct TranscodeRequest {
    pub source: Option<PathBuf>,
    pub destination: Option<Destination>,
    /// Named preset. When set, `options` is not applied at all, so a sink
    /// destination relies on the preset to name the container; the
    /// `output_format` that validation asks for is not forwarded.
    pub preset: Option<String>,
    pub options: TranscodeOptions,
}

impl TranscodeRequest {
    /// Create a request with a source and a destination.
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<Destination>) -> Self {
        Self {
            source: Some(source.into()),
            destination: Some(destination.into()),
            ..Self::default()
        }
    }

    /// Use a named preset instead of individual options.
    pub fn with_preset(mut self, preset: impl Into<String>) -> Self {
        self.preset = Some(preset.into());
        self
    }

    /// Replace the individual options.
    pub fn with_options(mut self, options: TranscodeOptions) -> Self {
        self.options = options;
        self
    }

    /// Check the fields every strategy needs, without touching any tool.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingInput`] without a source.
    /// - [`Error::MissingOutput`] without a destination.
    /// - [`Error::MissingFormat`] for a sink destination without an output format.
    pub fn validate(&self) -> Result<()> {
        if self.source.is_none() {
            return Err(Error::MissingInput);
        }
        match &self.destination {
            None => Err(Error::MissingOutput),
            Some(destination) if destination.is_sink() && self.options.output_format.is_none() => {
                Err(Error::MissingFormat)
            }
            Some(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_descriptor_with_both_dimensions() {
        let opts = TranscodeOptions {
            width: Some(1280),
            height: Some(720),
            ..Default::default()
        };
        assert_eq!(opts.size_descriptor().as_deref(), Some("1280x720"));
    }

    #[test]
    fn size_descriptor_wildcards_missing_dimension() {
        let width_only = TranscodeOptions {
            width: Some(1280),
            ..Default::default()
        };
        assert_eq!(width_only.size_descriptor().as_deref(), Some("1280x?"));

        let height_only = TranscodeOptions {
            height: Some(720),
            ..Default::default()
        };
        assert_eq!(height_only.size_descriptor().as_deref(), Some("?x720"));
    }

    #[test]
    fn size_descriptor_absent_without_dimensions() {
        assert_eq!(TranscodeOptions::default().size_descriptor(), None);
    }

    #[test]
    fn bitrate_from_number_is_kilobits() {
        assert_eq!(Bitrate::from(128).as_str(), "128k");
        assert_eq!(Bitrate::from("1000k").as_str(), "1000k");
    }

    #[test]
    fn bitrate_from_digit_string_is_kilobits() {
        assert_eq!(Bitrate::from("128").as_str(), "128k");
        assert_eq!(Bitrate::from(String::from("1000")).as_str(), "1000k");
        assert_eq!(Bitrate::from("2M").as_str(), "2M");
        assert_eq!(Bitrate::from("1.5M").as_str(), "1.5M");

        let opts: TranscodeOptions = serde_json::from_str(r#"{"audio_bitrate": "96"}"#).unwrap();
        assert_eq!(opts.audio_bitrate.unwrap().as_str(), "96k");
    }

    #[test]
    fn validate_checks_source_destination_and_sink_format() {
        assert_eq!(
            TranscodeRequest::default().validate(),
            Err(Error::MissingInput)
        );
        let no_destination = TranscodeRequest {
            source: Some("in.avi".into()),
            ..Default::default()
        };
        assert_eq!(no_destination.validate(), Err(Error::MissingOutput));

        let sink = TranscodeRequest::new("in.avi", Destination::sink(tokio::io::sink()));
        assert_eq!(sink.validate(), Err(Error::MissingFormat));

        let sink = sink.with_options(TranscodeOptions {
            output_format: Some("matroska".into()),
            ..Default::default()
        });
        assert_eq!(sink.validate(), Ok(()));
        assert_eq!(TranscodeRequest::new("in.avi", "out.mp4").validate(), Ok(()));
    }

    #[test]
    fn options_deserialize_mixed_bitrates() {
        let opts: TranscodeOptions = serde_json::from_str(
            r#"{"audio_bitrate": 96, "video_bitrate": "2M", "width": 640}"#,
        )
        .unwrap();
        assert_eq!(opts.audio_bitrate, Some(Bitrate::from("96k")));
        assert_eq!(opts.video_bitrate, Some(Bitrate::from("2M")));
        assert_eq!(opts.width, Some(640));
        assert!(opts.height.is_none());
    }

    #[test]
    fn options_reject_unknown_fields() {
        let result: std::result::Result<TranscodeOptions, _> =
            serde_json::from_str(r#"{"auduio_bitrate": 96}"#);
        assert!(result.is_err());
    }

    #[test]
    fn destination_debug_hides_sink() {
        let sink = Destination::sink(tokio::io::sink());
        assert!(sink.is_sink());
        assert_eq!(format!("{sink:?}"), "Sink(..)");
        let path = Destination::from("out.mp4");
        assert!(!path.is_sink());
    }
}
