//! Lifecycle observers for a running transcode.

use serde::{Deserialize, Serialize};

use crate::Error;

/// Input stream details reported once the engine has opened the source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodecData {
    /// Container format of the input (e.g. `mov,mp4,m4a,3gp,3g2,mj2`).
    pub format: String,
    /// Input duration as printed by the engine (`HH:MM:SS.cc`).
    pub duration: String,
    /// Codec of the first audio stream, empty if none.
    pub audio: String,
    pub audio_details: Vec<String>,
    /// Codec of the first video stream, empty if none.
    pub video: String,
    pub video_details: Vec<String>,
}

/// A progress report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    /// Frames encoded so far.
    pub frames: u64,
    pub current_fps: f64,
    /// Current output bitrate in kbit/s.
    pub current_kbps: f64,
    /// Bytes written so far, in kilobytes.
    pub target_size: u64,
    /// Output position (`HH:MM:SS.micros`).
    pub timemark: String,
    /// Percentage done, when the input duration is known.
    pub percent: Option<f64>,
}

/// Receives lifecycle events of one transcode.
///
/// Every method defaults to a no-op so implementations only override what
/// they care about. Observers are shared with the task driving the engine,
/// hence `Send + Sync`.
pub trait TranscodeObserver: Send + Sync {
    /// The engine was spawned with this command line.
    fn on_start(&self, _command_line: &str) {}

    /// Input codecs were detected.
    fn on_codec_data(&self, _data: &CodecData) {}

    fn on_progress(&self, _progress: &Progress) {}

    /// Files about to be generated (screenshots).
    fn on_filenames(&self, _filenames: &[String]) {}

    /// The run failed. Terminal.
    fn on_error(&self, _error: &Error) {}

    /// The run succeeded. Terminal.
    fn on_end(&self) {}
}

/// Default observer: logs every event through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingObserver;

impl TranscodeObserver for LoggingObserver {
    fn on_start(&self, command_line: &str) {
        tracing::info!("Spawned ffmpeg with command: {command_line}");
    }

    fn on_codec_data(&self, data: &CodecData) {
        tracing::info!(
            "Input is {} audio with {} video",
            display_codec(&data.audio),
            display_codec(&data.video)
        );
    }

    fn on_progress(&self, progress: &Progress) {
        match progress.percent {
            Some(pct) => tracing::debug!("Processing: {pct:.1}% done"),
            None => tracing::debug!("Processing: {} frames done", progress.frames),
        }
    }

    fn on_filenames(&self, filenames: &[String]) {
        tracing::info!("Will generate {}", filenames.join(", "));
    }

    fn on_error(&self, error: &Error) {
        tracing::error!("Cannot process video: {error}");
    }

    fn on_end(&self) {
        tracing::info!("Transcoding succeeded");
    }
}

fn display_codec(codec: &str) -> &str {
    if codec.is_empty() {
        "no"
    } else {
        codec
    }
}
