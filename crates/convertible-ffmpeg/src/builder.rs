//! The command-builder contract a strategy drives.
//!
//! A [`CommandFactory`] creates one [`CommandBuilder`] per transcode. The
//! builder accumulates configuration, collects observers, and is consumed by
//! exactly one finalize action: [`CommandBuilder::save`] for file output, or
//! [`CommandBuilder::output`] followed by [`CommandBuilder::run`] for a sink.
//! Finalize actions start the work in the background and return at once.

use std::path::Path;
use std::sync::Arc;

use crate::observer::TranscodeObserver;
use crate::request::{Bitrate, OutputSink, ScreenshotSpec};
use crate::Result;

/// A configurable, single-use transcoding command.
pub trait CommandBuilder: Send {
    /// Apply a named settings bundle.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnknownPreset`] if the name is not known.
    fn preset(&mut self, name: &str) -> Result<()>;

    fn audio_codec(&mut self, codec: &str);
    fn audio_bitrate(&mut self, bitrate: &Bitrate);
    fn audio_channels(&mut self, channels: u32);
    fn audio_frequency(&mut self, hz: u32);
    fn video_codec(&mut self, codec: &str);
    fn video_bitrate(&mut self, bitrate: &Bitrate);
    fn fps(&mut self, fps: f64);

    /// Set the output size from a `WxH` descriptor where either side may be `?`.
    fn size(&mut self, descriptor: &str);

    fn screenshots(&mut self, spec: &ScreenshotSpec);
    fn aspect(&mut self, aspect: &str);
    fn format(&mut self, format: &str);

    /// Bind the output to a writable sink. Finalize with [`CommandBuilder::run`].
    fn output(&mut self, sink: OutputSink);

    /// Register an observer. Observers are notified in registration order.
    fn on(&mut self, observer: Arc<dyn TranscodeObserver>);

    /// Write the output to `path` and start.
    fn save(self: Box<Self>, path: &Path);

    /// Start with the previously bound output.
    fn run(self: Box<Self>);
}

/// Creates a fresh [`CommandBuilder`] for a source.
pub trait CommandFactory: Send + Sync {
    fn command(&self, source: &Path) -> Box<dyn CommandBuilder>;
}
