//! The ffmpeg transcoding strategy.
//!
//! [`TranscodeAdapter`] validates a [`TranscodeRequest`], maps its options
//! onto a [`CommandBuilder`], registers observers and finalizes the command.
//! Validation failures are returned synchronously; the outcome of the run is
//! delivered later through the completion callback.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::builder::{CommandBuilder, CommandFactory};
use crate::observer::{LoggingObserver, TranscodeObserver};
use crate::request::{Destination, TranscodeOptions, TranscodeRequest};
use crate::strategy::Strategy;
use crate::{Error, Result};

/// Invoked once with the outcome of a run.
pub type CompletionCallback = Box<dyn FnOnce(Result<()>) + Send>;

/// Strategy that drives an ffmpeg-style command builder.
///
/// # Example
///
/// ```no_run
/// use convertible_ffmpeg::{FfmpegFactory, TranscodeAdapter, TranscodeRequest};
///
/// # fn example() -> convertible_ffmpeg::Result<()> {
/// let adapter = TranscodeAdapter::new(FfmpegFactory::discover(&Default::default())?);
/// adapter.transcode(
///     TranscodeRequest::new("input.avi", "output.mp4").with_preset("podcast"),
///     Some(Box::new(|result| println!("done: {result:?}"))),
/// )?;
/// # Ok(())
/// # }
/// ```
pub struct TranscodeAdapter {
    factory: Arc<dyn CommandFactory>,
    observer: Arc<dyn TranscodeObserver>,
}

impl TranscodeAdapter {
    /// Strategy name under which the adapter registers.
    pub const NAME: &'static str = "ffmpeg";

    /// Create an adapter that logs lifecycle events through `tracing`.
    pub fn new(factory: impl CommandFactory + 'static) -> Self {
        Self {
            factory: Arc::new(factory),
            observer: Arc::new(LoggingObserver),
        }
    }

    /// Replace the default logging observer.
    pub fn with_observer(mut self, observer: impl TranscodeObserver + 'static) -> Self {
        self.observer = Arc::new(observer);
        self
    }

    /// Validate `request`, configure a fresh command, and start it.
    ///
    /// Returns as soon as the command has been started. `on_complete`, if
    /// given, later receives `Ok(())` on success or the engine's
    /// [`Error::Execution`].
    ///
    /// # Errors
    ///
    /// - [`Error::MissingInput`] without a source.
    /// - [`Error::MissingOutput`] without a destination.
    /// - [`Error::MissingFormat`] for a sink destination without an output format.
    /// - [`Error::UnknownPreset`] if the builder rejects the preset.
    pub fn transcode(
        &self,
        request: TranscodeRequest,
        on_complete: Option<CompletionCallback>,
    ) -> Result<()> {
        request.validate()?;
        let TranscodeRequest {
            source,
            destination,
            preset,
            options,
        } = request;
        let source = source.ok_or(Error::MissingInput)?;
        let destination = destination.ok_or(Error::MissingOutput)?;

        tracing::debug!("transcode {:?} -> {:?}", source, destination);

        let mut command = self.factory.command(&source);
        match preset.as_deref() {
            Some(name) => command.preset(name)?,
            None => apply_options(command.as_mut(), &options),
        }

        command.on(Arc::clone(&self.observer));
        if let Some(callback) = on_complete {
            command.on(Arc::new(Completion::new(callback)));
        }

        match destination {
            Destination::Path(path) => command.save(&path),
            Destination::Sink(sink) => {
                command.output(sink);
                command.run();
            }
        }

        Ok(())
    }
}

impl Strategy for TranscodeAdapter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn transcode(
        &self,
        request: TranscodeRequest,
        on_complete: Option<CompletionCallback>,
    ) -> Result<()> {
        TranscodeAdapter::transcode(self, request, on_complete)
    }
}

/// Map individual options onto the builder, in a fixed order.
pub(crate) fn apply_options(command: &mut dyn CommandBuilder, options: &TranscodeOptions) {
    if let Some(codec) = &options.audio_codec {
        command.audio_codec(codec);
    }
    if let Some(bitrate) = &options.audio_bitrate {
        command.audio_bitrate(bitrate);
    }
    if let Some(channels) = options.audio_channels {
        command.audio_channels(channels);
    }
    if let Some(hz) = options.audio_frequency {
        command.audio_frequency(hz);
    }
    if let Some(codec) = &options.video_codec {
        command.video_codec(codec);
    }
    if let Some(bitrate) = &options.video_bitrate {
        command.video_bitrate(bitrate);
    }
    if let Some(fps) = options.frame_rate {
        command.fps(fps);
    }
    if let Some(size) = options.size_descriptor() {
        command.size(&size);
    }
    if let Some(spec) = &options.screenshots {
        command.screenshots(spec);
    }
    if let Some(aspect) = &options.aspect_ratio {
        command.aspect(aspect);
    }
    if let Some(format) = &options.output_format {
        command.format(format);
    }
}

/// Forwards the first terminal event to the completion callback.
struct Completion {
    callback: Mutex<Option<CompletionCallback>>,
}

impl Completion {
    fn new(callback: CompletionCallback) -> Self {
        Self {
            callback: Mutex::new(Some(callback)),
        }
    }

    fn complete(&self, result: Result<()>) {
        // Take before calling so the lock is not held inside user code.
        let callback = self.callback.lock().take();
        if let Some(callback) = callback {
            callback(result);
        }
    }
}

impl TranscodeObserver for Completion {
    fn on_error(&self, error: &Error) {
        self.complete(Err(error.clone()));
    }

    fn on_end(&self) {
        self.complete(Ok(()));
    }
}
