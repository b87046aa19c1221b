//! # convertible-ffmpeg
//!
//! Transcoding strategy that drives `ffmpeg`.
//!
//! This crate provides:
//! - [`TranscodeAdapter`], the `"ffmpeg"` strategy: validates a
//!   [`TranscodeRequest`], maps its options onto a [`CommandBuilder`] and
//!   finalizes it to a file or an async sink
//! - [`FfmpegFactory`], the production builder backed by the `ffmpeg` binary,
//!   with built-in and configured presets, progress parsing and screenshots
//! - [`Convertible`], a small registry of named strategies
//!
//! ## Example
//!
//! ```no_run
//! use convertible_ffmpeg::{
//!     FfmpegFactory, ToolsConfig, TranscodeAdapter, TranscodeOptions, TranscodeRequest,
//! };
//!
//! # async fn example() -> convertible_ffmpeg::Result<()> {
//! let adapter = TranscodeAdapter::new(FfmpegFactory::discover(&ToolsConfig::default())?);
//!
//! let (tx, rx) = tokio::sync::oneshot::channel();
//! let request = TranscodeRequest::new("input.avi", "output.mp4").with_options(TranscodeOptions {
//!     video_codec: Some("libx264".into()),
//!     width: Some(1280),
//!     ..Default::default()
//! });
//! adapter.transcode(request, Some(Box::new(move |result| {
//!     let _ = tx.send(result);
//! })))?;
//!
//! rx.await.unwrap_or_else(|_| Err(convertible_ffmpeg::Error::execution("dropped")))?;
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod builder;
mod error;
pub mod ffmpeg;
pub mod observer;
pub mod probe;
pub mod process;
pub mod request;
pub mod strategy;
pub mod tools;

// Re-exports
pub use adapter::{CompletionCallback, TranscodeAdapter};
pub use builder::{CommandBuilder, CommandFactory};
pub use error::{Error, Result};
pub use ffmpeg::{FfmpegCommand, FfmpegFactory, Preset, PresetTable, BUILTIN_PRESETS};
pub use observer::{CodecData, LoggingObserver, Progress, TranscodeObserver};
pub use process::{ToolCommand, ToolOutput};
pub use request::{
    Bitrate, Destination, OutputSink, ScreenshotSpec, TranscodeOptions, TranscodeRequest,
};
pub use strategy::{Convertible, Strategy};
pub use tools::{check_tools, ToolInfo, ToolsConfig};
