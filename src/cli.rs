use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "convertible")]
#[command(author, version, about = "Transcode media files with ffmpeg")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Transcode a media file
    Transcode(TranscodeArgs),

    /// List available presets
    Presets,

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}

#[derive(Args)]
pub struct TranscodeArgs {
    /// Input file
    #[arg(required = true)]
    pub input: PathBuf,

    /// Output file, or "-" to stream to stdout (requires --format)
    #[arg(required = true)]
    pub output: String,

    /// Use a named preset; individual options are then ignored
    #[arg(short, long)]
    pub preset: Option<String>,

    /// Audio codec (e.g. aac, libmp3lame)
    #[arg(long)]
    pub audio_codec: Option<String>,

    /// Audio bitrate, in kbit/s or with a unit (128, 128k)
    #[arg(long)]
    pub audio_bitrate: Option<String>,

    /// Number of audio channels
    #[arg(long)]
    pub audio_channels: Option<u32>,

    /// Audio sample rate in Hz
    #[arg(long)]
    pub audio_frequency: Option<u32>,

    /// Video codec (e.g. libx264)
    #[arg(long)]
    pub video_codec: Option<String>,

    /// Video bitrate, in kbit/s or with a unit (1000, 2M)
    #[arg(long)]
    pub video_bitrate: Option<String>,

    /// Output frame rate
    #[arg(long)]
    pub fps: Option<f64>,

    /// Output width; the height follows the aspect ratio if not given
    #[arg(long)]
    pub width: Option<u32>,

    /// Output height; the width follows the aspect ratio if not given
    #[arg(long)]
    pub height: Option<u32>,

    /// Display aspect ratio (e.g. 16:9)
    #[arg(long)]
    pub aspect: Option<String>,

    /// Output container format (e.g. mp4, matroska)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Extract this many evenly spaced screenshots
    #[arg(long)]
    pub screenshots: Option<u32>,

    /// Screenshot position: seconds, HH:MM:SS or N% (repeatable)
    #[arg(long = "timemark")]
    pub timemarks: Vec<String>,

    /// Directory for screenshots
    #[arg(long)]
    pub screenshot_folder: Option<PathBuf>,

    /// Screenshot filename pattern (%i index, %s seconds, %b basename)
    #[arg(long)]
    pub screenshot_filename: Option<String>,

    /// Screenshot size (e.g. 320x?)
    #[arg(long)]
    pub screenshot_size: Option<String>,
}
