//! The production [`CommandBuilder`]: assembles an `ffmpeg` invocation and
//! runs it on the tokio runtime.

mod parser;
pub mod presets;
pub mod screenshots;

pub use parser::{StderrEvent, StderrParser};
pub use presets::{Preset, PresetTable, BUILTIN_PRESETS};
pub use screenshots::{Screenshot, Timemark};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::adapter::apply_options;
use crate::builder::{CommandBuilder, CommandFactory};
use crate::observer::TranscodeObserver;
use crate::probe::probe_duration;
use crate::process::ToolCommand;
use crate::request::{Bitrate, OutputSink, ScreenshotSpec};
use crate::tools::{get_tool_path, ToolsConfig};
use crate::{Error, Result};

/// Containers that need fragmenting to be written to a pipe.
const SEEKABLE_FORMATS: &[&str] = &["mp4", "mov", "m4v", "ipod", "3gp"];

/// Creates [`FfmpegCommand`]s sharing tool paths, timeout and presets.
#[derive(Debug, Clone)]
pub struct FfmpegFactory {
    ffmpeg: PathBuf,
    ffprobe: Option<PathBuf>,
    timeout: Option<Duration>,
    presets: Arc<PresetTable>,
}

impl FfmpegFactory {
    /// Use the given ffmpeg executable, with no ffprobe and no timeout.
    pub fn new(ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: None,
            timeout: None,
            presets: Arc::new(PresetTable::default()),
        }
    }

    /// Locate ffmpeg (required) and ffprobe (optional) per `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ToolNotFound`] if ffmpeg cannot be found.
    pub fn discover(config: &ToolsConfig) -> Result<Self> {
        let ffmpeg = get_tool_path("ffmpeg", config.ffmpeg_path.as_deref())?;
        let ffprobe = get_tool_path("ffprobe", config.ffprobe_path.as_deref()).ok();
        if ffprobe.is_none() {
            tracing::warn!("ffprobe not found; percentage screenshot timemarks are unavailable");
        }
        tracing::debug!("using ffmpeg at {:?}", ffmpeg);

        Ok(Self {
            ffmpeg,
            ffprobe,
            timeout: config.timeout(),
            presets: Arc::new(PresetTable::default()),
        })
    }

    pub fn with_ffprobe(mut self, ffprobe: impl Into<PathBuf>) -> Self {
        self.ffprobe = Some(ffprobe.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_presets(mut self, presets: PresetTable) -> Self {
        self.presets = Arc::new(presets);
        self
    }

    pub fn presets(&self) -> &PresetTable {
        &self.presets
    }
}

impl CommandFactory for FfmpegFactory {
    fn command(&self, source: &Path) -> Box<dyn CommandBuilder> {
        Box::new(FfmpegCommand::new(self, source))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct OutputSettings {
    audio_codec: Option<String>,
    audio_bitrate: Option<Bitrate>,
    audio_channels: Option<u32>,
    audio_frequency: Option<u32>,
    video_codec: Option<String>,
    video_bitrate: Option<Bitrate>,
    fps: Option<f64>,
    size: Option<String>,
    aspect: Option<String>,
    format: Option<String>,
    extra_args: Vec<String>,
}

enum OutputTarget {
    Path(PathBuf),
    Pipe,
}

/// One ffmpeg run being configured.
pub struct FfmpegCommand {
    ffmpeg: PathBuf,
    ffprobe: Option<PathBuf>,
    timeout: Option<Duration>,
    presets: Arc<PresetTable>,
    source: PathBuf,
    settings: OutputSettings,
    screenshots: Option<ScreenshotSpec>,
    sink: Option<OutputSink>,
    observers: Vec<Arc<dyn TranscodeObserver>>,
}

impl FfmpegCommand {
    fn new(factory: &FfmpegFactory, source: &Path) -> Self {
        Self {
            ffmpeg: factory.ffmpeg.clone(),
            ffprobe: factory.ffprobe.clone(),
            timeout: factory.timeout,
            presets: Arc::clone(&factory.presets),
            source: source.to_path_buf(),
            settings: OutputSettings::default(),
            screenshots: None,
            sink: None,
            observers: Vec::new(),
        }
    }

    fn emit(&self, f: impl Fn(&dyn TranscodeObserver)) {
        for observer in &self.observers {
            f(observer.as_ref());
        }
    }

    /// Full argument vector for this run.
    fn build_args(&self, target: &OutputTarget, shots: &[Screenshot]) -> Result<Vec<String>> {
        let mut args: Vec<String> = ["-y", "-nostdin", "-progress", "pipe:2", "-nostats", "-i"]
            .into_iter()
            .map(String::from)
            .collect();
        args.push(self.source.to_string_lossy().to_string());

        let s = &self.settings;
        let mut push = |flag: &str, value: String| {
            args.push(flag.to_string());
            args.push(value);
        };
        if let Some(codec) = &s.audio_codec {
            push("-c:a", codec.clone());
        }
        if let Some(bitrate) = &s.audio_bitrate {
            push("-b:a", bitrate.to_string());
        }
        if let Some(channels) = s.audio_channels {
            push("-ac", channels.to_string());
        }
        if let Some(hz) = s.audio_frequency {
            push("-ar", hz.to_string());
        }
        if let Some(codec) = &s.video_codec {
            push("-c:v", codec.clone());
        }
        if let Some(bitrate) = &s.video_bitrate {
            push("-b:v", bitrate.to_string());
        }
        if let Some(fps) = s.fps {
            push("-r", fps.to_string());
        }
        if let Some(size) = &s.size {
            push("-vf", scale_filter(size)?);
        }
        if let Some(aspect) = &s.aspect {
            push("-aspect", aspect.clone());
        }
        args.extend(s.extra_args.iter().cloned());

        if let Some(format) = &s.format {
            let piped = matches!(target, OutputTarget::Pipe);
            if piped
                && SEEKABLE_FORMATS.contains(&format.as_str())
                && !s.extra_args.iter().any(|a| a == "-movflags")
            {
                args.extend(["-movflags".to_string(), "frag_keyframe+empty_moov".to_string()]);
            }
            args.extend(["-f".to_string(), format.clone()]);
        }

        match target {
            OutputTarget::Path(path) => args.push(path.to_string_lossy().to_string()),
            OutputTarget::Pipe => args.push("pipe:1".to_string()),
        }

        let shot_scale = self
            .screenshots
            .as_ref()
            .and_then(|spec| spec.size.as_deref())
            .map(scale_filter)
            .transpose()?;
        for shot in shots {
            args.extend(
                ["-map", "0:v:0", "-ss"]
                    .into_iter()
                    .map(String::from)
                    .chain([format!("{:.3}", shot.seconds)])
                    .chain(
                        ["-frames:v", "1", "-update", "1"]
                            .into_iter()
                            .map(String::from),
                    ),
            );
            if let Some(scale) = &shot_scale {
                args.extend(["-vf".to_string(), scale.clone()]);
            }
            args.push(shot.path.to_string_lossy().to_string());
        }

        Ok(args)
    }

    fn start(self: Box<Self>, target: OutputTarget) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(self.execute(target));
            }
            Err(_) => {
                let err = Error::execution("no tokio runtime available to run ffmpeg");
                self.emit(|o| o.on_error(&err));
            }
        }
    }

    async fn execute(mut self: Box<Self>, target: OutputTarget) {
        match self.try_execute(target).await {
            Ok(()) => self.emit(|o| o.on_end()),
            Err(err) => self.emit(|o| o.on_error(&err)),
        }
    }

    async fn try_execute(&mut self, target: OutputTarget) -> Result<()> {
        let shots = plan_screenshots(
            self.screenshots.as_ref(),
            self.ffprobe.as_deref(),
            &self.source,
            self.timeout,
        )
        .await?;
        if !shots.is_empty() {
            let names: Vec<String> = shots
                .iter()
                .map(|s| s.path.to_string_lossy().to_string())
                .collect();
            self.emit(|o| o.on_filenames(&names));
        }

        let mut cmd = ToolCommand::new(self.ffmpeg.clone());
        cmd.args(self.build_args(&target, &shots)?);
        cmd.timeout(self.timeout);

        let command_line = cmd.command_line();
        self.emit(|o| o.on_start(&command_line));

        let sink = match target {
            OutputTarget::Pipe => self.sink.take(),
            OutputTarget::Path(_) => None,
        };

        let mut parser = StderrParser::new();
        let observers = &self.observers;
        let status = cmd
            .execute_streaming(sink, &mut |line: &str| {
                for event in parser.feed(line) {
                    for observer in observers {
                        match &event {
                            StderrEvent::CodecData(data) => observer.on_codec_data(data),
                            StderrEvent::Progress(progress) => observer.on_progress(progress),
                        }
                    }
                }
            })
            .await?;

        if status.success() {
            return Ok(());
        }
        let reason = match status.code() {
            Some(code) => format!("ffmpeg exited with code {code}"),
            None => "ffmpeg was killed by a signal".to_string(),
        };
        Err(Error::execution(format!("{reason}: {}", parser.tail())))
    }
}

impl CommandBuilder for FfmpegCommand {
    fn preset(&mut self, name: &str) -> Result<()> {
        let preset = self
            .presets
            .get(name)
            .ok_or_else(|| Error::UnknownPreset(name.to_string()))?;
        apply_options(self, &preset.options);
        self.settings.extra_args.extend(preset.extra_args);
        Ok(())
    }

    fn audio_codec(&mut self, codec: &str) {
        self.settings.audio_codec = Some(codec.to_string());
    }

    fn audio_bitrate(&mut self, bitrate: &Bitrate) {
        self.settings.audio_bitrate = Some(bitrate.clone());
    }

    fn audio_channels(&mut self, channels: u32) {
        self.settings.audio_channels = Some(channels);
    }

    fn audio_frequency(&mut self, hz: u32) {
        self.settings.audio_frequency = Some(hz);
    }

    fn video_codec(&mut self, codec: &str) {
        self.settings.video_codec = Some(codec.to_string());
    }

    fn video_bitrate(&mut self, bitrate: &Bitrate) {
        self.settings.video_bitrate = Some(bitrate.clone());
    }

    fn fps(&mut self, fps: f64) {
        self.settings.fps = Some(fps);
    }

    fn size(&mut self, descriptor: &str) {
        self.settings.size = Some(descriptor.to_string());
    }

    fn screenshots(&mut self, spec: &ScreenshotSpec) {
        self.screenshots = Some(spec.clone());
    }

    fn aspect(&mut self, aspect: &str) {
        self.settings.aspect = Some(aspect.to_string());
    }

    fn format(&mut self, format: &str) {
        self.settings.format = Some(format.to_string());
    }

    fn output(&mut self, sink: OutputSink) {
        self.sink = Some(sink);
    }

    fn on(&mut self, observer: Arc<dyn TranscodeObserver>) {
        self.observers.push(observer);
    }

    fn save(self: Box<Self>, path: &Path) {
        self.start(OutputTarget::Path(path.to_path_buf()));
    }

    fn run(self: Box<Self>) {
        let problem = if self.sink.is_none() {
            Some("no output specified")
        } else if self.settings.format.is_none() {
            // A pipe has no extension to infer the container from.
            Some("no output format set for streamed output")
        } else {
            None
        };
        if let Some(problem) = problem {
            let err = Error::InvalidInput(problem.into());
            self.emit(|o| o.on_error(&err));
            return;
        }
        self.start(OutputTarget::Pipe);
    }
}

/// Resolve screenshot positions, probing the duration only when a
/// percentage needs it.
async fn plan_screenshots(
    spec: Option<&ScreenshotSpec>,
    ffprobe: Option<&Path>,
    source: &Path,
    timeout: Option<Duration>,
) -> Result<Vec<Screenshot>> {
    let Some(spec) = spec else {
        return Ok(Vec::new());
    };
    let marks = screenshots::timemarks(spec)?;
    let duration = if screenshots::needs_duration(&marks) {
        let ffprobe = ffprobe.ok_or_else(|| Error::tool_not_found("ffprobe"))?;
        Some(probe_duration(ffprobe, source, timeout).await?)
    } else {
        None
    };
    screenshots::plan(spec, &marks, duration, source)
}

/// Translate a size descriptor (`WxH` with `?` wildcards, or `N%`) into a
/// scale filter. Wildcard sides keep the aspect ratio at an even size.
fn scale_filter(descriptor: &str) -> Result<String> {
    let invalid = || Error::InvalidInput(format!("invalid size: {descriptor:?}"));

    if let Some(pct) = descriptor.strip_suffix('%') {
        let pct: f64 = pct.trim().parse().map_err(|_| invalid())?;
        if pct <= 0.0 {
            return Err(invalid());
        }
        let factor = pct / 100.0;
        return Ok(format!(
            "scale=trunc(iw*{factor}/2)*2:trunc(ih*{factor}/2)*2"
        ));
    }

    let (w, h) = descriptor.split_once('x').ok_or_else(invalid)?;
    let dim = |d: &str| -> Result<Option<u32>> {
        match d.trim() {
            "?" => Ok(None),
            v => v
                .parse::<u32>()
                .ok()
                .filter(|v| *v > 0)
                .map(Some)
                .ok_or_else(invalid),
        }
    };

    match (dim(w)?, dim(h)?) {
        (Some(w), Some(h)) => Ok(format!("scale={w}:{h}")),
        (Some(w), None) => Ok(format!("scale={w}:-2")),
        (None, Some(h)) => Ok(format!("scale=-2:{h}")),
        (None, None) => Err(invalid()),
    }
}
