//! Integration tests against a real ffmpeg.
//!
//! Skipped when ffmpeg (or ffprobe, where needed) is not installed.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use convertible_ffmpeg::{
    CodecData, Destination, Error, FfmpegFactory, Progress, ScreenshotSpec, ToolCommand,
    ToolsConfig, TranscodeAdapter, TranscodeObserver, TranscodeOptions, TranscodeRequest,
};
use parking_lot::Mutex;
use tempfile::tempdir;

fn has_tool(name: &str) -> bool {
    which::which(name).is_ok()
}

async fn make_clip(dir: &Path) -> PathBuf {
    let clip = dir.join("clip.mkv");
    ToolCommand::new(PathBuf::from("ffmpeg"))
        .args([
            "-y",
            "-v",
            "error",
            "-f",
            "lavfi",
            "-i",
            "testsrc=duration=2:size=160x120:rate=10",
            "-f",
            "lavfi",
            "-i",
            "sine=frequency=440:duration=2",
            "-c:v",
            "mpeg4",
            "-c:a",
            "mp2",
            "-shortest",
        ])
        .arg(clip.to_string_lossy())
        .execute()
        .await
        .unwrap();
    clip
}

#[derive(Default)]
struct Recorder {
    starts: Mutex<Vec<String>>,
    codec_data: Mutex<Vec<CodecData>>,
    progress: Mutex<Vec<Progress>>,
    filenames: Mutex<Vec<String>>,
}

impl TranscodeObserver for Recorder {
    fn on_start(&self, command_line: &str) {
        self.starts.lock().push(command_line.to_string());
    }

    fn on_codec_data(&self, data: &CodecData) {
        self.codec_data.lock().push(data.clone());
    }

    fn on_progress(&self, progress: &Progress) {
        self.progress.lock().push(progress.clone());
    }

    fn on_filenames(&self, filenames: &[String]) {
        self.filenames.lock().extend(filenames.iter().cloned());
    }
}

/// Forwards events to a shared recorder so the test keeps a handle.
struct Shared(Arc<Recorder>);

impl TranscodeObserver for Shared {
    fn on_start(&self, command_line: &str) {
        self.0.on_start(command_line);
    }
    fn on_codec_data(&self, data: &CodecData) {
        self.0.on_codec_data(data);
    }
    fn on_progress(&self, progress: &Progress) {
        self.0.on_progress(progress);
    }
    fn on_filenames(&self, filenames: &[String]) {
        self.0.on_filenames(filenames);
    }
}

async fn run(adapter: &TranscodeAdapter, request: TranscodeRequest) -> convertible_ffmpeg::Result<()> {
    let (tx, rx) = tokio::sync::oneshot::channel();
    adapter.transcode(
        request,
        Some(Box::new(move |result| {
            let _ = tx.send(result);
        })),
    )?;
    rx.await.unwrap()
}

fn adapter_with(recorder: &Arc<Recorder>) -> TranscodeAdapter {
    let factory = FfmpegFactory::discover(&ToolsConfig::default()).unwrap();
    TranscodeAdapter::new(factory).with_observer(Shared(Arc::clone(recorder)))
}

#[tokio::test]
async fn transcodes_to_file_and_reports_events() {
    if !has_tool("ffmpeg") {
        eprintln!("ffmpeg not installed, skipping");
        return;
    }

    let dir = tempdir().unwrap();
    let clip = make_clip(dir.path()).await;
    let output = dir.path().join("out.avi");

    let recorder = Arc::new(Recorder::default());
    let adapter = adapter_with(&recorder);
    let request = TranscodeRequest::new(clip, output.as_path()).with_options(TranscodeOptions {
        video_codec: Some("mpeg4".into()),
        audio_codec: Some("mp2".into()),
        audio_channels: Some(1),
        width: Some(80),
        ..Default::default()
    });

    run(&adapter, request).await.unwrap();

    assert!(std::fs::metadata(&output).unwrap().len() > 0);
    assert_eq!(recorder.starts.lock().len(), 1);
    assert!(recorder.starts.lock()[0].contains("-c:v mpeg4"));

    let codec_data = recorder.codec_data.lock();
    assert_eq!(codec_data.len(), 1);
    assert_eq!(codec_data[0].video, "mpeg4");
    assert_eq!(codec_data[0].audio, "mp2");

    let progress = recorder.progress.lock();
    assert!(!progress.is_empty());
    assert!(progress.iter().all(|p| p.percent.map_or(true, |pct| pct <= 100.0)));
}

#[tokio::test]
async fn streams_into_a_file_sink() {
    if !has_tool("ffmpeg") {
        eprintln!("ffmpeg not installed, skipping");
        return;
    }

    let dir = tempdir().unwrap();
    let clip = make_clip(dir.path()).await;
    let output = dir.path().join("streamed.mkv");
    let file = tokio::fs::File::create(&output).await.unwrap();

    let recorder = Arc::new(Recorder::default());
    let adapter = adapter_with(&recorder);
    let request = TranscodeRequest {
        source: Some(clip),
        destination: Some(Destination::sink(file)),
        preset: None,
        options: TranscodeOptions {
            video_codec: Some("mpeg4".into()),
            audio_codec: Some("mp2".into()),
            output_format: Some("matroska".into()),
            ..Default::default()
        },
    };

    run(&adapter, request).await.unwrap();

    let bytes = std::fs::read(&output).unwrap();
    assert!(bytes.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]));
    assert!(recorder.starts.lock()[0].ends_with("-f matroska pipe:1"));
}

#[tokio::test]
async fn missing_source_is_delivered_through_callback() {
    if !has_tool("ffmpeg") {
        eprintln!("ffmpeg not installed, skipping");
        return;
    }

    let dir = tempdir().unwrap();
    let recorder = Arc::new(Recorder::default());
    let adapter = adapter_with(&recorder);
    let request = TranscodeRequest::new("/nonexistent/input.avi", dir.path().join("out.mkv"));

    let err = run(&adapter, request).await.unwrap_err();
    let Error::Execution { message } = err else {
        panic!("expected an execution error, got {err:?}");
    };
    assert!(message.starts_with("ffmpeg exited with code"), "{message}");
    assert!(message.contains("/nonexistent/input.avi"), "{message}");
}

#[tokio::test]
async fn percentage_screenshots_are_resolved_with_ffprobe() {
    if !has_tool("ffmpeg") || !has_tool("ffprobe") {
        eprintln!("ffmpeg/ffprobe not installed, skipping");
        return;
    }

    let dir = tempdir().unwrap();
    let clip = make_clip(dir.path()).await;
    let thumbs = dir.path().join("thumbs");
    std::fs::create_dir(&thumbs).unwrap();

    let recorder = Arc::new(Recorder::default());
    let adapter = adapter_with(&recorder);
    let request = TranscodeRequest::new(clip, dir.path().join("out.mkv")).with_options(
        TranscodeOptions {
            video_codec: Some("mpeg4".into()),
            audio_codec: Some("mp2".into()),
            screenshots: Some(ScreenshotSpec {
                count: Some(2),
                folder: Some(thumbs.clone()),
                size: Some("80x?".into()),
                ..Default::default()
            }),
            ..Default::default()
        },
    );

    run(&adapter, request).await.unwrap();

    let filenames = recorder.filenames.lock().clone();
    assert_eq!(filenames.len(), 2);
    for name in &filenames {
        assert!(Path::new(name).exists(), "{name} was not written");
    }
    assert!(thumbs.join("tn_1.png").exists());
    assert!(thumbs.join("tn_2.png").exists());
}
