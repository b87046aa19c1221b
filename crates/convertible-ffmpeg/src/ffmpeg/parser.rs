//! Incremental parser for ffmpeg's stderr.
//!
//! ffmpeg runs with `-progress pipe:2 -nostats`, so stderr interleaves the
//! regular log (input description, warnings, errors) with `key=value`
//! progress blocks terminated by a `progress=continue|end` line.

use std::collections::VecDeque;

use crate::observer::{CodecData, Progress};

/// Non-progress lines kept for error messages.
const TAIL_LINES: usize = 20;

/// Something worth reporting to observers.
#[derive(Debug, Clone, PartialEq)]
pub enum StderrEvent {
    CodecData(CodecData),
    Progress(Progress),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    FirstInput,
    Done,
}

/// Line-by-line stderr parser.
#[derive(Debug)]
pub struct StderrParser {
    section: Section,
    codec: CodecData,
    duration_secs: Option<f64>,
    progress: Progress,
    out_time_us: Option<i64>,
    tail: VecDeque<String>,
}

impl Default for StderrParser {
    fn default() -> Self {
        Self::new()
    }
}

impl StderrParser {
    pub fn new() -> Self {
        Self {
            section: Section::Preamble,
            codec: CodecData::default(),
            duration_secs: None,
            progress: Progress::default(),
            out_time_us: None,
            tail: VecDeque::with_capacity(TAIL_LINES),
        }
    }

    /// The last log lines, oldest first.
    pub fn tail(&self) -> String {
        self.tail.iter().cloned().collect::<Vec<_>>().join("\n")
    }

    /// Feed one line; returns the events it completes.
    pub fn feed(&mut self, line: &str) -> Vec<StderrEvent> {
        let trimmed = line.trim();
        let mut events = Vec::new();

        if let Some((key, value)) = progress_pair(trimmed) {
            // Progress only starts once the inputs have been described.
            events.extend(self.finish_input());
            events.extend(self.progress_value(key, value));
            return events;
        }

        if trimmed.is_empty() {
            return events;
        }
        self.remember(trimmed);

        if let Some(rest) = line.strip_prefix("Input #") {
            if rest.starts_with("0,") {
                self.section = Section::FirstInput;
                self.codec.format = parse_input_format(rest);
            } else {
                events.extend(self.finish_input());
            }
        } else if line.starts_with("Output #")
            || line.starts_with("Stream mapping:")
            || line.starts_with("Press [q]")
        {
            events.extend(self.finish_input());
        } else if self.section == Section::FirstInput {
            self.input_line(trimmed);
        }

        events
    }

    fn remember(&mut self, line: &str) {
        if self.tail.len() == TAIL_LINES {
            self.tail.pop_front();
        }
        self.tail.push_back(line.to_string());
    }

    fn finish_input(&mut self) -> Option<StderrEvent> {
        if self.section != Section::FirstInput {
            return None;
        }
        self.section = Section::Done;
        Some(StderrEvent::CodecData(self.codec.clone()))
    }

    fn input_line(&mut self, line: &str) {
        if let Some(rest) = line.strip_prefix("Duration:") {
            let stamp = rest.split(',').next().unwrap_or("").trim();
            self.codec.duration = stamp.to_string();
            self.duration_secs = parse_timestamp(stamp);
        } else if line.starts_with("Stream #0:") {
            if let Some(desc) = stream_description(line, "Video") {
                if self.codec.video.is_empty() {
                    (self.codec.video, self.codec.video_details) = split_codec(desc);
                }
            } else if let Some(desc) = stream_description(line, "Audio") {
                if self.codec.audio.is_empty() {
                    (self.codec.audio, self.codec.audio_details) = split_codec(desc);
                }
            }
        }
    }

    fn progress_value(&mut self, key: &str, value: &str) -> Option<StderrEvent> {
        let value = value.trim();
        match key {
            "frame" => {
                self.progress.frames = value.parse().unwrap_or(self.progress.frames);
            }
            "fps" => {
                self.progress.current_fps = value.parse().unwrap_or(self.progress.current_fps);
            }
            "bitrate" => {
                if let Some(kbps) = value
                    .strip_suffix("kbits/s")
                    .and_then(|v| v.trim().parse().ok())
                {
                    self.progress.current_kbps = kbps;
                }
            }
            "total_size" => {
                if let Ok(bytes) = value.parse::<u64>() {
                    self.progress.target_size = bytes / 1024;
                }
            }
            // out_time_ms is microseconds as well.
            "out_time_us" | "out_time_ms" => {
                if let Ok(us) = value.parse::<i64>() {
                    self.out_time_us = Some(us);
                }
            }
            "out_time" => {
                self.progress.timemark = value.to_string();
            }
            "progress" => {
                self.progress.percent = match (self.out_time_us, self.duration_secs) {
                    (Some(us), Some(duration)) if duration > 0.0 => {
                        Some((us as f64 / 1_000_000.0 / duration * 100.0).clamp(0.0, 100.0))
                    }
                    _ => None,
                };
                return Some(StderrEvent::Progress(self.progress.clone()));
            }
            _ => {}
        }
        None
    }
}

const PROGRESS_KEYS: &[&str] = &[
    "frame",
    "fps",
    "bitrate",
    "total_size",
    "out_time_us",
    "out_time_ms",
    "out_time",
    "dup_frames",
    "drop_frames",
    "speed",
    "progress",
];

fn progress_pair(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    let known = PROGRESS_KEYS.contains(&key)
        || (key.starts_with("stream_") && key.ends_with("_q"));
    known.then_some((key, value))
}

/// `0, avi, from 'input.avi':` -> `avi`
fn parse_input_format(rest: &str) -> String {
    let after_index = rest.split_once(", ").map(|(_, r)| r).unwrap_or("");
    after_index
        .rsplit_once(", from ")
        .map(|(format, _)| format)
        .unwrap_or(after_index)
        .to_string()
}

/// The part after `Video: ` / `Audio: ` on a stream line.
fn stream_description<'a>(line: &'a str, kind: &str) -> Option<&'a str> {
    let marker = format!(": {kind}: ");
    line.find(&marker).map(|idx| &line[idx + marker.len()..])
}

/// `h264 (High), yuv420p, 1280x720` -> (`h264`, [`(High)`, `yuv420p`, `1280x720`])
fn split_codec(desc: &str) -> (String, Vec<String>) {
    let codec = desc
        .split(|c: char| c.is_whitespace() || c == ',')
        .next()
        .unwrap_or("")
        .to_string();
    let details = desc[codec.len()..]
        .split(", ")
        .map(|part| part.trim_start_matches(',').trim())
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect();
    (codec, details)
}

/// Parse `[[HH:]MM:]SS[.frac]` into seconds.
pub(crate) fn parse_timestamp(stamp: &str) -> Option<f64> {
    let mut secs = 0.0;
    for part in stamp.trim().split(':') {
        let value: f64 = part.parse().ok()?;
        if value < 0.0 {
            return None;
        }
        secs = secs * 60.0 + value;
    }
    Some(secs)
}
