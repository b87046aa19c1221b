//! Named settings bundles.
//!
//! Three presets are built in (`divx`, `flashvideo`, `podcast`); more can be
//! declared in configuration. Built-ins cannot be shadowed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::request::{Bitrate, TranscodeOptions};
use crate::{Error, Result};

/// Names of the built-in presets.
pub const BUILTIN_PRESETS: &[&str] = &["divx", "flashvideo", "podcast"];

/// A preset: options plus raw output arguments appended after them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Preset {
    pub description: Option<String>,
    pub options: TranscodeOptions,
    pub extra_args: Vec<String>,
}

/// Look up a built-in preset.
pub fn builtin(name: &str) -> Option<Preset> {
    let preset = match name {
        "divx" => Preset {
            description: Some("MPEG-4 Part 2 video and MP3 audio in AVI".into()),
            options: TranscodeOptions {
                audio_codec: Some("libmp3lame".into()),
                audio_bitrate: Some(Bitrate::from(128)),
                audio_channels: Some(2),
                video_codec: Some("mpeg4".into()),
                video_bitrate: Some(Bitrate::from(1024)),
                width: Some(720),
                output_format: Some("avi".into()),
                ..Default::default()
            },
            extra_args: vec!["-vtag".into(), "DIVX".into()],
        },
        "flashvideo" => Preset {
            description: Some("Sorenson Spark video and MP3 audio in FLV".into()),
            options: TranscodeOptions {
                audio_codec: Some("libmp3lame".into()),
                audio_bitrate: Some(Bitrate::from(96)),
                audio_channels: Some(1),
                audio_frequency: Some(22050),
                video_codec: Some("flv".into()),
                video_bitrate: Some(Bitrate::from(512)),
                width: Some(320),
                output_format: Some("flv".into()),
                ..Default::default()
            },
            extra_args: Vec::new(),
        },
        "podcast" => Preset {
            description: Some("Small H.264/AAC video for portable players".into()),
            options: TranscodeOptions {
                audio_codec: Some("aac".into()),
                audio_bitrate: Some(Bitrate::from(128)),
                audio_channels: Some(1),
                video_codec: Some("libx264".into()),
                video_bitrate: Some(Bitrate::from(512)),
                width: Some(320),
                height: Some(176),
                output_format: Some("m4v".into()),
                ..Default::default()
            },
            extra_args: vec!["-profile:v".into(), "baseline".into()],
        },
        _ => return None,
    };
    Some(preset)
}

/// Built-in presets plus configured ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PresetTable {
    custom: BTreeMap<String, Preset>,
}

impl PresetTable {
    /// Build a table from configured presets.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if a custom preset reuses a built-in
    /// name or declares a zero dimension.
    pub fn new(custom: BTreeMap<String, Preset>) -> Result<Self> {
        for (name, preset) in &custom {
            if BUILTIN_PRESETS.contains(&name.as_str()) {
                return Err(Error::InvalidInput(format!(
                    "preset {name:?} shadows a built-in preset"
                )));
            }
            if preset.options.width == Some(0) || preset.options.height == Some(0) {
                return Err(Error::InvalidInput(format!(
                    "preset {name:?} has a zero dimension"
                )));
            }
        }
        Ok(Self { custom })
    }

    pub fn get(&self, name: &str) -> Option<Preset> {
        builtin(name).or_else(|| self.custom.get(name).cloned())
    }

    /// All preset names with their descriptions, built-ins first.
    pub fn list(&self) -> Vec<(String, Option<String>)> {
        BUILTIN_PRESETS
            .iter()
            .filter_map(|name| builtin(name).map(|p| (name.to_string(), p.description)))
            .chain(
                self.custom
                    .iter()
                    .map(|(name, p)| (name.clone(), p.description.clone())),
            )
            .collect()
    }
}
