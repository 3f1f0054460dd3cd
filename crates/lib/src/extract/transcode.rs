//! # Audio Transcoding
//!
//! Normalizes arbitrary uploaded audio to mono 16 kHz PCM WAV before speech
//! recognition.

use super::command;
use crate::errors::ExtractError;
use async_trait::async_trait;
use std::ffi::OsStr;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const TARGET_SAMPLE_RATE: u32 = 16_000;

#[async_trait]
pub trait AudioTranscoder: Send + Sync + Debug {
    /// Writes a normalized copy of `input` and returns its path.
    async fn normalize(&self, input: &Path) -> Result<PathBuf, ExtractError>;
}

/// The sibling path the normalized audio is written to: the input's file name
/// with `.wav` appended (`clip.m4a` -> `clip.m4a.wav`).
pub fn normalized_path(input: &Path) -> PathBuf {
    let mut name = input
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "audio".into());
    name.push(".wav");
    input.with_file_name(name)
}

/// Drives the `ffmpeg` CLI.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    binary: String,
    timeout: Duration,
}

impl FfmpegTranscoder {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }
}

#[async_trait]
impl AudioTranscoder for FfmpegTranscoder {
    async fn normalize(&self, input: &Path) -> Result<PathBuf, ExtractError> {
        let output = normalized_path(input);
        let sample_rate = TARGET_SAMPLE_RATE.to_string();
        let args = [
            OsStr::new("-y"),
            OsStr::new("-hide_banner"),
            OsStr::new("-loglevel"),
            OsStr::new("error"),
            OsStr::new("-i"),
            input.as_os_str(),
            OsStr::new("-ac"),
            OsStr::new("1"),
            OsStr::new("-ar"),
            OsStr::new(&sample_rate),
            OsStr::new("-c:a"),
            OsStr::new("pcm_s16le"),
            output.as_os_str(),
        ];
        command::run(&self.binary, args, self.timeout).await?;
        Ok(output)
    }
}
