//! # Test Fakes
//!
//! Deterministic stand-ins for the external collaborators (LLM, OCR engine,
//! transcoder, speech recognizer) so test suites never touch the network or
//! external binaries.

use async_trait::async_trait;
use finovia::errors::{ExtractError, PromptError};
use finovia::extract::ocr::{BoundingBox, OcrEngine, OcrLine};
use finovia::extract::speech::SpeechRecognizer;
use finovia::extract::transcode::{normalized_path, AudioTranscoder};
use finovia::providers::ai::AiProvider;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

// --- Mock AI Provider ---

#[derive(Clone, Debug)]
pub struct MockAiProvider {
    responses: Arc<Mutex<HashMap<String, String>>>,
    calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockAiProvider {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Pre-programs a response for a specific prompt.
    /// The key should be a unique substring of the system prompt.
    pub fn add_response(&self, key: &str, response: &str) {
        let mut responses = self.responses.lock().unwrap();
        responses.insert(key.to_string(), response.to_string());
    }

    /// Retrieves the recorded calls for assertion.
    pub fn get_calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockAiProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AiProvider for MockAiProvider {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, PromptError> {
        let mut calls = self.calls.lock().unwrap();
        calls.push((system_prompt.to_string(), user_prompt.to_string()));

        let responses = self.responses.lock().unwrap();
        for (key, response) in responses.iter() {
            if system_prompt.contains(key) {
                return Ok(response.clone());
            }
        }

        Err(PromptError::AiApi(format!(
            "MockAiProvider: No response programmed for system prompt. Got: '{system_prompt}'"
        )))
    }
}

// --- Fake OCR Engine ---

#[derive(Clone, Debug)]
pub struct FakeOcrEngine {
    lines: Option<Vec<OcrLine>>,
}

impl FakeOcrEngine {
    /// Recognizes every image as `text`, one OCR line per text line.
    pub fn with_text(text: &str) -> Self {
        let lines = text
            .lines()
            .enumerate()
            .map(|(i, line)| OcrLine {
                bbox: BoundingBox {
                    left: 0,
                    top: (i as i32) * 20,
                    width: 200,
                    height: 20,
                },
                text: line.to_string(),
                confidence: 0.9,
            })
            .collect();
        Self { lines: Some(lines) }
    }

    /// Fails every call like a crashed OCR binary.
    pub fn failing() -> Self {
        Self { lines: None }
    }
}

#[async_trait]
impl OcrEngine for FakeOcrEngine {
    async fn read_text(&self, _image_path: &Path) -> Result<Vec<OcrLine>, ExtractError> {
        self.lines.clone().ok_or_else(|| ExtractError::CommandFailed {
            binary: "fake-ocr".to_string(),
            status: "exit status: 1".to_string(),
            stderr: "cannot read image".to_string(),
        })
    }
}

// --- Fake Transcoder ---

#[derive(Clone, Debug)]
pub struct FakeTranscoder {
    fail: bool,
    leave_partial: bool,
    calls: Arc<Mutex<Vec<PathBuf>>>,
}

impl FakeTranscoder {
    /// Returns the input path unchanged.
    pub fn passthrough() -> Self {
        Self {
            fail: false,
            leave_partial: false,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            leave_partial: false,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Fails after writing a truncated file at the normalized path, the way
    /// ffmpeg does when it dies mid-stream.
    pub fn failing_with_partial_output() -> Self {
        Self {
            fail: true,
            leave_partial: true,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn get_calls(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AudioTranscoder for FakeTranscoder {
    async fn normalize(&self, input: &Path) -> Result<PathBuf, ExtractError> {
        self.calls.lock().unwrap().push(input.to_path_buf());
        if self.leave_partial {
            let partial = normalized_path(input);
            tokio::fs::write(&partial, b"RIFF")
                .await
                .map_err(|source| ExtractError::Io {
                    path: partial,
                    source,
                })?;
        }
        if self.fail {
            return Err(ExtractError::CommandFailed {
                binary: "fake-ffmpeg".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "Invalid data found when processing input".to_string(),
            });
        }
        Ok(input.to_path_buf())
    }
}

// --- Fake Speech Recognizer ---

#[derive(Clone, Debug)]
enum Recognition {
    Transcript(String),
    Silence,
    Failure,
}

#[derive(Clone, Debug)]
pub struct FakeSpeechRecognizer {
    outcome: Recognition,
}

impl FakeSpeechRecognizer {
    pub fn with_transcript(text: &str) -> Self {
        Self {
            outcome: Recognition::Transcript(text.to_string()),
        }
    }

    /// Reports that no speech was detected.
    pub fn silent() -> Self {
        Self {
            outcome: Recognition::Silence,
        }
    }

    /// Fails like a rejected cloud request.
    pub fn failing() -> Self {
        Self {
            outcome: Recognition::Failure,
        }
    }
}

#[async_trait]
impl SpeechRecognizer for FakeSpeechRecognizer {
    async fn recognize(&self, _wav_path: &Path) -> Result<String, ExtractError> {
        match &self.outcome {
            Recognition::Transcript(text) => Ok(text.clone()),
            Recognition::Silence => Err(ExtractError::NoSpeech),
            Recognition::Failure => Err(ExtractError::SpeechApi(
                "429 Too Many Requests: quota exceeded".to_string(),
            )),
        }
    }
}
