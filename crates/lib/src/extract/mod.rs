//! # Text Extraction
//!
//! Produces raw text from an uploaded file. Images go through an `OcrEngine`;
//! audio is normalized by an `AudioTranscoder` and then transcribed by a
//! `SpeechRecognizer`. Text supplied directly by a caller never reaches this
//! module.

mod command;
pub mod ocr;
pub mod speech;
pub mod transcode;

use crate::errors::ExtractError;
use async_trait::async_trait;
use ocr::{OcrEngine, OcrLine};
use speech::SpeechRecognizer;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use transcode::AudioTranscoder;

/// Turns a saved upload into raw text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, path: &Path) -> Result<String, ExtractError>;
}

/// Joins OCR lines in engine order, one per line. Boxes and confidences are
/// dropped and nothing is filtered by confidence.
pub fn join_ocr_lines(lines: &[OcrLine]) -> String {
    lines
        .iter()
        .map(|line| line.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// The image variant.
#[derive(Debug, Clone)]
pub struct OcrTextExtractor {
    engine: Arc<dyn OcrEngine>,
}

impl OcrTextExtractor {
    pub fn new(engine: Arc<dyn OcrEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl TextExtractor for OcrTextExtractor {
    async fn extract(&self, path: &Path) -> Result<String, ExtractError> {
        let lines = self.engine.read_text(path).await?;
        info!(image = %path.display(), lines = lines.len(), "OCR finished");
        Ok(join_ocr_lines(&lines))
    }
}

/// The audio variant.
#[derive(Debug, Clone)]
pub struct AudioTextExtractor {
    transcoder: Arc<dyn AudioTranscoder>,
    recognizer: Arc<dyn SpeechRecognizer>,
}

impl AudioTextExtractor {
    pub fn new(transcoder: Arc<dyn AudioTranscoder>, recognizer: Arc<dyn SpeechRecognizer>) -> Self {
        Self {
            transcoder,
            recognizer,
        }
    }
}

#[async_trait]
impl TextExtractor for AudioTextExtractor {
    async fn extract(&self, path: &Path) -> Result<String, ExtractError> {
        let wav_path = match self.transcoder.normalize(path).await {
            Ok(wav_path) => wav_path,
            Err(e) => {
                // A failed run may still leave a partial output behind.
                remove_intermediate(path, &transcode::normalized_path(path)).await;
                return Err(e);
            }
        };
        let transcript = self.recognizer.recognize(&wav_path).await;
        remove_intermediate(path, &wav_path).await;

        let transcript = transcript?;
        info!(audio = %path.display(), chars = transcript.len(), "Transcription finished");
        Ok(transcript.trim().to_string())
    }
}

// The normalized copy is only an intermediate; the upload itself stays.
async fn remove_intermediate(upload: &Path, wav_path: &Path) {
    if wav_path == upload {
        return;
    }
    if let Err(e) = tokio::fs::remove_file(wav_path).await {
        debug!(path = %wav_path.display(), error = %e, "Could not remove normalized audio");
    }
}
