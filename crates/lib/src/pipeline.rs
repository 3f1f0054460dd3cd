//! # Extraction Pipeline
//!
//! Composes text extraction, structured extraction and the total calculator
//! for each kind of request. The pipeline holds only read-only collaborators
//! and can be shared across concurrent requests.

use crate::{
    errors::PipelineError,
    extract::TextExtractor,
    structured::StructuredExtractor,
    total::compute_total,
    types::{Extraction, ExtractionRequest, ExtractionResult, RawInput, SourceKind},
};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct Pipeline {
    image_extractor: Arc<dyn TextExtractor>,
    audio_extractor: Arc<dyn TextExtractor>,
    structured: Arc<dyn StructuredExtractor>,
}

impl Pipeline {
    pub fn new(
        image_extractor: Arc<dyn TextExtractor>,
        audio_extractor: Arc<dyn TextExtractor>,
        structured: Arc<dyn StructuredExtractor>,
    ) -> Self {
        Self {
            image_extractor,
            audio_extractor,
            structured,
        }
    }

    /// Runs one request through the pipeline matching its kind and input.
    pub async fn run(&self, request: ExtractionRequest) -> Result<ExtractionResult, PipelineError> {
        match (request.source_kind, request.raw_input) {
            (SourceKind::Receipt, RawInput::File(path)) => Ok(self.process_receipt(&path).await),
            (SourceKind::Receipt, RawInput::Text(text)) => {
                Ok(self.structure(text, SourceKind::Receipt, None).await)
            }
            (SourceKind::Voice, RawInput::File(path)) => self.process_voice_audio(&path).await,
            (SourceKind::Voice, RawInput::Text(text)) => Ok(self.process_voice_text(text).await),
        }
    }

    /// OCR, then structured extraction. An OCR failure is reported as a
    /// degraded extraction with empty raw text, never as an error.
    pub async fn process_receipt(&self, image_path: &Path) -> ExtractionResult {
        match self.image_extractor.extract(image_path).await {
            Ok(raw_text) => self.structure(raw_text, SourceKind::Receipt, None).await,
            Err(e) => {
                warn!(image = %image_path.display(), error = %e, "OCR failed; continuing with empty text");
                self.structure(
                    String::new(),
                    SourceKind::Receipt,
                    Some(Extraction::degraded(format!("text extraction failed: {e}"))),
                )
                .await
            }
        }
    }

    /// Transcription, then structured extraction. Empty text, whether from a
    /// transcoder crash, a recognizer error or silence, is an error here.
    pub async fn process_voice_audio(
        &self,
        audio_path: &Path,
    ) -> Result<ExtractionResult, PipelineError> {
        let raw_text = match self.audio_extractor.extract(audio_path).await {
            Ok(text) => text,
            Err(e) => {
                warn!(audio = %audio_path.display(), error = %e, "Transcription failed");
                return Err(PipelineError::Transcription {
                    reason: e.to_string(),
                });
            }
        };
        if raw_text.trim().is_empty() {
            warn!(audio = %audio_path.display(), "Transcription produced no text");
            return Err(PipelineError::Transcription {
                reason: "empty transcript".to_string(),
            });
        }
        Ok(self.structure(raw_text, SourceKind::Voice, None).await)
    }

    /// The caller's text is the raw text verbatim.
    pub async fn process_voice_text(&self, text: String) -> ExtractionResult {
        self.structure(text, SourceKind::Voice, None).await
    }

    async fn structure(
        &self,
        raw_text: String,
        kind: SourceKind,
        preset: Option<Extraction>,
    ) -> ExtractionResult {
        let extraction = match preset {
            Some(extraction) => extraction,
            None => self.structured.extract(&raw_text, kind).await,
        };
        let (items, extraction) = extraction.into_parts();
        let total = compute_total(&items);
        info!(%kind, items = items.len(), total, "Extraction result ready");
        ExtractionResult {
            raw_text,
            items,
            total,
            extraction,
        }
    }
}
