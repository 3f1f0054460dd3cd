//! # Voice Handler
//!
//! `POST /parse_voice` accepts either an audio upload (`multipart/form-data`
//! with a `file` part) or a JSON body `{"text": "..."}`. The request's
//! `Content-Type` picks the path.

use super::{read_file_part, AppError, AppState};
use axum::{
    body::Bytes,
    extract::{FromRequest, Request, State},
    http::header::CONTENT_TYPE,
    Json,
};
use axum_extra::extract::Multipart;
use finovia::{ExtractionRequest, ExtractionResult, ExtractionStatus, LineItem, SourceKind, UploadError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

#[derive(Serialize, Deserialize, Debug)]
pub struct VoiceResponse {
    pub raw_text: String,
    pub items: Vec<LineItem>,
    pub estimated_total: f64,
    pub extraction: ExtractionStatus,
}

impl From<ExtractionResult> for VoiceResponse {
    fn from(result: ExtractionResult) -> Self {
        Self {
            raw_text: result.raw_text,
            items: result.items,
            estimated_total: result.total,
            extraction: result.extraction,
        }
    }
}

enum VoiceBody {
    Audio,
    Text,
}

fn classify(request: &Request) -> Option<VoiceBody> {
    let content_type = request.headers().get(CONTENT_TYPE)?.to_str().ok()?;
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    if mime == "multipart/form-data" {
        Some(VoiceBody::Audio)
    } else if mime == "application/json" || mime.ends_with("+json") {
        Some(VoiceBody::Text)
    } else {
        None
    }
}

pub async fn parse_voice_handler(
    State(app_state): State<AppState>,
    request: Request,
) -> Result<Json<VoiceResponse>, AppError> {
    let extraction_request = match classify(&request) {
        Some(VoiceBody::Audio) => {
            let mut multipart = Multipart::from_request(request, &app_state)
                .await
                .map_err(|rejection| {
                    warn!("Invalid multipart voice request: {}", rejection);
                    AppError::from(UploadError::MissingInput)
                })?;
            let upload = read_file_part(&mut multipart).await?;
            let audio_path = app_state
                .upload_store
                .save(SourceKind::Voice, &upload.file_name, &upload.bytes)
                .await?;
            ExtractionRequest::voice_audio(audio_path)
        }
        Some(VoiceBody::Text) => {
            let body = Bytes::from_request(request, &app_state)
                .await
                .map_err(|rejection| AppError::Rejected {
                    status: rejection.status(),
                    message: rejection.body_text(),
                })?;
            let text = text_field(&body)?;
            ExtractionRequest::voice_text(text)
        }
        None => return Err(AppError::UnsupportedMediaType),
    };
    let result = app_state.pipeline.run(extraction_request).await?;

    info!(
        items = result.items.len(),
        estimated_total = result.total,
        "Voice input parsed."
    );
    Ok(Json(result.into()))
}

/// Pulls a non-blank `text` string out of a JSON body.
fn text_field(body: &[u8]) -> Result<String, AppError> {
    let missing = || AppError::BadRequest("Missing 'text' field".to_string());
    let value: Value = serde_json::from_slice(body).map_err(|e| {
        warn!("Voice text body is not valid JSON: {}", e);
        missing()
    })?;
    match value.get("text").and_then(Value::as_str) {
        Some(text) if !text.trim().is_empty() => Ok(text.to_string()),
        _ => Err(missing()),
    }
}
