//! # Receipt Handler
//!
//! `POST /parse_receipt`: stores the uploaded image, runs OCR and structured
//! extraction, and returns the items with their total. OCR and LLM failures
//! are reported in `extraction`, not as HTTP errors.

use super::{read_file_part, AppError, AppState};
use axum::{extract::State, Json};
use axum_extra::extract::{multipart::MultipartRejection, Multipart};
use finovia::{ExtractionRequest, ExtractionStatus, LineItem, SourceKind, UploadError};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Serialize, Deserialize, Debug)]
pub struct ReceiptResponse {
    /// Where the uploaded image was stored.
    pub image: String,
    pub raw_text: String,
    pub items: Vec<LineItem>,
    pub total: f64,
    pub extraction: ExtractionStatus,
}

pub async fn parse_receipt_handler(
    State(app_state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ReceiptResponse>, AppError> {
    let mut multipart = multipart.map_err(|rejection| {
        warn!("Receipt request is not multipart: {}", rejection);
        AppError::from(UploadError::MissingInput)
    })?;
    let upload = read_file_part(&mut multipart).await?;

    let image_path = app_state
        .upload_store
        .save(SourceKind::Receipt, &upload.file_name, &upload.bytes)
        .await?;

    let result = app_state
        .pipeline
        .run(ExtractionRequest::receipt(image_path.clone()))
        .await?;
    info!(
        image = %image_path.display(),
        items = result.items.len(),
        total = result.total,
        "Receipt parsed."
    );

    Ok(Json(ReceiptResponse {
        image: image_path.display().to_string(),
        raw_text: result.raw_text,
        items: result.items,
        total: result.total,
        extraction: result.extraction,
    }))
}
