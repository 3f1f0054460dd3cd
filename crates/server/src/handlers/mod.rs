//! # API Route Handlers
//!
//! This module organizes all the Axum route handlers for the `finovia-server`.
//! The handlers are split into sub-modules by endpoint.

pub mod general;
pub mod receipt;
pub mod voice;

// Re-export all handlers from the sub-modules to make them easily accessible
// to the router under a single `handlers::` path.
pub use general::*;
pub use receipt::*;
pub use voice::*;

// Shared items used by multiple handler modules.
use super::{errors::AppError, state::AppState};
use axum_extra::extract::Multipart;
use finovia::UploadError;
use tracing::{info, warn};

/// The multipart part that carries the upload.
pub(crate) const FILE_FIELD: &str = "file";

/// An uploaded file read from a multipart body.
pub(crate) struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Reads the `file` part of a multipart body, ignoring any other part.
pub(crate) async fn read_file_part(multipart: &mut Multipart) -> Result<UploadedFile, AppError> {
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();
        if name != FILE_FIELD {
            warn!("Ignoring unknown multipart field: {}", name);
            continue;
        }

        let file_name = field.file_name().unwrap_or("").to_string();
        if file_name.trim().is_empty() {
            return Err(UploadError::EmptyFilename.into());
        }
        let bytes = field.bytes().await?.to_vec();
        info!(file_name = %file_name, bytes = bytes.len(), "Received upload.");
        return Ok(UploadedFile { file_name, bytes });
    }
    Err(UploadError::MissingInput.into())
}
