use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::multipart::MultipartError;
use finovia::{PipelineError, UploadError};
use serde_json::json;
use tracing::{error, warn};

/// A custom error type for the server application.
///
/// This enum encapsulates different kinds of errors that can occur within the server,
/// allowing them to be converted into appropriate HTTP responses.
pub enum AppError {
    /// Upload validation and storage errors.
    Upload(UploadError),
    /// Errors surfaced by the extraction pipeline.
    Pipeline(PipelineError),
    /// A malformed multipart body.
    Multipart(MultipartError),
    /// A request the client must fix.
    BadRequest(String),
    /// A body the framework refused to read, e.g. one over the size limit.
    Rejected { status: StatusCode, message: String },
    UnsupportedMediaType,
    /// Generic internal server errors.
    Internal(anyhow::Error),
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        AppError::Upload(err)
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        AppError::Pipeline(err)
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::Multipart(err)
    }
}

/// Conversion from `anyhow::Error` to `AppError`.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status_code, error_message) = match self {
            AppError::Upload(err) => match err {
                UploadError::MissingInput | UploadError::EmptyFilename => {
                    (StatusCode::BAD_REQUEST, err.to_string())
                }
                UploadError::Io { .. } => {
                    error!("UploadError: {:?}", err);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "An internal server error occurred.".to_string(),
                    )
                }
            },
            AppError::Pipeline(err) => {
                let PipelineError::Transcription { reason } = &err;
                warn!(%reason, "Voice request rejected");
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            AppError::Multipart(err) => {
                warn!("Multipart error: {}", err);
                let status = err.status();
                if status == StatusCode::PAYLOAD_TOO_LARGE {
                    (status, "File too large".to_string())
                } else {
                    (status, err.body_text())
                }
            }
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            AppError::Rejected { status, message } => {
                warn!(%status, "Request body rejected: {}", message);
                (status, message)
            }
            AppError::UnsupportedMediaType => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "Unsupported content type".to_string(),
            ),
            AppError::Internal(err) => {
                error!("Internal server error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred.".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status_code, body).into_response()
    }
}
