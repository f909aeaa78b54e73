//! Error types for tokwav-rp
//!
//! Two layers:
//! - [`PipelineError`]: the decode/resample/write/persist taxonomy. Every
//!   failure aborts the whole request; nothing is retried.
//! - [`ApiError`]: HTTP mapping of the above plus request-level failures.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// Coarse classification of a [`PipelineError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MalformedInput,
    Decode,
    Resample,
    Write,
    Storage,
    Metadata,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::MalformedInput => "MALFORMED_INPUT",
            ErrorKind::Decode => "DECODE_ERROR",
            ErrorKind::Resample => "RESAMPLE_ERROR",
            ErrorKind::Write => "WRITE_ERROR",
            ErrorKind::Storage => "STORAGE_ERROR",
            ErrorKind::Metadata => "METADATA_ERROR",
        }
    }
}

/// Stage of the request in which a failure originated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Validating,
    Decoding,
    Resampling,
    Writing,
    Storing,
    Recording,
}

/// Pipeline and persistence failures
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Payload length not divisible by the codebook depth, or unsupported format tag
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// External decoder failed or returned an unexpected shape
    #[error("Decode failed at batch {batch}: {detail}")]
    Decode { batch: usize, detail: String },

    /// Resampling failed
    #[error("Resample failed{}: {detail}", batch_suffix(.batch))]
    Resample { batch: Option<usize>, detail: String },

    /// Container append or finalize failed
    #[error("Write failed{}: {detail}", batch_suffix(.batch))]
    Write { batch: Option<usize>, detail: String },

    /// Blob store failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Metadata store failure
    #[error("Metadata error: {0}")]
    Metadata(String),
}

fn batch_suffix(batch: &Option<usize>) -> String {
    match batch {
        Some(index) => format!(" at batch {}", index),
        None => String::new(),
    }
}

impl PipelineError {
    pub fn resample(detail: impl Into<String>) -> Self {
        PipelineError::Resample {
            batch: None,
            detail: detail.into(),
        }
    }

    pub fn write(detail: impl Into<String>) -> Self {
        PipelineError::Write {
            batch: None,
            detail: detail.into(),
        }
    }

    /// Attach a batch index to stage errors raised without one
    pub fn at_batch(self, index: usize) -> Self {
        match self {
            PipelineError::Resample { batch: None, detail } => PipelineError::Resample {
                batch: Some(index),
                detail,
            },
            PipelineError::Write { batch: None, detail } => PipelineError::Write {
                batch: Some(index),
                detail,
            },
            other => other,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::MalformedInput(_) => ErrorKind::MalformedInput,
            PipelineError::Decode { .. } => ErrorKind::Decode,
            PipelineError::Resample { .. } => ErrorKind::Resample,
            PipelineError::Write { .. } => ErrorKind::Write,
            PipelineError::Storage(_) => ErrorKind::Storage,
            PipelineError::Metadata(_) => ErrorKind::Metadata,
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::MalformedInput(_) => Stage::Validating,
            PipelineError::Decode { .. } => Stage::Decoding,
            PipelineError::Resample { .. } => Stage::Resampling,
            PipelineError::Write { .. } => Stage::Writing,
            PipelineError::Storage(_) => Stage::Storing,
            PipelineError::Metadata(_) => Stage::Recording,
        }
    }

    /// Batch index for per-batch failures
    pub fn batch_index(&self) -> Option<usize> {
        match self {
            PipelineError::Decode { batch, .. } => Some(*batch),
            PipelineError::Resample { batch, .. } | PipelineError::Write { batch, .. } => *batch,
            _ => None,
        }
    }
}

impl From<sqlx::Error> for PipelineError {
    fn from(err: sqlx::Error) -> Self {
        PipelineError::Metadata(err.to_string())
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Pipeline or persistence failure (status depends on kind)
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Pipeline(PipelineError::from(err))
    }
}

impl From<axum::extract::multipart::MultipartError> for ApiError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        ApiError::BadRequest(format!("Invalid multipart body: {}", err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut stage = None;
        let mut batch = None;

        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Pipeline(ref err) => {
                stage = Some(err.stage());
                batch = err.batch_index();
                let status = match err.kind() {
                    ErrorKind::MalformedInput => StatusCode::BAD_REQUEST,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.kind().as_str(), err.to_string())
            }
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
                "stage": stage,
                "batch": batch,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
