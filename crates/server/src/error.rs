//! HTTP error mapping.
//!
//! Every failure leaves the service as `{"error": {"code", "message"}}` with
//! a matching status. Only upload problems reject a request; backend outages
//! are reported per spectrum inside a 202 response instead.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use spectra::{ParseError, SUPPORTED_FORMATS_MESSAGE};

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Malformed multipart body or missing `file` field
    #[error("{0}")]
    BadRequest(String),

    #[error("Uploaded file exceeds the {0} MB limit.")]
    PayloadTooLarge(usize),

    /// Upload rejected by the spectrum parser
    #[error("{}", parse_message(.0))]
    Parse(#[from] ParseError),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("Not found")]
    NotFound,
}

fn parse_message(err: &ParseError) -> String {
    match err {
        ParseError::UnsupportedFormat(_) => SUPPORTED_FORMATS_MESSAGE.to_string(),
        other => other.to_string(),
    }
}

/// Body of every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Parse(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            Self::Parse(ParseError::UnsupportedFormat(_)) => "UNSUPPORTED_FORMAT",
            Self::Parse(_) => "PARSE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::NotFound => "NOT_FOUND",
        }
    }

    /// Map a multipart read failure, reporting `max_mb` when the body limit was hit.
    pub fn multipart(err: MultipartError, max_mb: usize) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge(max_mb)
        } else {
            Self::BadRequest(format!("Invalid multipart body: {}", err.body_text()))
        }
    }
}

impl From<tokio::task::JoinError> for ServerError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(format!("parser task failed: {err}"))
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "request failed");
        } else {
            tracing::debug!(code = self.code(), error = %self, "request rejected");
        }

        let body = ErrorResponse {
            error: ErrorDetail {
                code: self.code().to_string(),
                message: self.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}
