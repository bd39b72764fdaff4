//! Route handlers. `annotate` owns the upload endpoint, `health` the health checks
//! and the metrics scrape.

pub mod annotate;
pub mod health;

use crate::error::{ServerError, ServerResult};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use spectra::SpectrumFormat;

/// `GET /`: service identity and the upload formats it accepts.
pub async fn api_info() -> ServerResult<impl IntoResponse> {
    let formats: Vec<&str> = SpectrumFormat::ALL.iter().map(|f| f.label()).collect();
    Ok(Json(json!({
        "name": "CSMP Server",
        "version": env!("CARGO_PKG_VERSION"),
        "supported_formats": formats,
        "upload_field": annotate::FILE_FIELD,
        "endpoints": ["/annotate-spectrum", "/health", "/ready", "/metrics"],
    })))
}

/// Fallback for unknown paths.
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
