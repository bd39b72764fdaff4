use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::body::Bytes;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use csmp::{AnnotationResult, AnnotationSummary};
use serde::{Deserialize, Serialize};
use spectra::SpectrumFormat;
use std::sync::Arc;
use tracing::info;

/// Multipart field carrying the upload.
pub const FILE_FIELD: &str = "file";

/// Response body for `POST /annotate-spectrum`
#[derive(Debug, Serialize, Deserialize)]
pub struct AnnotateResponse {
    pub status: String,
    pub file_name: String,
    pub file_type: String,
    pub message: String,
    pub results: Vec<AnnotationResult>,
}

/// Annotate every spectrum in an uploaded MGF, MSP or JSON file.
///
/// Unsupported or unparseable uploads are rejected with 400. Anything that
/// parses gets 202 with one result per spectrum, even when the inference
/// service or the database is unavailable.
pub async fn annotate_spectrum(
    State(state): State<Arc<ServerState>>,
    mut multipart: Multipart,
) -> ServerResult<(StatusCode, Json<AnnotateResponse>)> {
    let (file_name, bytes) = read_upload(&mut multipart, state.config.max_body_size_mb).await?;
    let format = SpectrumFormat::from_file_name(&file_name)?;

    let parser = Arc::clone(&state.parser);
    let name = file_name.clone();
    let spectra = tokio::task::spawn_blocking(move || parser.parse(&name, &bytes)).await??;

    metrics::counter!("csmp_uploads_total", "format" => format.label()).increment(1);
    info!(
        file_name = %file_name,
        file_type = format.label(),
        spectra = spectra.len(),
        "upload parsed"
    );

    let results = state.orchestrator.annotate(&spectra).await;
    let summary = AnnotationSummary::from_results(&results);

    Ok((
        StatusCode::ACCEPTED,
        Json(AnnotateResponse {
            status: "processed".to_string(),
            file_name,
            file_type: format.label().to_string(),
            message: summary.message(),
            results,
        }),
    ))
}

async fn read_upload(multipart: &mut Multipart, max_mb: usize) -> ServerResult<(String, Bytes)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::multipart(e, max_mb))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ServerError::multipart(e, max_mb))?;
        return Ok((file_name, bytes));
    }
    Err(ServerError::BadRequest(format!(
        "multipart field '{FILE_FIELD}' is required"
    )))
}
