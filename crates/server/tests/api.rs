//! HTTP-level tests for the annotation API.
//!
//! The router is driven in-process with `tower::ServiceExt::oneshot`; the
//! inference service and vector store are replaced by in-memory fakes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use csmp::{AnnotationConfig, AnnotationOrchestrator, Stage};
use encoder::{
    EncoderConfig, EncoderError, InferRequest, InferResponse, InferenceBackend, ModelMetadata,
    OutputTensor, SpectrumEncoder, TensorData,
};
use http_body_util::BodyExt;
use search::{CandidateSearch, InMemoryVectorStore, MoleculeRecord, SearchConfig};
use serde_json::Value;
use server::{build_router, ErrorResponse, ServerConfig, ServerState};
use tower::ServiceExt;

const BOUNDARY: &str = "csmp-test-boundary";

struct UnitEmbedding;

#[async_trait]
impl InferenceBackend for UnitEmbedding {
    async fn model_metadata(
        &self,
        _model_path: &str,
        _timeout: Duration,
    ) -> Result<ModelMetadata, EncoderError> {
        Err(EncoderError::Transport("no metadata".into()))
    }

    async fn infer(&self, request: &InferRequest) -> Result<InferResponse, EncoderError> {
        let rows = match &request.inputs[2].data {
            TensorData::Int64(counts) => counts.len(),
            other => panic!("unexpected num_peaks tensor {other:?}"),
        };
        let data = (0..rows).flat_map(|_| [1.0, 0.0]).collect();
        Ok(InferResponse {
            outputs: vec![OutputTensor::new(
                request.output_name.clone(),
                vec![rows, 2],
                data,
            )],
        })
    }
}

async fn healthy_router() -> Router {
    let encoder = SpectrumEncoder::with_backend(EncoderConfig::default(), Arc::new(UnitEmbedding))
        .await
        .unwrap();
    let store = InMemoryVectorStore::from_records(vec![
        MoleculeRecord::new("CCO", 300.0, vec![1.0, 0.0]),
        MoleculeRecord::new("CCN", 300.1, vec![0.0, 1.0]),
    ]);
    let search = CandidateSearch::new(SearchConfig::default(), Arc::new(store)).unwrap();
    router(AnnotationOrchestrator::new(
        Stage::Ready(Arc::new(encoder)),
        Stage::Ready(Arc::new(search)),
        AnnotationConfig::default(),
    ))
}

fn degraded_router() -> Router {
    router(AnnotationOrchestrator::new(
        Stage::Failed("inference service unreachable".into()),
        Stage::Failed("database unreachable".into()),
        AnnotationConfig::default(),
    ))
}

fn router(orchestrator: AnnotationOrchestrator) -> Router {
    let state = ServerState::new(ServerConfig::default(), orchestrator);
    build_router(Arc::new(state))
}

fn upload(field: &str, file_name: &str, content: &str) -> Request<Body> {
    let body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n\
         {content}\r\n\
         --{BOUNDARY}--\r\n"
    );
    Request::builder()
        .method("POST")
        .uri("/annotate-spectrum")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

const MGF: &str = "BEGIN IONS\n\
TITLE=ethanol\n\
PEPMASS=300.0\n\
45.0 100\n\
31.0 50\n\
END IONS\n\
BEGIN IONS\n\
TITLE=unknown\n\
50.0 10\n\
END IONS\n";

#[tokio::test]
async fn test_upload_is_annotated() {
    let (status, body) = send(healthy_router().await, upload("file", "run.mgf", MGF)).await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "processed");
    assert_eq!(body["file_name"], "run.mgf");
    assert_eq!(body["file_type"], "MGF");

    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);

    assert_eq!(results[0]["spectrum_id"], "ethanol");
    assert_eq!(results[0]["outcome"], "completed");
    let candidates = results[0]["candidates"].as_array().unwrap();
    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0]["smiles"], "CCO");
    assert_eq!(candidates[0]["similarity_score"], 100.0);
    assert_eq!(candidates[1]["smiles"], "CCN");
    assert_eq!(candidates[1]["similarity_score"], 0.0);

    assert_eq!(results[1]["spectrum_id"], "unknown");
    assert_eq!(results[1]["outcome"], "no_precursor");
    assert!(results[1]["candidates"].is_null());

    assert_eq!(
        body["message"],
        "Processed 2 spectra: 1 completed, 0 encoding unavailable, 0 search unavailable, 1 missing precursor."
    );
}

#[tokio::test]
async fn test_upload_degrades_when_backends_are_down() {
    let (status, body) = send(degraded_router(), upload("file", "run.mgf", MGF)).await;

    assert_eq!(status, StatusCode::ACCEPTED);
    let results = body["results"].as_array().unwrap();
    assert_eq!(results[0]["outcome"], "encoding_unavailable");
    assert!(results[0]["message"]
        .as_str()
        .unwrap()
        .contains("inference service unreachable"));
    assert_eq!(results[1]["outcome"], "no_precursor");
}

#[tokio::test]
async fn test_unsupported_extension_is_rejected() {
    let (status, body) = send(degraded_router(), upload("file", "run.mzXML", "<mzXML/>")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "UNSUPPORTED_FORMAT");
    assert_eq!(
        body["error"]["message"],
        spectra::SUPPORTED_FORMATS_MESSAGE
    );
}

#[tokio::test]
async fn test_empty_file_is_rejected() {
    let (status, body) = send(degraded_router(), upload("file", "run.mgf", "")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: ErrorResponse = serde_json::from_value(body).unwrap();
    assert_eq!(body.error.code, "PARSE_ERROR");
    assert_eq!(body.error.message, "Uploaded file is empty.");
}

#[tokio::test]
async fn test_malformed_json_is_rejected() {
    let (status, body) = send(degraded_router(), upload("file", "run.json", "{not json")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "PARSE_ERROR");
}

#[tokio::test]
async fn test_missing_file_field_is_rejected() {
    let (status, body) = send(degraded_router(), upload("attachment", "run.mgf", MGF)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_health_and_readiness() {
    let (status, body) = send(degraded_router(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(degraded_router(), get("/ready")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["components"]["encoder"]["status"], "unavailable");
    assert_eq!(
        body["components"]["search"]["error"],
        "database unreachable"
    );

    let (status, body) = send(healthy_router().await, get("/ready")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_api_info_lists_formats() {
    let (status, body) = send(degraded_router(), get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "CSMP Server");
    assert_eq!(body["upload_field"], "file");
    let formats: Vec<&str> = body["supported_formats"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert_eq!(formats, ["mzML", "MGF", "MSP", "JSON"]);
}

#[tokio::test]
async fn test_unknown_route_and_disabled_metrics() {
    let (status, body) = send(degraded_router(), get("/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, _) = send(degraded_router(), get("/metrics")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_responses_carry_request_id() {
    let response = degraded_router().oneshot(get("/health")).await.unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}
