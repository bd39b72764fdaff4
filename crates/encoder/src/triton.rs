use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::backend::{InferRequest, InferResponse, InferenceBackend, ModelMetadata};
use crate::error::EncoderError;
use crate::tensor::TensorData;

/// [`InferenceBackend`] speaking the KServe v2 JSON protocol over HTTP.
#[derive(Debug, Clone)]
pub struct TritonHttpBackend {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct WireInput<'a> {
    name: &'a str,
    shape: &'a [usize],
    datatype: &'static str,
    data: &'a TensorData,
}

#[derive(Serialize)]
struct WireOutput<'a> {
    name: &'a str,
}

#[derive(Serialize)]
struct WireRequest<'a> {
    inputs: Vec<WireInput<'a>>,
    outputs: [WireOutput<'a>; 1],
}

impl<'a> From<&'a InferRequest> for WireRequest<'a> {
    fn from(request: &'a InferRequest) -> Self {
        Self {
            inputs: request
                .inputs
                .iter()
                .map(|input| WireInput {
                    name: &input.name,
                    shape: &input.shape,
                    datatype: input.datatype().wire_code(),
                    data: &input.data,
                })
                .collect(),
            outputs: [WireOutput {
                name: &request.output_name,
            }],
        }
    }
}

impl TritonHttpBackend {
    pub fn new(base_url: impl Into<String>) -> Result<Self, EncoderError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| EncoderError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, model_path: &str) -> String {
        format!("{}/v2/{}", self.base_url, model_path)
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, EncoderError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EncoderError::Transport(format!("HTTP error {status}: {body}")));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| EncoderError::Protocol(format!("invalid JSON response: {e}")))
    }
}

#[async_trait]
impl InferenceBackend for TritonHttpBackend {
    async fn model_metadata(
        &self,
        model_path: &str,
        timeout: Duration,
    ) -> Result<ModelMetadata, EncoderError> {
        let url = self.endpoint(model_path);
        debug!(%url, "fetching model metadata");
        let response = self
            .client
            .get(&url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| EncoderError::Transport(format!("metadata request failed: {e}")))?;
        Self::read_json(response).await
    }

    async fn infer(&self, request: &InferRequest) -> Result<InferResponse, EncoderError> {
        let url = format!("{}/infer", self.endpoint(&request.model_path));
        let response = self
            .client
            .post(&url)
            .timeout(request.timeout)
            .json(&WireRequest::from(request))
            .send()
            .await
            .map_err(|e| EncoderError::Transport(format!("infer request failed: {e}")))?;
        Self::read_json(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::{build_batch, InputLayout};
    use serde_json::json;
    use spectra::Spectrum;

    #[test]
    fn endpoint_joins_base_and_model_path() {
        let backend = TritonHttpBackend::new("http://triton:8000/").unwrap();
        assert_eq!(
            backend.endpoint("models/spectrum_encoder"),
            "http://triton:8000/v2/models/spectrum_encoder"
        );
    }

    #[test]
    fn wire_request_matches_protocol() {
        let spectra = vec![Spectrum::from_pairs("a", Some(10.0), &[(1.0, 2.0)])];
        let batch = build_batch(&spectra, 2, &InputLayout::default());
        let request = InferRequest {
            model_path: "models/m".into(),
            inputs: batch.inputs,
            output_name: "embedding".into(),
            timeout: Duration::from_secs(1),
        };

        let body = serde_json::to_value(WireRequest::from(&request)).unwrap();
        assert_eq!(
            body,
            json!({
                "inputs": [
                    {"name": "mzs", "shape": [1, 2], "datatype": "FP32", "data": [1.0, 0.0]},
                    {"name": "intens", "shape": [1, 2], "datatype": "FP32", "data": [2.0, 0.0]},
                    {"name": "num_peaks", "shape": [1, 1], "datatype": "INT64", "data": [1]}
                ],
                "outputs": [{"name": "embedding"}]
            })
        );
    }

    #[tokio::test]
    async fn unreachable_service_is_a_transport_error() {
        let backend = TritonHttpBackend::new("http://127.0.0.1:9").unwrap();
        let err = backend
            .model_metadata("models/m", Duration::from_millis(500))
            .await
            .unwrap_err();
        assert!(matches!(err, EncoderError::Transport(_)));
    }
}
