//! Inference protocol types and the backend seam.
//!
//! Messages follow the KServe v2 inference protocol, which Triton serves over
//! HTTP. [`InferenceBackend`] is the only thing [`SpectrumEncoder`](crate::SpectrumEncoder)
//! talks to, so tests can swap the HTTP client for an in-process fake.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::error::EncoderError;
use crate::tensor::InferTensor;

/// Output name used when model metadata is unavailable.
pub const DEFAULT_OUTPUT_NAME: &str = "output";

/// Subset of the model metadata response we rely on.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ModelMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub outputs: Vec<TensorMetadata>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TensorMetadata {
    pub name: String,
    #[serde(default)]
    pub datatype: String,
    #[serde(default)]
    pub shape: Vec<i64>,
}

impl ModelMetadata {
    /// Name of the first declared output, if any.
    pub fn first_output(&self) -> Option<&str> {
        self.outputs
            .first()
            .map(|output| output.name.as_str())
            .filter(|name| !name.is_empty())
    }
}

/// One inference call.
#[derive(Debug, Clone, PartialEq)]
pub struct InferRequest {
    /// `models/{name}[/versions/{version}]`
    pub model_path: String,
    pub inputs: Vec<InferTensor>,
    pub output_name: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InferResponse {
    #[serde(default)]
    pub outputs: Vec<OutputTensor>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OutputTensor {
    pub name: String,
    #[serde(default)]
    pub datatype: String,
    #[serde(default)]
    pub shape: Vec<usize>,
    #[serde(default)]
    pub data: Option<Vec<f64>>,
}

impl OutputTensor {
    pub fn new(name: impl Into<String>, shape: Vec<usize>, data: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            datatype: "FP32".into(),
            shape,
            data: Some(data),
        }
    }
}

impl InferResponse {
    /// Split the named `[batch, dim]` output into `batch` rows.
    pub fn rows(&self, output_name: &str, batch_size: usize) -> Result<Vec<Vec<f32>>, EncoderError> {
        let output = self
            .outputs
            .iter()
            .find(|output| output.name == output_name)
            .ok_or_else(|| {
                EncoderError::Protocol(format!("output '{output_name}' missing from response"))
            })?;

        let data = match output.data.as_deref() {
            Some(data) if !data.is_empty() => data,
            _ => return Err(EncoderError::EmptyOutput(output_name.to_string())),
        };

        let (rows, dim) = match output.shape.as_slice() {
            [rows, dim] => (*rows, *dim),
            shape => {
                return Err(EncoderError::Protocol(format!(
                    "output '{output_name}' has shape {shape:?}, expected [batch, dim]"
                )))
            }
        };
        if rows != batch_size {
            return Err(EncoderError::Protocol(format!(
                "output '{output_name}' has {rows} rows for a batch of {batch_size}"
            )));
        }
        if dim == 0 || rows * dim != data.len() {
            return Err(EncoderError::Protocol(format!(
                "output '{output_name}' holds {} values, shape says {rows}x{dim}",
                data.len()
            )));
        }

        Ok(data
            .chunks_exact(dim)
            .map(|row| row.iter().map(|&v| v as f32).collect())
            .collect())
    }
}

/// Remote inference service.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    async fn model_metadata(
        &self,
        model_path: &str,
        timeout: Duration,
    ) -> Result<ModelMetadata, EncoderError>;

    async fn infer(&self, request: &InferRequest) -> Result<InferResponse, EncoderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(shape: Vec<usize>, data: Vec<f64>) -> InferResponse {
        InferResponse {
            outputs: vec![OutputTensor::new("embedding", shape, data)],
        }
    }

    #[test]
    fn splits_row_major_output() {
        let rows = response(vec![2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
            .rows("embedding", 2)
            .unwrap();
        assert_eq!(rows, vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
    }

    #[test]
    fn rejects_missing_empty_and_mismatched_outputs() {
        let resp = response(vec![1, 2], vec![1.0, 2.0]);
        assert!(matches!(resp.rows("other", 1), Err(EncoderError::Protocol(_))));

        let resp = response(vec![1, 0], vec![]);
        assert_eq!(
            resp.rows("embedding", 1),
            Err(EncoderError::EmptyOutput("embedding".into()))
        );

        let resp = response(vec![1, 2], vec![1.0, 2.0]);
        assert!(matches!(resp.rows("embedding", 2), Err(EncoderError::Protocol(_))));

        let resp = response(vec![2, 2], vec![1.0, 2.0, 3.0]);
        assert!(matches!(resp.rows("embedding", 2), Err(EncoderError::Protocol(_))));

        let resp = response(vec![4], vec![1.0, 2.0, 3.0, 4.0]);
        assert!(matches!(resp.rows("embedding", 1), Err(EncoderError::Protocol(_))));
    }

    #[test]
    fn null_data_counts_as_empty() {
        let resp: InferResponse = serde_json::from_str(
            r#"{"outputs": [{"name": "embedding", "datatype": "FP32", "shape": [1, 4], "data": null}]}"#,
        )
        .unwrap();
        assert_eq!(
            resp.rows("embedding", 1),
            Err(EncoderError::EmptyOutput("embedding".into()))
        );
    }

    #[test]
    fn metadata_first_output() {
        let meta: ModelMetadata = serde_json::from_str(
            r#"{"name": "spectrum_encoder", "outputs": [{"name": "emb", "datatype": "FP32", "shape": [-1, 512]}, {"name": "aux"}]}"#,
        )
        .unwrap();
        assert_eq!(meta.first_output(), Some("emb"));
        assert_eq!(ModelMetadata::default().first_output(), None);
    }
}
