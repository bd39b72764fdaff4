use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::EncoderError;
use crate::tensor::InputLayout;

/// Connection and batching settings for [`SpectrumEncoder`](crate::SpectrumEncoder).
///
/// # Example
/// ```
/// use encoder::EncoderConfig;
///
/// let cfg = EncoderConfig {
///     url: "http://localhost:8000".into(),
///     chunk_size: 8,
///     ..Default::default()
/// };
/// assert!(cfg.validate().is_ok());
/// assert_eq!(cfg.max_peaks, 1024);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EncoderConfig {
    /// Base URL of the inference service (scheme, host and port).
    pub url: String,
    /// Model name registered with the inference service.
    pub model_name: String,
    /// Model version; empty selects the server's latest.
    pub model_version: String,
    /// Tensor width. Longer peak lists are truncated, shorter ones zero padded.
    pub max_peaks: usize,
    /// Spectra per inference call.
    pub chunk_size: usize,
    /// Per-call timeout in seconds, applied to metadata and inference requests.
    pub infer_timeout_secs: f64,
    /// Input tensor names and element types.
    pub inputs: InputLayout,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            url: "http://triton_service:8000".into(),
            model_name: "spectrum_encoder".into(),
            model_version: String::new(),
            max_peaks: 1024,
            chunk_size: 32,
            infer_timeout_secs: 30.0,
            inputs: InputLayout::default(),
        }
    }
}

impl EncoderConfig {
    pub fn infer_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.infer_timeout_secs).unwrap_or(Duration::MAX)
    }

    /// `models/{name}` or `models/{name}/versions/{version}`.
    pub fn model_path(&self) -> String {
        if self.model_version.is_empty() {
            format!("models/{}", self.model_name)
        } else {
            format!("models/{}/versions/{}", self.model_name, self.model_version)
        }
    }

    pub fn validate(&self) -> Result<(), EncoderError> {
        if self.chunk_size == 0 {
            return Err(EncoderError::InvalidConfig("chunk_size must be > 0".into()));
        }
        if self.max_peaks == 0 {
            return Err(EncoderError::InvalidConfig("max_peaks must be > 0".into()));
        }
        if self.model_name.trim().is_empty() {
            return Err(EncoderError::InvalidConfig(
                "model_name must not be empty".into(),
            ));
        }
        if !(self.infer_timeout_secs > 0.0
            && Duration::try_from_secs_f64(self.infer_timeout_secs).is_ok())
        {
            return Err(EncoderError::InvalidConfig(
                "infer_timeout_secs must be a positive, representable number of seconds".into(),
            ));
        }
        self.inputs.validate()
    }
}
