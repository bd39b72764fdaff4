//! # CSMP Encoder
//!
//! Turns parsed spectra into L2-normalized embeddings by calling a remote
//! inference service (KServe v2 / Triton HTTP protocol).
//!
//! ```text
//! [Spectrum; n] -> chunks of `chunk_size` -> padded tensors -> infer (sequential)
//!               -> concatenate rows -> L2 normalize -> [SpectrumEmbedding; n]
//! ```
//!
//! The output tensor name is discovered once, when the encoder is built, from
//! the model metadata endpoint. If that lookup fails the encoder logs a warning
//! and falls back to `"output"`.
//!
//! Encoding is all-or-nothing: any failed chunk aborts the whole call.
//!
//! ```no_run
//! use encoder::{EncoderConfig, SpectrumEncoder};
//! use spectra::Spectrum;
//!
//! # async fn run() -> Result<(), encoder::EncoderError> {
//! let encoder = SpectrumEncoder::connect(EncoderConfig::default()).await?;
//! let spectra = vec![Spectrum::from_pairs("s1", Some(195.08), &[(110.07, 1000.0)])];
//! let embeddings = encoder.encode(&spectra).await?;
//! assert_eq!(embeddings[0].spectrum_id, "s1");
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod normalize;
pub mod tensor;
pub mod triton;

use std::borrow::Borrow;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub use crate::backend::{
    InferRequest, InferResponse, InferenceBackend, ModelMetadata, OutputTensor, TensorMetadata,
    DEFAULT_OUTPUT_NAME,
};
pub use crate::config::EncoderConfig;
pub use crate::error::EncoderError;
pub use crate::normalize::{l2_normalize_in_place, l2_normalize_rows};
pub use crate::tensor::{InferTensor, InputLayout, TensorData, TensorDataType, TensorSpec};
pub use crate::triton::TritonHttpBackend;

use spectra::Spectrum;

/// Unit-norm (or zero) embedding for one spectrum.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumEmbedding {
    pub spectrum_id: String,
    pub vector: Vec<f32>,
}

/// Batched client for the spectrum embedding model.
///
/// Cheap to share behind an `Arc`; holds no per-request state.
pub struct SpectrumEncoder {
    config: EncoderConfig,
    backend: Arc<dyn InferenceBackend>,
    output_name: String,
}

impl std::fmt::Debug for SpectrumEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectrumEncoder")
            .field("config", &self.config)
            .field("output_name", &self.output_name)
            .finish_non_exhaustive()
    }
}

impl SpectrumEncoder {
    /// Build an encoder backed by [`TritonHttpBackend`] at `config.url`.
    pub async fn connect(config: EncoderConfig) -> Result<Self, EncoderError> {
        config.validate()?;
        let backend = TritonHttpBackend::new(config.url.clone())?;
        Self::with_backend(config, Arc::new(backend)).await
    }

    /// Build an encoder over any backend. Validates the config and resolves
    /// the output tensor name.
    pub async fn with_backend(
        config: EncoderConfig,
        backend: Arc<dyn InferenceBackend>,
    ) -> Result<Self, EncoderError> {
        config.validate()?;
        let output_name = resolve_output_name(backend.as_ref(), &config).await;
        info!(
            model = %config.model_name,
            version = %config.model_version,
            output = %output_name,
            chunk_size = config.chunk_size,
            max_peaks = config.max_peaks,
            "spectrum encoder ready"
        );
        Ok(Self {
            config,
            backend,
            output_name,
        })
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    pub fn output_name(&self) -> &str {
        &self.output_name
    }

    /// Embed `spectra`, preserving input order.
    ///
    /// Chunks are sent one after another; the first failure aborts the call
    /// and no embeddings are returned. Empty input never touches the network.
    ///
    /// Accepts owned or borrowed spectra, so callers holding `&Spectrum`
    /// never copy peak lists just to encode them.
    pub async fn encode<S>(&self, spectra: &[S]) -> Result<Vec<SpectrumEmbedding>, EncoderError>
    where
        S: Borrow<Spectrum> + Sync,
    {
        if spectra.is_empty() {
            return Ok(Vec::new());
        }

        let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(spectra.len());
        for (chunk_index, chunk) in spectra.chunks(self.config.chunk_size).enumerate() {
            match self.encode_chunk(chunk).await {
                Ok(rows) => vectors.extend(rows),
                Err(err) => {
                    metrics::counter!("csmp_encoder_failures_total").increment(1);
                    warn!(chunk = chunk_index, size = chunk.len(), error = %err, "inference chunk failed");
                    return Err(err);
                }
            }
        }

        l2_normalize_rows(&mut vectors);

        Ok(spectra
            .iter()
            .zip(vectors)
            .map(|(spectrum, vector)| SpectrumEmbedding {
                spectrum_id: spectrum.borrow().spectrum_id.clone(),
                vector,
            })
            .collect())
    }

    async fn encode_chunk<S>(&self, chunk: &[S]) -> Result<Vec<Vec<f32>>, EncoderError>
    where
        S: Borrow<Spectrum> + Sync,
    {
        let batch = tensor::build_batch(chunk, self.config.max_peaks, &self.config.inputs);
        if batch.truncated > 0 {
            metrics::counter!("csmp_encoder_truncated_spectra_total")
                .increment(batch.truncated as u64);
            debug!(
                truncated = batch.truncated,
                max_peaks = self.config.max_peaks,
                "peak lists truncated to tensor width"
            );
        }

        let request = InferRequest {
            model_path: self.config.model_path(),
            inputs: batch.inputs,
            output_name: self.output_name.clone(),
            timeout: self.config.infer_timeout(),
        };
        metrics::counter!("csmp_encoder_requests_total").increment(1);
        let response = self.backend.infer(&request).await?;
        response.rows(&self.output_name, batch.batch_size)
    }
}

async fn resolve_output_name(backend: &dyn InferenceBackend, config: &EncoderConfig) -> String {
    match backend
        .model_metadata(&config.model_path(), config.infer_timeout())
        .await
    {
        Ok(metadata) => match metadata.first_output() {
            Some(name) => name.to_string(),
            None => {
                warn!(
                    model = %config.model_name,
                    "model metadata declares no outputs, using '{DEFAULT_OUTPUT_NAME}'"
                );
                DEFAULT_OUTPUT_NAME.to_string()
            }
        },
        Err(err) => {
            warn!(
                model = %config.model_name,
                error = %err,
                "could not read model metadata, using '{DEFAULT_OUTPUT_NAME}'"
            );
            DEFAULT_OUTPUT_NAME.to_string()
        }
    }
}
