#![allow(dead_code)]

use async_trait::async_trait;
use encoder::{
    EncoderConfig, EncoderError, InferRequest, InferResponse, InferenceBackend, ModelMetadata,
    OutputTensor, SpectrumEncoder, TensorData,
};
use search::{
    CandidateSearch, InMemoryVectorStore, MassWindow, MoleculeRecord, SearchConfig, SearchError,
    StoreRow, VectorStore,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Inference fake: each spectrum embeds to `[1, 0]`, or fails every call.
#[derive(Default)]
pub struct FakeInference {
    pub fail: bool,
    pub calls: AtomicUsize,
}

#[async_trait]
impl InferenceBackend for FakeInference {
    async fn model_metadata(
        &self,
        _model_path: &str,
        _timeout: Duration,
    ) -> Result<ModelMetadata, EncoderError> {
        Err(EncoderError::Transport("metadata endpoint disabled".into()))
    }

    async fn infer(&self, request: &InferRequest) -> Result<InferResponse, EncoderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(EncoderError::Transport("inference service unreachable".into()));
        }
        let rows = match &request.inputs[2].data {
            TensorData::Int64(counts) => counts.len(),
            other => panic!("unexpected num_peaks tensor {other:?}"),
        };
        let data = (0..rows).flat_map(|_| [1.0, 0.0]).collect();
        Ok(InferResponse {
            outputs: vec![OutputTensor::new(request.output_name.clone(), vec![rows, 2], data)],
        })
    }
}

/// Store that fails for any window containing `poisoned_mass` and otherwise
/// delegates to an in-memory store.
pub struct FlakyStore {
    pub poisoned_mass: f64,
    pub inner: InMemoryVectorStore,
    pub calls: AtomicUsize,
}

#[async_trait]
impl VectorStore for FlakyStore {
    async fn nearest(
        &self,
        window: MassWindow,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<StoreRow>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if window.contains(self.poisoned_mass) {
            return Err(SearchError::unavailable("connection reset by peer"));
        }
        self.inner.nearest(window, embedding, limit).await
    }

    fn name(&self) -> &'static str {
        "flaky"
    }
}

pub async fn encoder(backend: Arc<FakeInference>, chunk_size: usize) -> Arc<SpectrumEncoder> {
    let config = EncoderConfig {
        chunk_size,
        max_peaks: 8,
        ..Default::default()
    };
    Arc::new(SpectrumEncoder::with_backend(config, backend).await.unwrap())
}

pub fn search(store: Arc<dyn VectorStore>) -> Arc<CandidateSearch> {
    Arc::new(CandidateSearch::new(SearchConfig::default(), store).unwrap())
}

pub fn molecules() -> InMemoryVectorStore {
    InMemoryVectorStore::from_records(vec![
        MoleculeRecord::new("CCO", 300.0, vec![1.0, 0.0]),
        MoleculeRecord::new("CCN", 300.1, vec![0.0, 1.0]),
        MoleculeRecord::new("c1ccccc1", 78.05, vec![1.0, 0.0]),
    ])
}
