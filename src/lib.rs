//! Workspace umbrella crate for the CSMP spectrum annotation pipeline.
//!
//! This crate stitches together spectrum parsing, embedding and candidate
//! search so callers can annotate an upload with a single entry point:
//!
//! ```text
//! bytes ─► spectra::parse_spectra ─► AnnotationOrchestrator::annotate ─► [AnnotationResult]
//!                                     ├─ encoder::SpectrumEncoder   (batched, remote inference)
//!                                     └─ search::CandidateSearch    (mass window + vector store)
//! ```
//!
//! Service handles are built once at startup with [`build_orchestrator`] and
//! shared across requests.

pub mod annotate;
pub mod config;

pub use encoder::{EncoderConfig, EncoderError, SpectrumEmbedding, SpectrumEncoder};
pub use search::{
    CandidateSearch, MoleculeCandidate, PostgresConfig, SearchConfig, SearchError, StoreConfig,
};
pub use spectra::{parse_spectra, ParseError, Peak, Spectrum, SpectrumFormat};

pub use crate::annotate::{
    AnnotationConfig, AnnotationOrchestrator, AnnotationOutcome, AnnotationResult,
    AnnotationSummary, Stage,
};
pub use crate::config::{ConfigLoadError, PipelineConfig};

use std::sync::Arc;
use tracing::{error, info};

/// Build the encoder and search handles described by `config`.
///
/// Never fails: a stage that cannot be built is kept as [`Stage::Failed`] and
/// its spectra are reported as unavailable until the process restarts.
pub async fn build_orchestrator(config: &PipelineConfig) -> AnnotationOrchestrator {
    let encoder = Stage::from_result(
        SpectrumEncoder::connect(config.encoder.clone())
            .await
            .map(Arc::new),
    );
    if let Some(reason) = encoder.error() {
        error!(error = %reason, "spectrum encoder failed to initialize");
    }

    let search = Stage::from_result(CandidateSearch::from_config(config.search.clone()).map(Arc::new));
    match &search {
        Stage::Ready(search) => info!(store = search.store_name(), "candidate search ready"),
        Stage::Failed(reason) => error!(error = %reason, "candidate search failed to initialize"),
    }

    AnnotationOrchestrator::new(encoder, search, config.annotation.clone())
}
