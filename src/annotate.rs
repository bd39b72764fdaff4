//! Per-request annotation driver.
//!
//! ```text
//! spectra ──┬── no precursor ─────────────────────────────► NoPrecursor
//!           └── with precursor ── encode (one batch) ─┬─ err ► EncodingUnavailable (all)
//!                                                     └─ ok ── search (per spectrum)
//!                                                              ├─ err ► SearchUnavailable
//!                                                              └─ ok ─► Completed
//! ```
//!
//! The orchestrator never fails: every input spectrum yields exactly one
//! [`AnnotationResult`], in input order.

use encoder::SpectrumEncoder;
use futures::stream::{self, StreamExt};
use search::{CandidateSearch, MoleculeCandidate};
use serde::{Deserialize, Serialize};
use spectra::{Spectrum, MISSING_PRECURSOR_MESSAGE};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Terminal state of one spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationOutcome {
    NoPrecursor,
    EncodingUnavailable,
    SearchUnavailable,
    Completed,
}

impl AnnotationOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoPrecursor => "no_precursor",
            Self::EncodingUnavailable => "encoding_unavailable",
            Self::SearchUnavailable => "search_unavailable",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for AnnotationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result for one input spectrum.
///
/// `candidates` is `None` when search was never attempted and `Some(vec![])`
/// when it ran and found nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationResult {
    pub spectrum_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precursor_mz: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidates: Option<Vec<MoleculeCandidate>>,
    pub outcome: AnnotationOutcome,
    pub message: String,
}

impl AnnotationResult {
    fn new(spectrum: &Spectrum, outcome: AnnotationOutcome, message: String) -> Self {
        Self {
            spectrum_id: spectrum.spectrum_id.clone(),
            precursor_mz: spectrum.precursor_mz,
            candidates: None,
            outcome,
            message,
        }
    }

    fn completed(spectrum: &Spectrum, candidates: Vec<MoleculeCandidate>) -> Self {
        let message = if candidates.is_empty() {
            "Search completed: no candidates in configured mass window.".to_string()
        } else {
            format!("Search completed: {} candidate(s) found.", candidates.len())
        };
        Self {
            candidates: Some(candidates),
            ..Self::new(spectrum, AnnotationOutcome::Completed, message)
        }
    }
}

/// A long-lived service handle, or the reason it could not be built.
///
/// The server keeps running when the inference service or the database is
/// down at startup; affected spectra are reported as unavailable instead.
#[derive(Debug)]
pub enum Stage<T> {
    Ready(T),
    Failed(String),
}

impl<T> Stage<T> {
    pub fn from_result<E: fmt::Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Ready(value),
            Err(err) => Self::Failed(err.to_string()),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Initialization error, if any.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Ready(_) => None,
            Self::Failed(reason) => Some(reason),
        }
    }
}

/// Orchestrator knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationConfig {
    /// Searches in flight at once for one request.
    pub search_concurrency: usize,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            search_concurrency: 4,
        }
    }
}

/// Counts per outcome for one request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationSummary {
    pub total: usize,
    pub completed: usize,
    pub encoding_unavailable: usize,
    pub search_unavailable: usize,
    pub no_precursor: usize,
}

impl AnnotationSummary {
    pub fn from_results(results: &[AnnotationResult]) -> Self {
        let mut summary = Self {
            total: results.len(),
            ..Self::default()
        };
        for result in results {
            match result.outcome {
                AnnotationOutcome::Completed => summary.completed += 1,
                AnnotationOutcome::EncodingUnavailable => summary.encoding_unavailable += 1,
                AnnotationOutcome::SearchUnavailable => summary.search_unavailable += 1,
                AnnotationOutcome::NoPrecursor => summary.no_precursor += 1,
            }
        }
        summary
    }

    pub fn message(&self) -> String {
        format!(
            "Processed {} spectra: {} completed, {} encoding unavailable, {} search unavailable, {} missing precursor.",
            self.total,
            self.completed,
            self.encoding_unavailable,
            self.search_unavailable,
            self.no_precursor
        )
    }
}

/// Runs encoding and candidate search for one request's spectra.
///
/// Holds only shared, read-only handles; one instance serves every request.
pub struct AnnotationOrchestrator {
    encoder: Stage<Arc<SpectrumEncoder>>,
    search: Stage<Arc<CandidateSearch>>,
    config: AnnotationConfig,
}

impl AnnotationOrchestrator {
    pub fn new(
        encoder: Stage<Arc<SpectrumEncoder>>,
        search: Stage<Arc<CandidateSearch>>,
        config: AnnotationConfig,
    ) -> Self {
        Self {
            encoder,
            search,
            config,
        }
    }

    pub fn encoder(&self) -> &Stage<Arc<SpectrumEncoder>> {
        &self.encoder
    }

    pub fn search(&self) -> &Stage<Arc<CandidateSearch>> {
        &self.search
    }

    /// Annotate `spectra`. Always returns one result per spectrum, same order.
    pub async fn annotate(&self, spectra: &[Spectrum]) -> Vec<AnnotationResult> {
        let mut results: Vec<Option<AnnotationResult>> = vec![None; spectra.len()];
        let mut valid: Vec<(usize, &Spectrum)> = Vec::with_capacity(spectra.len());

        for (index, spectrum) in spectra.iter().enumerate() {
            if spectrum.has_precursor() {
                valid.push((index, spectrum));
            } else {
                let message = spectrum
                    .parsing_message
                    .clone()
                    .unwrap_or_else(|| MISSING_PRECURSOR_MESSAGE.to_string());
                results[index] = Some(AnnotationResult::new(
                    spectrum,
                    AnnotationOutcome::NoPrecursor,
                    message,
                ));
            }
        }

        if !valid.is_empty() {
            for (index, result) in self.annotate_valid(&valid).await {
                results[index] = Some(result);
            }
        }

        let results: Vec<AnnotationResult> = results.into_iter().flatten().collect();
        debug_assert_eq!(results.len(), spectra.len());

        let summary = AnnotationSummary::from_results(&results);
        record_outcomes(&results);
        info!(
            total = summary.total,
            completed = summary.completed,
            encoding_unavailable = summary.encoding_unavailable,
            search_unavailable = summary.search_unavailable,
            no_precursor = summary.no_precursor,
            "annotation finished"
        );
        results
    }

    async fn annotate_valid(&self, valid: &[(usize, &Spectrum)]) -> Vec<(usize, AnnotationResult)> {
        let encoder = match &self.encoder {
            Stage::Ready(encoder) => encoder,
            Stage::Failed(reason) => {
                return demote_all(valid, &format!("encoder not initialized: {reason}"));
            }
        };

        let batch: Vec<&Spectrum> = valid.iter().map(|&(_, spectrum)| spectrum).collect();
        let embeddings = match encoder.encode(&batch).await {
            Ok(embeddings) if embeddings.len() == batch.len() => embeddings,
            Ok(embeddings) => {
                let reason = format!(
                    "encoder returned {} embeddings for {} spectra",
                    embeddings.len(),
                    batch.len()
                );
                return demote_all(valid, &reason);
            }
            Err(err) => {
                warn!(spectra = batch.len(), error = %err, "batch encoding failed");
                return demote_all(valid, &err.to_string());
            }
        };

        let search = match &self.search {
            Stage::Ready(search) => search,
            Stage::Failed(reason) => {
                let message = format!(
                    "Candidate search unavailable: search backend not initialized: {reason}"
                );
                return valid
                    .iter()
                    .map(|&(index, spectrum)| {
                        (
                            index,
                            AnnotationResult::new(
                                spectrum,
                                AnnotationOutcome::SearchUnavailable,
                                message.clone(),
                            ),
                        )
                    })
                    .collect();
            }
        };

        // Embeddings line up with `valid` by position.
        let concurrency = self.config.search_concurrency.max(1);
        stream::iter(valid.iter().copied().zip(embeddings))
            .map(|((index, spectrum), embedding)| async move {
                let precursor = spectrum.precursor_mz.unwrap_or_default();
                let result = match search.search(precursor, &embedding.vector, None, None).await {
                    Ok(candidates) => AnnotationResult::completed(spectrum, candidates),
                    Err(err) => {
                        debug!(spectrum_id = %spectrum.spectrum_id, error = %err, "search failed");
                        AnnotationResult::new(
                            spectrum,
                            AnnotationOutcome::SearchUnavailable,
                            format!("Candidate search unavailable: {err}"),
                        )
                    }
                };
                (index, result)
            })
            .boxed()
            .buffered(concurrency)
            .collect()
            .await
    }
}

fn demote_all(valid: &[(usize, &Spectrum)], reason: &str) -> Vec<(usize, AnnotationResult)> {
    let message =
        format!("Spectrum encoding unavailable: {reason}. Candidate search was not attempted.");
    valid
        .iter()
        .map(|&(index, spectrum)| {
            (
                index,
                AnnotationResult::new(
                    spectrum,
                    AnnotationOutcome::EncodingUnavailable,
                    message.clone(),
                ),
            )
        })
        .collect()
}

fn record_outcomes(results: &[AnnotationResult]) {
    for result in results {
        metrics::counter!("csmp_annotation_outcomes_total", "outcome" => result.outcome.as_str())
            .increment(1);
    }
}
