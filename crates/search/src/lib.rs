//! # CSMP Search
//!
//! Candidate lookup for one spectrum: restrict stored molecules to a ppm
//! window around the precursor mass, rank by cosine distance to the spectrum
//! embedding and keep the `top_k` nearest.
//!
//! ```text
//! precursor_mass, embedding
//!   -> MassWindow::around(mass, ppm)
//!   -> VectorStore::nearest(window, embedding, top_k)
//!   -> score = round4(clamp(1 - distance, 0, 1) * 100)
//! ```
//!
//! ```
//! use search::{CandidateSearch, InMemoryVectorStore, MoleculeRecord, SearchConfig};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), search::SearchError> {
//! let store = InMemoryVectorStore::from_records(vec![
//!     MoleculeRecord::new("CCO", 46.0419, vec![1.0, 0.0]),
//! ]);
//! let search = CandidateSearch::new(SearchConfig::default(), Arc::new(store))?;
//! let hits = search.search(46.04, &[1.0, 0.0], None, None).await?;
//! assert_eq!(hits[0].similarity_score, 100.0);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod score;
pub mod store;
pub mod window;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

pub use crate::config::{PostgresConfig, SearchConfig, StoreConfig};
pub use crate::error::SearchError;
pub use crate::memory::{InMemoryVectorStore, MoleculeRecord};
#[cfg(feature = "postgres")]
pub use crate::postgres::PgVectorStore;
pub use crate::score::similarity_score;
pub use crate::store::{StoreRow, VectorStore};
pub use crate::window::MassWindow;

/// One ranked candidate molecule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoleculeCandidate {
    pub smiles: String,
    pub mass: f64,
    /// 0 to 100, 4 decimals.
    pub similarity_score: f64,
}

/// Mass-window bounded nearest-neighbour search.
pub struct CandidateSearch {
    config: SearchConfig,
    store: Arc<dyn VectorStore>,
}

impl std::fmt::Debug for CandidateSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandidateSearch")
            .field("store", &self.store.name())
            .field("ppm_tolerance", &self.config.ppm_tolerance)
            .field("top_k", &self.config.top_k)
            .finish()
    }
}

impl CandidateSearch {
    /// Build the store described by `config.store`.
    pub fn from_config(config: SearchConfig) -> Result<Self, SearchError> {
        config.validate()?;
        let store = config.store.build()?;
        Self::new(config, store)
    }

    pub fn new(config: SearchConfig, store: Arc<dyn VectorStore>) -> Result<Self, SearchError> {
        config.validate()?;
        Ok(Self { config, store })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn store_name(&self) -> &'static str {
        self.store.name()
    }

    /// Nearest candidates for one spectrum, best first.
    ///
    /// A non-positive `precursor_mass` yields an empty list without touching
    /// the store. Overrides replace the configured `ppm_tolerance` / `top_k`.
    pub async fn search(
        &self,
        precursor_mass: f64,
        embedding: &[f32],
        ppm_tolerance: Option<f64>,
        top_k: Option<usize>,
    ) -> Result<Vec<MoleculeCandidate>, SearchError> {
        if precursor_mass <= 0.0 {
            return Ok(Vec::new());
        }
        if embedding.is_empty() {
            return Err(SearchError::validation("embedding is empty"));
        }
        if let Some(pos) = embedding.iter().position(|v| !v.is_finite()) {
            return Err(SearchError::validation(format!(
                "embedding has a non-finite value at index {pos}"
            )));
        }

        let ppm = ppm_tolerance.unwrap_or(self.config.ppm_tolerance);
        if !(ppm.is_finite() && ppm > 0.0) {
            return Err(SearchError::validation(format!(
                "ppm_tolerance must be positive, got {ppm}"
            )));
        }
        let limit = top_k.unwrap_or(self.config.top_k);
        if limit == 0 {
            return Err(SearchError::validation("top_k must be at least 1"));
        }

        let window = MassWindow::around(precursor_mass, ppm);
        metrics::counter!("csmp_search_queries_total").increment(1);
        let rows = match self.store.nearest(window, embedding, limit).await {
            Ok(rows) => rows,
            Err(err) => {
                metrics::counter!("csmp_search_failures_total").increment(1);
                warn!(
                    store = self.store.name(),
                    precursor_mass,
                    error = %err,
                    "candidate search failed"
                );
                return Err(match err {
                    SearchError::Unavailable(_) => err,
                    other => SearchError::unavailable(other.to_string()),
                });
            }
        };

        let candidates: Vec<MoleculeCandidate> = rows
            .into_iter()
            .take(limit)
            .filter_map(|row| {
                let distance = row.cosine_distance.filter(|d| d.is_finite())?;
                Some(MoleculeCandidate {
                    smiles: row.smiles,
                    mass: row.monoisotopic_mass,
                    similarity_score: similarity_score(distance),
                })
            })
            .collect();

        debug!(
            lower = window.lower,
            upper = window.upper,
            top_k = limit,
            hits = candidates.len(),
            "candidate search done"
        );
        Ok(candidates)
    }
}
