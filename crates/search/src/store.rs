use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SearchError;
use crate::window::MassWindow;

/// One row returned by a [`VectorStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreRow {
    pub smiles: String,
    pub monoisotopic_mass: f64,
    /// `None` when the store could not compute a distance (zero vectors, NULL columns).
    pub cosine_distance: Option<f64>,
}

/// Mass-filtered nearest-neighbour lookup over stored molecule embeddings.
///
/// Implementations return rows whose mass lies in `window` (inclusive),
/// ordered by ascending cosine distance to `embedding`, at most `limit` of them.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn nearest(
        &self,
        window: MassWindow,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<StoreRow>, SearchError>;

    /// Short label for logs and readiness output.
    fn name(&self) -> &'static str;
}

/// Text form of a vector accepted by pgvector's `::text::vector` cast.
pub fn vector_literal(embedding: &[f32]) -> String {
    let mut out = String::with_capacity(embedding.len() * 10 + 2);
    out.push('[');
    for (i, value) in embedding.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&value.to_string());
    }
    out.push(']');
    out
}
