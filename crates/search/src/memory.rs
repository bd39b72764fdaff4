use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::RwLock;

use crate::error::SearchError;
use crate::store::{StoreRow, VectorStore};
use crate::window::MassWindow;

/// A stored molecule: structure, mass and embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoleculeRecord {
    pub smiles: String,
    pub monoisotopic_mass: f64,
    pub embedding: Vec<f32>,
}

impl MoleculeRecord {
    pub fn new(smiles: impl Into<String>, monoisotopic_mass: f64, embedding: Vec<f32>) -> Self {
        Self {
            smiles: smiles.into(),
            monoisotopic_mass,
            embedding,
        }
    }
}

/// In-process [`VectorStore`] using a `RwLock` around a `Vec`.
///
/// Exact scan with the same window, ordering and distance rules as the
/// PostgreSQL store. Useful for tests and offline runs.
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    records: RwLock<Vec<MoleculeRecord>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<MoleculeRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    /// Load a JSON array of [`MoleculeRecord`]s.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SearchError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            SearchError::InvalidConfig(format!("failed to read {}: {e}", path.display()))
        })?;
        let records: Vec<MoleculeRecord> = serde_json::from_str(&text).map_err(|e| {
            SearchError::InvalidConfig(format!("failed to parse {}: {e}", path.display()))
        })?;
        Ok(Self::from_records(records))
    }

    pub fn insert(&self, record: MoleculeRecord) -> Result<(), SearchError> {
        self.records
            .write()
            .map_err(|_| SearchError::unavailable("poisoned lock"))?
            .push(record);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `1 - cos(a, b)`, or `None` if either vector has zero norm.
pub(crate) fn cosine_distance(a: &[f32], b: &[f32]) -> Option<f64> {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }
    Some(1.0 - dot / (norm_a.sqrt() * norm_b.sqrt()))
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn nearest(
        &self,
        window: MassWindow,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<StoreRow>, SearchError> {
        let records = self
            .records
            .read()
            .map_err(|_| SearchError::unavailable("poisoned lock"))?;

        let mut rows = Vec::new();
        for record in records.iter().filter(|r| window.contains(r.monoisotopic_mass)) {
            if record.embedding.len() != embedding.len() {
                return Err(SearchError::unavailable(format!(
                    "different vector dimensions {} and {}",
                    record.embedding.len(),
                    embedding.len()
                )));
            }
            rows.push(StoreRow {
                smiles: record.smiles.clone(),
                monoisotopic_mass: record.monoisotopic_mass,
                cosine_distance: cosine_distance(&record.embedding, embedding),
            });
        }

        // Undefined distances sort last, like NULLs under ORDER BY ... ASC.
        rows.sort_by(|a, b| match (a.cosine_distance, b.cosine_distance) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        rows.truncate(limit);
        Ok(rows)
    }

    fn name(&self) -> &'static str {
        "in-memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(lower: f64, upper: f64) -> MassWindow {
        MassWindow { lower, upper }
    }

    #[test]
    fn cosine_distance_basics() {
        assert_eq!(cosine_distance(&[1.0, 0.0], &[2.0, 0.0]), Some(0.0));
        assert!((cosine_distance(&[1.0, 0.0], &[0.0, 1.0]).unwrap() - 1.0).abs() < 1e-12);
        assert!((cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]).unwrap() - 2.0).abs() < 1e-12);
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), None);
    }

    #[tokio::test]
    async fn filters_by_mass_and_orders_by_distance() {
        let store = InMemoryVectorStore::from_records(vec![
            MoleculeRecord::new("far", 100.0, vec![0.0, 1.0]),
            MoleculeRecord::new("near", 100.5, vec![1.0, 0.1]),
            MoleculeRecord::new("exact", 99.5, vec![1.0, 0.0]),
            MoleculeRecord::new("heavy", 150.0, vec![1.0, 0.0]),
        ]);

        let rows = store.nearest(window(99.0, 101.0), &[1.0, 0.0], 10).await.unwrap();
        let smiles: Vec<&str> = rows.iter().map(|r| r.smiles.as_str()).collect();
        assert_eq!(smiles, vec!["exact", "near", "far"]);

        let rows = store.nearest(window(99.0, 101.0), &[1.0, 0.0], 2).await.unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn zero_vectors_sort_last_without_distance() {
        let store = InMemoryVectorStore::new();
        store.insert(MoleculeRecord::new("zero", 10.0, vec![0.0, 0.0])).unwrap();
        store.insert(MoleculeRecord::new("one", 10.0, vec![0.0, 1.0])).unwrap();

        let rows = store.nearest(window(0.0, 20.0), &[1.0, 1.0], 5).await.unwrap();
        assert_eq!(rows[0].smiles, "one");
        assert_eq!(rows[1].cosine_distance, None);
    }

    #[tokio::test]
    async fn dimension_mismatch_is_unavailable() {
        let store =
            InMemoryVectorStore::from_records(vec![MoleculeRecord::new("c", 10.0, vec![1.0])]);
        let err = store.nearest(window(0.0, 20.0), &[1.0, 0.0], 5).await.unwrap_err();
        assert!(matches!(err, SearchError::Unavailable(_)));
    }

    #[test]
    fn loads_records_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("molecules.json");
        std::fs::write(
            &path,
            r#"[{"smiles": "CCO", "monoisotopic_mass": 46.0419, "embedding": [0.1, 0.2]}]"#,
        )
        .unwrap();
        let store = InMemoryVectorStore::from_json_file(&path).unwrap();
        assert_eq!(store.len(), 1);

        let missing = InMemoryVectorStore::from_json_file(dir.path().join("nope.json"));
        assert!(matches!(missing, Err(SearchError::InvalidConfig(_))));
    }
}
