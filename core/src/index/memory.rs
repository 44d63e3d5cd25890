//! Brute-force cosine index held in memory.
//!
//! Useful for offline runs against an exported snapshot of the hosted index
//! and for tests. Fine for a few thousand chunks; the hosted index is the
//! production path.

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use super::IndexError;
use super::IndexMatch;
use super::VectorIndex;

/// One pre-embedded corpus chunk as exported by the indexing pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexRecord {
    #[serde(default)]
    pub id: Option<String>,
    pub text: String,
    #[serde(alias = "values")]
    pub vector: Vec<f32>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

pub struct InMemoryVectorIndex {
    name: String,
    dimensions: usize,
    records: Vec<IndexRecord>,
}

impl InMemoryVectorIndex {
    pub fn new(name: impl Into<String>, dimensions: usize) -> Self {
        Self {
            name: name.into(),
            dimensions,
            records: Vec::new(),
        }
    }

    pub fn insert(&mut self, record: IndexRecord) -> Result<(), IndexError> {
        if record.vector.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                actual: record.vector.len(),
            });
        }
        if record.vector.iter().any(|v| !v.is_finite()) {
            return Err(IndexError::Malformed(format!(
                "non-finite vector value in record {}",
                record.id.as_deref().unwrap_or("<unnamed>")
            )));
        }
        self.records.push(record);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Load a JSON Lines snapshot: one [`IndexRecord`] per line. The first
    /// record fixes the dimensionality; blank lines are skipped.
    pub async fn load_jsonl(path: &Path) -> Result<Self, IndexError> {
        let data = tokio::fs::read_to_string(path).await?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "memory".to_string());

        let mut index: Option<Self> = None;
        for (line_no, line) in data.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record: IndexRecord = serde_json::from_str(line).map_err(|e| {
                IndexError::Malformed(format!("{}:{}: {e}", path.display(), line_no + 1))
            })?;
            let index =
                index.get_or_insert_with(|| Self::new(name.clone(), record.vector.len()));
            index.insert(record)?;
        }

        let index = index.unwrap_or_else(|| Self::new(name, 0));
        info!(index = %index.name, chunks = index.len(), "loaded in-memory index");
        Ok(index)
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>, IndexError> {
        if self.records.is_empty() {
            return Ok(Vec::new());
        }
        if vector.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(IndexError::Malformed(
                "non-finite value in query vector".to_string(),
            ));
        }

        let mut scored: Vec<(f32, &IndexRecord)> = self
            .records
            .iter()
            .map(|record| (cosine_similarity(vector, &record.vector), record))
            .collect();

        // Stable sort keeps insertion order among equal scores.
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(score, record)| IndexMatch {
                id: record.id.clone(),
                content: record.text.clone(),
                score,
                metadata: record.metadata.clone(),
            })
            .collect())
    }
}

/// Calculate cosine similarity between two vectors
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a * magnitude_b == 0.0 {
        0.0
    } else {
        dot_product / (magnitude_a * magnitude_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn record(id: &str, text: &str, vector: Vec<f32>) -> IndexRecord {
        IndexRecord {
            id: Some(id.to_string()),
            text: text.to_string(),
            vector,
            metadata: BTreeMap::new(),
        }
    }

    #[test]
    fn test_dimension_mismatch_protection() {
        let mut index = InMemoryVectorIndex::new("acs", 3);
        assert!(index.insert(record("a", "x", vec![1.0, 0.0, 0.0])).is_ok());
        assert!(matches!(
            index.insert(record("b", "y", vec![1.0, 0.0])),
            Err(IndexError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[tokio::test]
    async fn test_non_finite_vectors_are_rejected() {
        let mut index = InMemoryVectorIndex::new("acs", 2);
        index.insert(record("ok", "B01003 Ohio", vec![1.0, 0.0])).unwrap();
        for bad in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            assert!(matches!(
                index.insert(record("bad", "B01003 Utah", vec![bad, 0.0])),
                Err(IndexError::Malformed(_))
            ));
        }
        assert_eq!(index.len(), 1);

        let err = index.query(&[f32::NAN, 1.0], 1).await.unwrap_err();
        assert!(matches!(err, IndexError::Malformed(_)));
        let hits = index.query(&[1.0, 0.0], 1).await.unwrap();
        assert_eq!(hits[0].id.as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn test_query_ranks_by_similarity() {
        let mut index = InMemoryVectorIndex::new("acs", 2);
        index.insert(record("far", "B19013 Kansas", vec![0.0, 1.0])).unwrap();
        index.insert(record("near", "B19013 Texas", vec![1.0, 0.1])).unwrap();
        index.insert(record("mid", "B01003 Texas", vec![0.7, 0.7])).unwrap();

        let hits = index.query(&[1.0, 0.0], 2).await.unwrap();
        let ids: Vec<_> = hits.iter().filter_map(|h| h.id.as_deref()).collect();
        assert_eq!(ids, vec!["near", "mid"]);
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn test_empty_index_returns_no_matches() {
        let index = InMemoryVectorIndex::new("acs", 4);
        let hits = index.query(&[1.0, 2.0], 3).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_load_jsonl() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"id":"t1","text":"Median household income","values":[1.0,0.0],"metadata":{{"table":"B19013"}}}}"#
        )
        .unwrap();
        writeln!(file).unwrap();
        writeln!(file, r#"{{"text":"Total population","vector":[0.0,1.0]}}"#).unwrap();

        let index = InMemoryVectorIndex::load_jsonl(file.path()).await.unwrap();
        assert_eq!(index.len(), 2);

        let hits = index.query(&[1.0, 0.0], 1).await.unwrap();
        assert_eq!(hits[0].content, "Median household income");
        assert_eq!(hits[0].metadata["table"], "B19013");
    }

    #[tokio::test]
    async fn test_load_jsonl_reports_bad_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"text":"ok","vector":[1.0]}}"#).unwrap();
        writeln!(file, "not json").unwrap();

        let err = InMemoryVectorIndex::load_jsonl(file.path()).await.err().unwrap();
        assert!(matches!(err, IndexError::Malformed(msg) if msg.contains(":2:")));
    }

    #[tokio::test]
    async fn test_load_jsonl_rejects_overflowing_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"text":"ok","vector":[1.0,0.0]}}"#).unwrap();
        writeln!(file, r#"{{"id":"huge","text":"overflow","vector":[1e39,0.0]}}"#).unwrap();

        let err = InMemoryVectorIndex::load_jsonl(file.path()).await.err().unwrap();
        assert!(matches!(err, IndexError::Malformed(msg) if msg.contains("huge")));
    }
}
