//! Vector index access.
//!
//! The index is built and owned by an external pipeline. This module only
//! queries it: given a query vector, return the nearest corpus chunks in
//! descending similarity order.

pub mod memory;
pub mod pinecone;

pub use memory::InMemoryVectorIndex;
pub use pinecone::PineconeIndex;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One nearest-neighbor hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMatch {
    pub id: Option<String>,
    pub content: String,
    pub score: f32,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Human-readable index identifier for logs.
    fn name(&self) -> &str;

    /// Return at most `top_k` matches, most similar first.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>, IndexError>;
}
