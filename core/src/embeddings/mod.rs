//! Query embedding.
//!
//! The corpus was embedded ahead of time by an external indexing pipeline;
//! the only embedding done here is of the user's question, which has to use
//! the same model the corpus was indexed with.

pub mod providers;

pub use providers::OpenAiCompatibleEmbeddings;

use async_trait::async_trait;
use thiserror::Error;

pub type EmbeddingVector = Vec<f32>;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Maps text to a fixed-dimension vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Unique model identifier, e.g. `openai-compatible:all-MiniLM-L6-v2`.
    fn model_id(&self) -> String;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<EmbeddingVector, EmbeddingError>;
}
