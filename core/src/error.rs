use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::embeddings::EmbeddingError;
use crate::generation::GenerationError;
use crate::index::IndexError;
use crate::retrieval::RetrievalError;

pub type Result<T> = std::result::Result<T, RagErr>;

/// Coarse classification of a failed request, stable enough for a front end
/// to branch on when choosing what to tell the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    InvalidInput,
    RetrievalUnavailable,
    GenerationUnavailable,
    Cancelled,
    InvalidConfig,
}

impl ErrorKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::RetrievalUnavailable => "retrieval_unavailable",
            ErrorKind::GenerationUnavailable => "generation_unavailable",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::InvalidConfig => "invalid_config",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum RagErr {
    /// The question was empty or otherwise unusable. The user has to resupply it.
    #[error("invalid question: {0}")]
    InvalidInput(String),

    /// The embedding provider or the vector index failed. Grounding data is
    /// unknown, which is not the same thing as "no relevant data".
    #[error("retrieval unavailable: {0}")]
    RetrievalUnavailable(#[from] RetrievalError),

    /// The chat-completion backend failed (transport, auth, quota).
    #[error("generation unavailable: {0}")]
    GenerationUnavailable(#[from] GenerationError),

    /// The caller aborted the request before it completed.
    #[error("request cancelled")]
    Cancelled,

    /// Startup configuration is missing or malformed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl RagErr {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    pub const fn kind(&self) -> ErrorKind {
        match self {
            RagErr::InvalidInput(_) => ErrorKind::InvalidInput,
            RagErr::RetrievalUnavailable(_) => ErrorKind::RetrievalUnavailable,
            RagErr::GenerationUnavailable(_) => ErrorKind::GenerationUnavailable,
            RagErr::Cancelled => ErrorKind::Cancelled,
            RagErr::InvalidConfig(_) => ErrorKind::InvalidConfig,
        }
    }

    /// Whether re-running the whole question cycle may succeed. The core never
    /// retries on its own; this is advice for the caller.
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            RagErr::RetrievalUnavailable(_) | RagErr::GenerationUnavailable(_)
        )
    }
}

impl From<EmbeddingError> for RagErr {
    fn from(err: EmbeddingError) -> Self {
        RagErr::RetrievalUnavailable(RetrievalError::Embedding(err))
    }
}

impl From<IndexError> for RagErr {
    fn from(err: IndexError) -> Self {
        RagErr::RetrievalUnavailable(RetrievalError::Index(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            RagErr::invalid_input("empty").kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(RagErr::Cancelled.kind(), ErrorKind::Cancelled);

        let err: RagErr = IndexError::Transport("connection refused".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::RetrievalUnavailable);

        let err: RagErr = EmbeddingError::Malformed("no data".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::RetrievalUnavailable);

        let err: RagErr = GenerationError::EmptyCompletion.into();
        assert_eq!(err.kind(), ErrorKind::GenerationUnavailable);
    }

    #[test]
    fn test_retryable_only_for_unavailable_services() {
        let retrieval: RagErr = IndexError::Transport("reset".to_string()).into();
        let generation: RagErr = GenerationError::Transport("reset".to_string()).into();
        assert!(retrieval.is_retryable());
        assert!(generation.is_retryable());
        assert!(!RagErr::invalid_input("").is_retryable());
        assert!(!RagErr::Cancelled.is_retryable());
        assert!(!RagErr::invalid_config("top_k").is_retryable());
    }

    #[test]
    fn test_display_keeps_source_detail() {
        let err: RagErr = IndexError::Api {
            status: 503,
            message: "index warming up".to_string(),
        }
        .into();
        let text = err.to_string();
        assert!(text.starts_with("retrieval unavailable"));
        assert!(text.contains("index warming up"));
    }

    #[test]
    fn test_kind_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&ErrorKind::GenerationUnavailable).unwrap();
        assert_eq!(json, "\"GENERATION_UNAVAILABLE\"");
    }
}
