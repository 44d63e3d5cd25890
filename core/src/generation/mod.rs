//! Chat-completion backend seam.

pub mod chat_completions;

pub use chat_completions::ChatCompletionsBackend;
pub use chat_completions::DEFAULT_GENERATION_BASE_URL;
pub use chat_completions::DEFAULT_MAX_TOKENS;
pub use chat_completions::DEFAULT_MODEL;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::prompt::PromptMessageSequence;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("API error ({status}): {message}")]
    Api {
        status: u16,
        message: String,
        retry_after: Option<Duration>,
    },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("backend returned no completion text")]
    EmptyCompletion,

    #[error("timed out after {0:?}")]
    TimedOut(Duration),
}

impl GenerationError {
    pub const fn is_rate_limited(&self) -> bool {
        matches!(self, GenerationError::Api { status: 429, .. })
    }

    pub const fn is_auth_failure(&self) -> bool {
        matches!(self, GenerationError::Api { status: 401 | 403, .. })
    }
}

/// A hosted chat-completion model. One call is one atomic request/response:
/// it either yields the text of the top choice or fails. Implementations
/// must not retry.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    fn model_id(&self) -> &str;

    async fn generate(&self, messages: &PromptMessageSequence) -> Result<String, GenerationError>;
}
