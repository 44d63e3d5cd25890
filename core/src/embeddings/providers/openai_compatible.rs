//! Embeddings over the OpenAI `/v1/embeddings` wire format.
//!
//! Hugging Face text-embeddings-inference speaks the same format, so the
//! default setup points this at a local TEI server hosting
//! `sentence-transformers/all-MiniLM-L6-v2`, the model the ACS corpus was
//! indexed with. Hosted OpenAI-compatible endpoints work too; the API key is
//! optional because local servers usually run without one.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::embeddings::EmbeddingError;
use crate::embeddings::EmbeddingProvider;
use crate::embeddings::EmbeddingVector;

pub const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";
pub const DEFAULT_EMBEDDING_URL: &str = "http://localhost:8080/v1/embeddings";

/// all-MiniLM-L6-v2 output width.
const MINILM_DIMENSIONS: usize = 384;

pub struct OpenAiCompatibleEmbeddings {
    client: Client,
    api_key: Option<String>,
    model: String,
    endpoint: String,
    dimensions: Option<usize>,
}

impl OpenAiCompatibleEmbeddings {
    pub fn new(model: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: None,
            model: model.into(),
            endpoint: endpoint.into(),
            dimensions: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        self.api_key = (!api_key.is_empty()).then_some(api_key);
        self
    }

    /// Reject responses whose width differs from `dimensions`.
    pub const fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    fn expected_dimensions(&self) -> Option<usize> {
        self.dimensions.or_else(|| {
            self.model
                .ends_with("all-MiniLM-L6-v2")
                .then_some(MINILM_DIMENSIONS)
        })
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
    encoding_format: &'static str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[async_trait]
impl EmbeddingProvider for OpenAiCompatibleEmbeddings {
    fn model_id(&self) -> String {
        format!("openai-compatible:{}", self.model)
    }

    async fn embed(&self, text: &str) -> Result<EmbeddingVector, EmbeddingError> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: vec![text],
            encoding_format: "float",
        };

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| EmbeddingError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|wrapper| wrapper.error.message)
                .unwrap_or(body);
            return Err(EmbeddingError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Malformed(format!("failed to parse response: {e}")))?;

        let embedding = parsed
            .data
            .into_iter()
            .min_by_key(|d| d.index)
            .map(|d| d.embedding)
            .ok_or_else(|| EmbeddingError::Malformed("response contained no embeddings".into()))?;

        if embedding.is_empty() {
            return Err(EmbeddingError::Malformed("embedding is empty".into()));
        }
        if embedding.iter().any(|v| !v.is_finite()) {
            return Err(EmbeddingError::Malformed(
                "embedding contains non-finite values".into(),
            ));
        }
        if let Some(expected) = self.expected_dimensions()
            && embedding.len() != expected
        {
            return Err(EmbeddingError::DimensionMismatch {
                expected,
                actual: embedding.len(),
            });
        }

        debug!(model = %self.model, dims = embedding.len(), "embedded question");
        Ok(embedding)
    }
}
