//! Pinecone serverless index over the data-plane REST API.
//!
//! The ACS corpus was written by a LangChain pipeline, which stores the chunk
//! text under the `text` metadata key. Every other metadata key is passed
//! through untouched.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::warn;

use super::IndexError;
use super::IndexMatch;
use super::VectorIndex;

pub const DEFAULT_INDEX_NAME: &str = "acs-tables";
const API_VERSION: &str = "2024-07";
const TEXT_KEY: &str = "text";

pub struct PineconeIndex {
    client: Client,
    api_key: String,
    name: String,
    host: String,
    namespace: Option<String>,
}

impl PineconeIndex {
    /// `host` is the index-specific data-plane host shown in the Pinecone
    /// console, with or without the `https://` scheme.
    pub fn new(api_key: impl Into<String>, name: impl Into<String>, host: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            name: name.into(),
            host: normalize_host(host),
            namespace: None,
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    score: f32,
    #[serde(default)]
    metadata: Option<BTreeMap<String, serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: Option<String>,
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl QueryMatch {
    fn into_index_match(self) -> Result<IndexMatch, IndexError> {
        let mut metadata = self.metadata.unwrap_or_default();
        let content = match metadata.remove(TEXT_KEY) {
            Some(serde_json::Value::String(text)) => text,
            Some(other) => {
                return Err(IndexError::Malformed(format!(
                    "match {} has non-string `{TEXT_KEY}` metadata: {other}",
                    self.id
                )));
            }
            None => {
                return Err(IndexError::Malformed(format!(
                    "match {} has no `{TEXT_KEY}` metadata",
                    self.id
                )));
            }
        };
        if !self.score.is_finite() {
            return Err(IndexError::Malformed(format!(
                "match {} has a non-finite score",
                self.id
            )));
        }
        Ok(IndexMatch {
            id: Some(self.id),
            content,
            score: self.score,
            metadata,
        })
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>, IndexError> {
        let request = QueryRequest {
            vector,
            top_k,
            include_metadata: true,
            include_values: false,
            namespace: self.namespace.as_deref(),
        };

        let response = self
            .client
            .post(format!("{}/query", self.host))
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| IndexError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|e| e.error.map(|d| d.message).or(e.message))
                .unwrap_or(body);
            warn!(index = %self.name, status = status.as_u16(), "index query failed");
            return Err(IndexError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|e| IndexError::Malformed(format!("failed to parse response: {e}")))?;

        let matches = parsed
            .matches
            .into_iter()
            .map(QueryMatch::into_index_match)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(index = %self.name, hits = matches.len(), top_k, "index query finished");
        Ok(matches)
    }
}
