//! OpenAI-compatible `/chat/completions` backend.
//!
//! Groq serves the Llama 3 models behind this wire format, so the defaults
//! point there. Any compatible base URL can be substituted.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::HeaderValue;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::warn;

use super::ChatBackend;
use super::GenerationError;
use crate::prompt::PromptMessage;
use crate::prompt::PromptMessageSequence;

pub const DEFAULT_MODEL: &str = "llama3-70b-8192";
pub const DEFAULT_GENERATION_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MAX_TOKENS: u32 = 300;

#[derive(Clone)]
pub struct ChatCompletionsBackend {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: Option<u32>,
}

impl ChatCompletionsBackend {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_GENERATION_BASE_URL.to_string(),
            model: model.into(),
            max_tokens: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the maximum number of tokens to generate.
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [PromptMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

#[async_trait]
impl ChatBackend for ChatCompletionsBackend {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn generate(&self, messages: &PromptMessageSequence) -> Result<String, GenerationError> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: messages.messages(),
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| GenerationError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers().get("retry-after"));
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|wrapper| wrapper.error.message)
                .unwrap_or(body);
            warn!(model = %self.model, status = status.as_u16(), "chat completion failed");
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message,
                retry_after,
            });
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|err| GenerationError::Malformed(format!("failed to parse response: {err}")))?;

        let text = extract_text_response(parsed)?;
        debug!(model = %self.model, chars = text.len(), "chat completion received");
        Ok(text)
    }
}

fn extract_text_response(response: ChatCompletionResponse) -> Result<String, GenerationError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|text| !text.trim().is_empty())
        .ok_or(GenerationError::EmptyCompletion)
}

fn parse_retry_after(header: Option<&HeaderValue>) -> Option<Duration> {
    let value = header?.to_str().ok()?;
    if let Ok(seconds) = value.trim().parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|s| s.is_finite() && (0.0..86_400.0).contains(s))
        .map(Duration::from_secs_f64)
}
