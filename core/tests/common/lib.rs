//! Scripted stand-ins for the three external services, so orchestration
//! tests run without a network.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use acs_chat_core::RagOrchestrator;
use acs_chat_core::embeddings::EmbeddingError;
use acs_chat_core::embeddings::EmbeddingProvider;
use acs_chat_core::embeddings::EmbeddingVector;
use acs_chat_core::generation::ChatBackend;
use acs_chat_core::generation::GenerationError;
use acs_chat_core::index::IndexError;
use acs_chat_core::index::IndexMatch;
use acs_chat_core::index::VectorIndex;
use acs_chat_core::prompt::PromptMessageSequence;
use acs_chat_core::retrieval::ExcerptRetriever;
use async_trait::async_trait;
use tokio::sync::Notify;

pub const TEST_DIMENSIONS: usize = 4;

/// Index hit with `source` metadata, the way ingested ACS chunks look.
pub fn acs_match(id: &str, content: &str, score: f32) -> IndexMatch {
    let mut metadata = std::collections::BTreeMap::new();
    metadata.insert(
        "source".to_string(),
        serde_json::Value::String(format!("{id}.csv")),
    );
    IndexMatch {
        id: Some(id.to_string()),
        content: content.to_string(),
        score,
        metadata,
    }
}

/// Returns the same vector for every input, or fails with a transport error.
pub struct StaticEmbedder {
    fail: bool,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl StaticEmbedder {
    pub fn new() -> Self {
        Self {
            fail: false,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    /// Sleep for `delay` before answering.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for StaticEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for StaticEmbedder {
    fn model_id(&self) -> String {
        "static:test".to_string()
    }

    async fn embed(&self, _text: &str) -> Result<EmbeddingVector, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(EmbeddingError::Transport("connection refused".to_string()));
        }
        Ok(vec![0.5; TEST_DIMENSIONS])
    }
}

/// Returns a fixed list of matches (truncated to `top_k`) or an outage.
pub struct ScriptedIndex {
    matches: Vec<IndexMatch>,
    fail: bool,
    delay: Option<Duration>,
    queries: AtomicUsize,
}

impl ScriptedIndex {
    pub fn with_matches(matches: Vec<IndexMatch>) -> Self {
        Self {
            matches,
            fail: false,
            delay: None,
            queries: AtomicUsize::new(0),
        }
    }

    pub fn empty() -> Self {
        Self::with_matches(Vec::new())
    }

    pub fn unavailable() -> Self {
        Self {
            fail: true,
            ..Self::empty()
        }
    }

    /// Sleep for `delay` before answering.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorIndex for ScriptedIndex {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn query(&self, _vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>, IndexError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(IndexError::Api {
                status: 503,
                message: "index unavailable".to_string(),
            });
        }
        Ok(self.matches.iter().take(top_k).cloned().collect())
    }
}

enum Step {
    Answer(String),
    Fail { status: u16, message: String },
    Hang,
}

/// Plays back a script of answers and failures and records every prompt it
/// was sent. Once the script runs out it keeps answering `"ok"`.
pub struct ScriptedBackend {
    script: Mutex<VecDeque<Step>>,
    prompts: Mutex<Vec<PromptMessageSequence>>,
    started: Notify,
}

impl ScriptedBackend {
    fn from_steps(steps: Vec<Step>) -> Self {
        Self {
            script: Mutex::new(steps.into()),
            prompts: Mutex::new(Vec::new()),
            started: Notify::new(),
        }
    }

    pub fn answering<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_steps(answers.into_iter().map(|a| Step::Answer(a.into())).collect())
    }

    /// Fails the first call with an API error, then answers normally.
    pub fn failing_once(status: u16, message: &str) -> Self {
        Self::from_steps(vec![Step::Fail {
            status,
            message: message.to_string(),
        }])
    }

    /// Never completes its first call.
    pub fn hanging() -> Self {
        Self::from_steps(vec![Step::Hang])
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn prompts(&self) -> Vec<PromptMessageSequence> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last_prompt(&self) -> Option<PromptMessageSequence> {
        self.prompts().pop()
    }

    /// Resolves once a `generate` call has begun.
    pub async fn wait_started(&self) {
        self.started.notified().await;
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    fn model_id(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, messages: &PromptMessageSequence) -> Result<String, GenerationError> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(messages.clone());
        let step = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        self.started.notify_one();

        match step {
            Some(Step::Answer(text)) => Ok(text),
            Some(Step::Fail { status, message }) => Err(GenerationError::Api {
                status,
                message,
                retry_after: None,
            }),
            Some(Step::Hang) => std::future::pending().await,
            None => Ok("ok".to_string()),
        }
    }
}

/// Wires fakes into an orchestrator with default assembly settings.
pub fn orchestrator(
    embedder: Arc<StaticEmbedder>,
    index: Arc<ScriptedIndex>,
    backend: Arc<ScriptedBackend>,
    top_k: usize,
) -> RagOrchestrator {
    let retriever = ExcerptRetriever::new(embedder, index, top_k);
    RagOrchestrator::new(retriever, backend)
}
