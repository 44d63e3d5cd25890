//! Per-session ownership of conversation history.
//!
//! [`ChatSession::ask`] takes `&mut self`, so a session that is not shared
//! cannot start a second question while one is in flight. When a deployment
//! needs to share a session across tasks, [`SharedSession`] serializes whole
//! question cycles behind an async mutex.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::Instrument;
use tracing::info_span;
use uuid::Uuid;

use crate::conversation::ConversationHistory;
use crate::error::Result;
use crate::orchestrator::CallOptions;
use crate::orchestrator::RagOrchestrator;

pub struct ChatSession {
    id: Uuid,
    orchestrator: Arc<RagOrchestrator>,
    history: ConversationHistory,
}

impl ChatSession {
    pub fn new(orchestrator: Arc<RagOrchestrator>) -> Self {
        Self::with_history(orchestrator, ConversationHistory::new())
    }

    /// Resume a session from a previously displayed history.
    pub fn with_history(orchestrator: Arc<RagOrchestrator>, history: ConversationHistory) -> Self {
        Self {
            id: Uuid::new_v4(),
            orchestrator,
            history,
        }
    }

    pub const fn id(&self) -> Uuid {
        self.id
    }

    pub const fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub async fn ask(&mut self, question: &str, options: &CallOptions) -> Result<String> {
        let span = info_span!("chat_session", session = %self.id, turn = self.history.exchanges() + 1);
        self.orchestrator
            .answer(&mut self.history, question, options)
            .instrument(span)
            .await
    }

    /// Forget the conversation; the session id is kept.
    pub fn reset(&mut self) {
        self.history.clear();
    }

    pub fn into_history(self) -> ConversationHistory {
        self.history
    }
}

/// A [`ChatSession`] that can be cloned across tasks. Only one question runs
/// at a time; later callers wait for the one in flight to finish.
#[derive(Clone)]
pub struct SharedSession {
    inner: Arc<Mutex<ChatSession>>,
}

impl SharedSession {
    pub fn new(session: ChatSession) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    pub async fn ask(&self, question: &str, options: &CallOptions) -> Result<String> {
        let mut session = self.inner.lock().await;
        session.ask(question, options).await
    }

    pub async fn history(&self) -> ConversationHistory {
        self.inner.lock().await.history().clone()
    }

    pub async fn reset(&self) {
        self.inner.lock().await.reset();
    }
}
