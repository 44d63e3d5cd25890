//! One question in, one grounded answer out.
//!
//! The orchestrator composes retrieval, prompt assembly and generation into a
//! single request cycle and is the only place that writes to a
//! [`ConversationHistory`]. A cycle either completes and appends exactly one
//! user turn and one assistant turn, or fails and leaves the history as it
//! was.

mod state;

pub use state::RagState;
pub use state::StateTransition;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing::warn;

use crate::conversation::ConversationHistory;
use crate::error::RagErr;
use crate::error::Result;
use crate::generation::ChatBackend;
use crate::generation::GenerationError;
use crate::prompt::PromptAssembler;
use crate::prompt::SystemPolicy;
use crate::retrieval::ExcerptRetriever;
use crate::retrieval::Question;
use state::RunTracker;

/// Caller-supplied bounds for one request. The timeout applies to each
/// external call separately; cancellation applies to the whole cycle.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    cancellation: CancellationToken,
    timeout: Option<Duration>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub const fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

/// Outcome of one cycle together with the states it passed through.
#[derive(Debug)]
pub struct RagRun {
    pub transitions: Vec<StateTransition>,
    pub result: Result<String>,
}

impl RagRun {
    pub fn final_state(&self) -> RagState {
        self.transitions
            .last()
            .map(|t| t.to)
            .unwrap_or(RagState::Idle)
    }

    /// States visited, starting with `Idle`.
    pub fn path(&self) -> Vec<RagState> {
        std::iter::once(RagState::Idle)
            .chain(self.transitions.iter().map(|t| t.to))
            .collect()
    }

    pub fn into_result(self) -> Result<String> {
        self.result
    }
}

pub struct RagOrchestrator {
    retriever: ExcerptRetriever,
    assembler: PromptAssembler,
    policy: SystemPolicy,
    backend: Arc<dyn ChatBackend>,
}

impl RagOrchestrator {
    pub fn new(retriever: ExcerptRetriever, backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            retriever,
            assembler: PromptAssembler::default(),
            policy: SystemPolicy::default(),
            backend,
        }
    }

    pub const fn with_assembler(mut self, assembler: PromptAssembler) -> Self {
        self.assembler = assembler;
        self
    }

    pub fn with_policy(mut self, policy: SystemPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub const fn assembler(&self) -> &PromptAssembler {
        &self.assembler
    }

    pub const fn policy(&self) -> &SystemPolicy {
        &self.policy
    }

    /// Answer `question`, appending the exchange to `history` on success.
    pub async fn answer(
        &self,
        history: &mut ConversationHistory,
        question: &str,
        options: &CallOptions,
    ) -> Result<String> {
        self.run(history, question, options).await.into_result()
    }

    /// Like [`RagOrchestrator::answer`] but also reports the state path.
    pub async fn run(
        &self,
        history: &mut ConversationHistory,
        question: &str,
        options: &CallOptions,
    ) -> RagRun {
        let started = Instant::now();
        let mut tracker = RunTracker::new();
        let result = self.drive(&mut tracker, history, question, options).await;

        match &result {
            Ok(answer) => info!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                answer_chars = answer.len(),
                history_turns = history.len(),
                "question answered"
            ),
            Err(err) => {
                tracker.advance(RagState::Failed(err.kind()));
                warn!(
                    kind = %err.kind(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error = %err,
                    "question failed"
                );
            }
        }

        RagRun {
            transitions: tracker.into_transitions(),
            result,
        }
    }

    async fn drive(
        &self,
        tracker: &mut RunTracker,
        history: &mut ConversationHistory,
        raw_question: &str,
        options: &CallOptions,
    ) -> Result<String> {
        let question = Question::parse(raw_question)?;

        tracker.advance(RagState::Retrieving);
        let excerpts = cancellable(
            options,
            self.retriever.retrieve_within(&question, options.timeout),
        )
        .await?;

        tracker.advance(RagState::Assembling);
        let messages = self
            .assembler
            .assemble(&self.policy, history, &question, &excerpts);

        tracker.advance(RagState::Generating);
        let generation = async { self.backend.generate(&messages).await.map_err(RagErr::from) };
        let generation = bounded(options.timeout, generation, |limit| {
            GenerationError::TimedOut(limit).into()
        });
        let answer = cancellable(options, generation).await?;

        history.record_exchange(question.into_string(), answer.clone());
        tracker.advance(RagState::Completed);
        debug_assert_eq!(tracker.state(), RagState::Completed);
        Ok(answer)
    }
}

/// Race `work` against the caller's cancellation token.
async fn cancellable<T, F>(options: &CallOptions, work: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        () = options.cancellation.cancelled() => Err(RagErr::Cancelled),
        result = work => result,
    }
}

/// Apply the per-call timeout, if any, to a single external call.
async fn bounded<T, F>(
    limit: Option<Duration>,
    work: F,
    on_timeout: impl FnOnce(Duration) -> RagErr,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match limit {
        Some(limit) => match tokio::time::timeout(limit, work).await {
            Ok(result) => result,
            Err(_) => Err(on_timeout(limit)),
        },
        None => work.await,
    }
}
