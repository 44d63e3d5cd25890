use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;
use tracing::trace;

use super::Excerpt;
use super::ExcerptSet;
use super::Question;
use super::RetrievalError;
use crate::embeddings::EmbeddingProvider;
use crate::error::Result;
use crate::index::VectorIndex;

/// Embeds a question and asks the vector index for its nearest chunks.
///
/// No caching and no deduplication: every call goes to both services, so a
/// call against a static corpus is idempotent. Failures are always surfaced;
/// an outage never turns into an empty [`ExcerptSet`].
#[derive(Clone)]
pub struct ExcerptRetriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    top_k: usize,
}

impl ExcerptRetriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            index,
            top_k,
        }
    }

    pub const fn top_k(&self) -> usize {
        self.top_k
    }

    pub async fn retrieve(&self, question: &Question) -> Result<ExcerptSet> {
        self.retrieve_within(question, None).await
    }

    /// Like [`ExcerptRetriever::retrieve`], with `timeout` bounding the
    /// embedding call and the index query each on their own.
    pub async fn retrieve_within(
        &self,
        question: &Question,
        timeout: Option<Duration>,
    ) -> Result<ExcerptSet> {
        let vector = within(timeout, self.embedder.embed(question.as_str())).await?;
        let mut hits = within(timeout, self.index.query(&vector, self.top_k)).await?;

        // Indexes return ranked results already; the stable sort only guards
        // against adapters that do not.
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));

        debug!(
            index = self.index.name(),
            model = %self.embedder.model_id(),
            hits = hits.len(),
            top_k = self.top_k,
            "retrieved excerpts"
        );
        trace!(question = %question, "retrieval query");

        Ok(hits.into_iter().map(Excerpt::from).collect())
    }
}

async fn within<T, E, F>(limit: Option<Duration>, call: F) -> std::result::Result<T, RetrievalError>
where
    F: Future<Output = std::result::Result<T, E>>,
    RetrievalError: From<E>,
{
    match limit {
        Some(limit) => match tokio::time::timeout(limit, call).await {
            Ok(result) => result.map_err(RetrievalError::from),
            Err(_) => Err(RetrievalError::TimedOut(limit)),
        },
        None => call.await.map_err(RetrievalError::from),
    }
}
