//! Question validation and excerpt retrieval.

mod retriever;

pub use retriever::ExcerptRetriever;

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::embeddings::EmbeddingError;
use crate::error::RagErr;
use crate::error::Result;
use crate::index::IndexError;
use crate::index::IndexMatch;

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("embedding provider: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("vector index: {0}")]
    Index(#[from] IndexError),

    #[error("timed out after {0:?}")]
    TimedOut(Duration),
}

/// A user question that has passed validation: non-empty after trimming.
/// Stored trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Question(String);

impl Question {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(RagErr::invalid_input("question is empty"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Question {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A read-only copy of one retrieved corpus chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Excerpt {
    pub content: String,
    pub source: Option<String>,
    pub score: Option<f32>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Excerpt {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source: None,
            score: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub const fn with_score(mut self, score: f32) -> Self {
        self.score = Some(score);
        self
    }
}

impl From<IndexMatch> for Excerpt {
    fn from(hit: IndexMatch) -> Self {
        Self {
            content: hit.content,
            source: hit.id,
            score: Some(hit.score),
            metadata: hit.metadata,
        }
    }
}

/// Excerpts ordered most relevant first. An empty set means the corpus had
/// nothing relevant, never that retrieval failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExcerptSet(Vec<Excerpt>);

impl ExcerptSet {
    pub const fn empty() -> Self {
        Self(Vec::new())
    }

    /// Wrap excerpts that are already ranked.
    pub const fn ranked(excerpts: Vec<Excerpt>) -> Self {
        Self(excerpts)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Excerpt> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Excerpt] {
        &self.0
    }
}

impl FromIterator<Excerpt> for ExcerptSet {
    fn from_iter<I: IntoIterator<Item = Excerpt>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a ExcerptSet {
    type Item = &'a Excerpt;
    type IntoIter = std::slice::Iter<'a, Excerpt>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_question_rejects_blank_input() {
        for raw in ["", "   ", "\n\t"] {
            let err = Question::parse(raw).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput);
        }
    }

    #[test]
    fn test_question_is_trimmed() {
        let question = Question::parse("  What is the poverty rate in Ohio?\n").unwrap();
        assert_eq!(question.as_str(), "What is the poverty rate in Ohio?");
    }

    #[test]
    fn test_excerpt_from_index_match() {
        let hit = IndexMatch {
            id: Some("B17001-39".to_string()),
            content: "Poverty status, Ohio".to_string(),
            score: 0.71,
            metadata: BTreeMap::new(),
        };
        let excerpt = Excerpt::from(hit);
        assert_eq!(excerpt.source.as_deref(), Some("B17001-39"));
        assert_eq!(excerpt.score, Some(0.71));
    }
}
