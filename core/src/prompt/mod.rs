//! Prompt construction: policy, windowed history and the grounded question.

pub mod assembler;
pub mod policy;

pub use assembler::DEFAULT_EXCERPT_BUDGET_CHARS;
pub use assembler::EXCERPT_DELIMITER;
pub use assembler::NO_EXCERPTS_MARKER;
pub use assembler::PromptAssembler;
pub use assembler::TRUNCATION_MARKER;
pub use policy::SYSTEM_POLICY;
pub use policy::SystemPolicy;

use serde::Deserialize;
use serde::Serialize;

use crate::conversation::Role;
use crate::conversation::Turn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub const fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl From<Role> for MessageRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => MessageRole::User,
            Role::Assistant => MessageRole::Assistant,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: MessageRole,
    pub content: String,
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

impl From<&Turn> for PromptMessage {
    fn from(turn: &Turn) -> Self {
        Self {
            role: turn.role().into(),
            content: turn.content().to_string(),
        }
    }
}

/// `[system policy, ..windowed history, synthesized user message]`, built
/// fresh for every backend call and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PromptMessageSequence(Vec<PromptMessage>);

impl PromptMessageSequence {
    pub fn messages(&self) -> &[PromptMessage] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The synthesized user message (always the last entry).
    pub fn final_user_message(&self) -> Option<&PromptMessage> {
        self.0.last().filter(|m| m.role == MessageRole::User)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PromptMessage> {
        self.0.iter()
    }
}

impl FromIterator<PromptMessage> for PromptMessageSequence {
    fn from_iter<I: IntoIterator<Item = PromptMessage>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
