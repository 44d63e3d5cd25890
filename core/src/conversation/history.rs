use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// How many of the most recent turns are replayed into each prompt.
pub const DEFAULT_HISTORY_WINDOW: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    const fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message of an exchange. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    role: Role,
    content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub const fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Ordered turns of one session.
///
/// The only way in is [`ConversationHistory::record_exchange`], which appends
/// a user turn and its assistant reply together, so the history always
/// alternates user/assistant starting with user and always has even length.
/// Everything is retained for display; prompt construction only sees
/// [`ConversationHistory::window`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationHistory {
    turns: Vec<Turn>,
}

impl ConversationHistory {
    pub const fn new() -> Self {
        Self { turns: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Number of completed question/answer pairs.
    pub fn exchanges(&self) -> usize {
        self.turns.len() / 2
    }

    /// The most recent `size` turns in chronological order.
    pub fn window(&self, size: usize) -> &[Turn] {
        let start = self.turns.len().saturating_sub(size);
        &self.turns[start..]
    }

    pub fn record_exchange(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.turns.reserve(2);
        self.turns.push(Turn::user(question));
        self.turns.push(Turn::assistant(answer));
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Full transcript, one `Role: content` block per turn.
    pub fn transcript(&self) -> String {
        self.turns
            .iter()
            .map(|turn| format!("{}: {}", turn.role.label(), turn.content))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
