//! Session-scoped conversation state.
//!
//! This module provides the turn model and the per-session history that both
//! feeds the prompt window and backs transcript display.

pub mod history;

pub use history::ConversationHistory;
pub use history::DEFAULT_HISTORY_WINDOW;
pub use history::Role;
pub use history::Turn;
