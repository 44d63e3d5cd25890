//! Retrieval-augmented chat over Census ACS table excerpts.
//!
//! A question is embedded, matched against a vector index of ACS table
//! chunks, and answered by a hosted chat model whose prompt carries the
//! persona policy, a window of recent conversation and the retrieved
//! excerpts. See [`RagOrchestrator`] for the request cycle and
//! [`ChatSession`] for per-session state.

pub mod config;
pub mod conversation;
pub mod embeddings;
pub mod error;
pub mod generation;
pub mod index;
pub mod orchestrator;
pub mod prompt;
pub mod retrieval;
pub mod session;

pub use config::Credentials;
pub use config::RagConfig;
pub use conversation::ConversationHistory;
pub use error::ErrorKind;
pub use error::RagErr;
pub use error::Result;
pub use orchestrator::CallOptions;
pub use orchestrator::RagOrchestrator;
pub use orchestrator::RagRun;
pub use orchestrator::RagState;
pub use session::ChatSession;
pub use session::SharedSession;
