//! What the user sees when a question fails.

use acs_chat_core::ErrorKind;
use acs_chat_core::RagErr;
use acs_chat_core::generation::GenerationError;

/// A short, user-facing explanation of `err`. The full error is in the logs.
pub fn describe(err: &RagErr) -> String {
    match err.kind() {
        ErrorKind::InvalidInput => {
            "I couldn't make out a question there. Please rephrase it and try again.".to_string()
        }
        ErrorKind::RetrievalUnavailable => {
            "The ACS table search is unavailable right now, so I can't look anything up. \
             Please try again in a moment."
                .to_string()
        }
        ErrorKind::GenerationUnavailable => match err {
            RagErr::GenerationUnavailable(GenerationError::Api {
                status: 429,
                retry_after: Some(wait),
                ..
            }) => format!(
                "The language model is rate limited. Please try again in {} seconds.",
                wait.as_secs().max(1)
            ),
            RagErr::GenerationUnavailable(inner) if inner.is_auth_failure() => {
                "The language model rejected our credentials. Check GROQ_API_KEY.".to_string()
            }
            _ => "The language model is unavailable right now. Please try again in a moment."
                .to_string(),
        },
        ErrorKind::Cancelled => "Question cancelled.".to_string(),
        ErrorKind::InvalidConfig => format!("Configuration problem: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acs_chat_core::retrieval::RetrievalError;
    use std::time::Duration;

    #[test]
    fn test_each_kind_has_its_own_message() {
        let errors = [
            RagErr::invalid_input("question is empty"),
            RagErr::RetrievalUnavailable(RetrievalError::TimedOut(Duration::from_secs(5))),
            RagErr::GenerationUnavailable(GenerationError::EmptyCompletion),
            RagErr::Cancelled,
            RagErr::invalid_config("GROQ_API_KEY is not set"),
        ];
        let messages: Vec<String> = errors.iter().map(describe).collect();
        for (i, a) in messages.iter().enumerate() {
            for b in &messages[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert!(messages[4].contains("GROQ_API_KEY"));
    }

    #[test]
    fn test_rate_limit_mentions_wait() {
        let err = RagErr::GenerationUnavailable(GenerationError::Api {
            status: 429,
            message: "slow down".to_string(),
            retry_after: Some(Duration::from_secs(7)),
        });
        assert!(describe(&err).contains("7 seconds"));
    }
}
