use std::borrow::Cow;
use std::fmt::Write as _;

use tracing::debug;

use super::PromptMessage;
use super::PromptMessageSequence;
use super::SystemPolicy;
use crate::conversation::ConversationHistory;
use crate::conversation::DEFAULT_HISTORY_WINDOW;
use crate::retrieval::Excerpt;
use crate::retrieval::ExcerptSet;
use crate::retrieval::Question;

/// Line placed between serialized excerpts. Table text never contains a run
/// of dashes this long.
pub const EXCERPT_DELIMITER: &str = "------------------------------------------------------";

/// Stands in for the excerpt section when retrieval legitimately found nothing.
pub const NO_EXCERPTS_MARKER: &str = "[no matching excerpts found]";

/// Appended to the top excerpt when it alone is over budget.
pub const TRUNCATION_MARKER: &str = "[excerpt truncated]";

pub const DEFAULT_EXCERPT_BUDGET_CHARS: usize = 12_000;

/// Builds the message sequence for one backend call.
///
/// Pure: the output depends only on the arguments and the assembler's window
/// and budget, so identical inputs always give an identical sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptAssembler {
    history_window: usize,
    excerpt_budget_chars: usize,
}

impl Default for PromptAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_WINDOW, DEFAULT_EXCERPT_BUDGET_CHARS)
    }
}

struct FittedExcerpt<'a> {
    excerpt: &'a Excerpt,
    text: Cow<'a, str>,
}

impl PromptAssembler {
    pub const fn new(history_window: usize, excerpt_budget_chars: usize) -> Self {
        Self {
            history_window,
            excerpt_budget_chars,
        }
    }

    pub const fn history_window(&self) -> usize {
        self.history_window
    }

    pub const fn excerpt_budget_chars(&self) -> usize {
        self.excerpt_budget_chars
    }

    pub fn assemble(
        &self,
        policy: &SystemPolicy,
        history: &ConversationHistory,
        question: &Question,
        excerpts: &ExcerptSet,
    ) -> PromptMessageSequence {
        let window = history.window(self.history_window);

        let mut messages = Vec::with_capacity(window.len() + 2);
        messages.push(PromptMessage::system(policy.as_str()));
        messages.extend(window.iter().map(PromptMessage::from));
        messages.push(PromptMessage::user(self.user_message(question, excerpts)));

        PromptMessageSequence(messages)
    }

    fn user_message(&self, question: &Question, excerpts: &ExcerptSet) -> String {
        let body = if excerpts.is_empty() {
            NO_EXCERPTS_MARKER.to_string()
        } else {
            let separator = format!("\n\n{EXCERPT_DELIMITER}\n\n");
            self.fit_to_budget(excerpts)
                .iter()
                .enumerate()
                .map(|(i, fitted)| render_excerpt(i + 1, fitted))
                .collect::<Vec<_>>()
                .join(separator.as_str())
        };

        format!("User Question: {question}\n\nRelevant Data Excerpt(s):\n\n{body}")
    }

    /// Drop excerpts from the low-relevance end until the combined text fits.
    /// The top match always survives; if it alone is too long it is cut to
    /// the budget and marked.
    fn fit_to_budget<'a>(&self, excerpts: &'a ExcerptSet) -> Vec<FittedExcerpt<'a>> {
        let all = excerpts.as_slice();
        let lengths: Vec<usize> = all.iter().map(|e| e.content.chars().count()).collect();
        let mut total: usize = lengths.iter().sum();
        let mut kept = all.len();

        while kept > 1 && total > self.excerpt_budget_chars {
            kept -= 1;
            total -= lengths[kept];
        }
        if kept < all.len() {
            debug!(
                dropped = all.len() - kept,
                budget = self.excerpt_budget_chars,
                "dropped low-relevance excerpts over budget"
            );
        }

        all[..kept]
            .iter()
            .map(|excerpt| {
                let text = if total > self.excerpt_budget_chars {
                    debug!(budget = self.excerpt_budget_chars, "truncated top excerpt");
                    let cut: String = excerpt
                        .content
                        .chars()
                        .take(self.excerpt_budget_chars)
                        .collect();
                    Cow::Owned(format!("{cut}\n{TRUNCATION_MARKER}"))
                } else {
                    Cow::Borrowed(excerpt.content.as_str())
                };
                FittedExcerpt { excerpt, text }
            })
            .collect()
    }
}

fn render_excerpt(position: usize, fitted: &FittedExcerpt<'_>) -> String {
    let mut header = format!("[Excerpt {position}]");
    let excerpt = fitted.excerpt;
    match (&excerpt.source, excerpt.score) {
        (Some(source), Some(score)) => {
            let _ = write!(header, " (source: {source}, score: {score:.3})");
        }
        (Some(source), None) => {
            let _ = write!(header, " (source: {source})");
        }
        (None, Some(score)) => {
            let _ = write!(header, " (score: {score:.3})");
        }
        (None, None) => {}
    }
    format!("{header}\n{}", fitted.text)
}
