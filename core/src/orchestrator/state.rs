//! Request lifecycle states with transition tracking.

use std::fmt;
use std::time::SystemTime;

use tracing::debug;

use crate::error::ErrorKind;

/// `Idle → Retrieving → Assembling → Generating → Completed`, or
/// `Failed(kind)` from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RagState {
    Idle,
    Retrieving,
    Assembling,
    Generating,
    Completed,
    Failed(ErrorKind),
}

impl RagState {
    pub const fn name(&self) -> &'static str {
        match self {
            RagState::Idle => "Idle",
            RagState::Retrieving => "Retrieving",
            RagState::Assembling => "Assembling",
            RagState::Generating => "Generating",
            RagState::Completed => "Completed",
            RagState::Failed(_) => "Failed",
        }
    }

    pub const fn is_terminal(&self) -> bool {
        matches!(self, RagState::Completed | RagState::Failed(_))
    }

    pub const fn can_transition_to(&self, next: &RagState) -> bool {
        match (self, next) {
            (state, RagState::Failed(_)) => !state.is_terminal(),
            (RagState::Idle, RagState::Retrieving)
            | (RagState::Retrieving, RagState::Assembling)
            | (RagState::Assembling, RagState::Generating)
            | (RagState::Generating, RagState::Completed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for RagState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RagState::Failed(kind) => write!(f, "Failed({kind})"),
            other => f.write_str(other.name()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StateTransition {
    pub from: RagState,
    pub to: RagState,
    pub timestamp: SystemTime,
}

/// Current state plus the path taken to reach it, for one request.
#[derive(Debug)]
pub(crate) struct RunTracker {
    state: RagState,
    transitions: Vec<StateTransition>,
}

impl RunTracker {
    pub(crate) const fn new() -> Self {
        Self {
            state: RagState::Idle,
            transitions: Vec::new(),
        }
    }

    pub(crate) const fn state(&self) -> RagState {
        self.state
    }

    pub(crate) fn advance(&mut self, next: RagState) {
        debug_assert!(
            self.state.can_transition_to(&next),
            "invalid transition {} -> {}",
            self.state,
            next
        );
        debug!(from = %self.state, to = %next, "state transition");
        self.transitions.push(StateTransition {
            from: self.state,
            to: next,
            timestamp: SystemTime::now(),
        });
        self.state = next;
    }

    pub(crate) fn into_transitions(self) -> Vec<StateTransition> {
        self.transitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_is_allowed() {
        let path = [
            RagState::Idle,
            RagState::Retrieving,
            RagState::Assembling,
            RagState::Generating,
            RagState::Completed,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(&pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_terminal_states_are_final() {
        let failed = RagState::Failed(ErrorKind::Cancelled);
        assert!(!RagState::Completed.can_transition_to(&RagState::Idle));
        assert!(!RagState::Completed.can_transition_to(&failed));
        assert!(!failed.can_transition_to(&RagState::Retrieving));
    }

    #[test]
    fn test_no_skipping_steps() {
        assert!(!RagState::Idle.can_transition_to(&RagState::Generating));
        assert!(!RagState::Retrieving.can_transition_to(&RagState::Completed));
    }

    #[test]
    fn test_tracker_records_path() {
        let mut tracker = RunTracker::new();
        tracker.advance(RagState::Retrieving);
        tracker.advance(RagState::Failed(ErrorKind::RetrievalUnavailable));
        assert_eq!(
            tracker.state(),
            RagState::Failed(ErrorKind::RetrievalUnavailable)
        );
        let transitions = tracker.into_transitions();
        assert_eq!(transitions.len(), 2);
        assert_eq!(transitions[0].from, RagState::Idle);
        assert_eq!(
            transitions[1].to.to_string(),
            "Failed(retrieval_unavailable)"
        );
    }
}
