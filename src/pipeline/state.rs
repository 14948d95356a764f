//! Lifecycle of a single search session.

use serde::Serialize;
use std::fmt;

/// Where a search session currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchState {
    #[default]
    Idle,
    Searching,
    Summarizing,
    Done,
    Failed,
}

impl SearchState {
    /// Status label shown to the user
    pub fn label(&self) -> &'static str {
        match self {
            SearchState::Idle | SearchState::Failed => "Search",
            SearchState::Searching => "Searching...",
            SearchState::Summarizing => "Summarizing...",
            SearchState::Done => "Done",
        }
    }

    /// Whether a new run may start from this state
    pub fn is_ready(&self) -> bool {
        allowed(*self, SearchState::Searching)
    }

    /// Whether a run is in flight
    pub fn is_busy(&self) -> bool {
        matches!(self, SearchState::Searching | SearchState::Summarizing)
    }
}

impl fmt::Display for SearchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Illegal state transition: {from:?} -> {to:?}")]
pub struct TransitionError {
    pub from: SearchState,
    pub to: SearchState,
}

/// Validates a state transition.
pub fn validate_transition(from: SearchState, to: SearchState) -> Result<(), TransitionError> {
    if allowed(from, to) {
        Ok(())
    } else {
        Err(TransitionError { from, to })
    }
}

pub fn allowed_transitions(from: SearchState) -> Vec<SearchState> {
    use SearchState::*;
    match from {
        Idle => vec![Searching],
        Searching => vec![Summarizing, Failed],
        Summarizing => vec![Done, Failed],
        Done => vec![Searching],
        Failed => vec![Searching],
    }
}

fn allowed(from: SearchState, to: SearchState) -> bool {
    allowed_transitions(from).into_iter().any(|s| s == to)
}
