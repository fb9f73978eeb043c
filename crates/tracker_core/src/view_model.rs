use chrono::{DateTime, Utc};

use crate::{range_for, BatchRange, DisplayState};

/// Poll feed health, so readers can flag stale data without the registry
/// discarding it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FeedHealth {
    pub consecutive_failures: u32,
    pub last_success_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OperationView {
    pub state: DisplayState,
    pub pending_cancel: bool,
    pub pages_range: BatchRange,
}

impl OperationView {
    pub fn new(state: &DisplayState, pending_cancel: bool) -> Self {
        Self {
            pages_range: range_for(state.display_pages_processed),
            state: state.clone(),
            pending_cancel,
        }
    }
}

/// Read-only copy of the registry handed to listeners, in first-seen order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RegistrySnapshot {
    pub operations: Vec<OperationView>,
    pub health: FeedHealth,
}

impl RegistrySnapshot {
    pub fn is_stale(&self) -> bool {
        self.health.consecutive_failures > 0
    }

    pub fn find(&self, id: &str) -> Option<&OperationView> {
        self.operations.iter().find(|view| view.state.id == id)
    }
}
