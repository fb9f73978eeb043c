use chrono::{DateTime, Utc};

use crate::{OperationId, OperationStatus};

/// Depth label used when the backend reports neither current nor max depth.
pub const UNKNOWN_DEPTH: &str = "unknown";

/// Monotonically adjusted, terminal-locked view of one operation.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayState {
    pub id: OperationId,
    pub status: OperationStatus,
    pub display_progress: f64,
    pub display_pages_processed: u64,
    pub display_code_examples: u64,
    pub depth_label: String,
    pub target_url: String,
    pub error_message: Option<String>,
    pub operation_type: Option<String>,
    pub total_pages: Option<u64>,
    pub current_url: Option<String>,
    pub message: Option<String>,
    pub last_seen_at: DateTime<Utc>,
    pub terminal_locked_at: Option<DateTime<Utc>>,
}

impl DisplayState {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Registry entry: either confirmed by the last poll, or carrying an
/// acknowledged stop request that no poll has confirmed yet.
///
/// Only a poll moves an entry back to `Confirmed`; the status itself is never
/// set to cancelled locally.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackedOperation {
    Confirmed(DisplayState),
    PendingCancel {
        state: DisplayState,
        unconfirmed_polls: u32,
    },
}

impl TrackedOperation {
    pub fn state(&self) -> &DisplayState {
        match self {
            TrackedOperation::Confirmed(state) => state,
            TrackedOperation::PendingCancel { state, .. } => state,
        }
    }

    pub fn is_pending_cancel(&self) -> bool {
        matches!(self, TrackedOperation::PendingCancel { .. })
    }
}
