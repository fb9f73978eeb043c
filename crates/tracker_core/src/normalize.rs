use std::fmt;

use chrono::{DateTime, Utc};

use crate::{DisplayState, RawSnapshot, UNKNOWN_DEPTH};

/// Width of the windows a processed-item counter is presented in.
pub const BATCH_WIDTH: u64 = 50;

/// Pure merge: folds one raw snapshot into the previous display state.
///
/// While the result is non-terminal the progress, page and code-example
/// counters never drop below their previous values. A terminal previous state
/// is returned untouched, whatever the snapshot says. Depth is taken as
/// reported; it is not held monotonic. An empty target URL keeps the previous
/// one.
pub fn merge(
    previous: Option<&DisplayState>,
    raw: &RawSnapshot,
    now: DateTime<Utc>,
) -> DisplayState {
    if let Some(prev) = previous {
        if prev.is_terminal() {
            return prev.clone();
        }
    }

    let raw_progress = raw
        .progress_percentage
        .filter(|value| value.is_finite())
        .unwrap_or(0.0);
    let prev_progress = previous.map_or(0.0, |prev| prev.display_progress);
    let display_progress = raw_progress.max(prev_progress).clamp(0.0, 100.0);

    let display_pages_processed = raw
        .pages_processed
        .unwrap_or(0)
        .max(previous.map_or(0, |prev| prev.display_pages_processed));
    let display_code_examples = raw
        .code_examples_found
        .unwrap_or(0)
        .max(previous.map_or(0, |prev| prev.display_code_examples));

    let depth_label = raw
        .current_depth
        .or(raw.max_depth)
        .map_or_else(|| UNKNOWN_DEPTH.to_string(), |depth| depth.to_string());

    // Partial snapshots often omit the URL; keep the one already known.
    let target_url = match previous {
        Some(prev) if raw.target_url.is_empty() => prev.target_url.clone(),
        _ => raw.target_url.clone(),
    };

    let terminal_locked_at = if raw.status.is_terminal() {
        Some(now)
    } else {
        None
    };

    DisplayState {
        id: raw.id.clone(),
        status: raw.status.clone(),
        display_progress,
        display_pages_processed,
        display_code_examples,
        depth_label,
        target_url,
        error_message: raw.error_message.clone(),
        operation_type: raw.operation_type.clone(),
        total_pages: raw.total_pages,
        current_url: raw.current_url.clone(),
        message: raw.message.clone(),
        last_seen_at: now,
        terminal_locked_at,
    }
}

/// Inclusive window of a processed-item counter, e.g. `101-112`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchRange {
    pub start: u64,
    pub end: u64,
}

impl BatchRange {
    /// True for a counter of zero, where the window is `1-0`.
    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

impl fmt::Display for BatchRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Returns the current [`BATCH_WIDTH`]-wide window containing item `n`.
pub fn range_for(n: u64) -> BatchRange {
    if n == 0 {
        return BatchRange { start: 1, end: 0 };
    }
    let start = (n - 1) / BATCH_WIDTH * BATCH_WIDTH + 1;
    let end = (start + BATCH_WIDTH - 1).min(n);
    BatchRange { start, end }
}
