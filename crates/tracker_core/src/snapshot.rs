use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::OperationStatus;

pub type OperationId = String;

/// One server-reported observation of an operation, exactly as polled.
///
/// Every field except `id` may be missing from the wire payload and falls back
/// to its default, so a partial entry still merges.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSnapshot {
    pub id: OperationId,
    pub status: OperationStatus,
    pub progress_percentage: Option<f64>,
    pub pages_processed: Option<u64>,
    pub code_examples_found: Option<u64>,
    pub current_depth: Option<u32>,
    pub max_depth: Option<u32>,
    pub target_url: String,
    pub error_message: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    pub operation_type: Option<String>,
    pub total_pages: Option<u64>,
    pub current_url: Option<String>,
    pub message: Option<String>,
}

impl RawSnapshot {
    pub fn new(id: impl Into<OperationId>, status: impl Into<OperationStatus>) -> Self {
        Self {
            id: id.into(),
            status: status.into(),
            ..Self::default()
        }
    }

    pub fn with_progress(mut self, progress: f64) -> Self {
        self.progress_percentage = Some(progress);
        self
    }

    pub fn with_pages(mut self, pages: u64) -> Self {
        self.pages_processed = Some(pages);
        self
    }

    pub fn with_code_examples(mut self, found: u64) -> Self {
        self.code_examples_found = Some(found);
        self
    }

    pub fn with_depth(mut self, current: Option<u32>, max: Option<u32>) -> Self {
        self.current_depth = current;
        self.max_depth = max;
        self
    }

    pub fn with_target_url(mut self, url: impl Into<String>) -> Self {
        self.target_url = url.into();
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }
}
