use std::fmt;

use serde::{Deserialize, Serialize};

/// Status string reported by the backend for one operation.
///
/// Known pipeline states are parsed case-insensitively; anything else is kept
/// verbatim in [`OperationStatus::Other`] and treated as non-terminal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OperationStatus {
    Pending,
    Starting,
    Crawling,
    Processing,
    DocumentStorage,
    CodeExtraction,
    Running,
    Stopping,
    Completed,
    Error,
    Failed,
    Cancelled,
    Other(String),
}

impl OperationStatus {
    /// Terminal statuses lock the display state for good.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OperationStatus::Completed
                | OperationStatus::Error
                | OperationStatus::Failed
                | OperationStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &str {
        match self {
            OperationStatus::Pending => "pending",
            OperationStatus::Starting => "starting",
            OperationStatus::Crawling => "crawling",
            OperationStatus::Processing => "processing",
            OperationStatus::DocumentStorage => "document_storage",
            OperationStatus::CodeExtraction => "code_extraction",
            OperationStatus::Running => "running",
            OperationStatus::Stopping => "stopping",
            OperationStatus::Completed => "completed",
            OperationStatus::Error => "error",
            OperationStatus::Failed => "failed",
            OperationStatus::Cancelled => "cancelled",
            OperationStatus::Other(raw) => raw,
        }
    }
}

impl Default for OperationStatus {
    fn default() -> Self {
        OperationStatus::Other("unknown".to_string())
    }
}

impl From<&str> for OperationStatus {
    fn from(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "pending" => OperationStatus::Pending,
            "starting" => OperationStatus::Starting,
            "crawling" => OperationStatus::Crawling,
            "processing" => OperationStatus::Processing,
            "document_storage" => OperationStatus::DocumentStorage,
            "code_extraction" => OperationStatus::CodeExtraction,
            "running" | "in_progress" => OperationStatus::Running,
            "stopping" => OperationStatus::Stopping,
            "completed" => OperationStatus::Completed,
            "error" => OperationStatus::Error,
            "failed" => OperationStatus::Failed,
            "cancelled" | "canceled" => OperationStatus::Cancelled,
            _ => OperationStatus::Other(trimmed.to_string()),
        }
    }
}

impl From<String> for OperationStatus {
    fn from(raw: String) -> Self {
        OperationStatus::from(raw.as_str())
    }
}

impl From<OperationStatus> for String {
    fn from(status: OperationStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
