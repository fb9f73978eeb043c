use std::fmt;

use thiserror::Error;
use tracker_core::OperationId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct SourceError {
    pub kind: FailureKind,
    pub message: String,
}

impl SourceError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Whether another attempt within the same tick may succeed.
    pub fn is_transient(&self) -> bool {
        match self.kind {
            FailureKind::Timeout | FailureKind::Network => true,
            FailureKind::HttpStatus(code) => code == 429 || code >= 500,
            FailureKind::InvalidUrl | FailureKind::Decode | FailureKind::Rejected => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Decode,
    Rejected,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Decode => write!(f, "malformed response"),
            FailureKind::Rejected => write!(f, "rejected by backend"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

/// Recoverable failure of a stop request. Registry state is untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StopError {
    #[error("operation id is empty")]
    EmptyId,
    #[error("stop request for {id} failed: {error}")]
    Transport {
        id: OperationId,
        #[source]
        error: SourceError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The backend accepted the request; a later poll confirms it.
    Acknowledged,
    /// The registry already holds a terminal status; nothing was sent.
    AlreadyFinished,
}
