//! Tracker engine: polling, scheduling and command dispatch around the pure
//! registry in `tracker_core`.
mod decode;
mod dispatcher;
mod retry;
mod scheduler;
mod source;
mod tracker;
mod types;
mod visibility;

pub use decode::{decode_batch, decode_snapshot, DecodedBatch};
pub use dispatcher::CommandDispatcher;
pub use retry::RetryPolicy;
pub use scheduler::{PollScheduler, SchedulerSettings, SchedulerStats, TickContext};
pub use source::{ProgressSource, ReqwestProgressSource, SourceSettings};
pub use tracker::{Clock, ProgressTracker, SharedRegistry, TrackerSettings};
pub use types::{FailureKind, SourceError, StopError, StopOutcome};
pub use visibility::{Visibility, VisibilityController, VisibilitySignal};
