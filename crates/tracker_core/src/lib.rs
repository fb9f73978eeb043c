//! Tracker core: pure snapshot normalization and the operation registry.
mod display;
mod normalize;
mod registry;
mod snapshot;
mod status;
mod view_model;

pub use display::{DisplayState, TrackedOperation, UNKNOWN_DEPTH};
pub use normalize::{merge, range_for, BatchRange, BATCH_WIDTH};
pub use registry::{
    ApplyReport, Notification, OperationRegistry, RegistryListener, RegistrySettings,
    Subscription,
};
pub use snapshot::{OperationId, RawSnapshot};
pub use status::OperationStatus;
pub use view_model::{FeedHealth, OperationView, RegistrySnapshot};
