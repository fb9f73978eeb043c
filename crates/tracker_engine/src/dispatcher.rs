use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures_util::future::{BoxFuture, FutureExt, Shared};
use tracker_core::OperationId;
use tracker_logging::{tracker_debug, tracker_info, tracker_warn};

use crate::tracker::{lock_registry, write_registry, SharedRegistry};
use crate::{ProgressSource, StopError, StopOutcome};

type StopFuture = Shared<BoxFuture<'static, Result<StopOutcome, StopError>>>;

/// Issues stop requests, at most one in flight per operation id.
#[derive(Clone)]
pub struct CommandDispatcher {
    source: Arc<dyn ProgressSource>,
    registry: SharedRegistry,
    in_flight: Arc<Mutex<HashMap<OperationId, StopFuture>>>,
}

impl CommandDispatcher {
    pub fn new(source: Arc<dyn ProgressSource>, registry: SharedRegistry) -> Self {
        Self {
            source,
            registry,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn is_stop_in_flight(&self, id: &str) -> bool {
        self.in_flight
            .lock()
            .map(|map| map.contains_key(id))
            .unwrap_or(false)
    }

    /// Asks the backend to stop `id`. A second call while the first is still
    /// outstanding sends nothing and resolves to the first call's outcome.
    ///
    /// On acknowledgement the entry is flagged pending-cancel; its status is
    /// left for the next poll to confirm. Failures leave the registry as is.
    pub async fn request_stop(&self, id: &str) -> Result<StopOutcome, StopError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(StopError::EmptyId);
        }

        let already_terminal = lock_registry(&self.registry)
            .get(id)
            .is_some_and(|tracked| tracked.state().is_terminal());
        if already_terminal {
            tracker_debug!("Stop for {} skipped; operation already finished", id);
            return Ok(StopOutcome::AlreadyFinished);
        }

        let request = {
            let mut in_flight = self
                .in_flight
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            match in_flight.get(id) {
                Some(existing) => {
                    tracker_debug!("Stop for {} already in flight; joining it", id);
                    existing.clone()
                }
                None => {
                    let request = dispatch_stop(
                        self.source.clone(),
                        self.registry.clone(),
                        self.in_flight.clone(),
                        id.to_string(),
                    )
                    .boxed()
                    .shared();
                    in_flight.insert(id.to_string(), request.clone());
                    request
                }
            }
        };

        request.await
    }
}

async fn dispatch_stop(
    source: Arc<dyn ProgressSource>,
    registry: SharedRegistry,
    in_flight: Arc<Mutex<HashMap<OperationId, StopFuture>>>,
    id: OperationId,
) -> Result<StopOutcome, StopError> {
    tracker_info!("Requesting stop for {}", id);
    let result = source.stop_operation(&id).await;

    let outcome = match result {
        Ok(()) => {
            if write_registry(&registry, |registry| registry.mark_pending_cancel(&id)) {
                tracker_info!("Stop for {} acknowledged; awaiting confirmation", id);
            } else {
                tracker_info!("Stop for {} acknowledged; no live entry to flag", id);
            }
            Ok(StopOutcome::Acknowledged)
        }
        Err(error) => {
            tracker_warn!("Stop for {} failed: {}", id, error);
            Err(StopError::Transport {
                id: id.clone(),
                error,
            })
        }
    };

    if let Ok(mut map) = in_flight.lock() {
        map.remove(&id);
    }
    outcome
}
