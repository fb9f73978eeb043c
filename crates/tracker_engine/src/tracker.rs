use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tracker_core::{
    merge, OperationRegistry, OperationView, RegistrySettings, RegistrySnapshot, Subscription,
};
use tracker_logging::{tracker_debug, tracker_info, tracker_warn};

use crate::{
    CommandDispatcher, PollScheduler, ProgressSource, RetryPolicy, SchedulerSettings,
    SchedulerStats, SourceError, StopError, StopOutcome, TickContext, VisibilitySignal,
};

/// The registry as shared between the poll cycle, the dispatcher and readers.
/// The lock is never held across an await.
pub type SharedRegistry = Arc<Mutex<OperationRegistry>>;

/// Wall clock used to stamp merges and age terminal entries.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub(crate) fn lock_registry(registry: &SharedRegistry) -> MutexGuard<'_, OperationRegistry> {
    registry
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Runs one writing pass under the registry lock, then calls listeners once
/// the lock is released so they can read the registry themselves.
pub(crate) fn write_registry<T>(
    registry: &SharedRegistry,
    pass: impl FnOnce(&mut OperationRegistry) -> T,
) -> T {
    let (value, notification) = {
        let mut guard = lock_registry(registry);
        let value = pass(&mut *guard);
        (value, guard.take_notification())
    };
    if let Some(notification) = notification {
        notification.deliver();
    }
    value
}

#[derive(Clone)]
pub struct TrackerSettings {
    pub scheduler: SchedulerSettings,
    pub retry: RetryPolicy,
    pub registry: RegistrySettings,
    pub clock: Clock,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            scheduler: SchedulerSettings::default(),
            retry: RetryPolicy::default(),
            registry: RegistrySettings::default(),
            clock: Arc::new(Utc::now),
        }
    }
}

/// Composition of source, registry, scheduler and dispatcher. Created at the
/// composition root and torn down with [`ProgressTracker::stop`] or drop.
pub struct ProgressTracker {
    source: Arc<dyn ProgressSource>,
    registry: SharedRegistry,
    scheduler: PollScheduler,
    dispatcher: CommandDispatcher,
    retry: RetryPolicy,
    clock: Clock,
}

impl ProgressTracker {
    pub fn new(
        source: Arc<dyn ProgressSource>,
        settings: TrackerSettings,
        visibility: VisibilitySignal,
    ) -> Self {
        let registry: SharedRegistry =
            Arc::new(Mutex::new(OperationRegistry::new(settings.registry)));
        let dispatcher = CommandDispatcher::new(source.clone(), registry.clone());
        Self {
            source,
            registry,
            scheduler: PollScheduler::new(settings.scheduler, visibility),
            dispatcher,
            retry: settings.retry,
            clock: settings.clock,
        }
    }

    pub fn registry(&self) -> SharedRegistry {
        self.registry.clone()
    }

    pub fn dispatcher(&self) -> CommandDispatcher {
        self.dispatcher.clone()
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        lock_registry(&self.registry).snapshot()
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&RegistrySnapshot) + Send + Sync + 'static,
    {
        lock_registry(&self.registry).subscribe(listener)
    }

    /// Starts polling; the first cycle runs immediately.
    pub fn start(&mut self) {
        let source = self.source.clone();
        let registry = self.registry.clone();
        let retry = self.retry;
        let clock = self.clock.clone();
        self.scheduler.start(move |ctx| {
            let source = source.clone();
            let registry = registry.clone();
            let clock = clock.clone();
            async move { run_cycle(source.as_ref(), &registry, &retry, &clock, ctx).await }
        });
        tracker_info!("Progress tracker started");
    }

    pub fn stop(&mut self) {
        self.scheduler.stop();
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    pub fn scheduler_stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }

    pub async fn request_stop(&self, id: &str) -> Result<StopOutcome, StopError> {
        self.dispatcher.request_stop(id).await
    }

    /// Fetches one operation and previews how it would merge, without
    /// writing to the registry.
    pub async fn inspect(&self, id: &str) -> Result<OperationView, SourceError> {
        let raw = self
            .retry
            .run("inspect", || self.source.get_operation(id))
            .await?;
        let registry = lock_registry(&self.registry);
        let tracked = registry.get(&raw.id);
        let merged = merge(tracked.map(|t| t.state()), &raw, (self.clock)());
        Ok(OperationView::new(
            &merged,
            tracked.is_some_and(|t| t.is_pending_cancel()),
        ))
    }
}

/// One fetch-and-merge cycle. Failures never clear state; they only mark the
/// feed as failing.
pub(crate) async fn run_cycle(
    source: &dyn ProgressSource,
    registry: &SharedRegistry,
    retry: &RetryPolicy,
    clock: &Clock,
    ctx: TickContext,
) {
    // Taken before the fetch: terminal ages follow tick spacing.
    let now = clock();
    match retry.run("list operations", || source.list_operations()).await {
        Ok(batch) => write_registry(registry, |registry| {
            let report = registry.apply_batch(&batch, now);
            for id in &report.created {
                tracker_debug!("Tracking new operation {}", id);
            }
            for id in &report.locked {
                tracker_info!("Operation {} reached a terminal status", id);
            }
            for id in &report.cancel_expired {
                tracker_info!("Stop for {} unconfirmed; pending flag cleared", id);
            }
            let purged = registry.purge_terminal(now, ctx.interval);
            if !purged.is_empty() {
                tracker_debug!("Purged finished operations: {:?}", purged);
            }
        }),
        Err(err) => {
            tracker_warn!("Poll cycle {} abandoned: {}", ctx.cycle, err);
            write_registry(registry, OperationRegistry::record_failure);
        }
    }
}
