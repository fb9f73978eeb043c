use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracker_logging::{set_poll_cycle, tracker_debug, tracker_warn};

use crate::{Visibility, VisibilitySignal};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerSettings {
    pub visible_interval: Duration,
    pub hidden_interval: Duration,
    /// A cycle older than `stall_factor` × the current interval is treated
    /// as hung and replaced.
    pub stall_factor: u32,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            visible_interval: Duration::from_millis(1000),
            hidden_interval: Duration::from_millis(10_000),
            stall_factor: 2,
        }
    }
}

impl SchedulerSettings {
    pub fn interval_for(&self, visibility: Visibility) -> Duration {
        match visibility {
            Visibility::Visible => self.visible_interval,
            Visibility::Hidden => self.hidden_interval,
        }
    }

    pub fn stall_threshold(&self, interval: Duration) -> Duration {
        interval.saturating_mul(self.stall_factor)
    }
}

/// Passed to every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickContext {
    pub cycle: u64,
    pub interval: Duration,
    pub visibility: Visibility,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchedulerStats {
    pub ticks_started: u64,
    pub ticks_skipped: u64,
    pub forced_clears: u64,
}

#[derive(Debug, Default)]
struct StatsCounters {
    started: AtomicU64,
    skipped: AtomicU64,
    forced: AtomicU64,
}

struct Running {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Owns the single repeating poll timer.
///
/// At most one tick runs at a time: a due tick is skipped while the previous
/// one is unfinished, unless that one has outlived the stall threshold, in
/// which case it is aborted and replaced.
pub struct PollScheduler {
    settings: SchedulerSettings,
    visibility: VisibilitySignal,
    stats: Arc<StatsCounters>,
    running: Option<Running>,
}

impl PollScheduler {
    pub fn new(settings: SchedulerSettings, visibility: VisibilitySignal) -> Self {
        Self {
            settings,
            visibility,
            stats: Arc::new(StatsCounters::default()),
            running: None,
        }
    }

    /// Ticks once immediately, then on every interval. Must be called from
    /// within a tokio runtime. Calling it while running is a no-op.
    pub fn start<F, Fut>(&mut self, on_tick: F)
    where
        F: Fn(TickContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if self.is_running() {
            tracker_warn!("Poll scheduler already running; start ignored");
            return;
        }
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_loop(
            self.settings.clone(),
            self.visibility.clone(),
            self.stats.clone(),
            cancel.clone(),
            on_tick,
        ));
        self.running = Some(Running { cancel, task });
    }

    /// Cancels the timer and any in-flight tick. Idempotent.
    pub fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            running.cancel.cancel();
            tracker_debug!("Poll scheduler stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|running| !running.task.is_finished())
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            ticks_started: self.stats.started.load(Ordering::Relaxed),
            ticks_skipped: self.stats.skipped.load(Ordering::Relaxed),
            forced_clears: self.stats.forced.load(Ordering::Relaxed),
        }
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

struct InFlight {
    handle: JoinHandle<()>,
    started: Instant,
}

async fn run_loop<F, Fut>(
    settings: SchedulerSettings,
    mut visibility: VisibilitySignal,
    stats: Arc<StatsCounters>,
    cancel: CancellationToken,
    on_tick: F,
) where
    F: Fn(TickContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let mut in_flight: Option<InFlight> = None;
    let mut cycle = 0u64;
    let mut deadline = Instant::now();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = sleep_until(deadline) => {
                let current = visibility.current();
                let interval = settings.interval_for(current);
                let threshold = settings.stall_threshold(interval);

                let busy = match in_flight.take() {
                    Some(previous) if !previous.handle.is_finished() => {
                        let age = previous.started.elapsed();
                        if age > threshold {
                            tracker_warn!(
                                "Poll cycle {} hung for {:?} (limit {:?}); replacing it",
                                cycle,
                                age,
                                threshold
                            );
                            previous.handle.abort();
                            // Wait for the abort to land so two cycles never overlap.
                            let _ = previous.handle.await;
                            stats.forced.fetch_add(1, Ordering::Relaxed);
                            false
                        } else {
                            tracker_debug!("Poll cycle {} still in flight; tick skipped", cycle);
                            stats.skipped.fetch_add(1, Ordering::Relaxed);
                            in_flight = Some(previous);
                            true
                        }
                    }
                    _ => false,
                };

                if !busy {
                    cycle += 1;
                    set_poll_cycle(cycle);
                    stats.started.fetch_add(1, Ordering::Relaxed);
                    let tick = on_tick(TickContext {
                        cycle,
                        interval,
                        visibility: current,
                    });
                    in_flight = Some(InFlight {
                        handle: tokio::spawn(tick),
                        started: Instant::now(),
                    });
                }
                deadline = Instant::now() + interval;
            }
            next = visibility.changed() => {
                let interval = settings.interval_for(next);
                tracker_debug!("Visibility now {:?}; next tick in {:?}", next, interval);
                deadline = Instant::now() + interval;
            }
        }
    }

    if let Some(previous) = in_flight.take() {
        previous.handle.abort();
    }
}
