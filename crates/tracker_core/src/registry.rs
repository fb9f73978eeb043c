use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::{
    merge, FeedHealth, OperationId, OperationView, RawSnapshot, RegistrySnapshot,
    TrackedOperation,
};

pub type RegistryListener = Arc<dyn Fn(&RegistrySnapshot) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrySettings {
    /// Polls that may still report a non-terminal status after an
    /// acknowledged stop before the pending-cancel marker is dropped.
    pub cancel_confirm_polls: u32,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            cancel_confirm_polls: 5,
        }
    }
}

/// What one `apply_batch` pass did, for the caller to log.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ApplyReport {
    pub created: Vec<OperationId>,
    pub locked: Vec<OperationId>,
    pub cancel_expired: Vec<OperationId>,
}

#[derive(Default)]
struct ListenerList {
    next_id: u64,
    listeners: Vec<(u64, RegistryListener)>,
}

/// Handle returned by [`OperationRegistry::subscribe`]. Dropping it, or
/// calling [`Subscription::unsubscribe`], removes the listener.
#[must_use = "dropping a Subscription unsubscribes the listener"]
pub struct Subscription {
    id: u64,
    listeners: Weak<Mutex<ListenerList>>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            if let Ok(mut list) = listeners.lock() {
                list.listeners.retain(|(id, _)| *id != self.id);
            }
        }
    }
}

/// Listener calls owed by the registry passes since the last
/// [`OperationRegistry::take_notification`], one snapshot per pass.
///
/// Deliver it after releasing whatever lock guards the registry, so a
/// listener may read the registry again.
#[must_use = "listeners are not called until the notification is delivered"]
pub struct Notification {
    snapshots: Vec<RegistrySnapshot>,
    listeners: Vec<RegistryListener>,
}

impl Notification {
    pub fn deliver(self) {
        for snapshot in &self.snapshots {
            for listener in &self.listeners {
                listener(snapshot);
            }
        }
    }
}

/// Authoritative map from operation id to its tracked display state.
///
/// Written only by the poll cycle (plus the pending-cancel marker set after a
/// stop is acknowledged); everybody else reads snapshots. Mutating passes
/// never call listeners themselves; they queue a snapshot that the writer
/// hands out through [`OperationRegistry::take_notification`].
pub struct OperationRegistry {
    settings: RegistrySettings,
    entries: HashMap<OperationId, TrackedOperation>,
    order: Vec<OperationId>,
    health: FeedHealth,
    listeners: Arc<Mutex<ListenerList>>,
    pending: Vec<RegistrySnapshot>,
}

impl Default for OperationRegistry {
    fn default() -> Self {
        Self::new(RegistrySettings::default())
    }
}

impl OperationRegistry {
    pub fn new(settings: RegistrySettings) -> Self {
        Self {
            settings,
            entries: HashMap::new(),
            order: Vec::new(),
            health: FeedHealth::default(),
            listeners: Arc::new(Mutex::new(ListenerList::default())),
            pending: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&TrackedOperation> {
        self.entries.get(id)
    }

    pub fn health(&self) -> &FeedHealth {
        &self.health
    }

    /// Merges every snapshot of a successful poll into its entry. Ids absent
    /// from the batch are left as they are.
    pub fn apply_batch(&mut self, batch: &[RawSnapshot], now: DateTime<Utc>) -> ApplyReport {
        let mut report = ApplyReport::default();

        for raw in batch {
            if raw.id.is_empty() {
                continue;
            }
            let was_terminal = self
                .entries
                .get(&raw.id)
                .is_some_and(|tracked| tracked.state().is_terminal());
            let next = match self.entries.remove(&raw.id) {
                None => {
                    self.order.push(raw.id.clone());
                    report.created.push(raw.id.clone());
                    TrackedOperation::Confirmed(merge(None, raw, now))
                }
                Some(TrackedOperation::Confirmed(prev)) => {
                    TrackedOperation::Confirmed(merge(Some(&prev), raw, now))
                }
                Some(TrackedOperation::PendingCancel {
                    state,
                    unconfirmed_polls,
                }) => {
                    let merged = merge(Some(&state), raw, now);
                    let polls = unconfirmed_polls + 1;
                    if merged.is_terminal() {
                        TrackedOperation::Confirmed(merged)
                    } else if polls >= self.settings.cancel_confirm_polls {
                        report.cancel_expired.push(raw.id.clone());
                        TrackedOperation::Confirmed(merged)
                    } else {
                        TrackedOperation::PendingCancel {
                            state: merged,
                            unconfirmed_polls: polls,
                        }
                    }
                }
            };
            if !was_terminal && next.state().is_terminal() {
                report.locked.push(raw.id.clone());
            }
            self.entries.insert(raw.id.clone(), next);
        }

        self.health.consecutive_failures = 0;
        self.health.last_success_at = Some(now);
        self.queue_notification();
        report
    }

    /// Drops entries whose terminal lock is at least `grace` old.
    pub fn purge_terminal(&mut self, now: DateTime<Utc>, grace: Duration) -> Vec<OperationId> {
        let expired: Vec<OperationId> = self
            .entries
            .iter()
            .filter(|(_, tracked)| {
                tracked
                    .state()
                    .terminal_locked_at
                    .and_then(|locked_at| (now - locked_at).to_std().ok())
                    .is_some_and(|age| age >= grace)
            })
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            self.entries.remove(id);
        }
        self.order.retain(|id| self.entries.contains_key(id));
        self.queue_notification();
        expired
    }

    /// Records an abandoned poll. Display states are kept as they are.
    pub fn record_failure(&mut self) {
        self.health.consecutive_failures = self.health.consecutive_failures.saturating_add(1);
        self.queue_notification();
    }

    /// Flags an acknowledged stop request on a live entry. Returns false when
    /// the id is unknown or already terminal.
    pub fn mark_pending_cancel(&mut self, id: &str) -> bool {
        let Some(tracked) = self.entries.remove(id) else {
            return false;
        };
        if tracked.state().is_terminal() {
            self.entries.insert(id.to_string(), tracked);
            return false;
        }
        let was_pending = tracked.is_pending_cancel();
        let next = match tracked {
            pending @ TrackedOperation::PendingCancel { .. } => pending,
            TrackedOperation::Confirmed(state) => TrackedOperation::PendingCancel {
                state,
                unconfirmed_polls: 0,
            },
        };
        self.entries.insert(id.to_string(), next);
        if !was_pending {
            self.queue_notification();
        }
        true
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        let operations = self
            .order
            .iter()
            .filter_map(|id| self.entries.get(id))
            .map(|tracked| OperationView::new(tracked.state(), tracked.is_pending_cancel()))
            .collect();
        RegistrySnapshot {
            operations,
            health: self.health.clone(),
        }
    }

    /// Registers a listener for the snapshot each registry pass queues.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&RegistrySnapshot) + Send + Sync + 'static,
    {
        let mut list = self
            .listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        list.next_id += 1;
        let id = list.next_id;
        list.listeners.push((id, Arc::new(listener)));
        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    /// Hands out the queued listener calls, if any.
    pub fn take_notification(&mut self) -> Option<Notification> {
        if self.pending.is_empty() {
            return None;
        }
        Some(Notification {
            snapshots: std::mem::take(&mut self.pending),
            listeners: self.listener_handles(),
        })
    }

    fn queue_notification(&mut self) {
        if self.listener_handles().is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        self.pending.push(snapshot);
    }

    fn listener_handles(&self) -> Vec<RegistryListener> {
        let list = self
            .listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        list.listeners.iter().map(|(_, l)| l.clone()).collect()
    }
}
