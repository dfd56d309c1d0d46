//! Correlation of platform notifications with the tasks awaiting them.
//!
//! The registry is the only structure touched from both the host thread
//! (`dispatch`, via the callback pump) and background threads (`register_with`,
//! `cancel`). Every entry operation runs under one `parking_lot::Mutex`, and a
//! slot is completed while that lock is held, so register, dispatch and cancel
//! are linearizable per handle.
//!
//! The platform is never called with the registry locked. A request is issued
//! inside an *issue window*; a correlated notification pumped before its handle
//! is registered is parked and claimed by the registration that follows. When
//! the last open window closes, unclaimed parked notifications are dropped as
//! unknown.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::core::awaitable::AwaitSlot;
use crate::core::error::{BridgeError, RegistryError};
use crate::core::handle::{Channel, CompletionHandle, CorrelationKey, Topic};
use crate::core::notification::{Notification, NotificationSink};

/// Identifier of a broadcast subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct RegistryInner {
    awaiting: HashMap<CorrelationKey, Arc<AwaitSlot>>,
    subscribers: HashMap<SubscriptionId, (Topic, Arc<AwaitSlot>)>,
    early: HashMap<CorrelationKey, Notification>,
    open_windows: usize,
    next_subscription: u64,
    ignored: u64,
}

impl RegistryInner {
    /// Await `key`, or complete `slot` at once if its notification was parked.
    fn insert(&mut self, key: CorrelationKey, slot: Arc<AwaitSlot>) -> Result<(), RegistryError> {
        if self.awaiting.contains_key(&key) {
            return Err(RegistryError::DuplicateHandle(key));
        }
        match self.early.remove(&key) {
            Some(notification) => {
                debug!(key = %key, "claimed notification that arrived before registration");
                slot.complete(notification);
            }
            None => {
                self.awaiting.insert(key, slot);
            }
        }
        Ok(())
    }

    fn close_window(&mut self) {
        self.open_windows = self.open_windows.saturating_sub(1);
        if self.open_windows > 0 {
            return;
        }
        for (key, _) in self.early.drain() {
            self.ignored += 1;
            debug!(key = %key, "ignoring notification for unknown handle");
        }
    }
}

/// Closes an issue window on every exit path, unwinding included.
struct IssueWindow<'a> {
    registry: &'a CorrelationRegistry,
}

impl<'a> IssueWindow<'a> {
    fn open(registry: &'a CorrelationRegistry) -> Self {
        registry.inner.lock().open_windows += 1;
        Self { registry }
    }
}

impl Drop for IssueWindow<'_> {
    fn drop(&mut self) {
        self.registry.inner.lock().close_window();
    }
}

/// Table of in-flight handles and broadcast subscriptions.
#[derive(Default)]
pub struct CorrelationRegistry {
    inner: Mutex<RegistryInner>,
}

impl CorrelationRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task awaiting `key`. If the notification for `key` was
    /// parked during an open issue window, `slot` is completed immediately.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateHandle`] if another task already awaits `key`.
    pub fn register(&self, key: CorrelationKey, slot: Arc<AwaitSlot>) -> Result<(), RegistryError> {
        self.inner.lock().insert(key, slot)
    }

    /// Issue a request and register its handle. `issue` runs without the
    /// registry locked, inside an issue window, so a notification pumped before
    /// the handle is registered still reaches `slot`.
    ///
    /// # Errors
    ///
    /// Whatever `issue` returns; nothing is registered in that case.
    ///
    /// # Panics
    ///
    /// If the platform hands out a handle that is already awaited on `channel`.
    pub fn register_with<F>(
        &self,
        channel: Channel,
        slot: &Arc<AwaitSlot>,
        issue: F,
    ) -> Result<CorrelationKey, BridgeError>
    where
        F: FnOnce() -> Result<CompletionHandle, BridgeError>,
    {
        let window = IssueWindow::open(self);
        let handle = issue()?;
        let key = CorrelationKey::new(channel, handle);
        let inserted = self.inner.lock().insert(key, Arc::clone(slot));
        drop(window);
        if let Err(err) = inserted {
            panic!("{err}");
        }
        Ok(key)
    }

    /// Drop the entry for `key` without resolving it. Returns `false` if the
    /// entry was already gone.
    pub fn cancel(&self, key: &CorrelationKey) -> bool {
        self.inner.lock().awaiting.remove(key).is_some()
    }

    /// Listen for a broadcast topic.
    pub fn subscribe(&self, topic: Topic, slot: Arc<AwaitSlot>) -> SubscriptionId {
        let mut inner = self.inner.lock();
        let id = SubscriptionId(inner.next_subscription);
        inner.next_subscription += 1;
        inner.subscribers.insert(id, (topic, slot));
        id
    }

    /// Stop listening. Returns `false` if the subscription was unknown.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.lock().subscribers.remove(&id).is_some()
    }

    /// Whether a task currently awaits `key`.
    #[must_use]
    pub fn is_awaiting(&self, key: &CorrelationKey) -> bool {
        self.inner.lock().awaiting.contains_key(key)
    }

    /// Number of awaited handles.
    #[must_use]
    pub fn awaiting_len(&self) -> usize {
        self.inner.lock().awaiting.len()
    }

    /// Number of active broadcast subscriptions.
    #[must_use]
    pub fn subscription_len(&self) -> usize {
        self.inner.lock().subscribers.len()
    }

    /// Notifications dropped because nobody awaited their handle.
    #[must_use]
    pub fn ignored_count(&self) -> u64 {
        self.inner.lock().ignored
    }
}

impl NotificationSink for CorrelationRegistry {
    fn dispatch(&self, notification: &Notification) -> bool {
        let mut inner = self.inner.lock();

        if let Some(topic) = notification.topic() {
            for (subscribed, slot) in inner.subscribers.values() {
                if *subscribed == topic {
                    slot.mark_catalog_changed();
                }
            }
        }

        let Some(key) = notification.correlation_key() else {
            return false;
        };
        match inner.awaiting.remove(&key) {
            Some(slot) => slot.complete(*notification),
            None if inner.open_windows > 0 => {
                trace!(key = %key, "parking notification until its issuer registers");
                inner.early.insert(key, *notification);
                false
            }
            None => {
                inner.ignored += 1;
                debug!(key = %key, "ignoring notification for unknown handle");
                false
            }
        }
    }
}
