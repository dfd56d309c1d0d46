//! Callback-awaited worker tasks.
//!
//! A [`CallbackAwaitable`] issues a platform request from its background thread,
//! registers the returned handle with the [`CorrelationRegistry`], then parks on
//! an [`AwaitSlot`] until the host thread's callback pump delivers the matching
//! notification or the configured timeout elapses.
//!
//! ```text
//! Pending -> Executing -> AwaitingCallback -> {Succeeded, Failed, TimedOut} -> Resolved
//!                 \-> Failed (synchronous rejection)
//! ```
//!
//! The wait is a `parking_lot::Condvar` wait with a deadline, not a sleep loop.
//! It only blocks the task's own thread; if the host stops pumping, the task can
//! only finish by timing out.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace, warn};

use crate::core::error::BridgeError;
use crate::core::handle::{Channel, CompletionHandle, Topic};
use crate::core::notification::Notification;
use crate::core::registry::CorrelationRegistry;
use crate::core::task::TaskContext;

/// Lifecycle of a callback-awaited task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AwaitState {
    /// Created, not yet picked up.
    Pending,
    /// Running on its background thread, request not yet accepted.
    Executing,
    /// Request accepted, waiting for the correlated notification.
    AwaitingCallback,
    /// Completion arrived and the result was finalized.
    Succeeded,
    /// Rejected synchronously, or the completion reported a failure.
    Failed,
    /// No completion within the wait policy.
    TimedOut,
    /// Continuation dispatched on the host thread.
    Resolved,
}

impl AwaitState {
    /// Whether moving from `self` to `next` is a legal transition.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Executing)
                | (Self::Executing, Self::AwaitingCallback | Self::Failed)
                | (
                    Self::AwaitingCallback,
                    Self::Succeeded | Self::Failed | Self::TimedOut
                )
                | (Self::Succeeded | Self::Failed | Self::TimedOut, Self::Resolved)
        )
    }

    /// Whether the background side is done with this task.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::TimedOut)
    }
}

impl fmt::Display for AwaitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Executing => "executing",
            Self::AwaitingCallback => "awaiting_callback",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
            Self::Resolved => "resolved",
        };
        f.write_str(name)
    }
}

/// How long an awaitable may wait for its completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    /// `None` disables timeout tracking.
    pub timeout: Option<Duration>,
}

impl WaitPolicy {
    /// Bounded wait.
    #[must_use]
    pub const fn bounded(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }

    /// Wait until the completion arrives, however long that takes.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self { timeout: None }
    }
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self::bounded(Duration::from_millis(60_000))
    }
}

/// What the background thread wakes up with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wake {
    /// The correlated notification.
    pub notification: Notification,
    /// A catalog-changed broadcast arrived before the completion.
    pub catalog_changed: bool,
}

#[derive(Debug, Default)]
struct SlotState {
    notification: Option<Notification>,
    catalog_changed: bool,
}

/// Completion cell shared between a waiting task and the registry.
///
/// The first notification written wins; once completed, the slot never changes.
#[derive(Debug, Default)]
pub struct AwaitSlot {
    state: Mutex<SlotState>,
    ready: Condvar,
}

impl AwaitSlot {
    /// Fresh, incomplete slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a completion has been recorded.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.state.lock().notification.is_some()
    }

    /// Record the completion and wake the waiter. Returns `false` if the slot
    /// was already completed.
    pub(crate) fn complete(&self, notification: Notification) -> bool {
        let mut state = self.state.lock();
        if state.notification.is_some() {
            return false;
        }
        state.notification = Some(notification);
        drop(state);
        self.ready.notify_all();
        true
    }

    /// Set the catalog-changed flag unless already completed. Does not wake.
    pub(crate) fn mark_catalog_changed(&self) {
        let mut state = self.state.lock();
        if state.notification.is_none() {
            state.catalog_changed = true;
        }
    }

    /// The completion, if it has arrived.
    pub(crate) fn take(&self) -> Option<Wake> {
        let state = self.state.lock();
        state.notification.map(|notification| Wake {
            notification,
            catalog_changed: state.catalog_changed,
        })
    }

    /// Park until completed or until the policy's timeout has fully elapsed.
    /// On timeout returns the time actually waited.
    pub(crate) fn wait(&self, policy: WaitPolicy) -> Result<Wake, Duration> {
        let started = Instant::now();
        let deadline = policy.timeout.map(|timeout| started + timeout);
        let mut state = self.state.lock();
        loop {
            if let Some(notification) = state.notification {
                return Ok(Wake {
                    notification,
                    catalog_changed: state.catalog_changed,
                });
            }
            match deadline {
                None => self.ready.wait(&mut state),
                Some(deadline) => {
                    if self.ready.wait_until(&mut state, deadline).timed_out()
                        && state.notification.is_none()
                    {
                        return Err(started.elapsed());
                    }
                }
            }
        }
    }
}

/// Per-operation behavior of a callback-awaited task.
pub trait AwaitedStep: Send {
    /// Value handed to the success continuation.
    type Output: Send + 'static;

    /// Channel the completion is delivered on.
    fn channel(&self) -> Channel;

    /// Broadcast topics to listen to while waiting.
    fn topics(&self) -> &'static [Topic] {
        &[]
    }

    /// Issue the platform request. Runs on the task's thread with no bridge
    /// lock held.
    ///
    /// # Errors
    ///
    /// A synchronous rejection from the platform; the task fails without waiting.
    fn issue(&mut self, ctx: &TaskContext) -> Result<CompletionHandle, BridgeError>;

    /// Turn the correlated notification into the task's result.
    ///
    /// # Errors
    ///
    /// Any failure reported by the completion or by reading its results.
    fn complete(self: Box<Self>, ctx: &TaskContext, wake: Wake) -> Result<Self::Output, BridgeError>;

    /// Called once when the task times out, after its registry entry is gone.
    fn abandon(self: Box<Self>, _ctx: &TaskContext, _handle: CompletionHandle) {}
}

/// A worker task that waits for a correlated platform notification.
pub struct CallbackAwaitable<T> {
    step: Box<dyn AwaitedStep<Output = T>>,
}

/// State of one run, advanced only along legal transitions.
struct Lifecycle {
    operation: &'static str,
    state: AwaitState,
}

impl Lifecycle {
    fn advance(&mut self, next: AwaitState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal transition {} -> {next}",
            self.state
        );
        trace!(operation = self.operation, from = %self.state, to = %next, "awaitable transition");
        self.state = next;
    }
}

impl<T: Send + 'static> CallbackAwaitable<T> {
    /// Wrap an awaited step.
    pub fn new(step: impl AwaitedStep<Output = T> + 'static) -> Self {
        Self { step: Box::new(step) }
    }

    /// Run the issue / await / finalize sequence on the current thread.
    /// Returns the outcome with the terminal state it reached.
    pub(crate) fn run(self, operation: &'static str, ctx: &TaskContext) -> (Result<T, BridgeError>, AwaitState) {
        let mut lifecycle = Lifecycle {
            operation,
            state: AwaitState::Pending,
        };
        let outcome = Self::drive(self.step, &mut lifecycle, ctx);
        (outcome, lifecycle.state)
    }

    fn drive(
        mut step: Box<dyn AwaitedStep<Output = T>>,
        lifecycle: &mut Lifecycle,
        ctx: &TaskContext,
    ) -> Result<T, BridgeError> {
        let operation = lifecycle.operation;
        lifecycle.advance(AwaitState::Executing);
        let registry: &CorrelationRegistry = &ctx.registry;
        let slot = Arc::new(AwaitSlot::new());

        let subscriptions: Vec<_> = step
            .topics()
            .iter()
            .map(|topic| registry.subscribe(*topic, Arc::clone(&slot)))
            .collect();
        let unsubscribe = || {
            for id in &subscriptions {
                registry.unsubscribe(*id);
            }
        };

        let channel = step.channel();
        let key = match registry.register_with(channel, &slot, || step.issue(ctx)) {
            Ok(key) => key,
            Err(err) => {
                unsubscribe();
                lifecycle.advance(AwaitState::Failed);
                debug!(operation, error = %err, "request rejected synchronously");
                return Err(err);
            }
        };
        lifecycle.advance(AwaitState::AwaitingCallback);
        debug!(operation, key = %key, "awaiting completion");

        let wake = match slot.wait(ctx.wait) {
            Ok(wake) => wake,
            Err(elapsed) => {
                let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
                if registry.cancel(&key) {
                    unsubscribe();
                    lifecycle.advance(AwaitState::TimedOut);
                    warn!(operation, key = %key, elapsed_ms, "completion never arrived");
                    step.abandon(ctx, key.handle);
                    return Err(BridgeError::Timeout {
                        operation,
                        elapsed_ms,
                    });
                }
                // The pump removed the entry first, so the slot holds its completion.
                match slot.take() {
                    Some(wake) => wake,
                    None => {
                        unsubscribe();
                        lifecycle.advance(AwaitState::TimedOut);
                        return Err(BridgeError::Timeout {
                            operation,
                            elapsed_ms,
                        });
                    }
                }
            }
        };
        unsubscribe();

        let result = step.complete(ctx, wake);
        lifecycle.advance(if result.is_ok() {
            AwaitState::Succeeded
        } else {
            AwaitState::Failed
        });
        result
    }
}
