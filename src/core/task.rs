//! Worker tasks: a background step plus host-thread continuations.

use std::fmt;
use std::sync::Arc;

use crate::core::awaitable::{AwaitState, AwaitedStep, CallbackAwaitable, WaitPolicy};
use crate::core::error::BridgeError;
use crate::core::registry::CorrelationRegistry;
use crate::platform::Platform;

/// Identifier assigned to each submitted task.
pub type TaskId = u64;

/// Everything a background step may touch.
///
/// Steps must not call host-thread-only APIs; the platform calls made through
/// `platform` are the thread-safe subset of the SDK.
pub struct TaskContext {
    /// Platform SDK.
    pub platform: Arc<dyn Platform>,
    /// Registry owned by the scheduler.
    pub registry: Arc<CorrelationRegistry>,
    /// Wait policy for callback-awaited steps.
    pub wait: WaitPolicy,
}

impl fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskContext")
            .field("wait", &self.wait)
            .field("awaiting", &self.registry.awaiting_len())
            .finish_non_exhaustive()
    }
}

/// Per-operation behavior of a task that simply runs to completion off the host thread.
pub trait BlockingStep: Send {
    /// Value handed to the success continuation.
    type Output: Send + 'static;

    /// Do the work.
    ///
    /// # Errors
    ///
    /// Any failure, reported to the failure continuation.
    fn execute(self: Box<Self>, ctx: &TaskContext) -> Result<Self::Output, BridgeError>;
}

type SuccessFn<T> = Box<dyn FnOnce(T) + Send>;
type FailureFn = Box<dyn FnOnce(BridgeError) + Send>;

/// Host-thread callbacks of one task. Exactly one of them runs, exactly once.
pub struct Continuations<T> {
    on_success: SuccessFn<T>,
    on_failure: Option<FailureFn>,
}

impl<T: 'static> Continuations<T> {
    /// Success continuation only; failures resolve silently.
    pub fn new(on_success: impl FnOnce(T) + Send + 'static) -> Self {
        Self {
            on_success: Box::new(on_success),
            on_failure: None,
        }
    }

    /// Attach a failure continuation.
    #[must_use]
    pub fn on_failure(mut self, on_failure: impl FnOnce(BridgeError) + Send + 'static) -> Self {
        self.on_failure = Some(Box::new(on_failure));
        self
    }

    /// Whether a failure continuation is attached.
    #[must_use]
    pub const fn has_failure(&self) -> bool {
        self.on_failure.is_some()
    }

    /// Adapt to a task producing `U` by converting its output first.
    #[must_use]
    pub fn map_input<U: 'static>(self, convert: impl FnOnce(U) -> T + Send + 'static) -> Continuations<U> {
        let on_success = self.on_success;
        Continuations {
            on_success: Box::new(move |value| on_success(convert(value))),
            on_failure: self.on_failure,
        }
    }
}

impl<T> fmt::Debug for Continuations<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Continuations")
            .field("has_failure", &self.on_failure.is_some())
            .finish_non_exhaustive()
    }
}

/// Dispatch a finished outcome to its continuation and release both closures.
///
/// A failed task without a failure continuation resolves silently.
pub fn resolve<T>(outcome: Result<T, BridgeError>, continuations: Continuations<T>) {
    let Continuations {
        on_success,
        on_failure,
    } = continuations;
    match outcome {
        Ok(value) => on_success(value),
        Err(err) => {
            if let Some(on_failure) = on_failure {
                on_failure(err);
            }
        }
    }
}

/// The two flavors of background work.
pub enum TaskKind<T> {
    /// Runs to completion on its thread.
    Simple(Box<dyn BlockingStep<Output = T>>),
    /// Issues a request, then waits for a correlated notification.
    CallbackAwaited(CallbackAwaitable<T>),
}

impl<T: Send + 'static> TaskKind<T> {
    /// Run the background part. Never called on the host thread. Awaited tasks
    /// also report the terminal state they reached.
    pub(crate) fn execute(
        self,
        operation: &'static str,
        ctx: &TaskContext,
    ) -> (Result<T, BridgeError>, Option<AwaitState>) {
        match self {
            Self::Simple(step) => (step.execute(ctx), None),
            Self::CallbackAwaited(awaitable) => {
                let (outcome, state) = awaitable.run(operation, ctx);
                (outcome, Some(state))
            }
        }
    }

    /// Whether this task waits for a notification.
    #[must_use]
    pub const fn is_awaited(&self) -> bool {
        matches!(self, Self::CallbackAwaited(_))
    }
}

/// The unit of asynchronous work handed to the scheduler.
pub struct WorkerTask<T> {
    operation: &'static str,
    kind: TaskKind<T>,
    continuations: Continuations<T>,
}

impl<T: Send + 'static> WorkerTask<T> {
    /// Task that runs `step` to completion.
    pub fn simple(
        operation: &'static str,
        step: impl BlockingStep<Output = T> + 'static,
        continuations: Continuations<T>,
    ) -> Self {
        Self {
            operation,
            kind: TaskKind::Simple(Box::new(step)),
            continuations,
        }
    }

    /// Task that issues a request and waits for its completion.
    pub fn awaited(
        operation: &'static str,
        step: impl AwaitedStep<Output = T> + 'static,
        continuations: Continuations<T>,
    ) -> Self {
        Self {
            operation,
            kind: TaskKind::CallbackAwaited(CallbackAwaitable::new(step)),
            continuations,
        }
    }

    /// Operation name used in logs and error messages.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        self.operation
    }

    /// The background part.
    #[must_use]
    pub const fn kind(&self) -> &TaskKind<T> {
        &self.kind
    }

    pub(crate) fn into_parts(self) -> (&'static str, TaskKind<T>, Continuations<T>) {
        (self.operation, self.kind, self.continuations)
    }
}

impl<T> fmt::Debug for WorkerTask<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            TaskKind::Simple(_) => "simple",
            TaskKind::CallbackAwaited(_) => "callback_awaited",
        };
        f.debug_struct("WorkerTask")
            .field("operation", &self.operation)
            .field("kind", &kind)
            .finish_non_exhaustive()
    }
}
