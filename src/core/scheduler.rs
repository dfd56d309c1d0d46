//! Thread-per-task scheduler with host-thread continuation delivery.
//!
//! Every submitted [`WorkerTask`] runs on its own named OS thread. When the
//! background part finishes, its outcome and continuations travel back over a
//! channel and wait there until the host thread calls
//! [`TaskScheduler::drain_completions`] (or [`TaskScheduler::pump`], which also
//! runs the platform callback pump first).
//!
//! # Design
//!
//! - **No polling on background threads**: awaited tasks park on a condvar
//! - **Host owns delivery**: continuations only ever run inside `drain_completions`
//! - **Lock-free counters**: atomics for stats and admission control

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, error, info, trace, warn};

use crate::config::BridgeConfig;
use crate::core::awaitable::AwaitState;
use crate::core::error::BridgeError;
use crate::core::registry::CorrelationRegistry;
use crate::core::task::{resolve, Continuations, TaskContext, TaskId, TaskKind, WorkerTask};
use crate::platform::Platform;

/// Statistics about scheduler activity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Tasks accepted.
    pub submitted: u64,
    /// Tasks accepted whose continuation has not run yet.
    pub in_flight: u64,
    /// Background threads currently executing.
    pub running: u64,
    /// Finished tasks waiting for the host to drain them.
    pub awaiting_delivery: u64,
    /// Tasks whose background part succeeded.
    pub succeeded: u64,
    /// Tasks whose background part failed, timeouts included.
    pub failed: u64,
    /// Tasks that timed out waiting for a completion.
    pub timed_out: u64,
}

/// Internal counters (lock-free).
#[derive(Debug, Default)]
pub(crate) struct SchedulerCounters {
    pub submitted: AtomicU64,
    pub in_flight: AtomicU64,
    pub running: AtomicU64,
    pub awaiting_delivery: AtomicU64,
    pub succeeded: AtomicU64,
    pub failed: AtomicU64,
    pub timed_out: AtomicU64,
}

impl SchedulerCounters {
    pub fn snapshot(&self) -> SchedulerStats {
        SchedulerStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::Acquire),
            running: self.running.load(Ordering::Relaxed),
            awaiting_delivery: self.awaiting_delivery.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
        }
    }
}

/// A resolved task waiting for the host thread.
struct Completion {
    task_id: TaskId,
    operation: &'static str,
    deliver: Box<dyn FnOnce() + Send>,
}

/// Keeps counters honest if a background step panics or delivery fails.
struct RunGuard {
    counters: Arc<SchedulerCounters>,
    task_id: TaskId,
    operation: &'static str,
    delivered: bool,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.counters.running.fetch_sub(1, Ordering::Relaxed);
        if !self.delivered {
            self.counters.in_flight.fetch_sub(1, Ordering::AcqRel);
            error!(
                task_id = self.task_id,
                operation = self.operation,
                panicked = thread::panicking(),
                "task ended without reaching the host; continuation discarded"
            );
        }
    }
}

/// Runs worker tasks on background threads and hands their outcomes to the host.
pub struct TaskScheduler {
    config: BridgeConfig,
    context: Arc<TaskContext>,
    completions_tx: Sender<Completion>,
    completions_rx: Receiver<Completion>,
    counters: Arc<SchedulerCounters>,
    shutdown: AtomicBool,
    next_task_id: AtomicU64,
    host_thread: ThreadId,
}

impl TaskScheduler {
    /// Create a scheduler that owns a fresh correlation registry. The calling
    /// thread becomes the host thread.
    ///
    /// # Errors
    ///
    /// [`BridgeError::InvalidConfig`] if the configuration is invalid.
    pub fn new(config: BridgeConfig, platform: Arc<dyn Platform>) -> Result<Self, BridgeError> {
        config.validate().map_err(BridgeError::InvalidConfig)?;

        let context = Arc::new(TaskContext {
            platform,
            registry: Arc::new(CorrelationRegistry::new()),
            wait: config.wait_policy(),
        });
        let (completions_tx, completions_rx) = unbounded();

        info!(
            callback_timeout_ms = config.callback_timeout_ms,
            timeout_enabled = config.timeout_enabled,
            max_in_flight = config.max_in_flight,
            "TaskScheduler initialized (thread per task)"
        );

        Ok(Self {
            config,
            context,
            completions_tx,
            completions_rx,
            counters: Arc::new(SchedulerCounters::default()),
            shutdown: AtomicBool::new(false),
            next_task_id: AtomicU64::new(1),
            host_thread: thread::current().id(),
        })
    }

    /// Start a task on its own background thread. Returns immediately.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::SchedulerShutdown`] after [`shutdown`](Self::shutdown)
    /// - [`BridgeError::Saturated`] when `max_in_flight` tasks are outstanding
    /// - [`BridgeError::Spawn`] if the OS refuses a new thread
    ///
    /// In every error case the task's continuations are dropped without running.
    pub fn submit<T: Send + 'static>(&self, task: WorkerTask<T>) -> Result<TaskId, BridgeError> {
        if self.shutdown.load(Ordering::Acquire) {
            return Err(BridgeError::SchedulerShutdown);
        }

        let limit = self.config.max_in_flight;
        let in_flight = self.counters.in_flight.fetch_add(1, Ordering::AcqRel);
        if usize::try_from(in_flight).map_or(true, |n| n >= limit) {
            self.counters.in_flight.fetch_sub(1, Ordering::AcqRel);
            warn!(in_flight, limit, "scheduler saturated");
            return Err(BridgeError::Saturated { in_flight, limit });
        }

        let task_id = self.next_task_id.fetch_add(1, Ordering::Relaxed);
        let (operation, kind, continuations) = task.into_parts();
        let awaited = kind.is_awaited();
        let context = Arc::clone(&self.context);
        let counters = Arc::clone(&self.counters);
        let completions_tx = self.completions_tx.clone();

        let spawned = thread::Builder::new()
            .name(format!("{}-{task_id}", self.config.thread_name_prefix))
            .stack_size(self.config.thread_stack_size)
            .spawn(move || {
                run_task(
                    task_id,
                    operation,
                    kind,
                    continuations,
                    &context,
                    counters,
                    &completions_tx,
                );
            });

        match spawned {
            Ok(_) => {
                self.counters.submitted.fetch_add(1, Ordering::Relaxed);
                debug!(task_id, operation, awaited, "task submitted");
                Ok(task_id)
            }
            Err(e) => {
                self.counters.in_flight.fetch_sub(1, Ordering::AcqRel);
                error!(task_id, operation, error = %e, "failed to spawn background thread");
                Err(BridgeError::Spawn(e.to_string()))
            }
        }
    }

    /// Run every resolved task's continuation. Call from the host thread.
    /// Returns the number of continuations dispatched.
    pub fn drain_completions(&self) -> usize {
        if thread::current().id() != self.host_thread {
            warn!("completions drained off the host thread");
        }
        let mut ran = 0;
        while let Ok(completion) = self.completions_rx.try_recv() {
            self.counters.awaiting_delivery.fetch_sub(1, Ordering::Relaxed);
            // Released before the continuation runs so a panicking continuation
            // cannot hold its admission slot.
            self.counters.in_flight.fetch_sub(1, Ordering::AcqRel);
            debug!(
                task_id = completion.task_id,
                operation = completion.operation,
                "resolving task"
            );
            (completion.deliver)();
            ran += 1;
        }
        ran
    }

    /// Deliver pending platform notifications to the registry, then drain
    /// completions. This is the host thread's per-frame call.
    pub fn pump(&self) -> usize {
        self.context.platform.run_callbacks(self.context.registry.as_ref());
        self.drain_completions()
    }

    /// Pump at the configured cadence until nothing is in flight or `timeout`
    /// elapses. Returns `true` if the scheduler went idle.
    pub fn run_until_idle(&self, timeout: Duration) -> bool {
        let started = Instant::now();
        loop {
            self.pump();
            if self.in_flight() == 0 {
                return true;
            }
            let elapsed = started.elapsed();
            if elapsed >= timeout {
                return false;
            }
            thread::sleep(self.config.pump_interval().min(timeout - elapsed));
        }
    }

    /// Tasks accepted whose continuation has not run yet.
    #[must_use]
    pub fn in_flight(&self) -> u64 {
        self.counters.in_flight.load(Ordering::Acquire)
    }

    /// Current statistics.
    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        self.counters.snapshot()
    }

    /// The registry shared with every task.
    #[must_use]
    pub fn registry(&self) -> &Arc<CorrelationRegistry> {
        &self.context.registry
    }

    /// The platform tasks run against.
    #[must_use]
    pub fn platform(&self) -> &Arc<dyn Platform> {
        &self.context.platform
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Refuse new work. Tasks already running still resolve on later drains.
    pub fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }
        info!(in_flight = self.in_flight(), "scheduler shutting down");
    }

    /// Whether [`shutdown`](Self::shutdown) was called.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }
}

impl fmt::Debug for TaskScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskScheduler")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .field("shutdown", &self.is_shutdown())
            .finish_non_exhaustive()
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        let in_flight = self.in_flight();
        if in_flight > 0 {
            debug!(in_flight, "scheduler dropped with tasks in flight; their continuations are discarded");
        }
    }
}

/// Body of a background thread.
fn run_task<T: Send + 'static>(
    task_id: TaskId,
    operation: &'static str,
    kind: TaskKind<T>,
    continuations: Continuations<T>,
    context: &TaskContext,
    counters: Arc<SchedulerCounters>,
    completions_tx: &Sender<Completion>,
) {
    counters.running.fetch_add(1, Ordering::Relaxed);
    let mut guard = RunGuard {
        counters,
        task_id,
        operation,
        delivered: false,
    };
    debug!(task_id, operation, "task executing");

    let (outcome, awaited) = kind.execute(operation, context);
    debug_assert!(awaited.is_none_or(AwaitState::is_terminal));

    match &outcome {
        Ok(_) => {
            guard.counters.succeeded.fetch_add(1, Ordering::Relaxed);
            debug!(task_id, operation, "task succeeded");
        }
        Err(err) => {
            guard.counters.failed.fetch_add(1, Ordering::Relaxed);
            if err.is_timeout() {
                guard.counters.timed_out.fetch_add(1, Ordering::Relaxed);
            }
            debug!(task_id, operation, error = %err, "task failed");
        }
    }

    guard.counters.awaiting_delivery.fetch_add(1, Ordering::Relaxed);
    let completion = Completion {
        task_id,
        operation,
        deliver: Box::new(move || {
            resolve(outcome, continuations);
            if let Some(state) = awaited {
                debug_assert!(state.can_advance_to(AwaitState::Resolved));
                trace!(task_id, operation, from = %state, to = %AwaitState::Resolved, "awaitable transition");
            }
        }),
    };
    if completions_tx.send(completion).is_ok() {
        guard.delivered = true;
    } else {
        guard.counters.awaiting_delivery.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::task::BlockingStep;
    use crate::infra::platform::InMemoryPlatform;
    use parking_lot::Mutex;

    struct Echo(u32);

    impl BlockingStep for Echo {
        type Output = u32;

        fn execute(self: Box<Self>, _ctx: &TaskContext) -> Result<u32, BridgeError> {
            Ok(self.0)
        }
    }

    struct Sleepy(Duration);

    impl BlockingStep for Sleepy {
        type Output = ();

        fn execute(self: Box<Self>, _ctx: &TaskContext) -> Result<(), BridgeError> {
            thread::sleep(self.0);
            Ok(())
        }
    }

    fn scheduler(config: BridgeConfig) -> TaskScheduler {
        TaskScheduler::new(config, Arc::new(InMemoryPlatform::new())).unwrap()
    }

    #[test]
    fn test_continuation_waits_for_drain() {
        let sched = scheduler(BridgeConfig::default());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        sched
            .submit(WorkerTask::simple(
                "echo",
                Echo(7),
                Continuations::new(move |v| sink.lock().push(v)),
            ))
            .unwrap();

        // Nothing runs until the host drains.
        thread::sleep(Duration::from_millis(50));
        assert!(seen.lock().is_empty());

        assert!(sched.run_until_idle(Duration::from_secs(5)));
        assert_eq!(*seen.lock(), vec![7]);
        let stats = sched.stats();
        assert_eq!(stats.submitted, 1);
        assert_eq!(stats.succeeded, 1);
        assert_eq!(stats.in_flight, 0);
        assert_eq!(stats.awaiting_delivery, 0);
    }

    #[test]
    fn test_saturation() {
        let sched = scheduler(BridgeConfig::default().with_max_in_flight(1));
        sched
            .submit(WorkerTask::simple(
                "sleepy",
                Sleepy(Duration::from_millis(100)),
                Continuations::new(|()| {}),
            ))
            .unwrap();
        let err = sched
            .submit(WorkerTask::simple("echo", Echo(1), Continuations::new(|_| {})))
            .unwrap_err();
        assert!(matches!(err, BridgeError::Saturated { limit: 1, .. }));
        assert!(sched.run_until_idle(Duration::from_secs(5)));
        assert!(sched
            .submit(WorkerTask::simple("echo", Echo(1), Continuations::new(|_| {})))
            .is_ok());
        assert!(sched.run_until_idle(Duration::from_secs(5)));
    }

    #[test]
    fn test_shutdown_rejects_new_work() {
        let sched = scheduler(BridgeConfig::default());
        sched.shutdown();
        sched.shutdown();
        assert!(sched.is_shutdown());
        let err = sched
            .submit(WorkerTask::simple("echo", Echo(1), Continuations::new(|_| {})))
            .unwrap_err();
        assert_eq!(err, BridgeError::SchedulerShutdown);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = TaskScheduler::new(
            BridgeConfig::default().with_max_in_flight(0),
            Arc::new(InMemoryPlatform::new()),
        )
        .unwrap_err();
        assert!(matches!(err, BridgeError::InvalidConfig(_)));
    }

    #[test]
    fn test_threads_are_named() {
        struct ThreadName;

        impl BlockingStep for ThreadName {
            type Output = Option<String>;

            fn execute(self: Box<Self>, _ctx: &TaskContext) -> Result<Option<String>, BridgeError> {
                Ok(thread::current().name().map(str::to_string))
            }
        }

        let sched = scheduler(BridgeConfig::default().with_thread_name_prefix("unit"));
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let id = sched
            .submit(WorkerTask::simple(
                "thread_name",
                ThreadName,
                Continuations::new(move |name| *sink.lock() = name),
            ))
            .unwrap();
        assert!(sched.run_until_idle(Duration::from_secs(5)));
        assert_eq!(seen.lock().clone(), Some(format!("unit-{id}")));
    }
}
