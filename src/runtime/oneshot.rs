//! Tokio adapter: turn a task's continuations into an awaitable result.
//!
//! The host thread must still pump the bridge; the receiver only resolves once
//! the continuation has run inside a drain.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::core::error::BridgeError;
use crate::core::task::Continuations;

/// Receiving half of [`channel`].
#[derive(Debug)]
pub struct PendingResult<T> {
    rx: oneshot::Receiver<Result<T, BridgeError>>,
}

impl<T> PendingResult<T> {
    /// Wait for the task to resolve.
    ///
    /// # Errors
    ///
    /// The task's failure, or [`BridgeError::SchedulerShutdown`] if its
    /// continuations were dropped without running.
    pub async fn wait(self) -> Result<T, BridgeError> {
        self.rx.await.map_err(|_| BridgeError::SchedulerShutdown)?
    }

    /// The outcome if the task already resolved.
    pub fn try_take(&mut self) -> Option<Result<T, BridgeError>> {
        self.rx.try_recv().ok()
    }
}

/// Continuations that forward the outcome, success or failure, to a
/// [`PendingResult`].
#[must_use]
pub fn channel<T: Send + 'static>() -> (Continuations<T>, PendingResult<T>) {
    let (tx, rx) = oneshot::channel();
    let tx = Arc::new(Mutex::new(Some(tx)));
    let on_failure_tx = Arc::clone(&tx);

    let continuations = Continuations::new(move |value| {
        if let Some(tx) = tx.lock().take() {
            let _ = tx.send(Ok(value));
        }
    })
    .on_failure(move |err| {
        if let Some(tx) = on_failure_tx.lock().take() {
            let _ = tx.send(Err(err));
        }
    });

    (continuations, PendingResult { rx })
}
