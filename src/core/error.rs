//! Error types for bridge operations.

use thiserror::Error;

use crate::core::handle::{CorrelationKey, ResultCode};

/// Errors surfaced to the host through a task's failure continuation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// The platform refused the request immediately.
    #[error("{operation} rejected: {reason}")]
    SynchronousRejection {
        /// Operation that was refused.
        operation: &'static str,
        /// Human-readable reason.
        reason: String,
    },
    /// A completion arrived carrying a non-OK result code.
    #[error("{operation} failed with result code {code}")]
    PlatformResult {
        /// Operation whose completion failed.
        operation: &'static str,
        /// Result code reported by the platform.
        code: ResultCode,
    },
    /// The completion arrived but its results could not be read.
    #[error("{operation} failed: {reason}")]
    ResultFetch {
        /// Operation whose result could not be read.
        operation: &'static str,
        /// Human-readable reason.
        reason: String,
    },
    /// No completion arrived within the configured wait.
    #[error("{operation} timed out after {elapsed_ms} ms")]
    Timeout {
        /// Operation that timed out.
        operation: &'static str,
        /// Milliseconds spent waiting.
        elapsed_ms: u64,
    },
    /// A local file or archive step failed.
    #[error("{operation} i/o failure: {reason}")]
    Io {
        /// Operation that failed.
        operation: &'static str,
        /// Human-readable reason.
        reason: String,
    },
    /// A completion was correlated to the task but carried the wrong payload.
    #[error("{operation} received an unexpected completion")]
    UnexpectedNotification {
        /// Operation that received it.
        operation: &'static str,
    },
    /// The scheduler no longer accepts work.
    #[error("scheduler is shut down")]
    SchedulerShutdown,
    /// Too many tasks are in flight.
    #[error("scheduler saturated: {in_flight} tasks in flight (limit {limit})")]
    Saturated {
        /// Tasks currently in flight.
        in_flight: u64,
        /// Configured limit.
        limit: usize,
    },
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A background thread could not be started.
    #[error("failed to spawn background thread: {0}")]
    Spawn(String),
}

impl BridgeError {
    /// Shorthand for a synchronous rejection.
    pub fn rejected(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::SynchronousRejection {
            operation,
            reason: reason.into(),
        }
    }

    /// Shorthand for a local i/o failure.
    pub fn io(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::Io {
            operation,
            reason: reason.into(),
        }
    }

    /// Whether this error is a timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Programmer errors in correlation bookkeeping. Never reported to the host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A handle was registered while another task was already awaiting it.
    #[error("duplicate completion handle registered: {0}")]
    DuplicateHandle(CorrelationKey),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
