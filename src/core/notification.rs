//! Completion notifications delivered by the platform's callback pump.

use serde::{Deserialize, Serialize};

use crate::core::handle::{Channel, CompletionHandle, CorrelationKey, ResultCode, Topic};

/// Payload of a generic API-call completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CallPayload {
    /// Current player count query finished.
    PlayerCount {
        /// Whether the backend answered.
        success: bool,
        /// Number of players currently online.
        players: i32,
    },
    /// Encrypted app ticket request finished.
    EncryptedAppTicket {
        /// Result code of the request.
        result: ResultCode,
    },
}

/// An event produced by the platform pump, carrying a handle and an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// An inventory result set is ready to be read.
    InventoryResultReady {
        /// Handle the request was issued with.
        handle: CompletionHandle,
        /// Outcome of the request.
        result: ResultCode,
    },
    /// The full inventory catalog was refreshed. Not tied to any waiting handle.
    InventoryFullUpdate {
        /// Result set backing the refresh.
        handle: CompletionHandle,
    },
    /// A generic API call finished.
    CallCompleted {
        /// Call handle.
        handle: CompletionHandle,
        /// Transport failure while talking to the backend.
        io_failure: bool,
        /// Call-specific payload.
        payload: CallPayload,
    },
    /// An auth session ticket was validated by the backend.
    AuthSessionTicket {
        /// Ticket handle.
        handle: CompletionHandle,
        /// Outcome of the validation.
        result: ResultCode,
    },
}

impl Notification {
    /// Key of the awaiting task this notification resolves, if any.
    #[must_use]
    pub const fn correlation_key(&self) -> Option<CorrelationKey> {
        match *self {
            Self::InventoryResultReady { handle, .. } => {
                Some(CorrelationKey::new(Channel::Inventory, handle))
            }
            Self::CallCompleted { handle, .. } => Some(CorrelationKey::new(Channel::ApiCall, handle)),
            Self::AuthSessionTicket { handle, .. } => {
                Some(CorrelationKey::new(Channel::AuthTicket, handle))
            }
            Self::InventoryFullUpdate { .. } => None,
        }
    }

    /// Broadcast topic of this notification, if any.
    #[must_use]
    pub const fn topic(&self) -> Option<Topic> {
        match self {
            Self::InventoryFullUpdate { .. } => Some(Topic::CatalogChanged),
            _ => None,
        }
    }
}

/// Receiver of pumped notifications.
///
/// Implementations must tolerate notifications nobody is waiting for.
pub trait NotificationSink {
    /// Deliver one notification. Returns `true` if it resolved an awaiting task.
    fn dispatch(&self, notification: &Notification) -> bool;
}
