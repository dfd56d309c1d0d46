//! Completion handles and correlation keys.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque token returned by the platform when it accepts an asynchronous request.
///
/// Values are only meaningful to the platform; two outstanding operations on the
/// same [`Channel`] never share a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompletionHandle(pub u64);

impl fmt::Display for CompletionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Delivery channel a completion arrives on. Handles are unique per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Inventory result-ready notifications.
    Inventory,
    /// Generic API-call completions.
    ApiCall,
    /// Auth session ticket responses.
    AuthTicket,
}

impl Channel {
    /// Stable lowercase name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inventory => "inventory",
            Self::ApiCall => "api_call",
            Self::AuthTicket => "auth_ticket",
        }
    }
}

/// Broadcast notifications that are not tied to a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    /// The full inventory catalog was refreshed.
    CatalogChanged,
}

/// Registry key: a handle qualified by the channel it completes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationKey {
    /// Delivery channel.
    pub channel: Channel,
    /// Platform handle.
    pub handle: CompletionHandle,
}

impl CorrelationKey {
    /// Build a key.
    #[must_use]
    pub const fn new(channel: Channel, handle: CompletionHandle) -> Self {
        Self { channel, handle }
    }
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.channel.as_str(), self.handle)
    }
}

/// Result code carried by a completion notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultCode(pub u32);

impl ResultCode {
    /// Success.
    pub const OK: Self = Self(1);
    /// Generic failure.
    pub const FAIL: Self = Self(2);
    /// No connection to the platform backend.
    pub const NO_CONNECTION: Self = Self(3);
    /// The request was rate limited.
    pub const LIMIT_EXCEEDED: Self = Self(25);

    /// Whether this code signals success.
    #[must_use]
    pub const fn is_ok(self) -> bool {
        self.0 == Self::OK.0
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
