//! Host-facing API surface and async runtime adapters.

pub mod bridge;
#[cfg(feature = "tokio-runtime")]
pub mod oneshot;

pub use bridge::Bridge;
#[cfg(feature = "tokio-runtime")]
pub use oneshot::{channel as oneshot_channel, PendingResult};
