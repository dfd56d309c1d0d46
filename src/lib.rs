//! # Platform Bridge
//!
//! Asynchronous worker bridge between a single-threaded host and a
//! callback-driven platform SDK.
//!
//! The host (a script runtime, a game loop, a UI thread) may only be touched
//! from its own thread, while the SDK does its real work on remote services and
//! announces completion through notifications that are only delivered when the
//! host runs the SDK's callback pump. This crate runs each request on its own
//! background thread, correlates the SDK's notifications back to the task that
//! is waiting for them, and hands every result to host-thread continuations.
//!
//! ## Key Features
//!
//! - **Two task shapes**: blocking steps that simply run off the host thread,
//!   and callback-awaited steps that issue a request and park until the
//!   correlated notification arrives (or a configurable timeout elapses)
//! - **Correlation registry**: completions are matched by (channel, handle);
//!   unknown handles are ignored and broadcast topics only set flags
//! - **Result-handle protocol**: inventory result sets are probed, fetched into
//!   an exactly-sized buffer and released exactly once on every path
//! - **Host-thread delivery**: continuations only run inside `pump` /
//!   `drain_completions`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use platform_bridge::{Bridge, BridgeConfig, Continuations};
//! use platform_bridge::infra::InMemoryPlatform;
//!
//! let bridge = Bridge::builder(Arc::new(InMemoryPlatform::new()))
//!     .with_config(BridgeConfig::default().with_callback_timeout_ms(5_000))
//!     .build()?;
//!
//! bridge.get_all_items(
//!     Continuations::new(|snapshot| println!("{} items", snapshot.items.len()))
//!         .on_failure(|err| eprintln!("{err}")),
//! )?;
//!
//! // Once per frame on the host thread:
//! bridge.pump();
//! # bridge.run_until_idle(Duration::from_secs(1));
//! ```
//!
//! For complete scenarios, see `tests/inventory_protocol_test.rs` and
//! `tests/scheduler_test.rs`.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Builders to construct the bridge from configuration.
pub mod builders;
/// Configuration models for the scheduler and awaited tasks.
pub mod config;
/// Core scheduling abstractions: tasks, correlation and result handling.
pub mod core;
/// Infrastructure adapters: local files, archives and an in-process platform.
pub mod infra;
/// Operation steps, one module per family.
pub mod ops;
/// Capabilities the bridge requires from the platform SDK.
pub mod platform;
/// Host-facing API surface and async runtime adapters.
pub mod runtime;
/// Shared utilities.
pub mod util;

pub use crate::builders::BridgeBuilder;
pub use crate::config::BridgeConfig;
pub use crate::core::{BridgeError, Continuations, TaskScheduler, WorkerTask};
pub use crate::platform::Platform;
pub use crate::runtime::Bridge;
