//! Configuration models for the scheduler and awaited tasks.

pub mod bridge;

pub use bridge::BridgeConfig;
