//! Builders to construct the bridge from configuration.

pub mod bridge_builder;

pub use bridge_builder::BridgeBuilder;
