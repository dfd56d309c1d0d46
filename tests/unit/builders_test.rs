//! Tests for builder modules

use std::sync::Arc;

use platform_bridge::infra::platform::InMemoryPlatform;
use platform_bridge::{BridgeBuilder, BridgeConfig, BridgeError};

#[test]
fn test_builder_applies_config() {
    let bridge = BridgeBuilder::new(Arc::new(InMemoryPlatform::new()))
        .with_config(BridgeConfig::default().with_max_in_flight(3))
        .build()
        .unwrap();
    assert_eq!(bridge.scheduler().config().max_in_flight, 3);
    assert_eq!(bridge.stats().submitted, 0);
}

#[test]
fn test_builder_rejects_invalid_config() {
    let err = BridgeBuilder::new(Arc::new(InMemoryPlatform::new()))
        .with_config(BridgeConfig::default().with_callback_timeout_ms(0))
        .build()
        .unwrap_err();
    assert!(matches!(err, BridgeError::InvalidConfig(msg) if msg.contains("callback_timeout_ms")));
}
