//! Tests for configuration validation and loading

use std::collections::HashMap;
use std::time::Duration;

use platform_bridge::BridgeConfig;

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn test_defaults() {
    let cfg = BridgeConfig::default();
    assert_eq!(cfg.callback_timeout_ms, 60_000);
    assert!(cfg.timeout_enabled);
    assert_eq!(cfg.pump_interval_ms, 100);
    assert_eq!(cfg.max_in_flight, 256);
    assert_eq!(cfg.thread_stack_size, 2 * 1024 * 1024);
    assert_eq!(cfg.thread_name_prefix, "bridge-task");
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.wait_policy().timeout, Some(Duration::from_secs(60)));
}

#[test]
fn test_disabled_timeout_waits_unbounded() {
    let cfg = BridgeConfig::default().with_timeout_enabled(false);
    assert_eq!(cfg.wait_policy().timeout, None);
}

#[test]
fn test_invalid_values() {
    assert!(BridgeConfig::default().with_callback_timeout_ms(0).validate().is_err());
    assert!(BridgeConfig::default().with_pump_interval_ms(0).validate().is_err());
    assert!(BridgeConfig::default().with_max_in_flight(0).validate().is_err());
    assert!(BridgeConfig::default().with_thread_stack_size(4096).validate().is_err());
    assert!(BridgeConfig::default().with_thread_name_prefix("  ").validate().is_err());
}

#[test]
fn test_from_json_partial() {
    let cfg = BridgeConfig::from_json_str(r#"{"callback_timeout_ms": 250, "max_in_flight": 8}"#).unwrap();
    assert_eq!(cfg.callback_timeout_ms, 250);
    assert_eq!(cfg.max_in_flight, 8);
    assert_eq!(cfg.pump_interval_ms, 100);
}

#[test]
fn test_from_json_rejects_invalid() {
    let err = BridgeConfig::from_json_str(r#"{"pump_interval_ms": 0}"#).unwrap_err();
    assert!(err.contains("pump_interval_ms"));
    assert!(BridgeConfig::from_json_str("not json").unwrap_err().starts_with("parse error"));
}

#[test]
fn test_json_roundtrip() {
    let cfg = BridgeConfig::default().with_thread_name_prefix("inventory");
    let json = serde_json::to_string(&cfg).unwrap();
    assert_eq!(BridgeConfig::from_json_str(&json).unwrap(), cfg);
}

#[test]
fn test_env_overrides() {
    let cfg = BridgeConfig::from_lookup(lookup(&[
        ("BRIDGE_CALLBACK_TIMEOUT_MS", "1500"),
        ("BRIDGE_TIMEOUT_ENABLED", "false"),
        ("BRIDGE_THREAD_NAME_PREFIX", "worker"),
    ]))
    .unwrap();
    assert_eq!(cfg.callback_timeout_ms, 1_500);
    assert!(!cfg.timeout_enabled);
    assert_eq!(cfg.thread_name_prefix, "worker");
    assert_eq!(cfg.max_in_flight, 256);
}

#[test]
fn test_env_unparsable_value() {
    let err = BridgeConfig::from_lookup(lookup(&[("BRIDGE_MAX_IN_FLIGHT", "lots")])).unwrap_err();
    assert!(err.starts_with("BRIDGE_MAX_IN_FLIGHT"));
}

#[test]
fn test_env_values_are_validated() {
    assert!(BridgeConfig::from_lookup(lookup(&[("BRIDGE_PUMP_INTERVAL_MS", "0")])).is_err());
}

#[test]
fn test_load_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bridge.json");
    std::fs::write(&path, r#"{"thread_name_prefix": "steam"}"#).unwrap();
    let cfg = BridgeConfig::load(&path).unwrap();
    assert_eq!(cfg.thread_name_prefix, "steam");

    std::fs::write(&path, r#"{"max_in_flight": 0}"#).unwrap();
    let err = BridgeConfig::load(&path).unwrap_err();
    assert!(format!("{err:#}").contains("max_in_flight"));

    assert!(BridgeConfig::load(dir.path().join("missing.json")).is_err());
}
