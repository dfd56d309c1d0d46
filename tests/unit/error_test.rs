//! Tests for error types

use platform_bridge::core::{Channel, CompletionHandle, CorrelationKey, RegistryError, ResultCode};
use platform_bridge::BridgeError;

#[test]
fn test_platform_result_names_operation_and_code() {
    let err = BridgeError::PlatformResult {
        operation: "consume_item",
        code: ResultCode(16),
    };
    assert_eq!(format!("{err}"), "consume_item failed with result code 16");
}

#[test]
fn test_timeout_message() {
    let err = BridgeError::Timeout {
        operation: "get_all_items",
        elapsed_ms: 60_000,
    };
    assert_eq!(format!("{err}"), "get_all_items timed out after 60000 ms");
    assert!(err.is_timeout());
}

#[test]
fn test_rejection_message() {
    let err = BridgeError::rejected("delete_file", "file doesn't exist");
    assert_eq!(format!("{err}"), "delete_file rejected: file doesn't exist");
    assert!(!err.is_timeout());
}

#[test]
fn test_io_message() {
    let err = BridgeError::io("create_archive", "no archive tool configured");
    assert_eq!(format!("{err}"), "create_archive i/o failure: no archive tool configured");
}

#[test]
fn test_saturated_message() {
    let err = BridgeError::Saturated {
        in_flight: 256,
        limit: 256,
    };
    assert_eq!(format!("{err}"), "scheduler saturated: 256 tasks in flight (limit 256)");
}

#[test]
fn test_duplicate_handle_message() {
    let err = RegistryError::DuplicateHandle(CorrelationKey::new(Channel::ApiCall, CompletionHandle(4)));
    assert_eq!(format!("{err}"), "duplicate completion handle registered: api_call#4");
}
