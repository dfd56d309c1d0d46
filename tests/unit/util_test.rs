//! Tests for utility functions

use platform_bridge::core::ItemRecord;
use platform_bridge::platform::{CloudQuota, ItemSpend};
use platform_bridge::util::init_tracing;

#[test]
fn test_item_record_json_shape() {
    let record = ItemRecord {
        item_id: u64::MAX,
        definition: -1,
        quantity: 3,
        flags: 256,
    };
    let json = serde_json::to_string(&record).unwrap();
    assert_eq!(
        json,
        r#"{"item_id":"18446744073709551615","definition":-1,"quantity":3,"flags":256}"#
    );
    let back: ItemRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(back, record);
}

#[test]
fn test_u64_fields_accept_numbers_too() {
    let spend: ItemSpend = serde_json::from_str(r#"{"instance": 12, "quantity": 1}"#).unwrap();
    assert_eq!(spend.instance, 12);
    let quota: CloudQuota =
        serde_json::from_str(r#"{"total_bytes": "100", "available_bytes": 40}"#).unwrap();
    assert_eq!(quota.available_bytes, 40);
}

#[test]
fn test_u64_fields_reject_garbage() {
    assert!(serde_json::from_str::<ItemSpend>(r#"{"instance": "12a", "quantity": 1}"#).is_err());
}

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    init_tracing();
}
