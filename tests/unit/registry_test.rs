//! Tests for the correlation registry

use std::sync::Arc;
use std::thread;

use platform_bridge::core::{
    AwaitSlot, CallPayload, Channel, CompletionHandle, CorrelationKey, CorrelationRegistry,
    Notification, NotificationSink, RegistryError, ResultCode, Topic,
};

fn inventory_ready(handle: u64) -> Notification {
    Notification::InventoryResultReady {
        handle: CompletionHandle(handle),
        result: ResultCode::OK,
    }
}

#[test]
fn test_same_handle_on_different_channels_is_distinct() {
    let registry = CorrelationRegistry::new();
    let inventory = Arc::new(AwaitSlot::new());
    let call = Arc::new(AwaitSlot::new());
    registry
        .register(
            CorrelationKey::new(Channel::Inventory, CompletionHandle(4)),
            Arc::clone(&inventory),
        )
        .unwrap();
    registry
        .register(
            CorrelationKey::new(Channel::ApiCall, CompletionHandle(4)),
            Arc::clone(&call),
        )
        .unwrap();

    let completed = Notification::CallCompleted {
        handle: CompletionHandle(4),
        io_failure: false,
        payload: CallPayload::PlayerCount {
            success: true,
            players: 1,
        },
    };
    assert!(registry.dispatch(&completed));
    assert!(call.is_completed());
    assert!(!inventory.is_completed());
    assert_eq!(registry.awaiting_len(), 1);
}

#[test]
fn test_duplicate_error_names_the_key() {
    let registry = CorrelationRegistry::new();
    let key = CorrelationKey::new(Channel::ApiCall, CompletionHandle(4));
    registry.register(key, Arc::new(AwaitSlot::new())).unwrap();
    let err = registry.register(key, Arc::new(AwaitSlot::new())).unwrap_err();
    assert_eq!(err, RegistryError::DuplicateHandle(key));
    assert_eq!(err.to_string(), "duplicate completion handle registered: api_call#4");
}

#[test]
fn test_unsubscribe_stops_marking() {
    let registry = CorrelationRegistry::new();
    let slot = Arc::new(AwaitSlot::new());
    let id = registry.subscribe(Topic::CatalogChanged, Arc::clone(&slot));
    assert_eq!(registry.subscription_len(), 1);
    assert!(registry.unsubscribe(id));
    assert!(!registry.unsubscribe(id));
    assert_eq!(registry.subscription_len(), 0);
}

#[test]
fn test_concurrent_register_and_dispatch() {
    let registry = Arc::new(CorrelationRegistry::new());
    let slots: Vec<_> = (0..64).map(|_| Arc::new(AwaitSlot::new())).collect();

    let handles: Vec<_> = slots
        .iter()
        .enumerate()
        .map(|(i, slot)| {
            let registry = Arc::clone(&registry);
            let slot = Arc::clone(slot);
            thread::spawn(move || {
                registry
                    .register_with(Channel::Inventory, &slot, || Ok(CompletionHandle(i as u64)))
                    .unwrap()
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(registry.awaiting_len(), 64);

    for i in 0..64 {
        assert!(registry.dispatch(&inventory_ready(i)));
    }
    assert!(slots.iter().all(|slot| slot.is_completed()));
    assert_eq!(registry.awaiting_len(), 0);
    assert_eq!(registry.ignored_count(), 0);
}
