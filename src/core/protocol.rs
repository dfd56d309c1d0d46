//! Result-handle protocol shared by inventory-class operations.
//!
//! issue -> await ready -> size probe -> fetch -> release. The first two phases
//! are [`CallbackAwaitable`](crate::core::CallbackAwaitable); this module covers
//! the rest. The platform-side result set is released exactly once on every exit
//! path through [`ReleaseGuard`].

use tracing::{trace, warn};

use crate::core::buffer::{ItemRecord, ResultBuffer};
use crate::core::error::BridgeError;
use crate::core::handle::{CompletionHandle, ResultCode};
use crate::platform::InventoryApi;

const FETCH_FAILURE: &str = "the user has no items, or an internal error occurred";

/// Destroys a platform result set when dropped.
#[must_use = "the result set is released as soon as the guard drops"]
pub struct ReleaseGuard<'a, I: InventoryApi + ?Sized> {
    inventory: &'a I,
    handle: CompletionHandle,
}

impl<'a, I: InventoryApi + ?Sized> ReleaseGuard<'a, I> {
    /// Take ownership of the release of `handle`.
    pub const fn new(inventory: &'a I, handle: CompletionHandle) -> Self {
        Self { inventory, handle }
    }

    /// Handle being guarded.
    #[must_use]
    pub const fn handle(&self) -> CompletionHandle {
        self.handle
    }
}

impl<I: InventoryApi + ?Sized> Drop for ReleaseGuard<'_, I> {
    fn drop(&mut self) {
        trace!(handle = %self.handle, "releasing result set");
        self.inventory.destroy_result(self.handle);
    }
}

/// Read a ready result set into an exactly-sized buffer, then release it.
///
/// A non-OK `result` skips the probe. A failed probe skips the fetch. A failed
/// fetch discards the buffer. The release runs in all three cases.
///
/// # Errors
///
/// [`BridgeError::PlatformResult`] for a non-OK code, [`BridgeError::ResultFetch`]
/// when probing or filling fails.
pub fn collect_result_items<I: InventoryApi + ?Sized>(
    inventory: &I,
    operation: &'static str,
    handle: CompletionHandle,
    result: ResultCode,
) -> Result<ResultBuffer<ItemRecord>, BridgeError> {
    let _release = ReleaseGuard::new(inventory, handle);

    if !result.is_ok() {
        return Err(BridgeError::PlatformResult {
            operation,
            code: result,
        });
    }

    let fetch_failed = || BridgeError::ResultFetch {
        operation,
        reason: FETCH_FAILURE.to_string(),
    };

    let count = inventory.get_result_items(handle, None).ok_or_else(fetch_failed)?;
    let mut buffer = ResultBuffer::allocate(count);
    let filled = inventory
        .get_result_items(handle, Some(buffer.as_mut_slice()))
        .ok_or_else(fetch_failed)?;
    if filled != count {
        warn!(operation, handle = %handle, count, filled, "result set changed size between probe and fetch");
        return Err(fetch_failed());
    }
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::ItemGrant;
    use crate::core::buffer::ItemInstanceId;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        records: Vec<ItemRecord>,
        fail_probe: bool,
        fail_fetch: bool,
        calls: Mutex<Vec<&'static str>>,
    }

    impl InventoryApi for Recorder {
        fn consume_item(&self, _: ItemInstanceId, _: u32) -> Option<CompletionHandle> {
            None
        }
        fn exchange_items(&self, _: &[ItemGrant], _: &[crate::platform::ItemSpend]) -> Option<CompletionHandle> {
            None
        }
        fn get_all_items(&self) -> Option<CompletionHandle> {
            None
        }
        fn start_purchase(&self, _: &[ItemGrant]) -> Option<CompletionHandle> {
            None
        }
        fn get_result_items(&self, _: CompletionHandle, dest: Option<&mut [ItemRecord]>) -> Option<usize> {
            match dest {
                None => {
                    self.calls.lock().push("probe");
                    (!self.fail_probe).then_some(self.records.len())
                }
                Some(dest) => {
                    self.calls.lock().push("fetch");
                    if self.fail_fetch {
                        return None;
                    }
                    dest.copy_from_slice(&self.records);
                    Some(dest.len())
                }
            }
        }
        fn destroy_result(&self, _: CompletionHandle) {
            self.calls.lock().push("release");
        }
    }

    fn record(id: u64) -> ItemRecord {
        ItemRecord {
            item_id: id,
            definition: 42,
            quantity: 1,
            flags: 0,
        }
    }

    #[test]
    fn test_success_probes_fetches_releases() {
        let inv = Recorder {
            records: vec![record(1), record(2)],
            ..Default::default()
        };
        let items = collect_result_items(&inv, "get_all_items", CompletionHandle(1), ResultCode::OK).unwrap();
        assert_eq!(items.as_slice(), &[record(1), record(2)]);
        assert_eq!(*inv.calls.lock(), vec!["probe", "fetch", "release"]);
    }

    #[test]
    fn test_probe_failure_skips_fetch_and_releases() {
        let inv = Recorder {
            records: vec![record(1)],
            fail_probe: true,
            ..Default::default()
        };
        let err = collect_result_items(&inv, "consume_item", CompletionHandle(1), ResultCode::OK).unwrap_err();
        assert!(matches!(err, BridgeError::ResultFetch { .. }));
        assert!(err.to_string().contains("no items, or an internal error"));
        assert_eq!(*inv.calls.lock(), vec!["probe", "release"]);
    }

    #[test]
    fn test_fetch_failure_releases() {
        let inv = Recorder {
            records: vec![record(1)],
            fail_fetch: true,
            ..Default::default()
        };
        let err = collect_result_items(&inv, "consume_item", CompletionHandle(1), ResultCode::OK).unwrap_err();
        assert!(matches!(err, BridgeError::ResultFetch { .. }));
        assert_eq!(*inv.calls.lock(), vec!["probe", "fetch", "release"]);
    }

    #[test]
    fn test_result_code_failure_releases_without_probe() {
        let inv = Recorder::default();
        let err = collect_result_items(&inv, "exchange_items", CompletionHandle(1), ResultCode(16)).unwrap_err();
        assert_eq!(
            err,
            BridgeError::PlatformResult {
                operation: "exchange_items",
                code: ResultCode(16)
            }
        );
        assert_eq!(*inv.calls.lock(), vec!["release"]);
    }

    #[test]
    fn test_empty_result_set_is_success() {
        let inv = Recorder::default();
        let items = collect_result_items(&inv, "get_all_items", CompletionHandle(1), ResultCode::OK).unwrap();
        assert!(items.is_empty());
    }
}
