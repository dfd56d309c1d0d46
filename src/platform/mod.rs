//! Capabilities the bridge requires from the platform SDK.
//!
//! The SDK is a black box. These traits describe only the calls the bridge
//! makes; booleans and `Option`s mirror the SDK's own success reporting, and
//! the operations turn them into [`BridgeError`](crate::core::BridgeError)s.

use serde::{Deserialize, Serialize};

use crate::core::buffer::{ItemDefId, ItemInstanceId, ItemRecord};
use crate::core::handle::CompletionHandle;
use crate::core::notification::NotificationSink;

/// Quantity of an item definition to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemGrant {
    /// Item definition to generate.
    pub definition: ItemDefId,
    /// How many.
    pub quantity: u32,
}

/// Quantity of an item instance to destroy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSpend {
    /// Item instance to consume.
    #[serde(with = "crate::util::serde::u64_string")]
    pub instance: ItemInstanceId,
    /// How many.
    pub quantity: u32,
}

/// Cloud storage quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudQuota {
    /// Total bytes available to the user.
    #[serde(with = "crate::util::serde::u64_string")]
    pub total_bytes: u64,
    /// Bytes still free.
    #[serde(with = "crate::util::serde::u64_string")]
    pub available_bytes: u64,
}

/// Inventory service.
pub trait InventoryApi {
    /// Request consumption of `quantity` units of an item instance.
    /// `None` if the call was refused (e.g. made from the wrong execution context).
    fn consume_item(&self, item: ItemInstanceId, quantity: u32) -> Option<CompletionHandle>;

    /// Request an exchange of destroyed instances for generated definitions.
    fn exchange_items(&self, generate: &[ItemGrant], destroy: &[ItemSpend]) -> Option<CompletionHandle>;

    /// Request a snapshot of every item the user owns.
    fn get_all_items(&self) -> Option<CompletionHandle>;

    /// Open the platform's purchase flow. `None` is an invalid call handle.
    fn start_purchase(&self, items: &[ItemGrant]) -> Option<CompletionHandle>;

    /// Size probe (`dest` is `None`) or fill of a ready result set. Returns the
    /// record count, or `None` on failure.
    fn get_result_items(&self, handle: CompletionHandle, dest: Option<&mut [ItemRecord]>) -> Option<usize>;

    /// Free a result set held by the platform.
    fn destroy_result(&self, handle: CompletionHandle);
}

/// Achievements and stats.
pub trait UserStatsApi {
    /// Unlock an achievement locally. `false` if the name is unknown.
    fn set_achievement(&self, name: &str) -> bool;

    /// Whether an achievement is unlocked. `None` if the name is unknown.
    fn get_achievement(&self, name: &str) -> Option<bool>;

    /// Re-lock an achievement locally. `false` if the name is unknown.
    fn clear_achievement(&self, name: &str) -> bool;

    /// Upload pending stat changes.
    fn store_stats(&self) -> bool;

    /// Ask for the current player count; completes on the API-call channel.
    fn request_current_player_count(&self) -> CompletionHandle;
}

/// Per-user cloud files.
pub trait RemoteStorageApi {
    /// Whether `name` exists.
    fn file_exists(&self, name: &str) -> bool;

    /// Size of `name` in bytes.
    fn file_size(&self, name: &str) -> usize;

    /// Read into `dest`; returns the number of bytes read.
    fn file_read(&self, name: &str, dest: &mut [u8]) -> usize;

    /// Create or replace `name`.
    fn file_write(&self, name: &str, content: &[u8]) -> bool;

    /// Delete `name`.
    fn file_delete(&self, name: &str) -> bool;

    /// Current quota, if available.
    fn quota(&self) -> Option<CloudQuota>;
}

/// Session and ticket services.
pub trait UserApi {
    /// Write a session ticket into `dest`. Returns its handle and length; the
    /// backend's verdict arrives later on the auth-ticket channel.
    fn get_auth_session_ticket(&self, dest: &mut [u8]) -> Option<(CompletionHandle, usize)>;

    /// Ask for an encrypted app ticket embedding `user_data`.
    fn request_encrypted_app_ticket(&self, user_data: &[u8]) -> CompletionHandle;

    /// Copy the most recent encrypted app ticket into `dest`; returns its length.
    fn get_encrypted_app_ticket(&self, dest: &mut [u8]) -> Option<usize>;
}

/// Delivery of pending notifications. Host thread only.
pub trait CallbackPump {
    /// Hand every pending notification to `sink`, in arrival order.
    ///
    /// Implementations may hold their own locks while dispatching. The bridge
    /// never calls into the platform with its registry locked.
    fn run_callbacks(&self, sink: &dyn NotificationSink);
}

/// The full SDK surface.
pub trait Platform:
    InventoryApi + UserStatsApi + RemoteStorageApi + UserApi + CallbackPump + Send + Sync + 'static
{
}

impl<T> Platform for T where
    T: InventoryApi + UserStatsApi + RemoteStorageApi + UserApi + CallbackPump + Send + Sync + 'static
{
}
