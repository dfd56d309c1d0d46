//! In-process platform for development and tests.
//!
//! Emulates the SDK surface closely enough to drive every operation: an item
//! inventory with result sets, achievements, cloud files, a player count and
//! tickets. Completions are queued and only reach the registry when the host
//! calls [`CallbackPump::run_callbacks`], as with the real SDK.
//!
//! Failure modes (refused requests, failing probes or fetches, non-OK result
//! codes) are switched on with the `set_*` methods.

use std::collections::{BTreeMap, HashMap, VecDeque};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::core::buffer::{ItemInstanceId, ItemRecord};
use crate::core::handle::{CompletionHandle, ResultCode};
use crate::core::notification::{CallPayload, Notification, NotificationSink};
use crate::platform::{
    CallbackPump, CloudQuota, InventoryApi, ItemGrant, ItemSpend, RemoteStorageApi, UserApi, UserStatsApi,
};

/// Flag set on a record whose instance was consumed entirely.
pub const ITEM_REMOVED: u16 = 1 << 8;

const DEFAULT_QUOTA_BYTES: u64 = 100 * 1024 * 1024;

/// When completions are queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Delivery {
    /// Each accepted request queues its own completion.
    #[default]
    Automatic,
    /// Nothing is queued until the caller uses [`InMemoryPlatform::enqueue`] or
    /// [`InMemoryPlatform::complete_inventory`].
    Manual,
}

/// A call to `get_result_items`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultQuery {
    /// Size probe.
    Probe(CompletionHandle),
    /// Fill of a caller buffer.
    Fetch(CompletionHandle),
}

#[derive(Debug)]
struct State {
    delivery: Delivery,
    next_handle: u64,
    pending: VecDeque<Notification>,

    items: BTreeMap<ItemInstanceId, ItemRecord>,
    next_instance: ItemInstanceId,
    results: HashMap<CompletionHandle, (ResultCode, Vec<ItemRecord>)>,
    released: Vec<CompletionHandle>,
    queries: Vec<ResultQuery>,
    purchases: Vec<(CompletionHandle, Vec<ItemGrant>)>,
    reject_inventory: bool,
    fail_probe: bool,
    fail_fetch: bool,
    result_override: Option<ResultCode>,
    catalog_update_on_get_all: bool,

    achievements: BTreeMap<String, bool>,
    fail_store_stats: bool,
    players: Option<i32>,
    players_io_failure: bool,

    files: BTreeMap<String, Vec<u8>>,
    fail_file_write: bool,
    fail_file_read: bool,
    quota: Option<CloudQuota>,

    auth_ticket: Vec<u8>,
    reject_auth_ticket: bool,
    auth_result: ResultCode,
    app_ticket: Vec<u8>,
    app_ticket_result: ResultCode,
    app_ticket_io_failure: bool,
    app_ticket_user_data: Option<Vec<u8>>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            delivery: Delivery::Automatic,
            next_handle: 1,
            pending: VecDeque::new(),
            items: BTreeMap::new(),
            next_instance: 1_000,
            results: HashMap::new(),
            released: Vec::new(),
            queries: Vec::new(),
            purchases: Vec::new(),
            reject_inventory: false,
            fail_probe: false,
            fail_fetch: false,
            result_override: None,
            catalog_update_on_get_all: true,
            achievements: BTreeMap::new(),
            fail_store_stats: false,
            players: Some(0),
            players_io_failure: false,
            files: BTreeMap::new(),
            fail_file_write: false,
            fail_file_read: false,
            quota: Some(CloudQuota {
                total_bytes: DEFAULT_QUOTA_BYTES,
                available_bytes: DEFAULT_QUOTA_BYTES,
            }),
            auth_ticket: b"in-memory-auth-ticket".to_vec(),
            reject_auth_ticket: false,
            auth_result: ResultCode::OK,
            app_ticket: b"in-memory-app-ticket".to_vec(),
            app_ticket_result: ResultCode::OK,
            app_ticket_io_failure: false,
            app_ticket_user_data: None,
        }
    }
}

impl State {
    fn issue_handle(&mut self) -> CompletionHandle {
        let handle = CompletionHandle(self.next_handle);
        self.next_handle += 1;
        handle
    }

    fn queue(&mut self, notification: Notification) {
        if self.delivery == Delivery::Automatic {
            self.pending.push_back(notification);
        }
    }

    /// Stage a result set and queue its ready notification.
    fn stage_result(&mut self, code: ResultCode, records: Vec<ItemRecord>) -> CompletionHandle {
        let handle = self.issue_handle();
        let code = self.result_override.unwrap_or(code);
        self.results.insert(handle, (code, records));
        self.queue(Notification::InventoryResultReady { handle, result: code });
        handle
    }

    fn spend(&mut self, instance: ItemInstanceId, quantity: u32) -> Option<ItemRecord> {
        let record = self.items.get_mut(&instance)?;
        let quantity = u16::try_from(quantity).unwrap_or(u16::MAX);
        if quantity == 0 || quantity > record.quantity {
            return None;
        }
        record.quantity -= quantity;
        let mut snapshot = *record;
        if snapshot.quantity == 0 {
            snapshot.flags |= ITEM_REMOVED;
            self.items.remove(&instance);
        }
        Some(snapshot)
    }

    fn grant(&mut self, grant: ItemGrant) -> ItemRecord {
        let record = ItemRecord {
            item_id: self.next_instance,
            definition: grant.definition,
            quantity: u16::try_from(grant.quantity).unwrap_or(u16::MAX),
            flags: 0,
        };
        self.next_instance += 1;
        self.items.insert(record.item_id, record);
        record
    }

    fn used_bytes(&self) -> u64 {
        self.files
            .values()
            .map(|content| u64::try_from(content.len()).unwrap_or(u64::MAX))
            .sum()
    }
}

/// Scriptable in-process implementation of [`Platform`](crate::platform::Platform).
#[derive(Debug, Default)]
pub struct InMemoryPlatform {
    state: Mutex<State>,
}

impl InMemoryPlatform {
    /// Empty platform with automatic delivery and handles starting at 1.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start issuing handles at `first`.
    #[must_use]
    pub fn with_first_handle(self, first: u64) -> Self {
        self.state.lock().next_handle = first;
        self
    }

    /// Choose when completions are queued.
    #[must_use]
    pub fn with_delivery(self, delivery: Delivery) -> Self {
        self.state.lock().delivery = delivery;
        self
    }

    /// Queue an arbitrary notification for the next pump.
    pub fn enqueue(&self, notification: Notification) {
        trace!(?notification, "notification queued");
        self.state.lock().pending.push_back(notification);
    }

    /// Queue the ready notification of a staged inventory result set, with the
    /// result code it was staged with.
    pub fn complete_inventory(&self, handle: CompletionHandle) -> bool {
        let mut state = self.state.lock();
        let Some((result, _)) = state.results.get(&handle) else {
            return false;
        };
        let result = *result;
        state
            .pending
            .push_back(Notification::InventoryResultReady { handle, result });
        true
    }

    /// Notifications waiting for the next pump.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Add an item instance to the user's inventory.
    pub fn add_item(&self, record: ItemRecord) {
        self.state.lock().items.insert(record.item_id, record);
    }

    /// Current inventory, ordered by instance id.
    #[must_use]
    pub fn items(&self) -> Vec<ItemRecord> {
        self.state.lock().items.values().copied().collect()
    }

    /// Refuse consume, exchange and fetch-all requests.
    pub fn set_reject_inventory(&self, reject: bool) {
        self.state.lock().reject_inventory = reject;
    }

    /// Make size probes fail.
    pub fn set_fail_probe(&self, fail: bool) {
        self.state.lock().fail_probe = fail;
    }

    /// Make buffer fills fail.
    pub fn set_fail_fetch(&self, fail: bool) {
        self.state.lock().fail_fetch = fail;
    }

    /// Report `code` on every subsequent inventory result.
    pub fn set_result_override(&self, code: Option<ResultCode>) {
        self.state.lock().result_override = code;
    }

    /// Whether fetch-all also queues a catalog-changed broadcast.
    pub fn set_catalog_update_on_get_all(&self, enabled: bool) {
        self.state.lock().catalog_update_on_get_all = enabled;
    }

    /// Every `destroy_result` call, in order.
    #[must_use]
    pub fn released(&self) -> Vec<CompletionHandle> {
        self.state.lock().released.clone()
    }

    /// How many times `handle` was released.
    #[must_use]
    pub fn release_count(&self, handle: CompletionHandle) -> usize {
        self.state
            .lock()
            .released
            .iter()
            .filter(|released| **released == handle)
            .count()
    }

    /// Every `get_result_items` call, in order.
    #[must_use]
    pub fn result_queries(&self) -> Vec<ResultQuery> {
        self.state.lock().queries.clone()
    }

    /// Purchases started, with their call handles.
    #[must_use]
    pub fn purchases(&self) -> Vec<(CompletionHandle, Vec<ItemGrant>)> {
        self.state.lock().purchases.clone()
    }

    /// Declare a known, locked achievement.
    pub fn define_achievement(&self, name: impl Into<String>) {
        self.state.lock().achievements.insert(name.into(), false);
    }

    /// Unlock state of `name`, if defined.
    #[must_use]
    pub fn achievement(&self, name: &str) -> Option<bool> {
        self.state.lock().achievements.get(name).copied()
    }

    /// Make `store_stats` fail.
    pub fn set_fail_store_stats(&self, fail: bool) {
        self.state.lock().fail_store_stats = fail;
    }

    /// Player count reported by the next query; `None` reports an unsuccessful
    /// lookup.
    pub fn set_players(&self, players: Option<i32>) {
        self.state.lock().players = players;
    }

    /// Report an i/o failure on player count queries.
    pub fn set_players_io_failure(&self, failure: bool) {
        self.state.lock().players_io_failure = failure;
    }

    /// Store a cloud file directly.
    pub fn put_file(&self, name: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.state.lock().files.insert(name.into(), content.into());
    }

    /// Content of a cloud file.
    #[must_use]
    pub fn file(&self, name: &str) -> Option<Vec<u8>> {
        self.state.lock().files.get(name).cloned()
    }

    /// Make cloud writes fail.
    pub fn set_fail_file_write(&self, fail: bool) {
        self.state.lock().fail_file_write = fail;
    }

    /// Make cloud reads return zero bytes.
    pub fn set_fail_file_read(&self, fail: bool) {
        self.state.lock().fail_file_read = fail;
    }

    /// Total quota, or `None` to make quota queries fail.
    pub fn set_quota_total(&self, total_bytes: Option<u64>) {
        self.state.lock().quota = total_bytes.map(|total_bytes| CloudQuota {
            total_bytes,
            available_bytes: total_bytes,
        });
    }

    /// Bytes handed out as the auth session ticket.
    pub fn set_auth_ticket(&self, ticket: impl Into<Vec<u8>>) {
        self.state.lock().auth_ticket = ticket.into();
    }

    /// Refuse auth ticket requests.
    pub fn set_reject_auth_ticket(&self, reject: bool) {
        self.state.lock().reject_auth_ticket = reject;
    }

    /// Result code of auth ticket validation.
    pub fn set_auth_result(&self, result: ResultCode) {
        self.state.lock().auth_result = result;
    }

    /// Bytes handed out as the encrypted app ticket.
    pub fn set_app_ticket(&self, ticket: impl Into<Vec<u8>>) {
        self.state.lock().app_ticket = ticket.into();
    }

    /// Result code and transport outcome of encrypted app ticket requests.
    pub fn set_app_ticket_outcome(&self, result: ResultCode, io_failure: bool) {
        let mut state = self.state.lock();
        state.app_ticket_result = result;
        state.app_ticket_io_failure = io_failure;
    }

    /// User data passed with the last encrypted app ticket request.
    #[must_use]
    pub fn app_ticket_user_data(&self) -> Option<Vec<u8>> {
        self.state.lock().app_ticket_user_data.clone()
    }
}

impl InventoryApi for InMemoryPlatform {
    fn consume_item(&self, item: ItemInstanceId, quantity: u32) -> Option<CompletionHandle> {
        let mut state = self.state.lock();
        if state.reject_inventory {
            return None;
        }
        let handle = match state.spend(item, quantity) {
            Some(record) => state.stage_result(ResultCode::OK, vec![record]),
            None => state.stage_result(ResultCode::FAIL, Vec::new()),
        };
        debug!(handle = %handle, item, quantity, "consume_item accepted");
        Some(handle)
    }

    fn exchange_items(&self, generate: &[ItemGrant], destroy: &[ItemSpend]) -> Option<CompletionHandle> {
        let mut state = self.state.lock();
        if state.reject_inventory || generate.len() != 1 {
            return None;
        }
        let affordable = destroy.iter().all(|spend| {
            state.items.get(&spend.instance).is_some_and(|record| {
                u16::try_from(spend.quantity).is_ok_and(|q| q > 0 && q <= record.quantity)
            })
        });
        if !affordable {
            return Some(state.stage_result(ResultCode::FAIL, Vec::new()));
        }
        let mut records: Vec<ItemRecord> = generate.iter().map(|grant| state.grant(*grant)).collect();
        records.extend(
            destroy
                .iter()
                .filter_map(|spend| state.spend(spend.instance, spend.quantity)),
        );
        Some(state.stage_result(ResultCode::OK, records))
    }

    fn get_all_items(&self) -> Option<CompletionHandle> {
        let mut state = self.state.lock();
        if state.reject_inventory {
            return None;
        }
        let records: Vec<ItemRecord> = state.items.values().copied().collect();
        let handle = state.issue_handle();
        let code = state.result_override.unwrap_or(ResultCode::OK);
        state.results.insert(handle, (code, records));
        if state.catalog_update_on_get_all {
            state.queue(Notification::InventoryFullUpdate { handle });
        }
        state.queue(Notification::InventoryResultReady { handle, result: code });
        Some(handle)
    }

    fn start_purchase(&self, items: &[ItemGrant]) -> Option<CompletionHandle> {
        let mut state = self.state.lock();
        if state.reject_inventory || items.is_empty() {
            return None;
        }
        let handle = state.issue_handle();
        state.purchases.push((handle, items.to_vec()));
        Some(handle)
    }

    fn get_result_items(&self, handle: CompletionHandle, dest: Option<&mut [ItemRecord]>) -> Option<usize> {
        let mut state = self.state.lock();
        match dest {
            None => {
                state.queries.push(ResultQuery::Probe(handle));
                if state.fail_probe {
                    return None;
                }
                state.results.get(&handle).map(|(_, records)| records.len())
            }
            Some(dest) => {
                state.queries.push(ResultQuery::Fetch(handle));
                if state.fail_fetch {
                    return None;
                }
                let (_, records) = state.results.get(&handle)?;
                let filled = dest.len().min(records.len());
                dest[..filled].copy_from_slice(&records[..filled]);
                Some(filled)
            }
        }
    }

    fn destroy_result(&self, handle: CompletionHandle) {
        let mut state = self.state.lock();
        state.results.remove(&handle);
        state.released.push(handle);
    }
}

impl UserStatsApi for InMemoryPlatform {
    fn set_achievement(&self, name: &str) -> bool {
        match self.state.lock().achievements.get_mut(name) {
            Some(unlocked) => {
                *unlocked = true;
                true
            }
            None => false,
        }
    }

    fn get_achievement(&self, name: &str) -> Option<bool> {
        self.achievement(name)
    }

    fn clear_achievement(&self, name: &str) -> bool {
        match self.state.lock().achievements.get_mut(name) {
            Some(unlocked) => {
                *unlocked = false;
                true
            }
            None => false,
        }
    }

    fn store_stats(&self) -> bool {
        !self.state.lock().fail_store_stats
    }

    fn request_current_player_count(&self) -> CompletionHandle {
        let mut state = self.state.lock();
        let handle = state.issue_handle();
        let payload = CallPayload::PlayerCount {
            success: state.players.is_some(),
            players: state.players.unwrap_or_default(),
        };
        let io_failure = state.players_io_failure;
        state.queue(Notification::CallCompleted {
            handle,
            io_failure,
            payload,
        });
        handle
    }
}

impl RemoteStorageApi for InMemoryPlatform {
    fn file_exists(&self, name: &str) -> bool {
        self.state.lock().files.contains_key(name)
    }

    fn file_size(&self, name: &str) -> usize {
        self.state.lock().files.get(name).map_or(0, Vec::len)
    }

    fn file_read(&self, name: &str, dest: &mut [u8]) -> usize {
        let state = self.state.lock();
        if state.fail_file_read {
            return 0;
        }
        let Some(content) = state.files.get(name) else {
            return 0;
        };
        let read = dest.len().min(content.len());
        dest[..read].copy_from_slice(&content[..read]);
        read
    }

    fn file_write(&self, name: &str, content: &[u8]) -> bool {
        let mut state = self.state.lock();
        if state.fail_file_write {
            return false;
        }
        state.files.insert(name.to_string(), content.to_vec());
        true
    }

    fn file_delete(&self, name: &str) -> bool {
        self.state.lock().files.remove(name).is_some()
    }

    fn quota(&self) -> Option<CloudQuota> {
        let state = self.state.lock();
        let used = state.used_bytes();
        state.quota.map(|quota| CloudQuota {
            total_bytes: quota.total_bytes,
            available_bytes: quota.total_bytes.saturating_sub(used),
        })
    }
}

impl UserApi for InMemoryPlatform {
    fn get_auth_session_ticket(&self, dest: &mut [u8]) -> Option<(CompletionHandle, usize)> {
        let mut state = self.state.lock();
        if state.reject_auth_ticket {
            return None;
        }
        let len = dest.len().min(state.auth_ticket.len());
        dest[..len].copy_from_slice(&state.auth_ticket[..len]);
        let handle = state.issue_handle();
        let result = state.auth_result;
        state.queue(Notification::AuthSessionTicket { handle, result });
        Some((handle, len))
    }

    fn request_encrypted_app_ticket(&self, user_data: &[u8]) -> CompletionHandle {
        let mut state = self.state.lock();
        state.app_ticket_user_data = Some(user_data.to_vec());
        let handle = state.issue_handle();
        let notification = Notification::CallCompleted {
            handle,
            io_failure: state.app_ticket_io_failure,
            payload: CallPayload::EncryptedAppTicket {
                result: state.app_ticket_result,
            },
        };
        state.queue(notification);
        handle
    }

    fn get_encrypted_app_ticket(&self, dest: &mut [u8]) -> Option<usize> {
        let state = self.state.lock();
        if state.app_ticket.len() > dest.len() {
            return None;
        }
        dest[..state.app_ticket.len()].copy_from_slice(&state.app_ticket);
        Some(state.app_ticket.len())
    }
}

impl CallbackPump for InMemoryPlatform {
    fn run_callbacks(&self, sink: &dyn NotificationSink) {
        let pending: Vec<Notification> = self.state.lock().pending.drain(..).collect();
        for notification in &pending {
            let resolved = sink.dispatch(notification);
            trace!(?notification, resolved, "notification dispatched");
        }
    }
}
