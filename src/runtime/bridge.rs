//! Host-facing façade.
//!
//! Every operation returns as soon as its task is accepted. The outcome reaches
//! the supplied [`Continuations`] on a later [`Bridge::pump`] (or
//! [`Bridge::drain_completions`]) on the host thread. If the task is refused
//! synchronously the error is returned and the continuations are dropped
//! without running.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::builders::BridgeBuilder;
use crate::core::buffer::{ItemInstanceId, ItemRecord, ResultBuffer};
use crate::core::error::BridgeError;
use crate::core::handle::CompletionHandle;
use crate::core::registry::CorrelationRegistry;
use crate::core::scheduler::{SchedulerStats, TaskScheduler};
use crate::core::task::{Continuations, TaskId, WorkerTask};
use crate::infra::archive::ArchiveTool;
use crate::infra::files::FileStore;
use crate::ops::{archive, cloud, inventory, session, stats};
use crate::ops::{
    ActivateAchievement, AuthSessionTicket, AuthTicket, ClearAchievement, CreateArchive, DeleteFile,
    EncryptedAppTicket, ExtractArchive, GetAchievement, GetCloudQuota, InventorySnapshot, InventoryStep,
    PlayerCount, ReadTextFromFile, SaveFilesToCloud, SaveTextToFile, StartPurchase,
};
use crate::platform::{CloudQuota, ItemGrant, ItemSpend, Platform};

/// Asynchronous operations over a platform SDK.
pub struct Bridge {
    scheduler: TaskScheduler,
    file_store: Arc<dyn FileStore>,
    archive_tool: Option<Arc<dyn ArchiveTool>>,
}

impl Bridge {
    /// Start building a bridge over `platform`.
    pub fn builder(platform: Arc<dyn Platform>) -> BridgeBuilder {
        BridgeBuilder::new(platform)
    }

    pub(crate) fn from_parts(
        scheduler: TaskScheduler,
        file_store: Arc<dyn FileStore>,
        archive_tool: Option<Arc<dyn ArchiveTool>>,
    ) -> Self {
        Self {
            scheduler,
            file_store,
            archive_tool,
        }
    }

    /// Submit a custom task.
    ///
    /// # Errors
    ///
    /// See [`TaskScheduler::submit`].
    pub fn submit<T: Send + 'static>(&self, task: WorkerTask<T>) -> Result<TaskId, BridgeError> {
        self.scheduler.submit(task)
    }

    // Inventory

    /// Consume `quantity` units of an item instance. Yields the changed records.
    ///
    /// # Errors
    ///
    /// Synchronous refusal by the scheduler.
    pub fn consume_item(
        &self,
        item: ItemInstanceId,
        quantity: u32,
        continuations: Continuations<ResultBuffer<ItemRecord>>,
    ) -> Result<TaskId, BridgeError> {
        self.submit(WorkerTask::awaited(
            inventory::CONSUME_ITEM,
            InventoryStep::consume(item, quantity),
            continuations.map_input(|snapshot: InventorySnapshot| snapshot.items),
        ))
    }

    /// Exchange instances for a generated item. Yields the changed records.
    ///
    /// # Errors
    ///
    /// Synchronous refusal by the scheduler.
    pub fn exchange_items(
        &self,
        generate: Vec<ItemGrant>,
        destroy: Vec<ItemSpend>,
        continuations: Continuations<ResultBuffer<ItemRecord>>,
    ) -> Result<TaskId, BridgeError> {
        self.submit(WorkerTask::awaited(
            inventory::EXCHANGE_ITEMS,
            InventoryStep::exchange(generate, destroy),
            continuations.map_input(|snapshot: InventorySnapshot| snapshot.items),
        ))
    }

    /// Snapshot the user's inventory.
    ///
    /// # Errors
    ///
    /// Synchronous refusal by the scheduler.
    pub fn get_all_items(&self, continuations: Continuations<InventorySnapshot>) -> Result<TaskId, BridgeError> {
        self.submit(WorkerTask::awaited(
            inventory::GET_ALL_ITEMS,
            InventoryStep::fetch_all(),
            continuations,
        ))
    }

    /// Open the purchase flow. Yields the platform call handle.
    ///
    /// # Errors
    ///
    /// Synchronous refusal by the scheduler.
    pub fn start_purchase(
        &self,
        items: Vec<ItemGrant>,
        continuations: Continuations<CompletionHandle>,
    ) -> Result<TaskId, BridgeError> {
        self.submit(WorkerTask::simple(
            inventory::START_PURCHASE,
            StartPurchase::new(items),
            continuations,
        ))
    }

    // Cloud storage

    /// Write text to a cloud file.
    ///
    /// # Errors
    ///
    /// Synchronous refusal by the scheduler.
    pub fn save_text_to_file(
        &self,
        name: impl Into<String>,
        content: impl Into<String>,
        continuations: Continuations<()>,
    ) -> Result<TaskId, BridgeError> {
        self.submit(WorkerTask::simple(
            cloud::SAVE_TEXT_TO_FILE,
            SaveTextToFile::new(name, content),
            continuations,
        ))
    }

    /// Upload local files, each under its file name.
    ///
    /// # Errors
    ///
    /// Synchronous refusal by the scheduler.
    pub fn save_files_to_cloud(
        &self,
        paths: Vec<PathBuf>,
        continuations: Continuations<()>,
    ) -> Result<TaskId, BridgeError> {
        self.submit(WorkerTask::simple(
            cloud::SAVE_FILES_TO_CLOUD,
            SaveFilesToCloud::new(paths, Arc::clone(&self.file_store)),
            continuations,
        ))
    }

    /// Read a cloud file as text.
    ///
    /// # Errors
    ///
    /// Synchronous refusal by the scheduler.
    pub fn read_text_from_file(
        &self,
        name: impl Into<String>,
        continuations: Continuations<String>,
    ) -> Result<TaskId, BridgeError> {
        self.submit(WorkerTask::simple(
            cloud::READ_TEXT_FROM_FILE,
            ReadTextFromFile::new(name),
            continuations,
        ))
    }

    /// Delete a cloud file.
    ///
    /// # Errors
    ///
    /// Synchronous refusal by the scheduler.
    pub fn delete_file(&self, name: impl Into<String>, continuations: Continuations<()>) -> Result<TaskId, BridgeError> {
        self.submit(WorkerTask::simple(cloud::DELETE_FILE, DeleteFile::new(name), continuations))
    }

    /// Query the cloud quota.
    ///
    /// # Errors
    ///
    /// Synchronous refusal by the scheduler.
    pub fn get_cloud_quota(&self, continuations: Continuations<CloudQuota>) -> Result<TaskId, BridgeError> {
        self.submit(WorkerTask::simple(cloud::GET_CLOUD_QUOTA, GetCloudQuota, continuations))
    }

    // Achievements

    /// Unlock an achievement and upload stats.
    ///
    /// # Errors
    ///
    /// Synchronous refusal by the scheduler.
    pub fn activate_achievement(
        &self,
        name: impl Into<String>,
        continuations: Continuations<()>,
    ) -> Result<TaskId, BridgeError> {
        self.submit(WorkerTask::simple(
            stats::ACTIVATE_ACHIEVEMENT,
            ActivateAchievement::new(name),
            continuations,
        ))
    }

    /// Whether an achievement is unlocked.
    ///
    /// # Errors
    ///
    /// Synchronous refusal by the scheduler.
    pub fn get_achievement(&self, name: impl Into<String>, continuations: Continuations<bool>) -> Result<TaskId, BridgeError> {
        self.submit(WorkerTask::simple(
            stats::GET_ACHIEVEMENT,
            GetAchievement::new(name),
            continuations,
        ))
    }

    /// Re-lock an achievement and upload stats.
    ///
    /// # Errors
    ///
    /// Synchronous refusal by the scheduler.
    pub fn clear_achievement(&self, name: impl Into<String>, continuations: Continuations<()>) -> Result<TaskId, BridgeError> {
        self.submit(WorkerTask::simple(
            stats::CLEAR_ACHIEVEMENT,
            ClearAchievement::new(name),
            continuations,
        ))
    }

    // Session

    /// Current number of players.
    ///
    /// # Errors
    ///
    /// Synchronous refusal by the scheduler.
    pub fn get_number_of_players(&self, continuations: Continuations<i32>) -> Result<TaskId, BridgeError> {
        self.submit(WorkerTask::awaited(
            session::GET_NUMBER_OF_PLAYERS,
            PlayerCount,
            continuations,
        ))
    }

    /// Auth session ticket, once the backend has validated it.
    ///
    /// # Errors
    ///
    /// Synchronous refusal by the scheduler.
    pub fn get_auth_session_ticket(&self, continuations: Continuations<AuthTicket>) -> Result<TaskId, BridgeError> {
        self.submit(WorkerTask::awaited(
            session::GET_AUTH_SESSION_TICKET,
            AuthSessionTicket::default(),
            continuations,
        ))
    }

    /// Encrypted app ticket embedding `user_data`.
    ///
    /// # Errors
    ///
    /// Synchronous refusal by the scheduler.
    pub fn get_encrypted_app_ticket(
        &self,
        user_data: impl Into<Vec<u8>>,
        continuations: Continuations<Vec<u8>>,
    ) -> Result<TaskId, BridgeError> {
        self.submit(WorkerTask::awaited(
            session::GET_ENCRYPTED_APP_TICKET,
            EncryptedAppTicket::new(user_data),
            continuations,
        ))
    }

    // Archives

    /// Compress `source_dir` into `zip_path`. An empty `password` means none.
    ///
    /// # Errors
    ///
    /// Synchronous refusal by the scheduler.
    pub fn create_archive(
        &self,
        zip_path: impl Into<PathBuf>,
        source_dir: impl Into<PathBuf>,
        password: impl Into<String>,
        level: i32,
        continuations: Continuations<()>,
    ) -> Result<TaskId, BridgeError> {
        self.submit(WorkerTask::simple(
            archive::CREATE_ARCHIVE,
            CreateArchive::new(zip_path, source_dir, password, level, self.archive_tool.clone()),
            continuations,
        ))
    }

    /// Extract `zip_path` into `destination`. An empty `password` means none.
    ///
    /// # Errors
    ///
    /// Synchronous refusal by the scheduler.
    pub fn extract_archive(
        &self,
        zip_path: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        password: impl Into<String>,
        continuations: Continuations<()>,
    ) -> Result<TaskId, BridgeError> {
        self.submit(WorkerTask::simple(
            archive::EXTRACT_ARCHIVE,
            ExtractArchive::new(zip_path, destination, password, self.archive_tool.clone()),
            continuations,
        ))
    }

    // Host loop

    /// Run the platform callback pump, then every resolved continuation.
    pub fn pump(&self) -> usize {
        self.scheduler.pump()
    }

    /// Run resolved continuations without pumping the platform.
    pub fn drain_completions(&self) -> usize {
        self.scheduler.drain_completions()
    }

    /// Pump until idle or until `timeout` elapses. Returns `true` if idle.
    pub fn run_until_idle(&self, timeout: Duration) -> bool {
        self.scheduler.run_until_idle(timeout)
    }

    /// Scheduler statistics.
    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }

    /// The correlation registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<CorrelationRegistry> {
        self.scheduler.registry()
    }

    /// The underlying scheduler.
    #[must_use]
    pub const fn scheduler(&self) -> &TaskScheduler {
        &self.scheduler
    }

    /// Refuse new work.
    pub fn shutdown(&self) {
        self.scheduler.shutdown();
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("scheduler", &self.scheduler)
            .field("archive_enabled", &self.archive_tool.is_some())
            .finish_non_exhaustive()
    }
}
