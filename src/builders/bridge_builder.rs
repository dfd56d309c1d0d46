//! Builder that wires a [`Bridge`] from configuration and collaborators.

use std::sync::Arc;

use tracing::info;

use crate::config::BridgeConfig;
use crate::core::error::BridgeError;
use crate::core::scheduler::TaskScheduler;
use crate::infra::archive::ArchiveTool;
use crate::infra::files::{FileStore, LocalFileStore};
use crate::platform::Platform;
use crate::runtime::Bridge;

/// Assembles a [`Bridge`]. Must be built on the host thread.
pub struct BridgeBuilder {
    platform: Arc<dyn Platform>,
    config: BridgeConfig,
    file_store: Option<Arc<dyn FileStore>>,
    archive_tool: Option<Arc<dyn ArchiveTool>>,
}

impl BridgeBuilder {
    /// Start from default configuration.
    pub fn new(platform: Arc<dyn Platform>) -> Self {
        Self {
            platform,
            config: BridgeConfig::default(),
            file_store: None,
            archive_tool: None,
        }
    }

    /// Use `config` instead of the defaults.
    #[must_use]
    pub fn with_config(mut self, config: BridgeConfig) -> Self {
        self.config = config;
        self
    }

    /// Read local files through `store`. Defaults to [`LocalFileStore`].
    #[must_use]
    pub fn with_file_store(mut self, store: Arc<dyn FileStore>) -> Self {
        self.file_store = Some(store);
        self
    }

    /// Enable the archive operations.
    #[must_use]
    pub fn with_archive_tool(mut self, tool: Arc<dyn ArchiveTool>) -> Self {
        self.archive_tool = Some(tool);
        self
    }

    /// Validate the configuration and start the scheduler. The calling thread
    /// becomes the host thread.
    ///
    /// # Errors
    ///
    /// [`BridgeError::InvalidConfig`] if validation fails.
    pub fn build(self) -> Result<Bridge, BridgeError> {
        let archive_enabled = self.archive_tool.is_some();
        let scheduler = TaskScheduler::new(self.config, self.platform)?;
        let file_store = self
            .file_store
            .unwrap_or_else(|| Arc::new(LocalFileStore::new()) as Arc<dyn FileStore>);

        info!(archive_enabled, "bridge ready");
        Ok(Bridge::from_parts(scheduler, file_store, self.archive_tool))
    }
}
