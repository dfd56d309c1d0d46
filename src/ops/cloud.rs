//! Cloud storage operations. All run to completion on their own thread.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::core::error::BridgeError;
use crate::core::task::{BlockingStep, TaskContext};
use crate::infra::files::FileStore;
use crate::platform::CloudQuota;

/// Operation name of [`SaveTextToFile`].
pub const SAVE_TEXT_TO_FILE: &str = "save_text_to_file";
/// Operation name of [`SaveFilesToCloud`].
pub const SAVE_FILES_TO_CLOUD: &str = "save_files_to_cloud";
/// Operation name of [`ReadTextFromFile`].
pub const READ_TEXT_FROM_FILE: &str = "read_text_from_file";
/// Operation name of [`DeleteFile`].
pub const DELETE_FILE: &str = "delete_file";
/// Operation name of [`GetCloudQuota`].
pub const GET_CLOUD_QUOTA: &str = "get_cloud_quota";

const MISSING_FILE: &str = "file doesn't exist";

/// Write `content` to the cloud file `name`.
#[derive(Debug, Clone)]
pub struct SaveTextToFile {
    name: String,
    content: String,
}

impl SaveTextToFile {
    /// Save `content` under `name`.
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

impl BlockingStep for SaveTextToFile {
    type Output = ();

    fn execute(self: Box<Self>, ctx: &TaskContext) -> Result<(), BridgeError> {
        if ctx.platform.file_write(&self.name, self.content.as_bytes()) {
            Ok(())
        } else {
            Err(BridgeError::rejected(SAVE_TEXT_TO_FILE, "error on writing to file"))
        }
    }
}

/// Upload local files, each under its own file name.
///
/// Every file is read before anything is written, so a local read failure
/// uploads nothing.
pub struct SaveFilesToCloud {
    paths: Vec<PathBuf>,
    store: Arc<dyn FileStore>,
}

impl SaveFilesToCloud {
    /// Upload `paths` read through `store`.
    pub fn new(paths: Vec<PathBuf>, store: Arc<dyn FileStore>) -> Self {
        Self { paths, store }
    }
}

impl BlockingStep for SaveFilesToCloud {
    type Output = ();

    fn execute(self: Box<Self>, ctx: &TaskContext) -> Result<(), BridgeError> {
        let mut staged = Vec::with_capacity(self.paths.len());
        for path in &self.paths {
            let name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    BridgeError::io(SAVE_FILES_TO_CLOUD, format!("{} has no file name", path.display()))
                })?;
            let content = self.store.read_file(path).map_err(|e| {
                BridgeError::io(
                    SAVE_FILES_TO_CLOUD,
                    format!("error on reading {}: {e}", path.display()),
                )
            })?;
            staged.push((name, content));
        }

        for (name, content) in &staged {
            if !ctx.platform.file_write(name, content) {
                return Err(BridgeError::rejected(
                    SAVE_FILES_TO_CLOUD,
                    format!("error on writing {name} to cloud storage"),
                ));
            }
            debug!(file = %name, bytes = content.len(), "uploaded");
        }
        Ok(())
    }
}

/// Read the cloud file `name` as text.
#[derive(Debug, Clone)]
pub struct ReadTextFromFile {
    name: String,
}

impl ReadTextFromFile {
    /// Read `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl BlockingStep for ReadTextFromFile {
    type Output = String;

    fn execute(self: Box<Self>, ctx: &TaskContext) -> Result<String, BridgeError> {
        let platform = &ctx.platform;
        if !platform.file_exists(&self.name) {
            return Err(BridgeError::rejected(READ_TEXT_FROM_FILE, MISSING_FILE));
        }
        let size = platform.file_size(&self.name);
        let mut content = vec![0u8; size];
        let read = platform.file_read(&self.name, &mut content);
        if read == 0 && size > 0 {
            return Err(BridgeError::rejected(READ_TEXT_FROM_FILE, "error on reading file"));
        }
        content.truncate(read);
        Ok(String::from_utf8_lossy(&content).into_owned())
    }
}

/// Delete the cloud file `name`.
#[derive(Debug, Clone)]
pub struct DeleteFile {
    name: String,
}

impl DeleteFile {
    /// Delete `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl BlockingStep for DeleteFile {
    type Output = ();

    fn execute(self: Box<Self>, ctx: &TaskContext) -> Result<(), BridgeError> {
        if !ctx.platform.file_exists(&self.name) {
            return Err(BridgeError::rejected(DELETE_FILE, MISSING_FILE));
        }
        if ctx.platform.file_delete(&self.name) {
            Ok(())
        } else {
            Err(BridgeError::rejected(DELETE_FILE, "error on deleting file"))
        }
    }
}

/// Query the user's cloud quota.
#[derive(Debug, Clone, Copy, Default)]
pub struct GetCloudQuota;

impl BlockingStep for GetCloudQuota {
    type Output = CloudQuota;

    fn execute(self: Box<Self>, ctx: &TaskContext) -> Result<CloudQuota, BridgeError> {
        ctx.platform
            .quota()
            .ok_or_else(|| BridgeError::rejected(GET_CLOUD_QUOTA, "error on getting cloud quota"))
    }
}
