//! Archive operations, delegated to a host-supplied [`ArchiveTool`].

use std::path::PathBuf;
use std::sync::Arc;

use crate::core::error::BridgeError;
use crate::core::task::{BlockingStep, TaskContext};
use crate::infra::archive::ArchiveTool;

/// Operation name of [`CreateArchive`].
pub const CREATE_ARCHIVE: &str = "create_archive";
/// Operation name of [`ExtractArchive`].
pub const EXTRACT_ARCHIVE: &str = "extract_archive";

const NO_TOOL: &str = "no archive tool configured";

fn password(raw: &str) -> Option<&str> {
    (!raw.is_empty()).then_some(raw)
}

/// Compress a directory into a zip file.
pub struct CreateArchive {
    zip_path: PathBuf,
    source_dir: PathBuf,
    password: String,
    level: i32,
    tool: Option<Arc<dyn ArchiveTool>>,
}

impl CreateArchive {
    /// Compress `source_dir` into `zip_path`. An empty `password` means none.
    pub fn new(
        zip_path: impl Into<PathBuf>,
        source_dir: impl Into<PathBuf>,
        password: impl Into<String>,
        level: i32,
        tool: Option<Arc<dyn ArchiveTool>>,
    ) -> Self {
        Self {
            zip_path: zip_path.into(),
            source_dir: source_dir.into(),
            password: password.into(),
            level,
            tool,
        }
    }
}

impl BlockingStep for CreateArchive {
    type Output = ();

    fn execute(self: Box<Self>, _ctx: &TaskContext) -> Result<(), BridgeError> {
        let tool = self.tool.as_ref().ok_or_else(|| BridgeError::io(CREATE_ARCHIVE, NO_TOOL))?;
        tool.compress(&self.zip_path, &self.source_dir, self.level, password(&self.password))
            .map_err(|e| BridgeError::io(CREATE_ARCHIVE, format!("error on creating zip file: {e}")))
    }
}

/// Extract a zip file into a directory.
pub struct ExtractArchive {
    zip_path: PathBuf,
    destination: PathBuf,
    password: String,
    tool: Option<Arc<dyn ArchiveTool>>,
}

impl ExtractArchive {
    /// Extract `zip_path` into `destination`. An empty `password` means none.
    pub fn new(
        zip_path: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        password: impl Into<String>,
        tool: Option<Arc<dyn ArchiveTool>>,
    ) -> Self {
        Self {
            zip_path: zip_path.into(),
            destination: destination.into(),
            password: password.into(),
            tool,
        }
    }
}

impl BlockingStep for ExtractArchive {
    type Output = ();

    fn execute(self: Box<Self>, _ctx: &TaskContext) -> Result<(), BridgeError> {
        let tool = self.tool.as_ref().ok_or_else(|| BridgeError::io(EXTRACT_ARCHIVE, NO_TOOL))?;
        tool.decompress(&self.zip_path, &self.destination, password(&self.password))
            .map_err(|e| BridgeError::io(EXTRACT_ARCHIVE, format!("error on extracting zip file: {e}")))
    }
}
