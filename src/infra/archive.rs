//! Archive collaborator. The bridge only schedules archive work; the actual
//! compression library is supplied by the host.

use std::path::Path;

/// Zip-style compression and extraction.
pub trait ArchiveTool: Send + Sync {
    /// Compress `source_dir` into `zip_path`. `level` is the compression level
    /// and `password` is `None` for an unencrypted archive.
    ///
    /// # Errors
    ///
    /// A description of the failure.
    fn compress(
        &self,
        zip_path: &Path,
        source_dir: &Path,
        level: i32,
        password: Option<&str>,
    ) -> Result<(), String>;

    /// Extract `zip_path` into `destination`.
    ///
    /// # Errors
    ///
    /// A description of the failure.
    fn decompress(&self, zip_path: &Path, destination: &Path, password: Option<&str>) -> Result<(), String>;
}
