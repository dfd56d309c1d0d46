//! Local file access used by cloud uploads.

use std::fs;
use std::io;
use std::path::Path;

/// Whole-file reads and writes on the local machine.
pub trait FileStore: Send + Sync {
    /// Read an entire file.
    ///
    /// # Errors
    ///
    /// Any i/o error from the underlying storage.
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Create or replace a file with `content`.
    ///
    /// # Errors
    ///
    /// Any i/o error from the underlying storage.
    fn write_file(&self, path: &Path, content: &[u8]) -> io::Result<()>;
}

/// [`FileStore`] backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileStore;

impl LocalFileStore {
    /// Create a new local store.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl FileStore for LocalFileStore {
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn write_file(&self, path: &Path, content: &[u8]) -> io::Result<()> {
        fs::write(path, content)
    }
}
