//! Infrastructure adapters: local files, archives and an in-process platform.

pub mod archive;
pub mod files;
pub mod platform;

pub use archive::ArchiveTool;
pub use files::{FileStore, LocalFileStore};
pub use platform::InMemoryPlatform;
