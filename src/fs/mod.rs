//! The `FileSystem` port: the abstraction boundary between the scanner's
//! concurrency core and the underlying storage.
//!
//! Directory reading is a swappable strategy behind this trait so the
//! scanner can be exercised against an in-memory double in tests
//! (`memory.rs`) without touching real disk, and so a platform-accelerated
//! reader could be substituted later without touching `crate::scan`.

mod memory;
mod real;

pub use memory::MemoryFileSystem;
pub use real::RealFileSystem;

use std::time::SystemTime;

/// Stat information for one filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatInfo {
    pub is_dir: bool,
    /// Apparent (logical) size in bytes.
    pub size: u64,
    /// On-disk allocation in bytes.
    pub disk_usage: u64,
    pub mtime: Option<SystemTime>,
}

/// One entry yielded by [`FileSystem::scandir`].
///
/// `stat` is `None` when per-entry stat failed; the caller (a scan worker)
/// counts that as an access error and otherwise skips the entry.
#[derive(Debug, Clone)]
pub struct Entry {
    pub path: String,
    pub name: String,
    pub stat: Option<StatInfo>,
}

/// Abstract directory iteration and stat, so the scanner is testable against
/// a memory filesystem and so platform-optimized directory readers can be
/// substituted without touching the concurrency core.
pub trait FileSystem: Send + Sync {
    /// Expand a leading `~` to the user's home directory.
    fn expanduser(&self, path: &str) -> String;

    fn exists(&self, path: &str) -> bool;

    /// Resolve `path` to an absolute, normalized form.
    fn absolute(&self, path: &str) -> String;

    /// # Errors
    /// Returns an I/O error if the path cannot be stat'd.
    fn stat(&self, path: &str) -> std::io::Result<StatInfo>;

    /// # Errors
    /// Returns an I/O error if the directory cannot be opened for reading.
    fn scandir(&self, path: &str) -> std::io::Result<Vec<Entry>>;

    /// # Errors
    /// Returns an I/O error if the file cannot be read or is not valid UTF-8.
    fn read_text(&self, path: &str) -> std::io::Result<String>;
}
