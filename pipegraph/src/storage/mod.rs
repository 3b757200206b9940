//! Storage backends for staging directories and config files.
//!
//! The pipeline never touches the filesystem directly; every directory and
//! file it creates goes through a [`Storage`] implementation.

mod local;
mod memory;

pub use local::LocalStorage;
pub use memory::MemoryStorage;

use std::fmt::Debug;
use std::io;
use std::path::Path;

/// Abstract filesystem interface used for staging.
#[cfg_attr(test, mockall::automock)]
pub trait Storage: Send + Sync + Debug {
    /// Returns true if something exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Creates a directory and any missing parents. Succeeds if it already exists.
    fn create_dir(&self, path: &Path) -> io::Result<()>;

    /// Reads a whole file as UTF-8.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Writes a file, creating parent directories as needed.
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;
}
