//! Storage backed by the local filesystem.

use std::fs;
use std::io;
use std::path::Path;

use super::Storage;

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStorage;

impl LocalStorage {
    /// Creates a local storage backend.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Storage for LocalStorage {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_dir_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("a").join("b");
        let storage = LocalStorage::new();

        storage.create_dir(&dir).unwrap();
        storage.create_dir(&dir).unwrap();
        assert!(storage.exists(&dir));
    }

    #[test]
    fn test_write_creates_parents() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("run").join("index.json");
        let storage = LocalStorage::new();

        storage.write(&file, b"{}").unwrap();
        assert_eq!(storage.read_to_string(&file).unwrap(), "{}");
    }

    #[test]
    fn test_read_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let err = LocalStorage::new()
            .read_to_string(&tmp.path().join("nope"))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
