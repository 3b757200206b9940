//! In-memory storage for tests and dry runs.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::Storage;

#[derive(Debug, Clone)]
enum Entry {
    File(Vec<u8>),
    Dir,
}

#[derive(Debug, Default)]
struct State {
    entries: BTreeMap<PathBuf, Entry>,
    create_dir_calls: usize,
}

/// Storage that keeps directories and files in a map.
///
/// Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    state: Arc<Mutex<State>>,
}

impl MemoryStorage {
    /// Creates an empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `create_dir` calls seen so far.
    #[must_use]
    pub fn create_dir_calls(&self) -> usize {
        self.state.lock().create_dir_calls
    }

    /// Returns true if `path` is a directory.
    #[must_use]
    pub fn is_dir(&self, path: &Path) -> bool {
        matches!(self.state.lock().entries.get(path), Some(Entry::Dir))
    }

    /// Returns true if `path` is a file.
    #[must_use]
    pub fn is_file(&self, path: &Path) -> bool {
        matches!(self.state.lock().entries.get(path), Some(Entry::File(_)))
    }

    /// All directories, sorted.
    #[must_use]
    pub fn dirs(&self) -> Vec<PathBuf> {
        self.state
            .lock()
            .entries
            .iter()
            .filter(|(_, e)| matches!(e, Entry::Dir))
            .map(|(p, _)| p.clone())
            .collect()
    }

    /// All files, sorted.
    #[must_use]
    pub fn files(&self) -> Vec<PathBuf> {
        self.state
            .lock()
            .entries
            .iter()
            .filter(|(_, e)| matches!(e, Entry::File(_)))
            .map(|(p, _)| p.clone())
            .collect()
    }

    fn ensure_dirs(entries: &mut BTreeMap<PathBuf, Entry>, path: &Path) -> io::Result<()> {
        for dir in path.ancestors().filter(|p| !p.as_os_str().is_empty()) {
            match entries.get(dir) {
                Some(Entry::Dir) => break,
                Some(Entry::File(_)) => {
                    return Err(io::Error::new(
                        io::ErrorKind::AlreadyExists,
                        format!("{} is a file", dir.display()),
                    ))
                }
                None => {
                    entries.insert(dir.to_path_buf(), Entry::Dir);
                }
            }
        }
        Ok(())
    }
}

impl Storage for MemoryStorage {
    fn exists(&self, path: &Path) -> bool {
        self.state.lock().entries.contains_key(path)
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        let mut state = self.state.lock();
        state.create_dir_calls += 1;
        Self::ensure_dirs(&mut state.entries, path)
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        match self.state.lock().entries.get(path) {
            Some(Entry::File(bytes)) => String::from_utf8(bytes.clone())
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e)),
            Some(Entry::Dir) => Err(io::Error::new(
                io::ErrorKind::Other,
                format!("{} is a directory", path.display()),
            )),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            )),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let mut state = self.state.lock();
        if let Some(parent) = path.parent() {
            Self::ensure_dirs(&mut state.entries, parent)?;
        }
        if matches!(state.entries.get(path), Some(Entry::Dir)) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} is a directory", path.display()),
            ));
        }
        state
            .entries
            .insert(path.to_path_buf(), Entry::File(contents.to_vec()));
        Ok(())
    }
}
