//! JSON-file-backed key-value storage.

use crate::{KeyValueStorage, StorageError, StorageResult};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

/// Key-value storage persisted as a single JSON object on disk.
///
/// A missing or corrupt file reads as empty; every write rewrites the whole
/// file. The cache behind the mutex keeps reads off the filesystem.
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileStorage {
    /// Open storage at `path`, loading existing entries when present.
    pub fn open(path: PathBuf) -> StorageResult<Self> {
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<HashMap<String, String>>(&raw) {
                Ok(map) => map,
                Err(err) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %err,
                        "Storage file is corrupt, starting empty"
                    );
                    HashMap::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(err) => return Err(err.into()),
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    fn persist(&self, entries: &HashMap<String, String>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(entries)
            .map_err(|e| StorageError::Encoding(e.to_string()))?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

impl KeyValueStorage for FileStorage {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let entries = self.entries.lock().unwrap();
        Ok(entries.get(key).cloned())
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        let mut entries = self.entries.lock().unwrap();
        if entries.remove(key).is_none() {
            return Ok(false);
        }
        self.persist(&entries)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn set_get_delete_round_trip() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::open(dir.path().join("store.json")).unwrap();

        storage.set("key", "value").unwrap();
        assert_eq!(storage.get("key").unwrap(), Some("value".to_string()));
        assert!(storage.has("key").unwrap());

        assert!(storage.delete("key").unwrap());
        assert!(!storage.delete("key").unwrap());
        assert_eq!(storage.get("key").unwrap(), None);
    }

    #[test]
    fn entries_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");

        {
            let storage = FileStorage::open(path.clone()).unwrap();
            storage.set("token", "abc").unwrap();
        }

        let reopened = FileStorage::open(path).unwrap();
        assert_eq!(reopened.get("token").unwrap(), Some("abc".to_string()));
    }

    #[test]
    fn corrupt_file_reads_as_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "{ truncated").unwrap();

        let storage = FileStorage::open(path).unwrap();
        assert_eq!(storage.get("anything").unwrap(), None);
    }

    #[test]
    fn open_creates_parent_dirs_on_first_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("deeply").join("nested").join("store.json");

        let storage = FileStorage::open(path.clone()).unwrap();
        storage.set("key", "value").unwrap();
        assert!(path.exists());
    }
}
