use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use crate::error::{AnalyticsError, Result};

/// Durable string key/value storage, the equivalent of a browser's local storage.
pub trait Storage: Send + Sync + 'static {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Writes several keys together. Backends that persist on every write
    /// override this to persist once.
    fn set_many(&self, pairs: &[(&str, &str)]) -> Result<()> {
        for (key, value) in pairs {
            self.set(key, value)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Storage persisted as a single JSON object on disk. The whole file is
/// rewritten, synchronously, on every `set`/`set_many`; callers on an async
/// runtime block their worker for that write.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Opens (or lazily creates) the store at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(AnalyticsError::StorageFile { path, source }),
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// `<data dir>/glint/storage.json`, or `/tmp/glint/storage.json` when the
    /// platform has no data directory.
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join("glint")
            .join("storage.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let to_file_err = |source| AnalyticsError::StorageFile {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(to_file_err)?;
        }
        let json = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, json).map_err(to_file_err)
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.set_many(&[(key, value)])
    }

    fn set_many(&self, pairs: &[(&str, &str)]) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        let previous: Vec<_> = pairs
            .iter()
            .map(|(key, value)| (*key, entries.insert(key.to_string(), value.to_string())))
            .collect();

        if let Err(e) = self.persist(&entries) {
            // Keep memory and disk in agreement when the write fails.
            for (key, prev) in previous.into_iter().rev() {
                match prev {
                    Some(prev) => entries.insert(key.to_string(), prev),
                    None => entries.remove(key),
                };
            }
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");

        let store = FileStorage::open(&path).unwrap();
        assert_eq!(store.get("glint.session_id").unwrap(), None);
        store.set("glint.session_id", "abc").unwrap();

        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(
            reopened.get("glint.session_id").unwrap().as_deref(),
            Some("abc")
        );
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(
            FileStorage::open(&path),
            Err(AnalyticsError::Encode(_))
        ));
    }

    #[test]
    fn set_many_persists_together() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");

        let store = FileStorage::open(&path).unwrap();
        store
            .set_many(&[("glint.session_id", "abc"), ("glint.session_last_seen", "42")])
            .unwrap();

        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(reopened.get("glint.session_id").unwrap().as_deref(), Some("abc"));
        assert_eq!(
            reopened.get("glint.session_last_seen").unwrap().as_deref(),
            Some("42")
        );
    }

    #[test]
    fn failed_set_many_rolls_back_every_key() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be makes every write fail.
        let path = dir.path().join("storage.json");
        std::fs::create_dir(&path).unwrap();
        let store = FileStorage {
            path,
            entries: Mutex::new(BTreeMap::from([("a".to_string(), "1".to_string())])),
        };

        assert!(store.set_many(&[("a", "2"), ("b", "3")]).is_err());
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
        assert_eq!(store.get("b").unwrap(), None);
    }

    #[test]
    fn memory_storage_overwrites() {
        let store = MemoryStorage::new();
        store.set("k", "1").unwrap();
        store.set("k", "2").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("2"));
    }
}
