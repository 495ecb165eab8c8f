//! Persistent key/value storage for client state.
//!
//! The session record lives under a single well-known key. [`FileStorage`]
//! keeps one JSON file per key in a directory; [`MemoryStorage`] backs tests
//! and ephemeral runs.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use super::SessionError;

/// Key/value storage the session store persists into.
pub trait SessionStorage: Send + Sync {
    /// Read the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, SessionError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), SessionError>;

    /// Remove the value stored under `key`. Removing a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn remove(&self, key: &str) -> Result<(), SessionError>;
}

// =============================================================================
// FileStorage
// =============================================================================

/// Directory-backed storage: `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Create storage rooted at `dir`. The directory is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the stored files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SessionError::Storage(e.to_string())),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| SessionError::Storage(e.to_string()))?;

        // Write a sibling file, then rename over the record.
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        write_private(&tmp, value).map_err(|e| SessionError::Storage(e.to_string()))?;
        std::fs::rename(&tmp, &path).map_err(|e| SessionError::Storage(e.to_string()))
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SessionError::Storage(e.to_string())),
        }
    }
}

// =============================================================================
// MemoryStorage
// =============================================================================

/// In-memory storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create storage pre-populated with one entry.
    #[must_use]
    pub fn with_entry(key: &str, value: &str) -> Self {
        let storage = Self::default();
        storage
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        storage
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

/// Write `value` to `path`, readable by the owner only on unix. The record
/// holds a bearer token.
fn write_private(path: &Path, value: &str) -> std::io::Result<()> {
    use std::io::Write;

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
        options.mode(0o600);
        // `mode` only applies on creation; a leftover temp file keeps its own.
        if path.exists() {
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }
    }

    let mut file = options.open(path)?;
    file.write_all(value.as_bytes())?;
    file.sync_all()
}

impl<S: SessionStorage + ?Sized> SessionStorage for std::sync::Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        (**self).remove(key)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage_roundtrip() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get("k").unwrap(), None);
        storage.set("k", "v").unwrap();
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("v"));
        storage.remove("k").unwrap();
        storage.remove("k").unwrap();
        assert_eq!(storage.get("k").unwrap(), None);
    }

    #[test]
    fn test_file_storage_roundtrip() {
        let dir = std::env::temp_dir().join(format!("gbg-storage-{}", uuid::Uuid::new_v4()));
        let storage = FileStorage::new(&dir);

        assert_eq!(storage.get("gbg_session").unwrap(), None);
        storage.set("gbg_session", "{\"a\":1}").unwrap();
        assert!(dir.join("gbg_session.json").exists());
        assert_eq!(
            storage.get("gbg_session").unwrap().as_deref(),
            Some("{\"a\":1}")
        );

        storage.remove("gbg_session").unwrap();
        assert!(!dir.join("gbg_session.json").exists());
        storage.remove("gbg_session").unwrap();

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_file_storage_record_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = std::env::temp_dir().join(format!("gbg-storage-{}", uuid::Uuid::new_v4()));
        let storage = FileStorage::new(&dir);
        storage.set("gbg_session", "{\"token\":\"t\"}").unwrap();
        storage.set("gbg_session", "{\"token\":\"u\"}").unwrap();

        let mode = std::fs::metadata(dir.join("gbg_session.json"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
