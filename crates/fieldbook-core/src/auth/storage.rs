//! String key/value storage backing the persisted session.
//!
//! Values are opaque strings; the session manager decides what goes in them.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use keyring::Entry;
use thiserror::Error;
use tracing::debug;

/// Keychain service name used by `KeyringStorage`.
const KEYRING_SERVICE: &str = "fieldbook";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O error for '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Keychain error for '{key}': {source}")]
    Keyring {
        key: String,
        #[source]
        source: keyring::Error,
    },

    #[error("Could not encode value for '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

pub trait Storage: Send + Sync {
    /// Read a value, `None` when the key was never set or has been removed.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove a value. Removing a missing key succeeds.
    fn remove(&self, key: &str) -> StorageResult<()>;
}

impl<S: Storage + ?Sized> Storage for Box<S> {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        (**self).remove(key)
    }
}

impl<S: Storage + ?Sized> Storage for Arc<S> {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        (**self).remove(key)
    }
}

/// One file per key inside a directory.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path(&self, key: &str) -> StorageResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(key))
    }

    fn io_error(key: &str, source: std::io::Error) -> StorageError {
        StorageError::Io {
            key: key.to_string(),
            source,
        }
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.path(key)?;
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::io_error(key, e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let path = self.path(key)?;
        std::fs::create_dir_all(&self.dir).map_err(|e| Self::io_error(key, e))?;
        std::fs::write(&path, value).map_err(|e| Self::io_error(key, e))?;
        debug!(key, "Stored value");
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let path = self.path(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::io_error(key, e)),
        }
    }
}

/// OS keychain, one credential entry per key.
///
/// On Linux this is the kernel session keyring, which is cleared on reboot.
pub struct KeyringStorage {
    service: String,
}

impl KeyringStorage {
    pub fn new() -> Self {
        Self {
            service: KEYRING_SERVICE.to_string(),
        }
    }

    fn entry(&self, key: &str) -> StorageResult<Entry> {
        Entry::new(&self.service, key).map_err(|source| StorageError::Keyring {
            key: key.to_string(),
            source,
        })
    }
}

impl Default for KeyringStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage for KeyringStorage {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(source) => Err(StorageError::Keyring {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.entry(key)?
            .set_password(value)
            .map_err(|source| StorageError::Keyring {
                key: key.to_string(),
                source,
            })
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(source) => Err(StorageError::Keyring {
                key: key.to_string(),
                source,
            }),
        }
    }
}

/// In-process storage; contents are lost when the process exits.
#[derive(Default, Clone)]
pub struct MemoryStorage {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_storage_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("nested"));

        assert_eq!(storage.get("authToken").unwrap(), None);
        storage.set("authToken", "tok1").unwrap();
        assert_eq!(storage.get("authToken").unwrap().as_deref(), Some("tok1"));

        storage.remove("authToken").unwrap();
        assert_eq!(storage.get("authToken").unwrap(), None);
        // Removing twice is fine
        storage.remove("authToken").unwrap();
    }

    #[test]
    fn test_file_storage_rejects_path_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf());
        assert!(matches!(
            storage.set("../escape", "x"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(storage.get("").is_err());
    }

    #[test]
    fn test_memory_storage_len_survives_poisoned_lock() {
        let storage = MemoryStorage::new();
        storage.set("authToken", "tok1").unwrap();

        let values = storage.values.clone();
        let _ = std::thread::spawn(move || {
            let _guard = values.lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        assert!(storage.values.is_poisoned());
        assert_eq!(storage.len(), 1);
        assert!(!storage.is_empty());
        assert_eq!(storage.get("authToken").unwrap().as_deref(), Some("tok1"));
    }

    // Needs a platform keychain (macOS Keychain, Windows Credential Manager
    // or the Linux kernel keyring); run with `cargo test -- --ignored`.
    #[test]
    #[ignore]
    fn test_keyring_value_visible_to_new_instance() {
        let key = format!("fieldbookTest{}", std::process::id());
        KeyringStorage::new().set(&key, "tok1").unwrap();

        let reader = KeyringStorage::new();
        assert_eq!(reader.get(&key).unwrap().as_deref(), Some("tok1"));

        reader.remove(&key).unwrap();
        assert_eq!(KeyringStorage::new().get(&key).unwrap(), None);
    }

    #[test]
    fn test_encode_error_names_key() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = StorageError::Encode {
            key: "userData".into(),
            source,
        };
        assert!(err.to_string().starts_with("Could not encode value for 'userData'"));
    }

    #[test]
    fn test_memory_storage_clones_share_state() {
        let a = MemoryStorage::new();
        let b = a.clone();
        a.set("userData", "{}").unwrap();
        assert_eq!(b.get("userData").unwrap().as_deref(), Some("{}"));
        b.remove("userData").unwrap();
        assert!(a.is_empty());
    }
}
