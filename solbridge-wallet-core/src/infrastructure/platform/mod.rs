//! Platform storage implementations
//!
//! The privileged process persists the wallet record through a narrow
//! storage trait. Secret material is sealed by the vault before it ever
//! reaches this layer, so the storage itself only sees opaque records.

use crate::shared::constants::STORAGE_DIR_NAME;
use crate::shared::error::WalletError;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::Mutex;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Platform-specific storage implementation
pub trait PlatformStorage: Send + Sync {
    /// Store data under a key
    fn store(&self, key: &str, data: &[u8]) -> Result<(), WalletError>;

    /// Retrieve data by key
    fn retrieve(&self, key: &str) -> Result<Vec<u8>, WalletError>;

    /// Delete data by key
    fn delete(&self, key: &str) -> Result<(), WalletError>;

    /// Check if data exists
    fn exists(&self, key: &str) -> Result<bool, WalletError>;
}

/// File-backed storage under the OS data directory
pub struct FileStorage {
    base_dir: PathBuf,
}

impl FileStorage {
    pub fn new() -> Result<Self, WalletError> {
        let base_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("./storage"))
            .join(STORAGE_DIR_NAME);
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    /// Storage rooted at an explicit directory (used by tests)
    pub fn with_base_dir(base_dir: PathBuf) -> Result<Self, WalletError> {
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    fn file_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{}.dat", key))
    }
}

impl PlatformStorage for FileStorage {
    fn store(&self, key: &str, data: &[u8]) -> Result<(), WalletError> {
        let mut file = File::create(self.file_path(key))?;
        #[cfg(unix)]
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
        file.write_all(data)?;
        Ok(())
    }

    fn retrieve(&self, key: &str) -> Result<Vec<u8>, WalletError> {
        let path = self.file_path(key);
        if !path.exists() {
            return Err(WalletError::storage(format!("Key not found: {}", key)));
        }
        let mut data = vec![];
        File::open(path)?.read_to_end(&mut data)?;
        Ok(data)
    }

    fn delete(&self, key: &str) -> Result<(), WalletError> {
        let _ = fs::remove_file(self.file_path(key));
        Ok(())
    }

    fn exists(&self, key: &str) -> Result<bool, WalletError> {
        Ok(self.file_path(key).exists())
    }
}

/// In-memory storage used by tests and ephemeral sessions
pub struct MemoryStorage {
    data: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            data: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformStorage for MemoryStorage {
    fn store(&self, key: &str, data: &[u8]) -> Result<(), WalletError> {
        let mut storage = self
            .data
            .lock()
            .map_err(|_| WalletError::internal("Storage lock poisoned"))?;
        storage.insert(key.to_string(), data.to_vec());
        Ok(())
    }

    fn retrieve(&self, key: &str) -> Result<Vec<u8>, WalletError> {
        let storage = self
            .data
            .lock()
            .map_err(|_| WalletError::internal("Storage lock poisoned"))?;
        storage
            .get(key)
            .cloned()
            .ok_or_else(|| WalletError::storage(format!("Key not found: {}", key)))
    }

    fn delete(&self, key: &str) -> Result<(), WalletError> {
        let mut storage = self
            .data
            .lock()
            .map_err(|_| WalletError::internal("Storage lock poisoned"))?;
        storage.remove(key);
        Ok(())
    }

    fn exists(&self, key: &str) -> Result<bool, WalletError> {
        let storage = self
            .data
            .lock()
            .map_err(|_| WalletError::internal("Storage lock poisoned"))?;
        Ok(storage.contains_key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage_round_trip() {
        let storage = MemoryStorage::new();
        storage.store("key", b"value").unwrap();
        assert!(storage.exists("key").unwrap());
        assert_eq!(storage.retrieve("key").unwrap(), b"value");

        storage.delete("key").unwrap();
        assert!(!storage.exists("key").unwrap());
        assert!(storage.retrieve("key").is_err());
    }

    #[test]
    fn test_file_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::with_base_dir(dir.path().to_path_buf()).unwrap();

        storage.store("record", b"payload").unwrap();
        assert!(storage.exists("record").unwrap());
        assert_eq!(storage.retrieve("record").unwrap(), b"payload");

        storage.delete("record").unwrap();
        assert!(!storage.exists("record").unwrap());
    }

    #[test]
    fn test_file_storage_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::with_base_dir(dir.path().to_path_buf()).unwrap();
        assert!(storage.retrieve("absent").is_err());
    }
}
