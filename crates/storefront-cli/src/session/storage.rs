//! File-backed token storage.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use storefront_client::Storage;
use tracing::{debug, warn};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Get the default token file path.
pub fn default_token_path() -> Result<PathBuf> {
    let dirs =
        ProjectDirs::from("", "", "storefront").context("Could not determine data directory")?;

    Ok(dirs.data_dir().join("tokens.json"))
}

/// Key-value storage kept in a JSON object on disk.
///
/// The whole map is rewritten on every change. Write failures are logged and
/// the in-memory value still changes, so the current process keeps working.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open the storage file, starting empty if it does not exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let values = if path.exists() {
            let json = fs::read_to_string(&path).context("Failed to read token file")?;
            serde_json::from_str(&json).context("Invalid token file")?
        } else {
            BTreeMap::new()
        };

        debug!(path = %path.display(), "Opened token file");
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    fn save(&self, values: &BTreeMap<String, String>) {
        if let Err(e) = self.write(values) {
            warn!(error = %e, path = %self.path.display(), "Failed to save token file");
        }
    }

    fn write(&self, values: &BTreeMap<String, String>) -> Result<()> {
        if values.is_empty() {
            if self.path.exists() {
                fs::remove_file(&self.path).context("Failed to remove token file")?;
            }
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("Failed to create data directory")?;
        }

        let json = serde_json::to_string_pretty(values)?;
        fs::write(&self.path, &json).context("Failed to write token file")?;

        // Set restrictive permissions (Unix only)
        #[cfg(unix)]
        {
            let mut perms = fs::metadata(&self.path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&self.path, perms)?;
        }

        Ok(())
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value.to_string());
        self.save(&values);
    }

    fn remove(&self, key: &str) {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        if values.remove(key).is_some() {
            self.save(&values);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_client::{TokenPair, TokenStore};
    use tempfile::TempDir;

    #[test]
    fn missing_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::open(dir.path().join("tokens.json")).unwrap();
        assert_eq!(storage.get("access_token"), None);
    }

    #[test]
    fn values_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("tokens.json");

        let store = TokenStore::new(FileStorage::open(&path).unwrap());
        store.set_pair(&TokenPair::new("A1", "R1"));

        let reopened = TokenStore::new(FileStorage::open(&path).unwrap());
        assert_eq!(reopened.tokens(), Some(TokenPair::new("A1", "R1")));
    }

    #[test]
    fn clearing_removes_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tokens.json");

        let store = TokenStore::new(FileStorage::open(&path).unwrap());
        store.set_pair(&TokenPair::new("A1", "R1"));
        assert!(path.exists());

        store.clear();
        assert!(!path.exists());
        store.clear();
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tokens.json");
        fs::write(&path, "not json").unwrap();
        assert!(FileStorage::open(&path).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn file_is_owner_only() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tokens.json");
        let storage = FileStorage::open(&path).unwrap();
        storage.set("access_token", "A1");

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
