use anyhow::{Context, Result, bail};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::PathBuf;

/// Environment variable overriding the store directory
pub const DATA_DIR_ENV: &str = "COLDVAULT_DATA_DIR";

/// Key holding the inventory job being tracked
pub const JOB_KEY: &str = "glacier-inventory-job";
/// Key holding the last fetched archive list
pub const RESULTS_KEY: &str = "glacier-inventory-results";

/// String key/value store persisted as one file per key
///
/// Values are opaque strings (callers store serialized JSON). Writes go
/// through a temporary file and a rename so a crash never leaves a
/// half-written value behind.
#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    /// Open a store rooted at `dir`, creating the directory if needed
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .context(format!("Failed to create store directory {}", dir.display()))?;
        Ok(LocalStore { dir })
    }

    /// Open the store in `$COLDVAULT_DATA_DIR` or the platform data directory
    pub fn open_default() -> Result<Self> {
        Self::open(Self::default_dir()?)
    }

    /// Resolve the default store directory
    pub fn default_dir() -> Result<PathBuf> {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            if !dir.is_empty() {
                return Ok(PathBuf::from(dir));
            }
        }

        dirs::data_dir()
            .map(|d| d.join("coldvault"))
            .context("Could not determine a data directory; set COLDVAULT_DATA_DIR")
    }

    /// Get the value stored under `key`
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).context(format!("Failed to read {}", path.display())),
        }
    }

    /// Store `value` under `key`, replacing any previous value
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, value).context(format!("Failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &path).context(format!("Failed to replace {}", path.display()))?;
        Ok(())
    }

    /// Remove `key`; removing a missing key is not an error
    pub fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context(format!("Failed to remove {}", path.display())),
        }
    }

    /// Get and deserialize the JSON value under `key`
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key)? {
            Some(raw) => {
                let value = serde_json::from_str(&raw)
                    .context(format!("Corrupt value stored under '{}'", key))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Serialize `value` as JSON and store it under `key`
    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.set(key, &raw)
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            bail!("Invalid store key: {:?}", key);
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}
