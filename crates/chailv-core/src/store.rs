use anyhow::{anyhow, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Durable key-value storage for table blobs: one raw text file per key.
#[derive(Debug, Clone)]
pub struct TableStore {
    root: PathBuf,
}

impl TableStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store under the per-user config directory
    pub fn open_default() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(Self::new(config_dir.join("chailv").join("tables")))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.txt", key))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.path_for(key).exists()
    }

    /// Persisted value for `key`, or `preset` when absent or empty
    pub fn load(&self, key: &str, preset: &str) -> String {
        match fs::read_to_string(self.path_for(key)) {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => preset.to_string(),
            Err(e) if e.kind() == ErrorKind::NotFound => preset.to_string(),
            Err(e) => {
                tracing::warn!(key, error = %e, "unreadable table entry, using preset");
                preset.to_string()
            }
        }
    }

    pub fn save(&self, key: &str, text: &str) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        fs::write(self.path_for(key), text)
            .map_err(|e| anyhow!("Failed to save table {}: {}", key, e))
    }

    pub fn clear(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(anyhow!("Failed to clear table {}: {}", key, e)),
        }
    }
}
