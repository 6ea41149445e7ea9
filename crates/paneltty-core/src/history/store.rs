//! Persisted key-value storage for command histories.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Durable string-list storage keyed by string.
pub trait HistoryStore {
    /// Stored list for `key`, or `None` if nothing was ever saved.
    fn load(&self, key: &str) -> Result<Option<Vec<String>>>;

    /// Replace the list stored under `key`.
    fn save(&mut self, key: &str, value: &[String]) -> Result<()>;
}

impl<T: HistoryStore + ?Sized> HistoryStore for Box<T> {
    fn load(&self, key: &str) -> Result<Option<Vec<String>>> {
        (**self).load(key)
    }

    fn save(&mut self, key: &str, value: &[String]) -> Result<()> {
        (**self).save(key, value)
    }
}

/// All histories in a single JSON object file: `{ "<key>": ["cmd", ...] }`.
///
/// The file is read once on open and rewritten on every save.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: HashMap<String, Vec<String>>,
}

impl JsonFileStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let data = std::fs::read_to_string(&path)?;
            serde_json::from_str(&data).map_err(|e| {
                Error::History(format!(
                    "Failed to parse history file {}: {}",
                    path.display(),
                    e
                ))
            })?
        } else {
            HashMap::new()
        };
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

impl HistoryStore for JsonFileStore {
    fn load(&self, key: &str) -> Result<Option<Vec<String>>> {
        Ok(self.entries.get(key).cloned())
    }

    fn save(&mut self, key: &str, value: &[String]) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_vec());
        self.write()
    }
}

/// In-process store, lost on exit.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, Vec<String>>,
}

impl HistoryStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<Vec<String>>> {
        Ok(self.entries.get(key).cloned())
    }

    fn save(&mut self, key: &str, value: &[String]) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }
}
