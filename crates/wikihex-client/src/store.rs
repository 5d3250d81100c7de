//! A [`KeyValueStore`] backed by a JSON file.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use wikihex_core::KeyValueStore;

/// Writes the whole map to disk on every change.
///
/// A write that fails is logged and the value is kept in memory, so the
/// session carries on; the budget self-heals on the next start.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl JsonFileStore {
    /// Load `path`, starting empty if it does not exist or cannot be parsed
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match load(&path) {
            Ok(values) => values,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!("Ignoring unreadable store {}: {}", path.display(), e);
                BTreeMap::new()
            }
        };
        debug!("Opened store {} with {} keys", path.display(), values.len());
        Self { path, values }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) {
        let result = serde_json::to_vec_pretty(&self.values)
            .map_err(io::Error::from)
            .and_then(|bytes| fs::write(&self.path, bytes));
        if let Err(e) = result {
            warn!("Failed to write store {}: {}", self.path.display(), e);
        }
    }
}

fn load(path: &Path) -> io::Result<BTreeMap<String, String>> {
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.values.insert(key.to_string(), value);
        self.flush();
    }

    fn remove(&mut self, key: &str) {
        if self.values.remove(key).is_some() {
            self.flush();
        }
    }
}
