//! ## rollbar-wp-core::store
//! **Host option store seam**
//!
//! The host keeps plugin options as named mappings; the plugin only ever
//! touches the `rollbar_wp` entry. Two implementations ship here: an
//! in-process map and a JSON file holding every entry.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::debug;

use crate::error::StoreError;
use crate::value::{OptionMap, SettingValue};

/// Option name the plugin settings are persisted under.
pub const OPTION_KEY: &str = "rollbar_wp";

pub trait OptionStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<OptionMap>, StoreError>;

    fn set(&self, key: &str, value: &OptionMap) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, OptionMap>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, value: OptionMap) -> Self {
        let store = Self::new();
        store.entries.write().insert(key.to_string(), value);
        store
    }
}

impl OptionStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<OptionMap>, StoreError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &OptionMap) -> Result<(), StoreError> {
        self.entries.write().insert(key.to_string(), value.clone());
        Ok(())
    }
}

/// `null` marks an option as unset, the same as leaving it out.
fn drop_nulls(map: BTreeMap<String, Option<SettingValue>>) -> OptionMap {
    map.into_iter()
        .filter_map(|(name, value)| value.map(|value| (name, value)))
        .collect()
}

/// Options persisted as one JSON object keyed by option name.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: RwLock<()>,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: RwLock::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<HashMap<String, OptionMap>, StoreError> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(HashMap::new()),
            Ok(bytes) => {
                let raw: HashMap<String, BTreeMap<String, Option<SettingValue>>> =
                    serde_json::from_slice(&bytes)?;
                Ok(raw.into_iter().map(|(key, map)| (key, drop_nulls(map))).collect())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(HashMap::new()),
            Err(source) => Err(StoreError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

impl OptionStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<OptionMap>, StoreError> {
        let _guard = self.lock.read();
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &OptionMap) -> Result<(), StoreError> {
        let _guard = self.lock.write();
        let mut all = self.read_all()?;
        all.insert(key.to_string(), value.clone());

        let io_err = |source: std::io::Error| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(&self.path, serde_json::to_vec_pretty(&all)?).map_err(io_err)?;
        debug!(path = %self.path.display(), key, "Persisted options");
        Ok(())
    }
}
