//! JSON-file cache store.
//!
//! The whole cache lives in one pretty-printed JSON object keyed by cache
//! key. Plenty for a single creator's membership data, and trivially
//! inspectable with a pager.

use std::fs;
use std::path::PathBuf;

use async_trait::async_trait;
use patronage::store::{CacheKey, CacheStore, StoreError};
use serde_json::{Map, Value};
use tokio::sync::Mutex;

pub struct JsonFileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles on the backing file.
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    fn read_all(&self) -> Result<Map<String, Value>, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => {
                return Err(StoreError::Backend(format!(
                    "read {}: {e}",
                    self.path.display()
                )))
            }
        };
        serde_json::from_str(&raw).map_err(|e| {
            StoreError::Backend(format!("parse {}: {e}", self.path.display()))
        })
    }

    fn write_all(&self, entries: &Map<String, Value>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Backend(format!("create {}: {e}", parent.display()))
                })?;
            }
        }
        let raw = serde_json::to_string_pretty(entries)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        fs::write(&self.path, raw).map_err(|e| {
            StoreError::Backend(format!("write {}: {e}", self.path.display()))
        })
    }
}

#[async_trait]
impl CacheStore for JsonFileStore {
    async fn get(&self, key: CacheKey) -> Result<Option<Value>, StoreError> {
        let _guard = self.lock.lock().await;
        Ok(self.read_all()?.get(key.as_str()).cloned())
    }

    async fn set(&self, key: CacheKey, value: Value) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_all()?;
        entries.insert(key.as_str().to_string(), value);
        self.write_all(&entries)
    }
}
