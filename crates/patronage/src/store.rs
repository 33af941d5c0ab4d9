//! Opaque key-value cache seam.
//!
//! Where the synchronized state physically lives is the host application's
//! concern; the engine only needs `get`/`set` over a fixed set of keys.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// The cache keys the reconciliation engine reads and writes.
///
/// `Filters` is only probed (never written) to detect a first run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Rewards,
    Pledges,
    PledgeDeclines,
    Users,
    RewardUsers,
    Filters,
}

impl CacheKey {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CacheKey::Rewards => "rewards",
            CacheKey::Pledges => "pledges",
            CacheKey::PledgeDeclines => "pledge-declines",
            CacheKey::Users => "users",
            CacheKey::RewardUsers => "reward-users",
            CacheKey::Filters => "filters",
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cache store backend error: {0}")]
    Backend(String),
}

/// Opaque key-value persistence for the synchronized state.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: CacheKey) -> Result<Option<Value>, StoreError>;
    async fn set(&self, key: CacheKey, value: Value) -> Result<(), StoreError>;
}

/// In-memory store, used by tests and as a default for embedding hosts.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<CacheKey, Value>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: CacheKey) -> Result<Option<Value>, StoreError> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(entries.get(&key).cloned())
    }

    async fn set(&self, key: CacheKey, value: Value) -> Result<(), StoreError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        entries.insert(key, value);
        Ok(())
    }
}
