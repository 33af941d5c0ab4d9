//! Typed accessors over the opaque cache store.
//!
//! Each map lives under one cache key as a JSON object; a missing key reads
//! as an empty map so first runs need no seeding.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::{CacheKey, CacheStore, StoreError};

/// Synthetic reward identifier covering every patron with an active pledge.
pub const ALL_PATRONS: &str = "0";

/// A reward tier as cached in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    pub id: String,
    pub title: String,
    pub amount_cents: i64,
}

/// Reward id -> tier metadata. Always contains the [`ALL_PATRONS`] entry.
pub type RewardCatalog = BTreeMap<String, Reward>;
/// Patron id -> currently entitled amount in cents.
pub type PledgeMap = BTreeMap<String, i64>;
/// Patron id -> last charge date, present only for declined patrons.
pub type DeclineMap = BTreeMap<String, String>;
/// Patron id -> lower-cased email.
pub type UserMap = BTreeMap<String, String>;
/// Reward id -> patrons currently entitled to it.
pub type RewardMemberMap = BTreeMap<String, Vec<String>>;

async fn read<T>(store: &dyn CacheStore, key: CacheKey) -> Result<T, StoreError>
where
    T: DeserializeOwned + Default,
{
    match store.get(key).await? {
        Some(value) => serde_json::from_value(value)
            .map_err(|e| StoreError::Backend(format!("corrupt {key} cache entry: {e}"))),
        None => Ok(T::default()),
    }
}

async fn write<T: Serialize>(
    store: &dyn CacheStore,
    key: CacheKey,
    value: &T,
) -> Result<(), StoreError> {
    let value = serde_json::to_value(value)
        .map_err(|e| StoreError::Backend(format!("serialize {key} cache entry: {e}")))?;
    store.set(key, value).await
}

pub async fn rewards(store: &dyn CacheStore) -> Result<RewardCatalog, StoreError> {
    read(store, CacheKey::Rewards).await
}

pub async fn set_rewards(
    store: &dyn CacheStore,
    catalog: &RewardCatalog,
) -> Result<(), StoreError> {
    write(store, CacheKey::Rewards, catalog).await
}

pub async fn pledges(store: &dyn CacheStore) -> Result<PledgeMap, StoreError> {
    read(store, CacheKey::Pledges).await
}

pub async fn set_pledges(store: &dyn CacheStore, pledges: &PledgeMap) -> Result<(), StoreError> {
    write(store, CacheKey::Pledges, pledges).await
}

pub async fn declines(store: &dyn CacheStore) -> Result<DeclineMap, StoreError> {
    read(store, CacheKey::PledgeDeclines).await
}

pub async fn set_declines(store: &dyn CacheStore, declines: &DeclineMap) -> Result<(), StoreError> {
    write(store, CacheKey::PledgeDeclines, declines).await
}

pub async fn users(store: &dyn CacheStore) -> Result<UserMap, StoreError> {
    read(store, CacheKey::Users).await
}

pub async fn set_users(store: &dyn CacheStore, users: &UserMap) -> Result<(), StoreError> {
    write(store, CacheKey::Users, users).await
}

pub async fn reward_members(store: &dyn CacheStore) -> Result<RewardMemberMap, StoreError> {
    read(store, CacheKey::RewardUsers).await
}

pub async fn set_reward_members(
    store: &dyn CacheStore,
    members: &RewardMemberMap,
) -> Result<(), StoreError> {
    write(store, CacheKey::RewardUsers, members).await
}

/// First-run probe: does any filter configuration exist yet?
pub async fn has_filters(store: &dyn CacheStore) -> Result<bool, StoreError> {
    Ok(match store.get(CacheKey::Filters).await? {
        Some(value) => !is_blank(&value),
        None => false,
    })
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}
