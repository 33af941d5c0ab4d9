//! Full-catalog synchronization.
//!
//! One run fetches the campaign and tier metadata, rebuilds the reward
//! catalog, then walks every campaign's member listing and hands the pages
//! to the reconciliation engine for a full rebuild. The first successful
//! run on a host with no filter configuration also triggers the seed hook.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::cache::{self, Reward, RewardCatalog, ALL_PATRONS};
use crate::client::{ApiClient, CAMPAIGNS_URI};
use crate::error::SyncError;
use crate::reconcile;
use crate::resource::{Document, TierAttributes};
use crate::store::CacheStore;
use crate::walker;

/// One-time bootstrap collaborator, invoked after the first successful
/// sync on a host that has no filter configuration yet.
#[async_trait]
pub trait SeedHook: Send + Sync {
    async fn seed_default_content(&self) -> Result<(), SyncError>;
}

/// Seed hook for hosts with nothing to bootstrap.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSeed;

#[async_trait]
impl SeedHook for NoSeed {
    async fn seed_default_content(&self) -> Result<(), SyncError> {
        info!("no seed content configured, skipping bootstrap");
        Ok(())
    }
}

/// Orchestrates catalog refreshes and incremental pledge events against
/// one cache store.
pub struct Synchronizer {
    client: ApiClient,
    store: Arc<dyn CacheStore>,
    seed: Arc<dyn SeedHook>,
}

impl Synchronizer {
    pub fn new(client: ApiClient, store: Arc<dyn CacheStore>, seed: Arc<dyn SeedHook>) -> Self {
        Self { client, store, seed }
    }

    /// Run a full catalog and membership resync.
    ///
    /// Returns `Ok(false)` without touching the cache when the campaign
    /// listing comes back empty; API and walk failures propagate as errors.
    pub async fn sync_all(&self) -> Result<bool, SyncError> {
        let raw = self.client.campaign_data().await?;
        let document: Document =
            serde_json::from_value(raw).map_err(|source| SyncError::MalformedPage {
                uri: CAMPAIGNS_URI.to_string(),
                source,
            })?;

        if document.entries().is_empty() {
            warn!("campaign listing came back empty, leaving cached state untouched");
            return Ok(false);
        }

        let (campaign_ids, catalog) = build_catalog(&document);
        cache::set_rewards(self.store.as_ref(), &catalog).await?;

        let seeds: Vec<String> = campaign_ids
            .iter()
            .map(|id| ApiClient::members_uri(id))
            .collect();
        let pages = walker::walk_pages(&self.client, seeds).await?;
        reconcile::rebuild(self.store.as_ref(), &catalog, &pages).await?;

        info!(
            campaigns = campaign_ids.len(),
            rewards = catalog.len(),
            "full resync complete"
        );

        if !cache::has_filters(self.store.as_ref()).await? {
            self.seed.seed_default_content().await?;
        }
        Ok(true)
    }

    /// Apply a pledge-created event.
    pub async fn pledge_created(&self, payload: &serde_json::Value) -> Result<(), SyncError> {
        reconcile::pledge_created(self.store.as_ref(), payload).await
    }

    /// Apply a pledge-updated event.
    pub async fn pledge_updated(&self, payload: &serde_json::Value) -> Result<(), SyncError> {
        reconcile::pledge_updated(self.store.as_ref(), payload).await
    }

    /// Apply a pledge-deleted event.
    pub async fn pledge_deleted(&self, payload: &serde_json::Value) -> Result<(), SyncError> {
        reconcile::pledge_deleted(self.store.as_ref(), payload).await
    }
}

/// Build the reward catalog from a campaign listing document.
///
/// Only tiers actually referenced by a campaign's `tiers` relationship make
/// it in; the synthetic [`ALL_PATRONS`] entry is always present and never
/// sourced from the API.
fn build_catalog(document: &Document) -> (Vec<String>, RewardCatalog) {
    let mut campaign_ids = Vec::new();
    let mut tier_ids = Vec::new();
    for campaign in document.entries() {
        campaign_ids.push(campaign.id.clone());
        for tier in campaign.related("tiers") {
            tier_ids.push(tier.id.clone());
        }
    }

    let mut catalog = RewardCatalog::new();
    for entry in &document.included {
        if entry.kind == "tier" && tier_ids.iter().any(|id| id == &entry.id) {
            let attrs: TierAttributes =
                serde_json::from_value(entry.attributes.clone()).unwrap_or_default();
            catalog.insert(
                entry.id.clone(),
                Reward {
                    id: entry.id.clone(),
                    title: attrs.title,
                    amount_cents: attrs.amount_cents,
                },
            );
        }
    }

    catalog.insert(
        ALL_PATRONS.to_string(),
        Reward {
            id: ALL_PATRONS.to_string(),
            title: "All Patrons".to_string(),
            amount_cents: 0,
        },
    );

    (campaign_ids, catalog)
}
