//! Reconciliation of cached membership state.
//!
//! Two entry paths feed the cache: bulk rebuilds from a full page walk, and
//! incremental pledge events (create, delete, update). Both funnel through
//! [`Membership`], which owns the invariants: reward-list keys stay within
//! the known catalog, and the synthetic [`ALL_PATRONS`] list always equals
//! the pledge map's key set.

use serde_json::Value;
use tracing::{debug, info};

use crate::cache::{
    self, DeclineMap, PledgeMap, RewardCatalog, RewardMemberMap, UserMap, ALL_PATRONS,
};
use crate::error::SyncError;
use crate::extract::{self, PageExtract};
use crate::resource::{Document, Resource};
use crate::store::CacheStore;

/// The full cached membership state, held in memory while reconciling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Membership {
    pub pledges: PledgeMap,
    pub declines: DeclineMap,
    pub users: UserMap,
    pub reward_members: RewardMemberMap,
}

impl Membership {
    /// Fold one page extract in. Scalar entries for a repeated patron are
    /// overwritten (later pages win); reward lists are appended per known
    /// catalog reward, which keeps membership keys within the catalog.
    pub fn merge(&mut self, extract: &PageExtract, catalog: &RewardCatalog) {
        self.pledges.extend(extract.pledges.clone());
        self.declines.extend(extract.declines.clone());
        self.users.extend(extract.users.clone());

        for reward_id in catalog.keys() {
            let list = self.reward_members.entry(reward_id.clone()).or_default();
            if let Some(additions) = extract.reward_members.get(reward_id) {
                list.extend(additions.iter().cloned());
            }
        }

        self.refresh_all_patrons();
    }

    /// Drop a patron's scalar entries and trim the [`ALL_PATRONS`] list.
    ///
    /// Reward-list removal is the caller's business: delete events scope it
    /// to the rewards their payload names, updates unlist everywhere.
    fn remove_patron(&mut self, patron_id: &str) {
        self.pledges.remove(patron_id);
        self.declines.remove(patron_id);
        self.users.remove(patron_id);
        self.refresh_all_patrons();
    }

    /// Remove the patron from every reward list.
    fn unlist_everywhere(&mut self, patron_id: &str) {
        for patrons in self.reward_members.values_mut() {
            patrons.retain(|p| p != patron_id);
        }
    }

    /// Remove the patron from one reward list, if it exists.
    fn unlist(&mut self, reward_id: &str, patron_id: &str) {
        if let Some(patrons) = self.reward_members.get_mut(reward_id) {
            patrons.retain(|p| p != patron_id);
        }
    }

    /// Recompute the synthetic list of every actively pledging patron.
    fn refresh_all_patrons(&mut self) {
        self.reward_members.insert(
            ALL_PATRONS.to_string(),
            self.pledges.keys().cloned().collect(),
        );
    }
}

/// Load the cached membership maps into memory.
pub async fn load(store: &dyn CacheStore) -> Result<Membership, SyncError> {
    Ok(Membership {
        pledges: cache::pledges(store).await?,
        declines: cache::declines(store).await?,
        users: cache::users(store).await?,
        reward_members: cache::reward_members(store).await?,
    })
}

/// Persist the membership maps back to the cache.
pub async fn save(store: &dyn CacheStore, membership: &Membership) -> Result<(), SyncError> {
    cache::set_pledges(store, &membership.pledges).await?;
    cache::set_declines(store, &membership.declines).await?;
    cache::set_users(store, &membership.users).await?;
    cache::set_reward_members(store, &membership.reward_members).await?;
    Ok(())
}

/// Replace the cached state with a fresh rebuild from a full page walk.
///
/// The caller guarantees `pages` is a complete traversal; the previous
/// state is discarded rather than merged.
pub async fn rebuild(
    store: &dyn CacheStore,
    catalog: &RewardCatalog,
    pages: &[Document],
) -> Result<(), SyncError> {
    let mut membership = Membership::default();
    for page in pages {
        membership.merge(&extract::extract_page(page), catalog);
    }
    info!(
        pages = pages.len(),
        patrons = membership.pledges.len(),
        "rebuilt membership state"
    );
    save(store, &membership).await
}

/// Merge a pledge-created event into the cache.
///
/// Payloads carrying no entitled tiers describe followers rather than
/// patrons and are ignored.
pub async fn pledge_created(store: &dyn CacheStore, payload: &Value) -> Result<(), SyncError> {
    let (entry, extract) = decode_event(payload)?;
    if extract.is_empty() {
        debug!(resource = %entry.id, "pledge event with no entitled tiers ignored");
        return Ok(());
    }

    let catalog = cache::rewards(store).await?;
    let mut membership = load(store).await?;
    membership.merge(&extract, &catalog);
    save(store, &membership).await
}

/// Merge a pledge-deleted event into the cache.
///
/// The patron leaves the reward lists the payload names (the single
/// `reward` for a pledge resource, the entitled tiers for a member
/// resource) and the scalar maps and [`ALL_PATRONS`] list unconditionally.
pub async fn pledge_deleted(store: &dyn CacheStore, payload: &Value) -> Result<(), SyncError> {
    let entry = decode_entry(payload)?;
    let patron_id = event_patron_id(&entry)?.to_string();

    let mut membership = load(store).await?;
    match entry.kind.as_str() {
        "pledge" => {
            if let Some(reward_id) = entry.related_id("reward") {
                membership.unlist(reward_id, &patron_id);
            }
        }
        _ => {
            for tier in entry.related("currently_entitled_tiers") {
                membership.unlist(&tier.id, &patron_id);
            }
        }
    }
    membership.remove_patron(&patron_id);
    save(store, &membership).await
}

/// Merge a pledge-updated event: the patron's previous state is discarded
/// wholesale, then the payload is applied as a fresh pledge. A tier change
/// is reflected exactly, never merged additively, and stale decline or
/// email entries do not survive an update that no longer carries them.
pub async fn pledge_updated(store: &dyn CacheStore, payload: &Value) -> Result<(), SyncError> {
    let (entry, extract) = decode_event(payload)?;
    let patron_id = event_patron_id(&entry)?.to_string();

    let catalog = cache::rewards(store).await?;
    let mut membership = load(store).await?;
    membership.unlist_everywhere(&patron_id);
    membership.remove_patron(&patron_id);
    if !extract.is_empty() {
        membership.merge(&extract, &catalog);
    }
    save(store, &membership).await
}

fn decode_entry(payload: &Value) -> Result<Resource, SyncError> {
    let document: Document =
        serde_json::from_value(payload.clone()).map_err(|e| SyncError::MalformedPayload {
            reason: format!("event payload is not a resource document: {e}"),
        })?;
    document
        .entries()
        .first()
        .cloned()
        .ok_or_else(|| SyncError::MalformedPayload {
            reason: "event payload carries no resource".to_string(),
        })
}

fn decode_event(payload: &Value) -> Result<(Resource, PageExtract), SyncError> {
    let entry = decode_entry(payload)?;
    event_patron_id(&entry)?;

    let mut extract = PageExtract::default();
    extract::extract_entry(&entry, &mut extract);
    Ok((entry, extract))
}

/// The patron behind an event: member resources link a `user`, pledge
/// resources link a `patron`.
fn event_patron_id(entry: &Resource) -> Result<&str, SyncError> {
    let key = if entry.kind == "member" { "user" } else { "patron" };
    entry
        .related_id(key)
        .ok_or_else(|| SyncError::MalformedPayload {
            reason: format!("resource {} links no patron", entry.id),
        })
}
