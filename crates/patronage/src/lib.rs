//! Reconciliation engine for a crowdfunding platform's membership data.
//!
//! The crate keeps a local cache of a creator's campaigns, reward tiers,
//! and patron memberships in step with the remote platform. Two paths feed
//! the cache: scheduled full resyncs that page through every campaign's
//! member listing, and incremental webhook-style pledge events.
//!
//! The host application supplies the ambient collaborators: a
//! [`store::CacheStore`] for persistence, a [`report::ProblemReporter`] and
//! [`report::ErrorReporter`] for surfacing failures, and a
//! [`sync::SeedHook`] for first-run bootstrapping. Everything network-side
//! goes through the quota-enforcing, retrying [`client::ApiClient`].

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod extract;
pub mod http;
pub mod quota;
pub mod reconcile;
pub mod report;
pub mod resource;
pub mod store;
pub mod sync;
pub mod walker;

pub use client::ApiClient;
pub use config::ApiConfig;
pub use error::{ApiError, SyncError};
pub use report::{ErrorReporter, LogReporter, ProblemReporter};
pub use store::{CacheKey, CacheStore, MemoryStore, StoreError};
pub use sync::{NoSeed, SeedHook, Synchronizer};
