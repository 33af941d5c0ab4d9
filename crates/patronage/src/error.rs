//! Error taxonomy for fetching and reconciliation.

use thiserror::Error;

use crate::quota::QuotaExceeded;
use crate::store::StoreError;

/// Failures of a single API call.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A local quota window rejected the call before any network I/O.
    /// Not retried automatically; the caller may try again later.
    #[error(transparent)]
    Quota(#[from] QuotaExceeded),

    /// The API returned 401. The access token problem has already been
    /// flagged with the problem reporter by the time this is returned.
    #[error("access token rejected by the API")]
    AuthRejected,

    /// Any other unusable response: a non-2xx status after the retry budget
    /// is spent, a body that is not valid JSON, or a transport failure.
    /// Reported to the error reporter along with the offending URI.
    #[error("invalid API response: {body}")]
    InvalidResponse { body: String },

    /// The client itself could not be constructed.
    #[error("client configuration error: {0}")]
    Config(String),
}

/// Failures of a reconciliation step (bulk resync or incremental merge).
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A page walk hit an error result mid-traversal. Fatal to the walk;
    /// the bulk resync aborts without touching the cache.
    #[error("page walk aborted at {uri}")]
    IncompletePage {
        uri: String,
        #[source]
        source: ApiError,
    },

    /// A fetched page did not parse as a paginated document.
    #[error("malformed page at {uri}")]
    MalformedPage {
        uri: String,
        #[source]
        source: serde_json::Error,
    },

    /// A fetched page carried no data section at all.
    #[error("empty page document at {uri}")]
    EmptyPage { uri: String },

    /// An event payload or embedded resource could not be interpreted.
    /// Fatal before any cache write, since partial application would
    /// corrupt the membership invariants.
    #[error("malformed payload: {reason}")]
    MalformedPayload { reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}
