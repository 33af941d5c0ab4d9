//! Problem and error reporting collaborators.
//!
//! The host application owns the admin-facing problem dashboard and the
//! exception tracker; the engine only talks to them through these traits.

use std::time::Duration;

use crate::error::ApiError;

/// Problem code flagged when the API rejects the access token.
pub const ACCESS_TOKEN_INVALID: &str = "patronage_access_token_invalid";

/// How long an access-token problem stays flagged before re-checking.
pub const ACCESS_TOKEN_SUPPRESS: Duration = Duration::from_secs(7 * 60 * 60);

/// Admin-visible problem banner seam.
pub trait ProblemReporter: Send + Sync {
    fn flag_problem(&self, code: &str, suppress_for: Duration);
    fn clear_problem(&self, code: &str);
    fn is_problem_flagged(&self, code: &str) -> bool;
}

/// Exception tracker seam; `api_uri` is the request that produced the error.
pub trait ErrorReporter: Send + Sync {
    fn report_error(&self, error: &ApiError, api_uri: &str);
}

/// Default reporter that surfaces everything through the tracing subscriber.
///
/// Hosts with a real dashboard or exception tracker supply their own
/// implementations; this one never reports a problem as flagged.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl ProblemReporter for LogReporter {
    fn flag_problem(&self, code: &str, suppress_for: Duration) {
        tracing::warn!(code, ?suppress_for, "problem flagged");
    }

    fn clear_problem(&self, code: &str) {
        tracing::info!(code, "problem cleared");
    }

    fn is_problem_flagged(&self, _code: &str) -> bool {
        false
    }
}

impl ErrorReporter for LogReporter {
    fn report_error(&self, error: &ApiError, api_uri: &str) {
        tracing::warn!(api_uri, %error, "API error reported");
    }
}
