//! Client configuration.

use std::time::Duration;

use serde::Deserialize;

/// Production API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.patreon.com";

const DEFAULT_MAX_PER_HOUR: u32 = 100;
const DEFAULT_MAX_PER_DAY: u32 = 1000;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Settings for [`ApiClient`](crate::client::ApiClient).
///
/// Quota maxima default to a conservative share of the platform's
/// documented budget; hosts syncing many campaigns should raise them.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub access_token: String,
    pub max_requests_per_hour: u32,
    pub max_requests_per_day: u32,
    #[serde(with = "timeout_secs")]
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            access_token: String::new(),
            max_requests_per_hour: DEFAULT_MAX_PER_HOUR,
            max_requests_per_day: DEFAULT_MAX_PER_DAY,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ApiConfig {
    /// A config carrying just a token, with every other field defaulted.
    #[must_use]
    pub fn with_token(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            ..Self::default()
        }
    }
}

mod timeout_secs {
    use super::*;
    use serde::Deserializer;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
