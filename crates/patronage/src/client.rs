//! Rate-limited, retrying API fetcher.
//!
//! Every outbound call goes through [`ApiClient::get`], which enforces the
//! hourly and daily quota windows, retries transient server failures with
//! exponential backoff, and classifies terminal responses into the
//! [`ApiError`] taxonomy. Auth rejections are recovered into a flagged
//! problem rather than raised; other unusable responses are handed to the
//! error reporter with the offending URI.

use std::sync::Arc;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::http::reqwest_transport::ReqwestTransport;
use crate::http::{HttpError, HttpRequest, HttpResponse, HttpTransport};
use crate::quota::{QuotaWindow, QuotaWindowKind};
use crate::report::{ErrorReporter, ProblemReporter, ACCESS_TOKEN_INVALID, ACCESS_TOKEN_SUPPRESS};

/// Campaign listing with included reward tiers, one call.
pub(crate) const CAMPAIGNS_URI: &str =
    "/oauth2/v2/campaigns?include=tiers&fields[tier]=amount_cents,title&page[count]=100";

/// Status codes retried as transient server failures.
const RETRY_STATUSES: [u16; 4] = [500, 502, 503, 504];

/// Total attempts per call, including the first.
const RETRY_MAX_ATTEMPTS: usize = 4;

/// Base interval for the exponential backoff (factor 2, jitter on).
const RETRY_MIN_DELAY: Duration = Duration::from_secs(2);

struct Quotas {
    hourly: QuotaWindow,
    daily: QuotaWindow,
}

/// Authenticated client for the crowdfunding platform's read API.
pub struct ApiClient {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    token: String,
    quotas: Mutex<Quotas>,
    problems: Arc<dyn ProblemReporter>,
    errors: Arc<dyn ErrorReporter>,
}

impl ApiClient {
    /// Create a client with a real reqwest transport.
    pub fn new(
        config: &ApiConfig,
        problems: Arc<dyn ProblemReporter>,
        errors: Arc<dyn ErrorReporter>,
    ) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::with_timeout(config.request_timeout)
            .map_err(|e| ApiError::Config(e.to_string()))?;
        Ok(Self::with_transport(
            config,
            Arc::new(transport),
            problems,
            errors,
        ))
    }

    /// Create a client over an injected transport.
    pub fn with_transport(
        config: &ApiConfig,
        transport: Arc<dyn HttpTransport>,
        problems: Arc<dyn ProblemReporter>,
        errors: Arc<dyn ErrorReporter>,
    ) -> Self {
        Self {
            transport,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.access_token.clone(),
            quotas: Mutex::new(Quotas {
                hourly: QuotaWindow::new(QuotaWindowKind::Hourly, config.max_requests_per_hour),
                daily: QuotaWindow::new(QuotaWindowKind::Daily, config.max_requests_per_day),
            }),
            problems,
            errors,
        }
    }

    /// Member listing URI for one campaign, seed of a page walk.
    #[must_use]
    pub fn members_uri(campaign_id: &str) -> String {
        format!(
            "/oauth2/v2/campaigns/{campaign_id}/members\
             ?include=currently_entitled_tiers,user\
             &fields[member]=currently_entitled_amount_cents,email,last_charge_date,last_charge_status"
        )
    }

    /// Fetch the campaign + tier catalog document.
    pub async fn campaign_data(&self) -> Result<Value, ApiError> {
        self.get(CAMPAIGNS_URI).await
    }

    /// Fetch one URI as a JSON document.
    ///
    /// Quota protocol: an already exhausted window rejects the call before
    /// any network I/O; otherwise the request is issued and both windows are
    /// charged exactly once when a response completes, whether or not that
    /// response was usable. Pagination `next` links arrive absolute and are
    /// used as-is; other URIs are joined to the configured base URL.
    pub async fn get(&self, uri: &str) -> Result<Value, ApiError> {
        {
            let mut quotas = self.quotas.lock().await;
            if !quotas.hourly.can_perform() {
                quotas.hourly.performed()?;
            }
            if !quotas.daily.can_perform() {
                quotas.daily.performed()?;
            }
        }

        let url = self.absolute_url(uri);
        let outcome = (|| self.send_once(&url))
            .retry(backoff())
            .when(SendError::is_transient)
            .notify(|err: &SendError, dur: Duration| {
                tracing::debug!(url = %url, retry_in = ?dur, %err, "retrying API call");
            })
            .await;

        match outcome {
            Ok(response) => {
                self.register_usage().await;
                self.classify(uri, response)
            }
            Err(SendError::Retriable { status, body }) => {
                // Retry budget spent on a completed (but failed) response.
                self.register_usage().await;
                let error = ApiError::InvalidResponse { body };
                tracing::warn!(uri, status, "API call failed after retries");
                self.errors.report_error(&error, uri);
                Err(error)
            }
            Err(SendError::Http(http_err)) => {
                let error = ApiError::InvalidResponse {
                    body: http_err.to_string(),
                };
                tracing::warn!(uri, %http_err, "API transport failure");
                self.errors.report_error(&error, uri);
                Err(error)
            }
        }
    }

    async fn send_once(&self, url: &str) -> Result<HttpResponse, SendError> {
        let request = HttpRequest {
            url: url.to_string(),
            headers: vec![
                ("Accept".to_string(), "application/json".to_string()),
                (
                    "Authorization".to_string(),
                    format!("Bearer {}", self.token),
                ),
            ],
        };

        let response = self.transport.get(request).await.map_err(SendError::Http)?;

        if RETRY_STATUSES.contains(&response.status) {
            return Err(SendError::Retriable {
                status: response.status,
                body: response.body_text(),
            });
        }
        Ok(response)
    }

    /// Charge both quota windows for a completed call.
    ///
    /// The pre-check already guaranteed headroom, so rejections here can
    /// only come from a window rolling over mid-call; nothing to do then.
    async fn register_usage(&self) {
        let mut quotas = self.quotas.lock().await;
        let _ = quotas.hourly.performed();
        let _ = quotas.daily.performed();
    }

    fn classify(&self, uri: &str, response: HttpResponse) -> Result<Value, ApiError> {
        match response.status {
            200 => match serde_json::from_slice::<Value>(&response.body) {
                Ok(document) => {
                    if self.problems.is_problem_flagged(ACCESS_TOKEN_INVALID) {
                        self.problems.clear_problem(ACCESS_TOKEN_INVALID);
                    }
                    Ok(document)
                }
                Err(_) => {
                    let error = ApiError::InvalidResponse {
                        body: response.body_text(),
                    };
                    tracing::warn!(uri, "API returned 200 with a non-JSON body");
                    self.errors.report_error(&error, uri);
                    Err(error)
                }
            },
            401 => {
                self.problems
                    .flag_problem(ACCESS_TOKEN_INVALID, ACCESS_TOKEN_SUPPRESS);
                Err(ApiError::AuthRejected)
            }
            status => {
                let error = ApiError::InvalidResponse {
                    body: response.body_text(),
                };
                tracing::warn!(uri, status, "unexpected API response status");
                self.errors.report_error(&error, uri);
                Err(error)
            }
        }
    }

    fn absolute_url(&self, uri: &str) -> String {
        if uri.starts_with("http://") || uri.starts_with("https://") {
            uri.to_string()
        } else {
            format!("{}{}", self.base_url, uri)
        }
    }
}

#[derive(Debug, Error)]
enum SendError {
    #[error("retriable status {status}")]
    Retriable { status: u16, body: String },

    #[error(transparent)]
    Http(HttpError),
}

impl SendError {
    fn is_transient(&self) -> bool {
        match self {
            SendError::Retriable { .. } => true,
            SendError::Http(e) => e.is_timeout(),
        }
    }
}

fn backoff() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(RETRY_MIN_DELAY)
        .with_factor(2.0)
        .with_max_times(RETRY_MAX_ATTEMPTS - 1)
        .with_jitter()
}
