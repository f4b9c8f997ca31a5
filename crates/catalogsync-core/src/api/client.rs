//! HTTP client for the catalog backend.
//!
//! All catalog endpoints take a POST with a JSON body of the form
//! `{ action, ...criteria, user, sessionId }` and reply with a
//! `ResponseEnvelope`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{header, Client};
use serde::Serialize;
use tracing::{debug, warn};

use crate::auth::{SessionContext, SessionIdentity};
use crate::catalog::FilterCriteria;
use crate::config::Config;

use super::{EndpointResolver, RemoteSource, ResponseEnvelope, TransportError};

// ============================================================================
// Constants
// ============================================================================

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

#[derive(Debug, Serialize)]
struct RequestBody<'a> {
    action: &'a str,
    #[serde(flatten)]
    criteria: &'a FilterCriteria,
    #[serde(flatten)]
    identity: SessionIdentity,
}

/// API client for the catalog backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    endpoints: Arc<dyn EndpointResolver>,
    session: Arc<dyn SessionContext>,
}

impl ApiClient {
    pub fn new(
        endpoints: Arc<dyn EndpointResolver>,
        session: Arc<dyn SessionContext>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoints,
            session,
        })
    }

    pub fn from_config(config: &Config, session: Arc<dyn SessionContext>) -> Result<Self> {
        Self::new(
            Arc::new(config.clone()),
            session,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// Check if response is successful, returning an error with body if not.
    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit (should retry),
    /// or Err for other errors.
    async fn check_response_for_retry(
        response: reqwest::Response,
    ) -> Result<Option<reqwest::Response>, TransportError> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status().as_u16() == 429 {
            Ok(None)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(TransportError::from_status(status, &body))
        }
    }

    async fn post<B: Serialize>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<ResponseEnvelope, TransportError> {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let response = self
                .client
                .post(url)
                .header(header::ACCEPT, "application/json")
                .json(body)
                .send()
                .await?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => {
                    return response.json().await.map_err(|e| {
                        TransportError::InvalidResponse(format!(
                            "Failed to parse JSON response from {}: {}",
                            url, e
                        ))
                    });
                }
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(TransportError::RateLimited);
                    }
                    warn!(url = url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2;
                }
            }
        }
    }
}

#[async_trait]
impl RemoteSource for ApiClient {
    async fn send(
        &self,
        endpoint_id: &str,
        action: &str,
        criteria: &FilterCriteria,
    ) -> Result<ResponseEnvelope, TransportError> {
        let url = self.endpoints.resolve(endpoint_id);
        let body = RequestBody {
            action,
            criteria,
            identity: self.session.identity(),
        };

        debug!(endpoint = endpoint_id, action = action, url = %url, "Sending catalog request");
        self.post(&url, &body).await
    }
}
