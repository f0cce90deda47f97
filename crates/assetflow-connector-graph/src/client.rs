//! Microsoft Graph HTTP client with OData pagination.
//!
//! Handles bearer token injection, `Retry-After` on 429 responses, and a
//! bounded retry for transient gateway errors. These retries are internal to
//! the adapter; callers see either a result or a final error.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::{GraphError, GraphResult, TokenCache};

/// `OData` error response from Microsoft Graph.
#[derive(Debug, Deserialize)]
pub struct ODataError {
    pub error: ODataErrorBody,
}

/// `OData` error body.
#[derive(Debug, Deserialize)]
pub struct ODataErrorBody {
    pub code: String,
    pub message: String,
}

/// Response wrapper for paginated Graph API responses.
#[derive(Debug, Deserialize)]
pub struct ODataResponse<T> {
    pub value: Vec<T>,
    #[serde(rename = "@odata.nextLink")]
    pub next_link: Option<String>,
}

/// Authenticated Graph API client for one directory tenant.
#[derive(Debug)]
pub struct GraphApiClient {
    http_client: reqwest::Client,
    token_cache: Arc<TokenCache>,
    base_url: String,
    max_retries: u32,
}

impl GraphApiClient {
    /// Creates a new client on top of an existing token cache.
    pub fn new(base_url: String, token_cache: Arc<TokenCache>, http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            token_cache,
            base_url,
            max_retries: 3,
        }
    }

    /// Returns the versioned base URL for Graph API requests.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Performs a GET request, deserializing the JSON response.
    #[instrument(skip(self))]
    pub async fn get<T: DeserializeOwned>(&self, url: &str) -> GraphResult<T> {
        let response = self.send_with_retry(url).await?;
        let status = response.status();

        if status.is_success() {
            return response.json().await.map_err(GraphError::from);
        }

        Err(Self::error_from_response(response).await)
    }

    /// Performs a GET request for raw bytes.
    ///
    /// Returns `Ok(None)` on 404, which Graph uses for resources that simply
    /// do not exist (e.g. a user without a profile photo).
    #[instrument(skip(self))]
    pub async fn get_bytes(&self, url: &str) -> GraphResult<Option<Bytes>> {
        let response = self.send_with_retry(url).await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if status.is_success() {
            return Ok(Some(response.bytes().await?));
        }

        Err(Self::error_from_response(response).await)
    }

    /// Fetches all pages of a paginated response, passing each page to the
    /// callback.
    #[instrument(skip(self, callback))]
    pub async fn get_paginated<T, F>(&self, initial_url: &str, mut callback: F) -> GraphResult<()>
    where
        T: DeserializeOwned,
        F: FnMut(Vec<T>) -> GraphResult<()>,
    {
        let mut url = initial_url.to_string();

        loop {
            debug!(%url, "Fetching page");
            let response: ODataResponse<T> = self.get(&url).await?;

            callback(response.value)?;

            match response.next_link {
                Some(next) => url = next,
                None => return Ok(()),
            }
        }
    }

    /// Sends a GET request, retrying 429 and transient gateway errors with
    /// bounded exponential backoff.
    async fn send_with_retry(&self, url: &str) -> GraphResult<reqwest::Response> {
        let mut retries = 0;
        let mut delay = Duration::from_secs(1);

        loop {
            let token = self.token_cache.get_token().await?;

            let response = self
                .http_client
                .get(url)
                .bearer_auth(&token)
                .send()
                .await?;
            let status = response.status();

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS && retries < self.max_retries {
                let wait = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .map_or(delay, Duration::from_secs);

                retries += 1;
                warn!(
                    "Rate limited, retry {}/{} after {:?}",
                    retries, self.max_retries, wait
                );
                tokio::time::sleep(wait).await;
                delay *= 2;
                continue;
            }

            if matches!(
                status,
                reqwest::StatusCode::BAD_GATEWAY
                    | reqwest::StatusCode::SERVICE_UNAVAILABLE
                    | reqwest::StatusCode::GATEWAY_TIMEOUT
            ) && retries < self.max_retries
            {
                retries += 1;
                warn!(
                    "Transient error {}, retry {}/{} after {:?}",
                    status, retries, self.max_retries, delay
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
                continue;
            }

            return Ok(response);
        }
    }

    /// Converts a non-success response into a [`GraphError`].
    async fn error_from_response(response: reqwest::Response) -> GraphError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if let Ok(odata_error) = serde_json::from_str::<ODataError>(&body) {
            return GraphError::Api {
                code: odata_error.error.code,
                message: odata_error.error.message,
            };
        }

        GraphError::Api {
            code: status.to_string(),
            message: body,
        }
    }
}
