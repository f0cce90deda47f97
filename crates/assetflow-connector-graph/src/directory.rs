//! The directory seam consumed by the sync core.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use crate::users::USER_SELECT_FIELDS;
use crate::{
    DirectoryUserRecord, GraphApiClient, GraphConfig, GraphError, GraphResult, TenantCredentials,
    TokenCache,
};

/// Directory operations the sync core depends on.
///
/// The production implementation is [`GraphDirectory`]; tests substitute
/// in-memory fakes.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Lists all users in the tenant's directory.
    async fn list_users(
        &self,
        credentials: &TenantCredentials,
    ) -> GraphResult<Vec<DirectoryUserRecord>>;

    /// Fetches a user's profile photo.
    ///
    /// Returns `Ok(None)` when the user has no photo; absence is not an
    /// error and is not cached here.
    async fn fetch_user_photo(
        &self,
        credentials: &TenantCredentials,
        user_external_id: &str,
    ) -> GraphResult<Option<Bytes>>;
}

/// [`Directory`] implementation backed by the Microsoft Graph API.
///
/// Maintains one authenticated [`GraphApiClient`] (and token cache) per
/// directory tenant, created lazily on first use.
pub struct GraphDirectory {
    config: GraphConfig,
    http_client: reqwest::Client,
    clients: RwLock<HashMap<String, Arc<GraphApiClient>>>,
}

impl GraphDirectory {
    /// Creates a new Graph-backed directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: GraphConfig) -> GraphResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| GraphError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            config,
            http_client,
            clients: RwLock::new(HashMap::new()),
        })
    }

    /// Returns the cached client for the credential's directory tenant,
    /// creating it on first use.
    async fn client_for(&self, credentials: &TenantCredentials) -> Arc<GraphApiClient> {
        {
            let clients = self.clients.read().await;
            if let Some(client) = clients.get(&credentials.directory_tenant_id) {
                return client.clone();
            }
        }

        let token_cache = Arc::new(TokenCache::new(
            &self.config,
            credentials.clone(),
            self.http_client.clone(),
        ));
        let client = Arc::new(GraphApiClient::new(
            self.config.base_url(),
            token_cache,
            self.http_client.clone(),
        ));

        let mut clients = self.clients.write().await;
        clients
            .entry(credentials.directory_tenant_id.clone())
            .or_insert(client)
            .clone()
    }

    /// Builds the user listing URL with configured select fields and filter.
    fn user_query_url(&self) -> String {
        let mut url = format!(
            "{}/users?$select={}&$top={}",
            self.config.base_url(),
            USER_SELECT_FIELDS,
            self.config.page_size
        );

        if let Some(ref filter) = self.config.user_filter {
            url.push_str(&format!("&$filter={}", urlencoding::encode(filter)));
        }

        url
    }
}

#[async_trait]
impl Directory for GraphDirectory {
    #[instrument(skip(self, credentials), fields(tenant = %credentials.directory_tenant_id))]
    async fn list_users(
        &self,
        credentials: &TenantCredentials,
    ) -> GraphResult<Vec<DirectoryUserRecord>> {
        let client = self.client_for(credentials).await;
        let mut users = Vec::new();

        client
            .get_paginated(&self.user_query_url(), |page: Vec<serde_json::Value>| {
                debug!("Processing page with {} users", page.len());
                for value in page {
                    match DirectoryUserRecord::from_json(&value) {
                        Ok(record) => users.push(record),
                        Err(e) => {
                            warn!("Failed to parse user record: {e}");
                        }
                    }
                }
                Ok(())
            })
            .await?;

        debug!("Listed {} users", users.len());
        Ok(users)
    }

    #[instrument(skip(self, credentials), fields(tenant = %credentials.directory_tenant_id))]
    async fn fetch_user_photo(
        &self,
        credentials: &TenantCredentials,
        user_external_id: &str,
    ) -> GraphResult<Option<Bytes>> {
        let client = self.client_for(credentials).await;
        let url = format!(
            "{}/users/{}/photo/$value",
            client.base_url(),
            user_external_id
        );

        let photo = client.get_bytes(&url).await?;
        Ok(photo.filter(|bytes| !bytes.is_empty()))
    }
}
