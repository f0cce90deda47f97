//! Graph adapter configuration and per-tenant credentials.

use secrecy::SecretString;
use std::time::Duration;

/// Configuration for Graph API access, shared across tenants.
#[derive(Debug, Clone)]
pub struct GraphConfig {
    /// Graph API endpoint, without version segment.
    pub graph_endpoint: String,

    /// Azure AD login endpoint used for token acquisition.
    pub login_endpoint: String,

    /// Graph API version segment.
    pub api_version: String,

    /// Page size for user listing (`$top`).
    pub page_size: u32,

    /// Optional OData `$filter` applied to the user listing.
    pub user_filter: Option<String>,

    /// HTTP request timeout.
    pub request_timeout: Duration,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            graph_endpoint: "https://graph.microsoft.com".to_string(),
            login_endpoint: "https://login.microsoftonline.com".to_string(),
            api_version: "v1.0".to_string(),
            page_size: 100,
            user_filter: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl GraphConfig {
    /// Returns the versioned base URL for Graph API requests.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("{}/{}", self.graph_endpoint, self.api_version)
    }
}

/// Credentials for one tenant's app registration.
///
/// The client secret is wrapped in [`SecretString`] so it is redacted from
/// `Debug` output and never logged.
#[derive(Debug, Clone)]
pub struct TenantCredentials {
    /// Entra ID directory tenant the credentials belong to.
    pub directory_tenant_id: String,

    /// `OAuth2` client ID.
    pub client_id: String,

    /// `OAuth2` client secret.
    pub client_secret: SecretString,
}

impl TenantCredentials {
    /// Creates credentials from their raw parts.
    pub fn new(
        directory_tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            directory_tenant_id: directory_tenant_id.into(),
            client_id: client_id.into(),
            client_secret: SecretString::new(client_secret.into()),
        }
    }
}
