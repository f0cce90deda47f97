//! Microsoft Graph directory adapter for AssetFlow.
//!
//! Performs authenticated calls against the Microsoft Graph API on behalf of
//! a tenant: listing the directory's users and downloading user profile
//! photos. Authentication uses the `OAuth2` client credentials flow with a
//! cached access token per directory tenant.
//!
//! The sync core consumes this crate through the [`Directory`] trait; the
//! production implementation is [`GraphDirectory`].
//!
//! # Example
//!
//! ```no_run
//! use assetflow_connector_graph::{Directory, GraphConfig, GraphDirectory, TenantCredentials};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let directory = GraphDirectory::new(GraphConfig::default())?;
//! let credentials = TenantCredentials::new("directory-tenant-id", "client-id", "client-secret");
//!
//! let users = directory.list_users(&credentials).await?;
//! println!("{} users in the directory", users.len());
//! # Ok(())
//! # }
//! ```

mod auth;
mod client;
mod config;
mod directory;
mod error;
mod users;

pub use auth::TokenCache;
pub use client::{GraphApiClient, ODataError, ODataResponse};
pub use config::{GraphConfig, TenantCredentials};
pub use directory::{Directory, GraphDirectory};
pub use error::{GraphError, GraphResult};
pub use users::{DirectoryUserRecord, USER_SELECT_FIELDS};
