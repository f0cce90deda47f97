//! Tenant model.
//!
//! A tenant is an isolated customer organization. The directory credential
//! fields are owned exclusively by this record; the sync core only ever
//! reads them.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::DbError;

/// A tenant whose user directory may be synchronized from Microsoft Entra ID.
#[derive(Debug, Clone, FromRow)]
pub struct Tenant {
    /// Unique identifier for the tenant.
    pub id: Uuid,

    /// Human-readable name of the tenant (e.g., "Acme Corp").
    pub name: String,

    /// URL-safe slug for the tenant, unique across all tenants.
    pub slug: String,

    /// The Entra ID (Azure AD) directory tenant this tenant syncs from.
    pub entra_tenant_id: Option<String>,

    /// OAuth2 client ID of the app registration used for Graph API calls.
    pub client_id: Option<String>,

    /// OAuth2 client secret of the app registration.
    pub client_secret: Option<String>,

    /// When the client secret expires, if known. Feeds the secret-expiry
    /// notification job.
    pub client_secret_expires_at: Option<DateTime<Utc>>,

    /// Whether directory sync is enabled for this tenant.
    pub sync_enabled: bool,

    /// Timestamp when the tenant was created.
    pub created_at: DateTime<Utc>,

    /// Timestamp when the tenant was last updated.
    pub updated_at: DateTime<Utc>,
}

const TENANT_COLUMNS: &str = "id, name, slug, entra_tenant_id, client_id, client_secret, \
     client_secret_expires_at, sync_enabled, created_at, updated_at";

impl Tenant {
    /// Returns `true` when all three directory credential fields are present.
    ///
    /// Directory sync may only run for a tenant where this holds and
    /// `sync_enabled` is set.
    #[must_use]
    pub fn has_directory_credentials(&self) -> bool {
        self.entra_tenant_id.is_some() && self.client_id.is_some() && self.client_secret.is_some()
    }

    /// Finds a tenant by its ID.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, DbError> {
        sqlx::query_as::<_, Self>(&format!(
            "SELECT {TENANT_COLUMNS} FROM tenants WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(DbError::QueryFailed)
    }

    /// Finds a tenant by its Entra directory tenant ID.
    pub async fn find_by_entra_tenant_id(
        pool: &PgPool,
        entra_tenant_id: &str,
    ) -> Result<Option<Self>, DbError> {
        sqlx::query_as::<_, Self>(&format!(
            "SELECT {TENANT_COLUMNS} FROM tenants WHERE entra_tenant_id = $1"
        ))
        .bind(entra_tenant_id)
        .fetch_optional(pool)
        .await
        .map_err(DbError::QueryFailed)
    }

    /// Lists all tenants with directory sync enabled.
    pub async fn list_sync_enabled(pool: &PgPool) -> Result<Vec<Self>, DbError> {
        sqlx::query_as::<_, Self>(&format!(
            "SELECT {TENANT_COLUMNS} FROM tenants WHERE sync_enabled = TRUE ORDER BY created_at ASC"
        ))
        .fetch_all(pool)
        .await
        .map_err(DbError::QueryFailed)
    }

    /// Finds tenants whose client secret expires before `until` but has not
    /// expired yet.
    pub async fn find_secret_expiring(
        pool: &PgPool,
        until: DateTime<Utc>,
    ) -> Result<Vec<Self>, DbError> {
        sqlx::query_as::<_, Self>(&format!(
            "SELECT {TENANT_COLUMNS} FROM tenants \
             WHERE client_secret_expires_at IS NOT NULL \
               AND client_secret_expires_at > NOW() \
               AND client_secret_expires_at <= $1 \
             ORDER BY client_secret_expires_at ASC"
        ))
        .bind(until)
        .fetch_all(pool)
        .await
        .map_err(DbError::QueryFailed)
    }
}
