//! Persistence seams for the sync core.
//!
//! The orchestrator, photo worker, and scheduler depend on these traits
//! rather than on a connection pool, so their behavior can be exercised with
//! in-memory fakes. The Postgres implementations delegate to the
//! `assetflow-db` models.

use async_trait::async_trait;
use sqlx::PgPool;
use std::time::Duration;
use uuid::Uuid;

use assetflow_connector_graph::{DirectoryUserRecord, TenantCredentials};
use assetflow_db::models::{DirectoryUser, DirectoryUserUpsert, JobLease, Tenant};
use assetflow_db::DbError;

/// Tenant and directory-user persistence used by sync and photo tasks.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// Looks up a tenant by its local ID.
    async fn find_tenant(&self, id: Uuid) -> Result<Option<Tenant>, DbError>;

    /// Looks up a tenant by its Entra directory tenant ID.
    async fn find_tenant_by_directory_id(
        &self,
        directory_tenant_id: &str,
    ) -> Result<Option<Tenant>, DbError>;

    /// Lists all tenants with directory sync enabled.
    async fn list_sync_enabled(&self) -> Result<Vec<Tenant>, DbError>;

    /// Inserts or overwrites a directory user keyed by
    /// `(tenant_id, external_id)`.
    async fn upsert_directory_user(
        &self,
        tenant_id: Uuid,
        record: &DirectoryUserRecord,
    ) -> Result<DirectoryUser, DbError>;

    /// Records that a profile photo was stored for the user.
    async fn mark_photo_synced(&self, tenant_id: Uuid, external_id: &str) -> Result<(), DbError>;

    /// Records that a photo lookup found no photo.
    async fn mark_photo_checked(&self, tenant_id: Uuid, external_id: &str) -> Result<(), DbError>;
}

/// Durable lease operations backing the scheduler's overlap guard.
#[async_trait]
pub trait LeaseStore: Send + Sync {
    /// Attempts to acquire the named lease; `true` when acquired.
    async fn acquire(&self, job_name: &str, holder: Uuid, ttl: Duration) -> Result<bool, DbError>;

    /// Releases the named lease if still held by `holder`.
    async fn release(&self, job_name: &str, holder: Uuid) -> Result<(), DbError>;
}

/// Builds Graph credentials from a tenant row.
///
/// Returns `None` unless all three credential fields are present, mirroring
/// the sync precondition.
#[must_use]
pub fn directory_credentials(tenant: &Tenant) -> Option<TenantCredentials> {
    match (
        tenant.entra_tenant_id.as_deref(),
        tenant.client_id.as_deref(),
        tenant.client_secret.as_deref(),
    ) {
        (Some(directory_tenant_id), Some(client_id), Some(client_secret)) => Some(
            TenantCredentials::new(directory_tenant_id, client_id, client_secret),
        ),
        _ => None,
    }
}

/// [`DirectoryStore`] backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgDirectoryStore {
    pool: PgPool,
}

impl PgDirectoryStore {
    /// Creates a store over the given pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DirectoryStore for PgDirectoryStore {
    async fn find_tenant(&self, id: Uuid) -> Result<Option<Tenant>, DbError> {
        Tenant::find_by_id(&self.pool, id).await
    }

    async fn find_tenant_by_directory_id(
        &self,
        directory_tenant_id: &str,
    ) -> Result<Option<Tenant>, DbError> {
        Tenant::find_by_entra_tenant_id(&self.pool, directory_tenant_id).await
    }

    async fn list_sync_enabled(&self) -> Result<Vec<Tenant>, DbError> {
        Tenant::list_sync_enabled(&self.pool).await
    }

    async fn upsert_directory_user(
        &self,
        tenant_id: Uuid,
        record: &DirectoryUserRecord,
    ) -> Result<DirectoryUser, DbError> {
        let fields = DirectoryUserUpsert {
            external_id: &record.external_id,
            user_principal_name: &record.user_principal_name,
            display_name: &record.display_name,
            email: record.email.as_deref(),
            given_name: record.given_name.as_deref(),
            surname: record.surname.as_deref(),
            job_title: record.job_title.as_deref(),
            department: record.department.as_deref(),
            account_enabled: record.account_enabled,
            last_sign_in_at: record.last_sign_in,
        };
        DirectoryUser::upsert(&self.pool, tenant_id, &fields).await
    }

    async fn mark_photo_synced(&self, tenant_id: Uuid, external_id: &str) -> Result<(), DbError> {
        DirectoryUser::mark_photo_synced(&self.pool, tenant_id, external_id).await
    }

    async fn mark_photo_checked(&self, tenant_id: Uuid, external_id: &str) -> Result<(), DbError> {
        DirectoryUser::mark_photo_checked(&self.pool, tenant_id, external_id).await
    }
}

/// [`LeaseStore`] backed by the `job_leases` table.
#[derive(Debug, Clone)]
pub struct PgLeaseStore {
    pool: PgPool,
}

impl PgLeaseStore {
    /// Creates a lease store over the given pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LeaseStore for PgLeaseStore {
    async fn acquire(&self, job_name: &str, holder: Uuid, ttl: Duration) -> Result<bool, DbError> {
        JobLease::acquire(&self.pool, job_name, holder, ttl).await
    }

    async fn release(&self, job_name: &str, holder: Uuid) -> Result<(), DbError> {
        JobLease::release(&self.pool, job_name, holder).await
    }
}
