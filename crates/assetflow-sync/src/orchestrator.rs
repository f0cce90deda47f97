//! Per-tenant directory sync orchestration.

use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use assetflow_connector_graph::Directory;
use assetflow_core::TenantId;
use assetflow_db::models::{DirectoryUser, Tenant};

use crate::error::{SkipReason, SyncError, SyncOutcome};
use crate::photo::{PhotoFetchJob, PhotoMissPolicy, PhotoQueue};
use crate::store::{directory_credentials, DirectoryStore};

/// Summary of one pass over all sync-enabled tenants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    /// Tenants attempted.
    pub tenants: usize,
    /// Total user records processed across tenants.
    pub synced_users: usize,
    /// Tenants whose sync run failed.
    pub failed: usize,
}

/// Reconciles tenants' local user records against their external directory.
///
/// The orchestrator is the only writer of directory-sourced user rows.
/// Syncs are not transactional: a failure mid-run leaves already-upserted
/// rows in place and the remainder stale until the next scheduled run.
pub struct SyncOrchestrator {
    store: Arc<dyn DirectoryStore>,
    directory: Arc<dyn Directory>,
    photo_queue: Option<PhotoQueue>,
    photo_miss_policy: PhotoMissPolicy,
}

impl SyncOrchestrator {
    /// Creates an orchestrator without photo dispatch.
    pub fn new(store: Arc<dyn DirectoryStore>, directory: Arc<dyn Directory>) -> Self {
        Self {
            store,
            directory,
            photo_queue: None,
            photo_miss_policy: PhotoMissPolicy::default(),
        }
    }

    /// Enables fire-and-forget photo fetch dispatch after each upsert.
    #[must_use]
    pub fn with_photo_queue(mut self, queue: PhotoQueue, policy: PhotoMissPolicy) -> Self {
        self.photo_queue = Some(queue);
        self.photo_miss_policy = policy;
        self
    }

    /// Synchronizes one tenant's users from its external directory.
    ///
    /// Precondition failures are expected steady states and produce
    /// [`SyncOutcome::Skipped`], never an error. A failure of the directory
    /// API or the store aborts the run with the typed error; rows upserted
    /// before the failure remain.
    #[instrument(skip(self))]
    pub async fn sync_tenant(&self, tenant_id: TenantId) -> Result<SyncOutcome, SyncError> {
        let Some(tenant) = self.store.find_tenant(tenant_id.into_uuid()).await? else {
            warn!(%tenant_id, "Tenant not found, skipping directory sync");
            return Ok(SyncOutcome::Skipped(SkipReason::TenantNotFound));
        };

        if !tenant.sync_enabled {
            info!(tenant = %tenant.name, "Directory sync disabled, skipping");
            return Ok(SyncOutcome::Skipped(SkipReason::SyncDisabled));
        }

        let Some(credentials) = directory_credentials(&tenant) else {
            info!(tenant = %tenant.name, "Directory credentials incomplete, skipping");
            return Ok(SyncOutcome::Skipped(SkipReason::CredentialsMissing));
        };

        let records = self.directory.list_users(&credentials).await?;

        let mut synced = 0usize;
        for record in &records {
            let user = self.store.upsert_directory_user(tenant.id, record).await?;
            synced += 1;
            self.maybe_enqueue_photo(&tenant, &user);
        }

        info!(tenant = %tenant.name, synced, "Directory sync completed");
        Ok(SyncOutcome::Completed { synced })
    }

    /// Synchronizes every sync-enabled tenant, isolating failures per tenant.
    pub async fn sync_all_tenants(&self) -> Result<SyncSummary, SyncError> {
        let tenants = self.store.list_sync_enabled().await?;
        let mut summary = SyncSummary::default();

        for tenant in tenants {
            summary.tenants += 1;
            match self.sync_tenant(TenantId::from_uuid(tenant.id)).await {
                Ok(SyncOutcome::Completed { synced }) => summary.synced_users += synced,
                Ok(SyncOutcome::Skipped(_)) => {}
                Err(e) => {
                    error!(tenant = %tenant.name, error = %e, "Directory sync failed");
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }

    /// Dispatches a photo fetch for users without a stored photo.
    ///
    /// Under [`PhotoMissPolicy::Remember`], users whose last lookup found no
    /// photo are not re-dispatched; under [`PhotoMissPolicy::RetryAlways`]
    /// they are retried every cycle.
    fn maybe_enqueue_photo(&self, tenant: &Tenant, user: &DirectoryUser) {
        let Some(queue) = &self.photo_queue else {
            return;
        };
        let Some(directory_tenant_id) = tenant.entra_tenant_id.as_deref() else {
            return;
        };
        if user.photo_synced_at.is_some() {
            return;
        }
        if self.photo_miss_policy == PhotoMissPolicy::Remember && user.photo_checked_at.is_some() {
            return;
        }

        queue.enqueue(PhotoFetchJob {
            directory_tenant_id: directory_tenant_id.to_string(),
            user_external_id: user.external_id.clone(),
        });
    }
}
