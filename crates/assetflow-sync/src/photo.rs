//! Decoupled user photo fetching.
//!
//! Photo fetches are dispatched fire-and-forget onto a bounded queue so that
//! photo latency or failures never block directory sync. Delivery is
//! at-least-once across sync cycles with no ordering guarantee; a dropped
//! job is simply re-dispatched by a later cycle.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use assetflow_connector_graph::Directory;

use crate::error::{SkipReason, SyncError};
use crate::photo_store::{photo_path, PhotoStore};
use crate::store::{directory_credentials, DirectoryStore};

/// One unit of photo fetch work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoFetchJob {
    /// Entra directory tenant the user belongs to.
    pub directory_tenant_id: String,
    /// Entra object ID of the user.
    pub user_external_id: String,
}

/// Policy for users whose photo lookup came back empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PhotoMissPolicy {
    /// Look the photo up again on every sync cycle. Wasteful for users who
    /// never get a photo, but picks up late-added photos immediately.
    #[default]
    RetryAlways,
    /// Skip users whose last lookup found no photo.
    Remember,
}

/// Sending half of the photo fetch queue.
#[derive(Debug, Clone)]
pub struct PhotoQueue {
    tx: mpsc::Sender<PhotoFetchJob>,
}

impl PhotoQueue {
    /// Creates a bounded queue, returning the sender and the receiver to
    /// hand to a [`PhotoWorker`].
    #[must_use]
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<PhotoFetchJob>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Enqueues a job without blocking. A full queue drops the job with a
    /// warning; a later sync cycle re-dispatches it.
    pub fn enqueue(&self, job: PhotoFetchJob) {
        if let Err(e) = self.tx.try_send(job) {
            warn!(error = %e, "Photo fetch queue full, dropping job");
        }
    }
}

/// Result of one photo fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoOutcome {
    /// A photo was fetched and stored.
    Stored { bytes: usize },
    /// The user has no photo; nothing was written.
    NoPhoto,
    /// A precondition failed; the job was a no-op.
    Skipped(SkipReason),
}

/// Consumes photo fetch jobs until the queue closes.
///
/// Every failure is caught and logged here; nothing propagates and nothing
/// is retried.
pub struct PhotoWorker {
    store: Arc<dyn DirectoryStore>,
    directory: Arc<dyn Directory>,
    photos: Arc<dyn PhotoStore>,
}

impl PhotoWorker {
    /// Creates a worker over the given seams.
    pub fn new(
        store: Arc<dyn DirectoryStore>,
        directory: Arc<dyn Directory>,
        photos: Arc<dyn PhotoStore>,
    ) -> Self {
        Self {
            store,
            directory,
            photos,
        }
    }

    /// Runs until all queue senders are dropped.
    pub async fn run(self, mut rx: mpsc::Receiver<PhotoFetchJob>) {
        info!("Photo fetch worker started");
        while let Some(job) = rx.recv().await {
            match self.fetch_user_photo(&job).await {
                Ok(outcome) => debug!(
                    user = %job.user_external_id,
                    ?outcome,
                    "Photo fetch finished"
                ),
                Err(e) => warn!(
                    tenant = %job.directory_tenant_id,
                    user = %job.user_external_id,
                    error = %e,
                    "Photo fetch failed"
                ),
            }
        }
        info!("Photo fetch worker stopped");
    }

    /// Fetches and stores one user's photo.
    ///
    /// Absence of a photo is not cached as a refusal to retry; whether the
    /// user is looked up again is the dispatcher's policy decision.
    #[instrument(skip(self, job), fields(tenant = %job.directory_tenant_id, user = %job.user_external_id))]
    pub async fn fetch_user_photo(&self, job: &PhotoFetchJob) -> Result<PhotoOutcome, SyncError> {
        let Some(tenant) = self
            .store
            .find_tenant_by_directory_id(&job.directory_tenant_id)
            .await?
        else {
            info!("No tenant for directory tenant ID, skipping photo fetch");
            return Ok(PhotoOutcome::Skipped(SkipReason::TenantNotFound));
        };

        let Some(credentials) = directory_credentials(&tenant) else {
            info!(tenant = %tenant.name, "Directory credentials incomplete, skipping photo fetch");
            return Ok(PhotoOutcome::Skipped(SkipReason::CredentialsMissing));
        };

        match self
            .directory
            .fetch_user_photo(&credentials, &job.user_external_id)
            .await?
        {
            Some(bytes) => {
                let path = photo_path(&job.directory_tenant_id, &job.user_external_id);
                self.photos.put(&path, &bytes).await?;
                self.store
                    .mark_photo_synced(tenant.id, &job.user_external_id)
                    .await?;
                info!(bytes = bytes.len(), "Stored user photo");
                Ok(PhotoOutcome::Stored { bytes: bytes.len() })
            }
            None => {
                debug!("User has no photo");
                self.store
                    .mark_photo_checked(tenant.id, &job.user_external_id)
                    .await?;
                Ok(PhotoOutcome::NoPhoto)
            }
        }
    }
}
