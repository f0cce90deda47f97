//! Scheduled notification jobs.
//!
//! Simple query+notify jobs: each queries the database for rows in its
//! window and hands one notification per row to the [`Notifier`]. A
//! delivery failure is logged and does not abort the batch.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use assetflow_db::models::{Asset, DirectoryUser, Tenant};

use crate::error::SyncError;

/// A notification produced by one of the scheduled checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// An asset's warranty expires soon.
    WarrantyExpiring {
        tenant_id: Uuid,
        asset_name: String,
        serial_number: Option<String>,
        expires_at: DateTime<Utc>,
    },
    /// A directory user has not signed in for a long time.
    UserInactive {
        tenant_id: Uuid,
        user_principal_name: String,
        last_sign_in_at: DateTime<Utc>,
    },
    /// A tenant's directory client secret expires soon.
    ClientSecretExpiring {
        tenant_id: Uuid,
        tenant_name: String,
        expires_at: DateTime<Utc>,
    },
}

/// Delivery failure for a single notification.
#[derive(Debug, Error)]
#[error("Notification delivery failed: {0}")]
pub struct NotifyError(pub String);

/// Delivery channel for notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers one notification.
    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// [`Notifier`] that emits structured log lines.
///
/// The default channel; mail or chat delivery plugs in behind the same
/// trait.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
        match notification {
            Notification::WarrantyExpiring {
                tenant_id,
                asset_name,
                serial_number,
                expires_at,
            } => info!(
                %tenant_id,
                asset = %asset_name,
                serial = serial_number.as_deref().unwrap_or("-"),
                %expires_at,
                "Asset warranty expiring"
            ),
            Notification::UserInactive {
                tenant_id,
                user_principal_name,
                last_sign_in_at,
            } => info!(
                %tenant_id,
                user = %user_principal_name,
                %last_sign_in_at,
                "Directory user inactive"
            ),
            Notification::ClientSecretExpiring {
                tenant_id,
                tenant_name,
                expires_at,
            } => info!(
                %tenant_id,
                tenant = %tenant_name,
                %expires_at,
                "Directory client secret expiring"
            ),
        }
        Ok(())
    }
}

/// Delivers a batch, counting successes; failures are logged and skipped.
async fn deliver_all(notifier: &dyn Notifier, notifications: Vec<Notification>) -> usize {
    let mut delivered = 0;
    for notification in &notifications {
        match notifier.deliver(notification).await {
            Ok(()) => delivered += 1,
            Err(e) => warn!(error = %e, "Failed to deliver notification"),
        }
    }
    delivered
}

/// The three scheduled notification checks.
pub struct Notifications {
    pool: PgPool,
    notifier: Arc<dyn Notifier>,
    warranty_window: Duration,
    inactive_after: Duration,
    secret_window: Duration,
}

impl Notifications {
    /// Creates the checks with their default windows: warranty and secret
    /// expiry warn 30 days ahead, users count as inactive after 90 days
    /// without a sign-in.
    pub fn new(pool: PgPool, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            pool,
            notifier,
            warranty_window: Duration::days(30),
            inactive_after: Duration::days(90),
            secret_window: Duration::days(30),
        }
    }

    /// Notifies about assets whose warranty expires within the window.
    #[instrument(skip(self))]
    pub async fn run_warranty_expiry(&self) -> Result<usize, SyncError> {
        let until = Utc::now() + self.warranty_window;
        let assets = Asset::find_warranty_expiring(&self.pool, until).await?;

        let mut notifications = Vec::with_capacity(assets.len());
        for asset in assets {
            let Some(expires_at) = asset.warranty_expires_at else {
                continue;
            };
            notifications.push(Notification::WarrantyExpiring {
                tenant_id: asset.tenant_id,
                asset_name: asset.name,
                serial_number: asset.serial_number,
                expires_at,
            });
        }

        Ok(deliver_all(self.notifier.as_ref(), notifications).await)
    }

    /// Notifies about enabled users without a sign-in inside the window.
    #[instrument(skip(self))]
    pub async fn run_inactive_users(&self) -> Result<usize, SyncError> {
        let cutoff = Utc::now() - self.inactive_after;
        let users = DirectoryUser::find_inactive_since(&self.pool, cutoff).await?;

        let mut notifications = Vec::with_capacity(users.len());
        for user in users {
            let Some(last_sign_in_at) = user.last_sign_in_at else {
                continue;
            };
            notifications.push(Notification::UserInactive {
                tenant_id: user.tenant_id,
                user_principal_name: user.user_principal_name,
                last_sign_in_at,
            });
        }

        Ok(deliver_all(self.notifier.as_ref(), notifications).await)
    }

    /// Notifies about tenants whose client secret expires within the window.
    #[instrument(skip(self))]
    pub async fn run_secret_expiry(&self) -> Result<usize, SyncError> {
        let until = Utc::now() + self.secret_window;
        let tenants = Tenant::find_secret_expiring(&self.pool, until).await?;

        let mut notifications = Vec::with_capacity(tenants.len());
        for tenant in tenants {
            let Some(expires_at) = tenant.client_secret_expires_at else {
                continue;
            };
            notifications.push(Notification::ClientSecretExpiring {
                tenant_id: tenant.id,
                tenant_name: tenant.name,
                expires_at,
            });
        }

        Ok(deliver_all(self.notifier.as_ref(), notifications).await)
    }
}
