//! Interval scheduling with a durable overlap guard.
//!
//! Each job kind ticks on its own interval. A due tick first acquires the
//! job's lease; if the previous invocation of that job is still running
//! anywhere in the fleet, the tick is skipped entirely (not queued, not
//! delayed). The lease TTL bounds how long a crashed holder can block the
//! job.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::error::SyncError;
use crate::notifications::Notifications;
use crate::orchestrator::SyncOrchestrator;
use crate::store::LeaseStore;

/// The scheduled job types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    /// Directory sync across all tenants.
    DirectorySync,
    /// Warranty expiry notifications.
    WarrantyExpiry,
    /// Inactive user notifications.
    InactiveUsers,
    /// Client secret expiry notifications.
    SecretExpiry,
}

impl JobKind {
    /// The lease key for this job.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            JobKind::DirectorySync => "directory-sync",
            JobKind::WarrantyExpiry => "warranty-expiry",
            JobKind::InactiveUsers => "inactive-users",
            JobKind::SecretExpiry => "secret-expiry",
        }
    }

    /// How long an unreleased lease blocks the job before it may be taken
    /// over. Generous compared to expected run times.
    #[must_use]
    pub fn lease_ttl(&self) -> Duration {
        match self {
            JobKind::DirectorySync => Duration::from_secs(10 * 60),
            JobKind::WarrantyExpiry | JobKind::InactiveUsers | JobKind::SecretExpiry => {
                Duration::from_secs(2 * 60 * 60)
            }
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Tick intervals per job.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// Directory sync interval.
    pub sync_interval: Duration,
    /// Warranty expiry check interval.
    pub warranty_interval: Duration,
    /// Inactive user check interval.
    pub inactive_interval: Duration,
    /// Client secret expiry check interval.
    pub secret_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            sync_interval: Duration::from_secs(60),
            warranty_interval: Duration::from_secs(24 * 60 * 60),
            inactive_interval: Duration::from_secs(60 * 60),
            secret_interval: Duration::from_secs(90 * 24 * 60 * 60),
        }
    }
}

/// Whether a guarded invocation ran or was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardedRun<T> {
    /// The lease was held elsewhere; the invocation did nothing.
    Skipped,
    /// The invocation ran to completion with this result.
    Ran(T),
}

/// Runs `task` under the job's lease.
///
/// Returns [`GuardedRun::Skipped`] without invoking `task` when the lease is
/// held. The lease is released when the task finishes, successfully or not;
/// a release failure is logged and otherwise ignored (the TTL recovers it).
pub async fn run_guarded<F, Fut, T>(
    leases: &dyn LeaseStore,
    job: JobKind,
    holder: Uuid,
    task: F,
) -> Result<GuardedRun<T>, SyncError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, SyncError>>,
{
    if !leases.acquire(job.name(), holder, job.lease_ttl()).await? {
        return Ok(GuardedRun::Skipped);
    }

    let result = task().await;

    if let Err(e) = leases.release(job.name(), holder).await {
        warn!(job = job.name(), error = %e, "Failed to release job lease");
    }

    result.map(GuardedRun::Ran)
}

/// Drives the four scheduled jobs.
///
/// Each tick dispatches onto its own task so that a slow job of one kind
/// never delays the ticks of another; same-kind overlap is prevented solely
/// by the durable lease.
pub struct Scheduler {
    config: SchedulerConfig,
    orchestrator: Arc<SyncOrchestrator>,
    notifications: Arc<Notifications>,
    leases: Arc<dyn LeaseStore>,
    shutdown: Arc<AtomicBool>,
}

impl Scheduler {
    /// Creates a scheduler over the given components.
    pub fn new(
        config: SchedulerConfig,
        orchestrator: Arc<SyncOrchestrator>,
        notifications: Arc<Notifications>,
        leases: Arc<dyn LeaseStore>,
    ) -> Self {
        Self {
            config,
            orchestrator,
            notifications,
            leases,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Requests a graceful stop; in-flight job runs complete on their own.
    pub fn shutdown(&self) {
        info!("Scheduler shutdown requested");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Check if shutdown was requested.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Runs the tick loop until shutdown is requested.
    #[instrument(skip(self))]
    pub async fn run(&self) {
        info!(
            sync_interval_secs = self.config.sync_interval.as_secs(),
            "Scheduler started"
        );

        let mut sync_ticks = interval(self.config.sync_interval);
        let mut warranty_ticks = interval(self.config.warranty_interval);
        let mut inactive_ticks = interval(self.config.inactive_interval);
        let mut secret_ticks = interval(self.config.secret_interval);
        for ticks in [
            &mut sync_ticks,
            &mut warranty_ticks,
            &mut inactive_ticks,
            &mut secret_ticks,
        ] {
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
        }

        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                break;
            }

            tokio::select! {
                _ = sync_ticks.tick() => self.dispatch(JobKind::DirectorySync),
                _ = warranty_ticks.tick() => self.dispatch(JobKind::WarrantyExpiry),
                _ = inactive_ticks.tick() => self.dispatch(JobKind::InactiveUsers),
                _ = secret_ticks.tick() => self.dispatch(JobKind::SecretExpiry),
            }
        }

        info!("Scheduler stopped");
    }

    /// Spawns one guarded job run. Failures are logged here and go no
    /// further; the next tick is the retry.
    fn dispatch(&self, job: JobKind) {
        let orchestrator = self.orchestrator.clone();
        let notifications = self.notifications.clone();
        let leases = self.leases.clone();
        let holder = Uuid::new_v4();

        tokio::spawn(async move {
            let outcome = run_guarded(leases.as_ref(), job, holder, || async {
                match job {
                    JobKind::DirectorySync => orchestrator
                        .sync_all_tenants()
                        .await
                        .map(|summary| summary.synced_users),
                    JobKind::WarrantyExpiry => notifications.run_warranty_expiry().await,
                    JobKind::InactiveUsers => notifications.run_inactive_users().await,
                    JobKind::SecretExpiry => notifications.run_secret_expiry().await,
                }
            })
            .await;

            match outcome {
                Ok(GuardedRun::Skipped) => {
                    debug!(job = job.name(), "Previous run still active, skipping");
                }
                Ok(GuardedRun::Ran(count)) => {
                    info!(job = job.name(), count, "Scheduled job completed");
                }
                Err(e) => {
                    error!(job = job.name(), error = %e, "Scheduled job failed");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MemoryLeaseStore;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_job_names() {
        assert_eq!(JobKind::DirectorySync.name(), "directory-sync");
        assert_eq!(JobKind::WarrantyExpiry.name(), "warranty-expiry");
        assert_eq!(JobKind::InactiveUsers.name(), "inactive-users");
        assert_eq!(JobKind::SecretExpiry.name(), "secret-expiry");
    }

    #[test]
    fn test_default_intervals() {
        let config = SchedulerConfig::default();
        assert_eq!(config.sync_interval, Duration::from_secs(60));
        assert_eq!(config.inactive_interval, Duration::from_secs(3600));
        assert_eq!(config.warranty_interval, Duration::from_secs(86_400));
        assert_eq!(config.secret_interval, Duration::from_secs(7_776_000));
    }

    #[tokio::test]
    async fn test_guarded_run_executes_and_releases() {
        let leases = MemoryLeaseStore::default();

        let outcome = run_guarded(&leases, JobKind::DirectorySync, Uuid::new_v4(), || async {
            Ok::<_, SyncError>(42usize)
        })
        .await
        .unwrap();

        assert_eq!(outcome, GuardedRun::Ran(42));
        assert!(!leases.is_held("directory-sync"));
    }

    #[tokio::test]
    async fn test_guarded_run_skips_when_lease_held() {
        let leases = MemoryLeaseStore::default();
        leases.hold("directory-sync", Duration::from_secs(600));

        let invoked = AtomicUsize::new(0);
        let outcome = run_guarded(&leases, JobKind::DirectorySync, Uuid::new_v4(), || async {
            invoked.fetch_add(1, Ordering::SeqCst);
            Ok::<_, SyncError>(0usize)
        })
        .await
        .unwrap();

        assert_eq!(outcome, GuardedRun::Skipped);
        assert_eq!(invoked.load(Ordering::SeqCst), 0);
        assert!(leases.is_held("directory-sync"));
    }

    #[tokio::test]
    async fn test_guarded_run_releases_after_failure() {
        let leases = MemoryLeaseStore::default();

        let result = run_guarded(&leases, JobKind::DirectorySync, Uuid::new_v4(), || async {
            Err::<usize, _>(SyncError::Store(assetflow_db::DbError::NotFound(
                "boom".to_string(),
            )))
        })
        .await;

        assert!(result.is_err());
        assert!(!leases.is_held("directory-sync"));
    }

    #[tokio::test]
    async fn test_concurrent_same_job_is_skipped_not_parallel() {
        let leases = Arc::new(MemoryLeaseStore::default());
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

        let first = {
            let leases = leases.clone();
            tokio::spawn(async move {
                run_guarded(leases.as_ref(), JobKind::DirectorySync, Uuid::new_v4(), || async {
                    release_rx.await.ok();
                    Ok::<_, SyncError>(1usize)
                })
                .await
                .unwrap()
            })
        };

        // Let the first run acquire the lease.
        tokio::task::yield_now().await;
        while !leases.is_held("directory-sync") {
            tokio::task::yield_now().await;
        }

        let second = run_guarded(
            leases.as_ref(),
            JobKind::DirectorySync,
            Uuid::new_v4(),
            || async { Ok::<_, SyncError>(2usize) },
        )
        .await
        .unwrap();
        assert_eq!(second, GuardedRun::Skipped);

        release_tx.send(()).unwrap();
        assert_eq!(first.await.unwrap(), GuardedRun::Ran(1));
        assert!(!leases.is_held("directory-sync"));
    }
}
