//! Directory sync orchestration for AssetFlow.
//!
//! The core of the background service: the per-tenant sync orchestrator, the
//! interval scheduler with its durable overlap guard, the decoupled photo
//! fetch worker, and the scheduled notification jobs.
//!
//! Tenants are independent throughout: one tenant's failure or slowness never
//! prevents another tenant from being synced in the same tick, and no task
//! retries on its own. Resilience comes from the fixed re-scheduling
//! interval.

pub mod error;
pub mod notifications;
pub mod orchestrator;
pub mod photo;
pub mod photo_store;
pub mod scheduler;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{SkipReason, SyncError, SyncOutcome};
pub use notifications::{LogNotifier, Notification, Notifications, Notifier, NotifyError};
pub use orchestrator::{SyncOrchestrator, SyncSummary};
pub use photo::{PhotoFetchJob, PhotoMissPolicy, PhotoOutcome, PhotoQueue, PhotoWorker};
pub use photo_store::{photo_path, FsPhotoStore, PhotoStore};
pub use scheduler::{run_guarded, GuardedRun, JobKind, Scheduler, SchedulerConfig};
pub use store::{
    directory_credentials, DirectoryStore, LeaseStore, PgDirectoryStore, PgLeaseStore,
};
