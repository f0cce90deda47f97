//! Error and outcome types for sync tasks.
//!
//! A precondition short-circuit is a steady state, not a fault, so it is a
//! [`SyncOutcome::Skipped`] value rather than an error. Genuine failures are
//! typed in [`SyncError`] and returned to the caller; only the scheduler and
//! worker loops log-and-continue.

use assetflow_connector_graph::GraphError;
use assetflow_db::DbError;
use thiserror::Error;

/// A failure that aborted a task run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The external directory API failed (auth, network, or API error).
    #[error("Directory API failure: {0}")]
    Directory(#[from] GraphError),

    /// The persistence layer failed.
    #[error("Storage failure: {0}")]
    Store(#[from] DbError),

    /// The photo blob store failed.
    #[error("Photo storage failure: {0}")]
    Photo(#[from] std::io::Error),
}

/// Why a task run was skipped without doing any work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No tenant exists for the given identifier.
    TenantNotFound,
    /// The tenant has directory sync disabled.
    SyncDisabled,
    /// One or more directory credential fields are missing.
    CredentialsMissing,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::TenantNotFound => write!(f, "tenant not found"),
            SkipReason::SyncDisabled => write!(f, "sync disabled"),
            SkipReason::CredentialsMissing => write!(f, "credentials missing"),
        }
    }
}

/// Result of one sync orchestrator invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// A precondition failed; nothing was read or written.
    Skipped(SkipReason),
    /// The sync ran; `synced` counts the records processed.
    Completed { synced: usize },
}
