//! Job lease model.
//!
//! A durable lease keyed by job name. Scheduled jobs acquire the lease
//! before running so that overlapping invocations are detected even across
//! separate worker processes. An expired lease may be taken over, which
//! bounds the damage of a crashed holder.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::time::Duration;
use uuid::Uuid;

use crate::DbError;

/// A lease row for one named job.
#[derive(Debug, Clone, FromRow)]
pub struct JobLease {
    /// Name of the scheduled job (e.g. "directory-sync").
    pub job_name: String,

    /// Identity of the process run holding the lease.
    pub holder: Uuid,

    /// When the lease was acquired.
    pub acquired_at: DateTime<Utc>,

    /// When the lease lapses if not released.
    pub expires_at: DateTime<Utc>,
}

impl JobLease {
    /// Returns `true` if the lease has lapsed at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Attempts to acquire the lease for `job_name`.
    ///
    /// A single conditional upsert: the insert wins when no lease row
    /// exists, the update wins only when the existing lease has lapsed.
    /// Returns `true` when the lease was acquired.
    pub async fn acquire(
        pool: &PgPool,
        job_name: &str,
        holder: Uuid,
        ttl: Duration,
    ) -> Result<bool, DbError> {
        let now = Utc::now();
        let expires_at = now + ttl;

        let row = sqlx::query_as::<_, Self>(
            "INSERT INTO job_leases (job_name, holder, acquired_at, expires_at) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (job_name) DO UPDATE SET \
                 holder = EXCLUDED.holder, \
                 acquired_at = EXCLUDED.acquired_at, \
                 expires_at = EXCLUDED.expires_at \
             WHERE job_leases.expires_at <= EXCLUDED.acquired_at \
             RETURNING job_name, holder, acquired_at, expires_at",
        )
        .bind(job_name)
        .bind(holder)
        .bind(now)
        .bind(expires_at)
        .fetch_optional(pool)
        .await
        .map_err(DbError::QueryFailed)?;

        Ok(row.is_some())
    }

    /// Releases the lease if still held by `holder`.
    pub async fn release(pool: &PgPool, job_name: &str, holder: Uuid) -> Result<(), DbError> {
        sqlx::query("DELETE FROM job_leases WHERE job_name = $1 AND holder = $2")
            .bind(job_name)
            .bind(holder)
            .execute(pool)
            .await
            .map_err(DbError::QueryFailed)?;
        Ok(())
    }
}
