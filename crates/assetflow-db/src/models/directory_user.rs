//! Directory user model.
//!
//! Local representation of a tenant's Entra ID user, keyed by
//! `(tenant_id, external_id)`. Rows are created and updated exclusively by
//! the sync orchestrator; upserts overwrite fields wholesale
//! (last-write-wins, no merge semantics).

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::DbError;

/// A directory-sourced user belonging to a tenant.
#[derive(Debug, Clone, FromRow)]
pub struct DirectoryUser {
    /// Unique identifier for the local row.
    pub id: Uuid,

    /// The tenant this user belongs to.
    pub tenant_id: Uuid,

    /// Entra ID object ID of the user.
    pub external_id: String,

    /// User principal name (usually email format).
    pub user_principal_name: String,

    /// Display name.
    pub display_name: String,

    /// Primary email address.
    pub email: Option<String>,

    /// Given (first) name.
    pub given_name: Option<String>,

    /// Surname (last name).
    pub surname: Option<String>,

    /// Job title.
    pub job_title: Option<String>,

    /// Department.
    pub department: Option<String>,

    /// Whether the account is enabled upstream.
    pub account_enabled: bool,

    /// Last sign-in timestamp reported by the directory.
    pub last_sign_in_at: Option<DateTime<Utc>>,

    /// When a profile photo was last stored for this user.
    pub photo_synced_at: Option<DateTime<Utc>>,

    /// When a photo lookup last completed (with or without a photo).
    pub photo_checked_at: Option<DateTime<Utc>>,

    /// When the row was created.
    pub created_at: DateTime<Utc>,

    /// When the row was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Borrowed field set for a directory user upsert.
#[derive(Debug, Clone)]
pub struct DirectoryUserUpsert<'a> {
    pub external_id: &'a str,
    pub user_principal_name: &'a str,
    pub display_name: &'a str,
    pub email: Option<&'a str>,
    pub given_name: Option<&'a str>,
    pub surname: Option<&'a str>,
    pub job_title: Option<&'a str>,
    pub department: Option<&'a str>,
    pub account_enabled: bool,
    pub last_sign_in_at: Option<DateTime<Utc>>,
}

const USER_COLUMNS: &str = "id, tenant_id, external_id, user_principal_name, display_name, email, \
     given_name, surname, job_title, department, account_enabled, last_sign_in_at, \
     photo_synced_at, photo_checked_at, created_at, updated_at";

impl DirectoryUser {
    /// Inserts or overwrites the user keyed by `(tenant_id, external_id)`.
    ///
    /// Photo bookkeeping columns are left untouched on update.
    pub async fn upsert(
        pool: &PgPool,
        tenant_id: Uuid,
        fields: &DirectoryUserUpsert<'_>,
    ) -> Result<Self, DbError> {
        sqlx::query_as::<_, Self>(&format!(
            "INSERT INTO directory_users \
                 (tenant_id, external_id, user_principal_name, display_name, email, \
                  given_name, surname, job_title, department, account_enabled, last_sign_in_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             ON CONFLICT (tenant_id, external_id) DO UPDATE SET \
                 user_principal_name = EXCLUDED.user_principal_name, \
                 display_name = EXCLUDED.display_name, \
                 email = EXCLUDED.email, \
                 given_name = EXCLUDED.given_name, \
                 surname = EXCLUDED.surname, \
                 job_title = EXCLUDED.job_title, \
                 department = EXCLUDED.department, \
                 account_enabled = EXCLUDED.account_enabled, \
                 last_sign_in_at = EXCLUDED.last_sign_in_at, \
                 updated_at = NOW() \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(tenant_id)
        .bind(fields.external_id)
        .bind(fields.user_principal_name)
        .bind(fields.display_name)
        .bind(fields.email)
        .bind(fields.given_name)
        .bind(fields.surname)
        .bind(fields.job_title)
        .bind(fields.department)
        .bind(fields.account_enabled)
        .bind(fields.last_sign_in_at)
        .fetch_one(pool)
        .await
        .map_err(DbError::QueryFailed)
    }

    /// Records that a profile photo was stored for this user.
    pub async fn mark_photo_synced(
        pool: &PgPool,
        tenant_id: Uuid,
        external_id: &str,
    ) -> Result<(), DbError> {
        sqlx::query(
            "UPDATE directory_users \
             SET photo_synced_at = NOW(), photo_checked_at = NOW() \
             WHERE tenant_id = $1 AND external_id = $2",
        )
        .bind(tenant_id)
        .bind(external_id)
        .execute(pool)
        .await
        .map_err(DbError::QueryFailed)?;
        Ok(())
    }

    /// Records that a photo lookup completed without finding a photo.
    pub async fn mark_photo_checked(
        pool: &PgPool,
        tenant_id: Uuid,
        external_id: &str,
    ) -> Result<(), DbError> {
        sqlx::query(
            "UPDATE directory_users \
             SET photo_checked_at = NOW() \
             WHERE tenant_id = $1 AND external_id = $2",
        )
        .bind(tenant_id)
        .bind(external_id)
        .execute(pool)
        .await
        .map_err(DbError::QueryFailed)?;
        Ok(())
    }

    /// Finds enabled users whose last sign-in is older than `cutoff`.
    ///
    /// Users that have never signed in are not reported; only a stale
    /// sign-in timestamp marks an account as inactive.
    pub async fn find_inactive_since(
        pool: &PgPool,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Self>, DbError> {
        sqlx::query_as::<_, Self>(&format!(
            "SELECT {USER_COLUMNS} FROM directory_users \
             WHERE account_enabled = TRUE \
               AND last_sign_in_at IS NOT NULL \
               AND last_sign_in_at < $1 \
             ORDER BY last_sign_in_at ASC"
        ))
        .bind(cutoff)
        .fetch_all(pool)
        .await
        .map_err(DbError::QueryFailed)
    }
}
