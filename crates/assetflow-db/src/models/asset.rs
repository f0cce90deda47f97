//! Asset model.
//!
//! Only the warranty-expiry query surface is needed by the job core; asset
//! CRUD is handled outside this service.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::DbError;

/// An IT asset tracked for a tenant.
#[derive(Debug, Clone, FromRow)]
pub struct Asset {
    /// Unique identifier for the asset.
    pub id: Uuid,

    /// The tenant this asset belongs to.
    pub tenant_id: Uuid,

    /// Display name of the asset.
    pub name: String,

    /// Manufacturer serial number.
    pub serial_number: Option<String>,

    /// When the warranty expires, if tracked.
    pub warranty_expires_at: Option<DateTime<Utc>>,

    /// Directory user the asset is assigned to, if any.
    pub assigned_user_id: Option<Uuid>,

    /// When the asset was created.
    pub created_at: DateTime<Utc>,
}

impl Asset {
    /// Finds assets whose warranty expires after now but before `until`.
    pub async fn find_warranty_expiring(
        pool: &PgPool,
        until: DateTime<Utc>,
    ) -> Result<Vec<Self>, DbError> {
        sqlx::query_as::<_, Self>(
            "SELECT id, tenant_id, name, serial_number, warranty_expires_at, \
                    assigned_user_id, created_at \
             FROM assets \
             WHERE warranty_expires_at IS NOT NULL \
               AND warranty_expires_at > NOW() \
               AND warranty_expires_at <= $1 \
             ORDER BY warranty_expires_at ASC",
        )
        .bind(until)
        .fetch_all(pool)
        .await
        .map_err(DbError::QueryFailed)
    }
}
