//! Database connection pool setup.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

use crate::DbError;

/// Create a connection pool against the given database URL.
///
/// # Errors
///
/// Returns [`DbError::ConnectionFailed`] if the pool cannot be established.
pub async fn connect(database_url: &str) -> Result<PgPool, DbError> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
        .map_err(DbError::ConnectionFailed)
}
