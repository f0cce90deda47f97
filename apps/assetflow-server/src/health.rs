//! Health probe endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use sqlx::PgPool;

/// Builds the health router.
pub fn router(pool: PgPool) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/readyz", get(readyz_handler))
        .with_state(pool)
}

/// Liveness: the process is up.
async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Readiness: the database answers.
async fn readyz_handler(State(pool): State<PgPool>) -> (StatusCode, Json<Value>) {
    match sqlx::query("SELECT 1").execute(&pool).await {
        Ok(_) => (StatusCode::OK, Json(json!({ "status": "ready" }))),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable" })),
            )
        }
    }
}
