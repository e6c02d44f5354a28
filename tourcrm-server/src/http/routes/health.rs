//! Liveness endpoint for load balancers and `tourcrm serve` checks

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::http::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when Postgres does not answer
    pub status: &'static str,
    pub version: &'static str,
    pub database: bool,
    pub bitrix_enabled: bool,
}

impl HealthResponse {
    fn new(database: bool, bitrix_enabled: bool) -> Self {
        Self {
            status: if database { "ok" } else { "degraded" },
            version: env!("CARGO_PKG_VERSION"),
            database,
            bitrix_enabled,
        }
    }
}

/// GET /health - always 200 so the process stays in rotation while the
/// database restarts
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let database = sqlx::query("SELECT 1").execute(&state.pool).await.is_ok();
    if !database {
        tracing::warn!("Health check: database unreachable");
    }
    Json(HealthResponse::new(database, state.bitrix.is_some()))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health))
}
