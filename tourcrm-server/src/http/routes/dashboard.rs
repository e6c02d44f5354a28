//! Home screen endpoint

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::http::error::ApiError;
use crate::http::server::AppState;
use crate::services::dashboard::{self, Dashboard};

#[derive(Debug, Default, Deserialize)]
pub struct DashboardParams {
    /// Count unread notifications for this user only
    pub user_id: Option<Uuid>,
}

async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DashboardParams>,
) -> Result<Json<Dashboard>, ApiError> {
    Ok(Json(dashboard::dashboard(&state.pool, params.user_id).await?))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/dashboard", get(get_dashboard))
}
