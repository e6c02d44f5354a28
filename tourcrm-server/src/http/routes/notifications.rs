//! In-app notification endpoints

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{Notification, NotificationFilter, NotificationRepo};
use crate::http::error::ApiError;
use crate::http::extractors::ValidUuid;
use crate::http::server::AppState;
use crate::models::{Paginated, Pagination, PaginationParams};

#[derive(Debug, Default, Deserialize)]
pub struct ReadAllParams {
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct ReadAllResponse {
    pub updated: u64,
}

/// GET /api/notifications - a user sees their own rows plus broadcasts
async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<NotificationFilter>,
    Query(page): Query<PaginationParams>,
) -> Result<Json<Paginated<Notification>>, ApiError> {
    let notifications = NotificationRepo::new(&state.pool)
        .list(&filter, Pagination::from(page))
        .await?;
    Ok(Json(notifications))
}

async fn mark_read(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
) -> Result<Json<Notification>, ApiError> {
    Ok(Json(NotificationRepo::new(&state.pool).mark_read(id).await?))
}

/// POST /api/notifications/read-all
async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReadAllParams>,
) -> Result<Json<ReadAllResponse>, ApiError> {
    let updated = NotificationRepo::new(&state.pool)
        .mark_all_read(params.user_id)
        .await?;
    Ok(Json(ReadAllResponse { updated }))
}

/// Notification routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/notifications", get(list_notifications))
        .route("/api/notifications/read-all", post(mark_all_read))
        .route("/api/notifications/{id}/read", post(mark_read))
}

#[cfg(test)]
mod tests {
    use crate::http::server::test_support::send;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn bad_user_filter_rejected() {
        let response = send("GET", "/api/notifications?user_id=nobody", None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn read_all_is_not_an_id() {
        let response = send("POST", "/api/notifications/read-all/read", None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
