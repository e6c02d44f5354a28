//! Staff user endpoints

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::db::{User, UserRepo};
use crate::http::error::ApiError;
use crate::http::extractors::ValidUuid;
use crate::http::server::AppState;
use crate::models::user::{CreateUserRequest, UpdateUserRequest};
use crate::models::{Paginated, Pagination, PaginationParams};

#[derive(Debug, Default, Deserialize)]
pub struct UserListParams {
    #[serde(default)]
    pub active_only: bool,
}

/// GET /api/users
async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UserListParams>,
    Query(page): Query<PaginationParams>,
) -> Result<Json<Paginated<User>>, ApiError> {
    let users = UserRepo::new(&state.pool)
        .list(params.active_only, Pagination::from(page))
        .await?;
    Ok(Json(users))
}

/// POST /api/users
async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = UserRepo::new(&state.pool).create(&req.validate()?).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
) -> Result<Json<User>, ApiError> {
    Ok(Json(UserRepo::new(&state.pool).get(id).await?))
}

async fn update_user(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<User>, ApiError> {
    let patch = req.validate()?;
    Ok(Json(UserRepo::new(&state.pool).update(id, &patch).await?))
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
) -> Result<StatusCode, ApiError> {
    UserRepo::new(&state.pool).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// User routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/users", get(list_users).post(create_user))
        .route(
            "/api/users/{id}",
            get(get_user).patch(update_user).delete(delete_user),
        )
}

#[cfg(test)]
mod tests {
    use crate::http::server::test_support::{json_body, send};
    use axum::http::StatusCode;

    #[tokio::test]
    async fn invalid_username_rejected_before_database() {
        let response = send(
            "POST",
            "/api/users",
            Some(r#"{"username": "Not A Slug", "full_name": "Anna"}"#),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "validation_error");
    }
}
