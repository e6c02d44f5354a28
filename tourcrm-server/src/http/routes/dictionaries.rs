//! Reference dictionary endpoints

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;

use crate::db::{DictionaryEntry, DictionaryRepo};
use crate::http::error::ApiError;
use crate::http::extractors::ValidUuid;
use crate::http::server::AppState;
use crate::models::dictionary::{CreateEntryRequest, UpdateEntryRequest};

#[derive(Debug, Default, Deserialize)]
pub struct DictionaryParams {
    pub kind: Option<String>,
    #[serde(default)]
    pub active_only: bool,
}

/// GET /api/dictionaries?kind=hotel
async fn list_entries(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DictionaryParams>,
) -> Result<Json<Vec<DictionaryEntry>>, ApiError> {
    let kind = params.kind.as_deref().map(str::trim).filter(|k| !k.is_empty());
    let entries = DictionaryRepo::new(&state.pool)
        .list(kind, params.active_only)
        .await?;
    Ok(Json(entries))
}

/// POST /api/dictionaries - 409 when the kind already has the value
async fn create_entry(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateEntryRequest>,
) -> Result<(StatusCode, Json<DictionaryEntry>), ApiError> {
    let entry = DictionaryRepo::new(&state.pool).create(&req.validate()?).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

async fn update_entry(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
    Json(req): Json<UpdateEntryRequest>,
) -> Result<Json<DictionaryEntry>, ApiError> {
    let patch = req.validate()?;
    Ok(Json(DictionaryRepo::new(&state.pool).update(id, &patch).await?))
}

async fn delete_entry(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
) -> Result<StatusCode, ApiError> {
    DictionaryRepo::new(&state.pool).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Dictionary routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/dictionaries", get(list_entries).post(create_entry))
        .route(
            "/api/dictionaries/{id}",
            patch(update_entry).delete(delete_entry),
        )
}
