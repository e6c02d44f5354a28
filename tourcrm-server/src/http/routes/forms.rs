//! Booking form management (staff side)

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use crate::db::{Form, FormRepo, FormSubmission};
use crate::http::error::ApiError;
use crate::http::extractors::ValidUuid;
use crate::http::server::AppState;
use crate::models::form::{CreateFormRequest, UpdateFormRequest};
use crate::models::{Paginated, Pagination, PaginationParams};

async fn list_forms(
    State(state): State<Arc<AppState>>,
    Query(page): Query<PaginationParams>,
) -> Result<Json<Paginated<Form>>, ApiError> {
    Ok(Json(FormRepo::new(&state.pool).list(Pagination::from(page)).await?))
}

/// POST /api/forms - 409 on a duplicate slug
async fn create_form(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateFormRequest>,
) -> Result<(StatusCode, Json<Form>), ApiError> {
    let form = FormRepo::new(&state.pool).create(&req.validate()?).await?;
    Ok((StatusCode::CREATED, Json(form)))
}

async fn get_form(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
) -> Result<Json<Form>, ApiError> {
    Ok(Json(FormRepo::new(&state.pool).get(id).await?))
}

async fn update_form(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
    Json(req): Json<UpdateFormRequest>,
) -> Result<Json<Form>, ApiError> {
    let patch = req.validate()?;
    Ok(Json(FormRepo::new(&state.pool).update(id, &patch).await?))
}

async fn delete_form(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
) -> Result<StatusCode, ApiError> {
    FormRepo::new(&state.pool).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/forms/{id}/submissions
async fn list_submissions(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
    Query(page): Query<PaginationParams>,
) -> Result<Json<Paginated<FormSubmission>>, ApiError> {
    let submissions = FormRepo::new(&state.pool)
        .submissions(id, Pagination::from(page))
        .await?;
    Ok(Json(submissions))
}

/// Form routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/forms", get(list_forms).post(create_form))
        .route(
            "/api/forms/{id}",
            get(get_form).patch(update_form).delete(delete_form),
        )
        .route("/api/forms/{id}/submissions", get(list_submissions))
}
