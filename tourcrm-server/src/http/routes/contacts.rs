//! Contact (tourist) endpoints

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::db::{Contact, ContactRepo, DealDetails, DealFilter, DealRepo};
use crate::http::error::ApiError;
use crate::http::extractors::ValidUuid;
use crate::http::server::AppState;
use crate::models::contact::{CreateContactRequest, UpdateContactRequest};
use crate::models::{Paginated, Pagination, PaginationParams};

#[derive(Debug, Default, Deserialize)]
pub struct ContactSearch {
    pub q: Option<String>,
}

/// GET /api/contacts
async fn list_contacts(
    State(state): State<Arc<AppState>>,
    Query(search): Query<ContactSearch>,
    Query(page): Query<PaginationParams>,
) -> Result<Json<Paginated<Contact>>, ApiError> {
    let contacts = ContactRepo::new(&state.pool)
        .list(search.q.as_deref(), Pagination::from(page))
        .await?;
    Ok(Json(contacts))
}

/// POST /api/contacts
async fn create_contact(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateContactRequest>,
) -> Result<(StatusCode, Json<Contact>), ApiError> {
    let contact = ContactRepo::new(&state.pool).create(&req.validate()?).await?;
    Ok((StatusCode::CREATED, Json(contact)))
}

async fn get_contact(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
) -> Result<Json<Contact>, ApiError> {
    Ok(Json(ContactRepo::new(&state.pool).get(id).await?))
}

async fn update_contact(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
    Json(req): Json<UpdateContactRequest>,
) -> Result<Json<Contact>, ApiError> {
    let patch = req.validate()?;
    Ok(Json(ContactRepo::new(&state.pool).update(id, &patch).await?))
}

/// DELETE /api/contacts/{id} - removes the contact's deals and visits too
async fn delete_contact(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
) -> Result<StatusCode, ApiError> {
    ContactRepo::new(&state.pool).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/contacts/{id}/deals
async fn contact_deals(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
    Query(page): Query<PaginationParams>,
) -> Result<Json<Paginated<DealDetails>>, ApiError> {
    // 404 for an unknown contact instead of an empty list
    ContactRepo::new(&state.pool).get(id).await?;
    let filter = DealFilter {
        contact_id: Some(id),
        ..Default::default()
    };
    let deals = DealRepo::new(&state.pool)
        .list(&filter, Pagination::from(page))
        .await?;
    Ok(Json(deals))
}

/// Contact routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/contacts", get(list_contacts).post(create_contact))
        .route(
            "/api/contacts/{id}",
            get(get_contact).patch(update_contact).delete(delete_contact),
        )
        .route("/api/contacts/{id}/deals", get(contact_deals))
}

#[cfg(test)]
mod tests {
    use crate::http::server::test_support::send;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn contact_requires_surname() {
        let response = send(
            "POST",
            "/api/contacts",
            Some(r#"{"first_name": "Ivan", "last_name": "  "}"#),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn bad_phone_rejected_on_patch() {
        let response = send(
            "PATCH",
            "/api/contacts/6f1c2a9e-4a41-4d57-9a43-0d3c1f8f2b10",
            Some(r#"{"phone": "12"}"#),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
