//! Lead endpoints: CRUD, workflow, history and conversion

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::db::{Lead, LeadFilter, LeadRepo, LeadStatusChange};
use crate::http::error::ApiError;
use crate::http::extractors::ValidUuid;
use crate::http::server::AppState;
use crate::models::lead::{ChangeStatusRequest, ConvertLeadRequest, CreateLeadRequest, UpdateLeadRequest};
use crate::models::{LeadStatus, Paginated, Pagination, PaginationParams};
use crate::services::leads::{self, Conversion};

/// GET /api/leads
async fn list_leads(
    State(state): State<Arc<AppState>>,
    Query(mut filter): Query<LeadFilter>,
    Query(page): Query<PaginationParams>,
) -> Result<Json<Paginated<Lead>>, ApiError> {
    if let Some(status) = filter.status.as_deref() {
        filter.status = Some(LeadStatus::parse(status)?.as_str().to_owned());
    }
    let leads = LeadRepo::new(&state.pool)
        .list(&filter, Pagination::from(page))
        .await?;
    Ok(Json(leads))
}

/// POST /api/leads
async fn create_lead(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateLeadRequest>,
) -> Result<(StatusCode, Json<Lead>), ApiError> {
    let lead = leads::create_lead(&state.pool, &req.validate()?).await?;
    Ok((StatusCode::CREATED, Json(lead)))
}

async fn get_lead(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
) -> Result<Json<Lead>, ApiError> {
    Ok(Json(LeadRepo::new(&state.pool).get(id).await?))
}

async fn update_lead(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
    Json(req): Json<UpdateLeadRequest>,
) -> Result<Json<Lead>, ApiError> {
    let patch = req.validate()?;
    Ok(Json(leads::update_lead(&state.pool, id, &patch).await?))
}

async fn delete_lead(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
) -> Result<StatusCode, ApiError> {
    LeadRepo::new(&state.pool).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/leads/{id}/status
async fn change_status(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
    Json(req): Json<ChangeStatusRequest>,
) -> Result<Json<Lead>, ApiError> {
    let (status, note) = req.validate()?;
    let lead = leads::change_status(&state.pool, id, status, note.as_deref()).await?;
    Ok(Json(lead))
}

/// GET /api/leads/{id}/history
async fn lead_history(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
) -> Result<Json<Vec<LeadStatusChange>>, ApiError> {
    Ok(Json(LeadRepo::new(&state.pool).history(id).await?))
}

/// POST /api/leads/{id}/convert
#[instrument(skip(state, req))]
async fn convert_lead(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
    Json(req): Json<ConvertLeadRequest>,
) -> Result<(StatusCode, Json<Conversion>), ApiError> {
    let conversion = leads::convert_lead(&state.pool, state.crm(), id, &req).await?;
    Ok((StatusCode::CREATED, Json(conversion)))
}

/// Lead routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/leads", get(list_leads).post(create_lead))
        .route(
            "/api/leads/{id}",
            get(get_lead).patch(update_lead).delete(delete_lead),
        )
        .route("/api/leads/{id}/status", post(change_status))
        .route("/api/leads/{id}/history", get(lead_history))
        .route("/api/leads/{id}/convert", post(convert_lead))
}

#[cfg(test)]
mod tests {
    use crate::http::server::test_support::{json_body, send};
    use axum::http::StatusCode;

    #[tokio::test]
    async fn lead_without_contact_channel_rejected() {
        let response = send("POST", "/api/leads", Some(r#"{"first_name": "Anna"}"#)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert_eq!(json["message"], "contact: phone or email is required");
    }

    #[tokio::test]
    async fn unknown_status_filter_rejected() {
        let response = send("GET", "/api/leads?status=archived", None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn manual_conversion_via_status_rejected() {
        let response = send(
            "POST",
            "/api/leads/6f1c2a9e-4a41-4d57-9a43-0d3c1f8f2b10/status",
            Some(r#"{"status": "converted"}"#),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn negative_conversion_amount_rejected() {
        let response = send(
            "POST",
            "/api/leads/6f1c2a9e-4a41-4d57-9a43-0d3c1f8f2b10/convert",
            Some(r#"{"amount_cents": -5}"#),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn unknown_references_are_404() {
        use crate::http::server::test_support::{db_app, send_to};

        let app = db_app().await;
        let missing = uuid::Uuid::new_v4();
        for (field, resource) in [("event_id", "event"), ("assigned_to", "user")] {
            let body = format!(r#"{{"first_name": "Anna", "phone": "+7 900 111-22-33", "{}": "{}"}}"#, field, missing);
            let response = send_to(app.clone(), "POST", "/api/leads", Some(&body)).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", field);
            let json = json_body(response).await;
            assert_eq!(json["message"], format!("{} '{}' not found", resource, missing));
        }

        let response = send_to(
            app.clone(),
            "POST",
            "/api/leads",
            Some(r#"{"first_name": "Anna", "phone": "+7 900 111-22-33"}"#),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let lead_id = json_body(response).await["id"].as_str().unwrap().to_owned();

        for (field, resource) in [("event_id", "event"), ("assigned_to", "user")] {
            let body = format!(r#"{{"{}": "{}"}}"#, field, missing);
            let uri = format!("/api/leads/{}", lead_id);
            let response = send_to(app.clone(), "PATCH", &uri, Some(&body)).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", field);
            assert_eq!(json_body(response).await["message"], format!("{} '{}' not found", resource, missing));
        }

        let uri = format!("/api/leads/{}", lead_id);
        assert_eq!(send_to(app, "DELETE", &uri, None).await.status(), StatusCode::NO_CONTENT);
    }
}
