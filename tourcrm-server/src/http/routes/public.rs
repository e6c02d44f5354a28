//! Unauthenticated booking form endpoints used by the public site

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::instrument;

use crate::db::{EventRepo, Form, FormRepo};
use crate::http::error::ApiError;
use crate::http::extractors::FormSlug;
use crate::http::server::AppState;
use crate::models::FormField;
use crate::services::intake::{self, Submitted};

/// Tour a public form books into
#[derive(Debug, Serialize)]
pub struct PublicEvent {
    pub title: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub seats_left: i64,
}

/// What the public site needs to render a form
#[derive(Debug, Serialize)]
pub struct PublicForm {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub fields: Vec<FormField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<PublicEvent>,
}

impl PublicForm {
    fn new(form: Form, event: Option<PublicEvent>) -> Self {
        Self {
            name: form.name,
            slug: form.slug,
            description: form.description,
            fields: form.fields.0,
            event,
        }
    }
}

/// GET /public/forms/{slug} - inactive forms are 404
async fn get_public_form(
    State(state): State<Arc<AppState>>,
    FormSlug(slug): FormSlug,
) -> Result<Json<PublicForm>, ApiError> {
    let form = FormRepo::new(&state.pool).get_active_by_slug(&slug).await?;

    let event = match form.event_id {
        Some(event_id) => {
            let tour = EventRepo::new(&state.pool).get(event_id).await?;
            Some(PublicEvent {
                seats_left: tour.seats_left(),
                title: tour.event.title,
                start_date: tour.event.start_date,
                end_date: tour.event.end_date,
            })
        }
        None => None,
    };

    Ok(Json(PublicForm::new(form, event)))
}

/// POST /public/forms/{slug}/submit
#[instrument(skip(state, data))]
async fn submit(
    State(state): State<Arc<AppState>>,
    FormSlug(slug): FormSlug,
    Json(data): Json<Map<String, Value>>,
) -> Result<(StatusCode, Json<Submitted>), ApiError> {
    let submitted = intake::submit_form(&state.pool, &slug, &data).await?;
    Ok((StatusCode::CREATED, Json(submitted)))
}

/// Public form routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/public/forms/{slug}", get(get_public_form))
        .route("/public/forms/{slug}/submit", post(submit))
}

#[cfg(test)]
mod tests {
    use crate::http::server::test_support::send;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn malformed_slug_rejected() {
        let response = send("GET", "/public/forms/-summer", None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn submission_must_be_an_object() {
        let response = send("POST", "/public/forms/summer/submit", Some(r#"["Anna"]"#)).await;
        assert!(response.status().is_client_error());
    }
}
