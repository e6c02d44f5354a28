//! Tour endpoints: CRUD, bookings, tourist registration, summary, finance
//! and expenses

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::instrument;

use crate::db::{DealDetails, DealRepo, Event, EventRepo, EventWithBookings, Expense, ExpenseRepo};
use crate::http::error::ApiError;
use crate::http::extractors::ValidUuid;
use crate::http::server::AppState;
use crate::models::event::{CreateEventRequest, UpdateEventRequest};
use crate::models::expense::{CreateExpenseRequest, UpdateExpenseRequest};
use crate::models::tourist::RegisterTouristRequest;
use crate::models::{Paginated, Pagination, PaginationParams};
use crate::report::{self, SummaryOptions, SummaryReport};
use crate::services::finance::{self, EventFinance};
use crate::services::tourists::{register_tourist, PgTouristStore, Registration};

#[derive(Debug, Default, Deserialize)]
pub struct EventListParams {
    #[serde(default)]
    pub active_only: bool,
    /// Only tours starting today or later
    #[serde(default)]
    pub upcoming: bool,
}

/// GET /api/events
async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EventListParams>,
    Query(page): Query<PaginationParams>,
) -> Result<Json<Paginated<EventWithBookings>>, ApiError> {
    let from = params.upcoming.then(|| Utc::now().date_naive());
    let events = EventRepo::new(&state.pool)
        .list(params.active_only, from, Pagination::from(page))
        .await?;
    Ok(Json(events))
}

/// POST /api/events
async fn create_event(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<Event>), ApiError> {
    let event = EventRepo::new(&state.pool).create(&req.validate()?).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

async fn get_event(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
) -> Result<Json<EventWithBookings>, ApiError> {
    Ok(Json(EventRepo::new(&state.pool).get(id).await?))
}

/// PATCH /api/events/{id} - refused while recorded visits fall outside
/// the new cities or dates
async fn update_event(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
    Json(req): Json<UpdateEventRequest>,
) -> Result<Json<Event>, ApiError> {
    let event = crate::services::events::update_event(&state.pool, id, &req).await?;
    Ok(Json(event))
}

/// DELETE /api/events/{id} - refused while the tour has deals
async fn delete_event(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
) -> Result<StatusCode, ApiError> {
    EventRepo::new(&state.pool).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/events/{id}/deals
async fn event_deals(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
) -> Result<Json<Vec<DealDetails>>, ApiError> {
    EventRepo::new(&state.pool).get(id).await?;
    Ok(Json(DealRepo::new(&state.pool).list_for_event(id).await?))
}

/// POST /api/events/{id}/tourists
#[instrument(skip(state, req))]
async fn register(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
    Json(req): Json<RegisterTouristRequest>,
) -> Result<(StatusCode, Json<Registration>), ApiError> {
    let event = EventRepo::new(&state.pool).get(id).await?.event;
    let tourist = req.validate(event.id, &event.itinerary())?;

    let store = PgTouristStore::new(&state.pool);
    let registration = register_tourist(&store, state.crm(), &event, &tourist).await?;
    Ok((StatusCode::CREATED, Json(registration)))
}

/// GET /api/events/{id}/summary
async fn summary(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
    Query(options): Query<SummaryOptions>,
) -> Result<Json<SummaryReport>, ApiError> {
    Ok(Json(report::load_summary(&state.pool, id, options).await?))
}

/// GET /api/events/{id}/summary/export - CSV download
async fn summary_export(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
    Query(options): Query<SummaryOptions>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = report::load_summary(&state.pool, id, options).await?;
    let disposition = format!("attachment; filename=\"tour-{}-summary.csv\"", id);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_owned()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        report::csv::to_csv(&summary),
    ))
}

/// GET /api/events/{id}/finance
async fn event_finance(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
) -> Result<Json<EventFinance>, ApiError> {
    Ok(Json(finance::event_finance(&state.pool, id).await?))
}

/// GET /api/events/{id}/expenses
async fn list_expenses(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
) -> Result<Json<Vec<Expense>>, ApiError> {
    EventRepo::new(&state.pool).get(id).await?;
    Ok(Json(ExpenseRepo::new(&state.pool).list_for_event(id).await?))
}

/// POST /api/events/{id}/expenses
async fn create_expense(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
    Json(req): Json<CreateExpenseRequest>,
) -> Result<(StatusCode, Json<Expense>), ApiError> {
    let expense = ExpenseRepo::new(&state.pool)
        .create(id, &req.validate()?)
        .await?;
    Ok((StatusCode::CREATED, Json(expense)))
}

async fn update_expense(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
    Json(req): Json<UpdateExpenseRequest>,
) -> Result<Json<Expense>, ApiError> {
    let patch = req.validate()?;
    Ok(Json(ExpenseRepo::new(&state.pool).update(id, &patch).await?))
}

async fn delete_expense(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
) -> Result<StatusCode, ApiError> {
    ExpenseRepo::new(&state.pool).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Event and expense routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/events", get(list_events).post(create_event))
        .route(
            "/api/events/{id}",
            get(get_event).patch(update_event).delete(delete_event),
        )
        .route("/api/events/{id}/deals", get(event_deals))
        .route("/api/events/{id}/tourists", post(register))
        .route("/api/events/{id}/summary", get(summary))
        .route("/api/events/{id}/summary/export", get(summary_export))
        .route("/api/events/{id}/finance", get(event_finance))
        .route(
            "/api/events/{id}/expenses",
            get(list_expenses).post(create_expense),
        )
        .route(
            "/api/expenses/{id}",
            patch(update_expense).delete(delete_expense),
        )
}
