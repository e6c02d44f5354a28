//! Deal (booking) endpoints with payments and city visits

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};

use crate::db::{CityVisit, Deal, DealDetails, DealFilter, DealRepo, VisitRepo};
use crate::http::error::ApiError;
use crate::http::extractors::ValidUuid;
use crate::http::server::AppState;
use crate::models::deal::{CreateDealRequest, PaymentRequest, UpdateDealRequest};
use crate::models::visit::{UpdateVisitRequest, VisitRequest};
use crate::models::{DealStatus, Paginated, Pagination, PaginationParams};
use crate::services::bookings;

/// GET /api/deals
async fn list_deals(
    State(state): State<Arc<AppState>>,
    Query(mut filter): Query<DealFilter>,
    Query(page): Query<PaginationParams>,
) -> Result<Json<Paginated<DealDetails>>, ApiError> {
    if let Some(status) = filter.status.as_deref() {
        filter.status = Some(DealStatus::parse(status)?.as_str().to_owned());
    }
    let deals = DealRepo::new(&state.pool)
        .list(&filter, Pagination::from(page))
        .await?;
    Ok(Json(deals))
}

/// POST /api/deals - 409 when the tour is full or the contact is booked
async fn create_deal(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateDealRequest>,
) -> Result<(StatusCode, Json<Deal>), ApiError> {
    let deal = bookings::create_deal(&state.pool, &req.validate()?).await?;
    Ok((StatusCode::CREATED, Json(deal)))
}

async fn get_deal(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
) -> Result<Json<DealDetails>, ApiError> {
    Ok(Json(DealRepo::new(&state.pool).get(id).await?))
}

async fn update_deal(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
    Json(req): Json<UpdateDealRequest>,
) -> Result<Json<Deal>, ApiError> {
    let patch = req.validate()?;
    Ok(Json(bookings::update_deal(&state.pool, id, &patch).await?))
}

async fn delete_deal(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
) -> Result<StatusCode, ApiError> {
    DealRepo::new(&state.pool).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/deals/{id}/payments
async fn record_payment(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
    Json(req): Json<PaymentRequest>,
) -> Result<Json<Deal>, ApiError> {
    let amount = req.validate()?;
    Ok(Json(bookings::record_payment(&state.pool, id, amount).await?))
}

/// GET /api/deals/{id}/visits
async fn list_visits(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
) -> Result<Json<Vec<CityVisit>>, ApiError> {
    DealRepo::new(&state.pool).get(id).await?;
    Ok(Json(VisitRepo::new(&state.pool).list_for_deal(id).await?))
}

/// POST /api/deals/{id}/visits
async fn add_visit(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
    Json(req): Json<VisitRequest>,
) -> Result<(StatusCode, Json<CityVisit>), ApiError> {
    let visit = bookings::add_visit(&state.pool, id, &req).await?;
    Ok((StatusCode::CREATED, Json(visit)))
}

async fn update_visit(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
    Json(req): Json<UpdateVisitRequest>,
) -> Result<Json<CityVisit>, ApiError> {
    Ok(Json(bookings::update_visit(&state.pool, id, req).await?))
}

async fn delete_visit(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
) -> Result<StatusCode, ApiError> {
    VisitRepo::new(&state.pool).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Deal and visit routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/deals", get(list_deals).post(create_deal))
        .route(
            "/api/deals/{id}",
            get(get_deal).patch(update_deal).delete(delete_deal),
        )
        .route("/api/deals/{id}/payments", post(record_payment))
        .route("/api/deals/{id}/visits", get(list_visits).post(add_visit))
        .route("/api/visits/{id}", patch(update_visit).delete(delete_visit))
}

#[cfg(test)]
mod tests {
    use crate::http::server::test_support::send;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn zero_payment_rejected() {
        let response = send(
            "POST",
            "/api/deals/6f1c2a9e-4a41-4d57-9a43-0d3c1f8f2b10/payments",
            Some(r#"{"amount_cents": 0}"#),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_deal_status_rejected() {
        let response = send(
            "PATCH",
            "/api/deals/6f1c2a9e-4a41-4d57-9a43-0d3c1f8f2b10",
            Some(r#"{"status": "archived"}"#),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send("GET", "/api/deals?status=archived", None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
