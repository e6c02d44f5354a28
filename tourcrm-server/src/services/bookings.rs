//! Deals, seat limits, payments and city visits

use sqlx::{PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::db::repos::{deals, events, visits};
use crate::db::{CityVisit, ContactRepo, Deal, DealRepo, SeatLock, VisitRepo};
use crate::models::deal::{check_paid, DealPatch, NewDeal};
use crate::models::visit::{UpdateVisitRequest, VisitRequest};
use crate::models::DealStatus;

use super::{Result, ServiceError};

fn ensure_seat(seats: &SeatLock) -> Result<()> {
    if seats.is_full() {
        return Err(ServiceError::Conflict(format!(
            "tour is fully booked ({} of {} seats taken)",
            seats.booked, seats.capacity
        )));
    }
    Ok(())
}

/// Insert a deal under the event lock, enforcing capacity.
///
/// The amount defaults to the tour price. Must run inside a transaction.
pub async fn book(conn: &mut PgConnection, deal: &NewDeal) -> Result<Deal> {
    let seats = events::lock_seats(conn, deal.event_id).await?;
    if deal.status.occupies_seat() {
        ensure_seat(&seats)?;
    }

    let amount = deal.amount_cents.unwrap_or(seats.price_cents);
    check_paid(amount, deal.paid_cents)?;

    Ok(deals::insert(conn, deal, amount).await?)
}

/// Create a deal for an existing contact.
pub async fn create_deal(pool: &PgPool, deal: &NewDeal) -> Result<Deal> {
    ContactRepo::new(pool).get(deal.contact_id).await?;

    let mut tx = pool.begin().await?;
    let created = book(&mut tx, deal).await?;
    tx.commit().await?;

    info!(deal_id = %created.id, event_id = %created.event_id, "Deal created");
    Ok(created)
}

/// Apply a partial update.
///
/// Reactivating a cancelled deal needs a free seat; a new amount may not
/// fall below what was already paid.
pub async fn update_deal(pool: &PgPool, id: Uuid, patch: &DealPatch) -> Result<Deal> {
    let mut tx = pool.begin().await?;
    let current = deals::lock(&mut tx, id).await?;

    let next_status = patch.status.unwrap_or_else(|| current.status());
    if next_status.occupies_seat() && !current.status().occupies_seat() {
        let seats = events::lock_seats(&mut tx, current.event_id).await?;
        ensure_seat(&seats)?;
    }

    if let Some(amount) = patch.amount_cents {
        check_paid(amount, current.paid_cents)?;
    }

    let updated = deals::apply_patch(&mut tx, id, patch).await?;
    tx.commit().await?;

    if next_status == DealStatus::Cancelled && current.status() != DealStatus::Cancelled {
        info!(deal_id = %id, "Deal cancelled, seat released");
    }
    Ok(updated)
}

/// Add a payment; overpayment is a conflict.
pub async fn record_payment(pool: &PgPool, id: Uuid, amount_cents: i64) -> Result<Deal> {
    let deal = DealRepo::new(pool).record_payment(id, amount_cents).await?;
    info!(deal_id = %id, amount_cents, paid_cents = deal.paid_cents, "Payment recorded");
    Ok(deal)
}

/// Record a city visit after checking it against the deal's tour.
///
/// The tour row stays locked until the insert commits, so a concurrent
/// itinerary change cannot strand the new visit.
pub async fn add_visit(pool: &PgPool, deal_id: Uuid, request: &VisitRequest) -> Result<CityVisit> {
    let deal = DealRepo::new(pool).get(deal_id).await?;

    let mut tx = pool.begin().await?;
    let event = events::lock(&mut tx, deal.deal.event_id).await?;
    let visit = request.validate(&event.itinerary())?;
    let created = visits::insert(&mut tx, deal_id, &visit).await?;
    tx.commit().await?;
    Ok(created)
}

/// Merge a partial update into a stored visit and validate the result.
pub async fn update_visit(
    pool: &PgPool,
    visit_id: Uuid,
    request: UpdateVisitRequest,
) -> Result<CityVisit> {
    let current = VisitRepo::new(pool).get(visit_id).await?;
    let deal = DealRepo::new(pool).get(current.deal_id).await?;

    let mut tx = pool.begin().await?;
    let event = events::lock(&mut tx, deal.deal.event_id).await?;
    let merged = request.merge_into(current.to_request());
    let visit = merged.validate(&event.itinerary())?;
    let updated = visits::replace(&mut tx, visit_id, &visit).await?;
    tx.commit().await?;
    Ok(updated)
}
