//! Tours (events) with their itinerary and seat counts

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::models::event::{EventPatch, NewEvent};
use crate::models::{Itinerary, Paginated, Pagination};

use super::{into_page, Counted, DbError};

/// Event record from database
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub cities: Vec<String>,
    pub price_cents: i64,
    pub currency: String,
    pub capacity: i32,
    pub is_active: bool,
    pub bitrix_item_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn itinerary(&self) -> Itinerary {
        Itinerary {
            start_date: self.start_date,
            end_date: self.end_date,
            cities: self.cities.clone(),
        }
    }
}

/// Event with the number of seats taken by non-cancelled deals
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EventWithBookings {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub event: Event,
    pub booked: i64,
}

impl EventWithBookings {
    pub fn seats_left(&self) -> i64 {
        (self.event.capacity as i64 - self.booked).max(0)
    }
}

const COLUMNS: &str = "e.id, e.title, e.description, e.start_date, e.end_date, e.cities, \
                       e.price_cents, e.currency, e.capacity, e.is_active, e.bitrix_item_id, \
                       e.created_at, e.updated_at";

const BOOKED: &str = "(SELECT COUNT(*) FROM deals d WHERE d.event_id = e.id AND d.status <> 'cancelled')";

/// Seat state of an event, read under a row lock
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeatLock {
    pub capacity: i32,
    pub price_cents: i64,
    pub booked: i64,
}

impl SeatLock {
    pub fn is_full(&self) -> bool {
        self.booked >= self.capacity as i64
    }
}

/// Lock the event row and count occupied seats.
///
/// Concurrent bookings for the same event serialize on the lock, so the
/// count stays accurate until the caller's transaction ends.
pub async fn lock_seats(conn: &mut PgConnection, event_id: Uuid) -> Result<SeatLock, DbError> {
    let (capacity, price_cents): (i32, i64) =
        sqlx::query_as("SELECT capacity, price_cents FROM events WHERE id = $1 FOR UPDATE")
            .bind(event_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found("event", event_id))?;

    let (booked,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM deals WHERE event_id = $1 AND status <> 'cancelled'",
    )
    .bind(event_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(SeatLock {
        capacity,
        price_cents,
        booked,
    })
}

/// Lock the event row for the rest of the caller's transaction.
///
/// Itinerary changes and visit writes take this lock, so a visit is always
/// checked against the itinerary that ends up stored.
pub async fn lock(conn: &mut PgConnection, id: Uuid) -> Result<Event, DbError> {
    sqlx::query_as(&format!("SELECT {COLUMNS} FROM events e WHERE e.id = $1 FOR UPDATE"))
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| DbError::not_found("event", id))
}

pub async fn apply_patch(conn: &mut PgConnection, id: Uuid, patch: &EventPatch) -> Result<Event, DbError> {
    sqlx::query_as(&format!(
        r#"
        UPDATE events AS e SET
            title = COALESCE($2, title),
            description = COALESCE($3, description),
            start_date = COALESCE($4, start_date),
            end_date = COALESCE($5, end_date),
            cities = COALESCE($6, cities),
            price_cents = COALESCE($7, price_cents),
            currency = COALESCE($8, currency),
            capacity = COALESCE($9, capacity),
            is_active = COALESCE($10, is_active),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(&patch.title)
    .bind(&patch.description)
    .bind(patch.start_date)
    .bind(patch.end_date)
    .bind(&patch.cities)
    .bind(patch.price_cents)
    .bind(&patch.currency)
    .bind(patch.capacity)
    .bind(patch.is_active)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| DbError::not_found("event", id))
}

/// Event repository
pub struct EventRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> EventRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, event: &NewEvent) -> Result<Event, DbError> {
        let row = sqlx::query_as(&format!(
            r#"
            INSERT INTO events AS e
                (title, description, start_date, end_date, cities, price_cents, currency, capacity)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.start_date)
        .bind(event.end_date)
        .bind(&event.cities)
        .bind(event.price_cents)
        .bind(&event.currency)
        .bind(event.capacity)
        .fetch_one(self.pool)
        .await?;
        Ok(row)
    }

    pub async fn get(&self, id: Uuid) -> Result<EventWithBookings, DbError> {
        sqlx::query_as(&format!(
            "SELECT {COLUMNS}, {BOOKED} AS booked FROM events e WHERE e.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("event", id))
    }

    /// List events by start date.
    ///
    /// `upcoming_from` keeps events starting on or after that date.
    pub async fn list(
        &self,
        active_only: bool,
        upcoming_from: Option<NaiveDate>,
        page: Pagination,
    ) -> Result<Paginated<EventWithBookings>, DbError> {
        let rows: Vec<Counted<EventWithBookings>> = sqlx::query_as(&format!(
            r#"
            SELECT {COLUMNS}, {BOOKED} AS booked, COUNT(*) OVER() AS total
            FROM events e
            WHERE ($1 = FALSE OR e.is_active)
              AND ($2::date IS NULL OR e.start_date >= $2)
            ORDER BY e.start_date, e.title
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(active_only)
        .bind(upcoming_from)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;
        Ok(into_page(rows, page))
    }

    /// Delete an event; events with deals are refused by the foreign key.
    pub async fn delete(&self, id: Uuid) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::Conflict(_) => {
                    DbError::Conflict("event has deals; cancel or move them first".to_owned())
                }
                other => other,
            })?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("event", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seat_lock_full_at_capacity() {
        let lock = SeatLock {
            capacity: 2,
            price_cents: 0,
            booked: 2,
        };
        assert!(lock.is_full());
        assert!(!SeatLock { booked: 1, ..lock }.is_full());
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn create_and_count_bookings() {
        use crate::models::event::CreateEventRequest;

        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = crate::db::create_pool(&url).await.unwrap();
        crate::db::migrations::run(&pool).await.unwrap();

        let repo = EventRepo::new(&pool);
        let new = CreateEventRequest {
            title: "Golden Ring".into(),
            description: None,
            start_date: NaiveDate::from_ymd_opt(2030, 6, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2030, 6, 10).unwrap(),
            cities: vec!["Vladimir".into(), "Suzdal".into()],
            price_cents: 9_900_000,
            currency: None,
            capacity: 20,
        }
        .validate()
        .unwrap();

        let event = repo.create(&new).await.unwrap();
        let loaded = repo.get(event.id).await.unwrap();
        assert_eq!(loaded.booked, 0);
        assert_eq!(loaded.seats_left(), 20);
        assert_eq!(loaded.event.cities, vec!["Vladimir", "Suzdal"]);
        repo.delete(event.id).await.unwrap();
    }
}
