//! City visit repository

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::models::visit::{NewVisit, VisitRequest};

use super::DbError;

/// City visit record from database
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct CityVisit {
    pub id: Uuid,
    pub deal_id: Uuid,
    pub city: String,
    pub arrival_date: NaiveDate,
    pub arrival_time: Option<NaiveTime>,
    pub arrival_transport: Option<String>,
    pub arrival_details: Option<String>,
    pub departure_date: NaiveDate,
    pub departure_time: Option<NaiveTime>,
    pub departure_transport: Option<String>,
    pub departure_details: Option<String>,
    pub hotel: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CityVisit {
    /// Stored values as a request, the base for partial updates.
    pub fn to_request(&self) -> VisitRequest {
        VisitRequest {
            city: self.city.clone(),
            arrival_date: self.arrival_date,
            arrival_time: self.arrival_time,
            arrival_transport: self.arrival_transport.clone(),
            arrival_details: self.arrival_details.clone(),
            departure_date: self.departure_date,
            departure_time: self.departure_time,
            departure_transport: self.departure_transport.clone(),
            departure_details: self.departure_details.clone(),
            hotel: self.hotel.clone(),
        }
    }
}

const COLUMNS: &str = "id, deal_id, city, arrival_date, arrival_time, arrival_transport, \
                       arrival_details, departure_date, departure_time, departure_transport, \
                       departure_details, hotel, created_at";

pub async fn insert(conn: &mut PgConnection, deal_id: Uuid, visit: &NewVisit) -> Result<CityVisit, DbError> {
    sqlx::query_as(&format!(
        r#"
        INSERT INTO city_visits
            (deal_id, city, arrival_date, arrival_time, arrival_transport, arrival_details,
             departure_date, departure_time, departure_transport, departure_details, hotel)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(deal_id)
    .bind(&visit.city)
    .bind(visit.arrival_date)
    .bind(visit.arrival_time)
    .bind(visit.arrival_transport.map(|t| t.as_str()))
    .bind(&visit.arrival_details)
    .bind(visit.departure_date)
    .bind(visit.departure_time)
    .bind(visit.departure_transport.map(|t| t.as_str()))
    .bind(&visit.departure_details)
    .bind(&visit.hotel)
    .fetch_one(conn)
    .await
    .map_err(|e| match DbError::from(e) {
        DbError::Conflict(msg) if msg.contains("city_visits_deal_id_city_key") => {
            DbError::Conflict(format!("visit to {} already recorded for this deal", visit.city))
        }
        other => other,
    })
}

pub async fn list_for_event(conn: &mut PgConnection, event_id: Uuid) -> Result<Vec<CityVisit>, DbError> {
    let rows = sqlx::query_as(
        r#"
        SELECT v.id, v.deal_id, v.city, v.arrival_date, v.arrival_time, v.arrival_transport,
               v.arrival_details, v.departure_date, v.departure_time, v.departure_transport,
               v.departure_details, v.hotel, v.created_at
        FROM city_visits v
        JOIN deals d ON d.id = v.deal_id
        WHERE d.event_id = $1
        ORDER BY v.deal_id, v.arrival_date
        "#,
    )
    .bind(event_id)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

/// Replace every column of a visit with validated values.
pub async fn replace(conn: &mut PgConnection, id: Uuid, visit: &NewVisit) -> Result<CityVisit, DbError> {
    sqlx::query_as(&format!(
        r#"
        UPDATE city_visits SET
            city = $2,
            arrival_date = $3,
            arrival_time = $4,
            arrival_transport = $5,
            arrival_details = $6,
            departure_date = $7,
            departure_time = $8,
            departure_transport = $9,
            departure_details = $10,
            hotel = $11
        WHERE id = $1
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(&visit.city)
    .bind(visit.arrival_date)
    .bind(visit.arrival_time)
    .bind(visit.arrival_transport.map(|t| t.as_str()))
    .bind(&visit.arrival_details)
    .bind(visit.departure_date)
    .bind(visit.departure_time)
    .bind(visit.departure_transport.map(|t| t.as_str()))
    .bind(&visit.departure_details)
    .bind(&visit.hotel)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| DbError::not_found("visit", id))
}

/// Visit repository
pub struct VisitRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> VisitRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, deal_id: Uuid, visit: &NewVisit) -> Result<CityVisit, DbError> {
        let mut conn = self.pool.acquire().await?;
        insert(&mut conn, deal_id, visit).await
    }

    pub async fn get(&self, id: Uuid) -> Result<CityVisit, DbError> {
        sqlx::query_as(&format!("SELECT {COLUMNS} FROM city_visits WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("visit", id))
    }

    /// Visits of one deal in arrival order.
    pub async fn list_for_deal(&self, deal_id: Uuid) -> Result<Vec<CityVisit>, DbError> {
        let rows = sqlx::query_as(&format!(
            r#"
            SELECT {COLUMNS} FROM city_visits
            WHERE deal_id = $1
            ORDER BY arrival_date, arrival_time NULLS FIRST, city
            "#
        ))
        .bind(deal_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Visits of every deal on a tour (one query for the summary report).
    pub async fn list_for_event(&self, event_id: Uuid) -> Result<Vec<CityVisit>, DbError> {
        let mut conn = self.pool.acquire().await?;
        list_for_event(&mut conn, event_id).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM city_visits WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("visit", id));
        }
        Ok(())
    }
}
