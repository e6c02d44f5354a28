//! Deal (booking) repository
//!
//! Seat checks are done by the services under `events::lock_seats`; this
//! module only stores what it is given.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::models::deal::{DealPatch, NewDeal};
use crate::models::{DealStatus, Paginated, Pagination, PaymentState};

use super::{into_page, Counted, DbError};

/// Deal record from database
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Deal {
    pub id: Uuid,
    pub contact_id: Uuid,
    pub event_id: Uuid,
    pub group_id: Option<Uuid>,
    pub is_primary: bool,
    pub status: String,
    pub amount_cents: i64,
    pub paid_cents: i64,
    pub notes: Option<String>,
    pub bitrix_deal_id: Option<i64>,
    pub bitrix_item_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Deal {
    pub fn status(&self) -> DealStatus {
        DealStatus::parse(&self.status).unwrap_or(DealStatus::New)
    }

    pub fn payment_state(&self) -> PaymentState {
        PaymentState::from_amounts(self.amount_cents, self.paid_cents)
    }
}

/// Deal joined with its tourist and tour for list display
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DealDetails {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub deal: Deal,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: Option<String>,
    pub phone: Option<String>,
    pub event_title: String,
    pub payment_state: String,
}

/// Filters for listing deals
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DealFilter {
    pub event_id: Option<Uuid>,
    pub contact_id: Option<Uuid>,
    pub status: Option<String>,
}

const COLUMNS: &str = "id, contact_id, event_id, group_id, is_primary, status, amount_cents, \
                       paid_cents, notes, bitrix_deal_id, bitrix_item_id, created_at, updated_at";

const DETAIL_COLUMNS: &str = r#"
    d.id, d.contact_id, d.event_id, d.group_id, d.is_primary, d.status,
    d.amount_cents, d.paid_cents, d.notes, d.bitrix_deal_id, d.bitrix_item_id,
    d.created_at, d.updated_at,
    c.first_name, c.last_name, c.middle_name, c.phone,
    e.title AS event_title,
    CASE
        WHEN d.paid_cents >= d.amount_cents THEN 'paid'
        WHEN d.paid_cents = 0 THEN 'unpaid'
        ELSE 'partial'
    END AS payment_state
"#;

const DETAIL_FROM: &str = r#"
    FROM deals d
    JOIN contacts c ON c.id = d.contact_id
    JOIN events e ON e.id = d.event_id
"#;

/// Insert a deal priced at `amount_cents`.
pub async fn insert(
    conn: &mut PgConnection,
    deal: &NewDeal,
    amount_cents: i64,
) -> Result<Deal, DbError> {
    sqlx::query_as(&format!(
        r#"
        INSERT INTO deals
            (contact_id, event_id, group_id, is_primary, status, amount_cents, paid_cents, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(deal.contact_id)
    .bind(deal.event_id)
    .bind(deal.group_id)
    .bind(deal.is_primary)
    .bind(deal.status.as_str())
    .bind(amount_cents)
    .bind(deal.paid_cents)
    .bind(&deal.notes)
    .fetch_one(conn)
    .await
    .map_err(|e| match DbError::from(e) {
        DbError::Conflict(msg) if msg.contains("deals_contact_id_event_id_key") => {
            DbError::Conflict("contact is already booked on this tour".to_owned())
        }
        other => other,
    })
}

pub async fn lock(conn: &mut PgConnection, id: Uuid) -> Result<Deal, DbError> {
    sqlx::query_as(&format!("SELECT {COLUMNS} FROM deals WHERE id = $1 FOR UPDATE"))
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| DbError::not_found("deal", id))
}

pub async fn apply_patch(conn: &mut PgConnection, id: Uuid, patch: &DealPatch) -> Result<Deal, DbError> {
    sqlx::query_as(&format!(
        r#"
        UPDATE deals SET
            group_id = COALESCE($2, group_id),
            is_primary = COALESCE($3, is_primary),
            status = COALESCE($4, status),
            amount_cents = COALESCE($5, amount_cents),
            notes = COALESCE($6, notes),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(patch.group_id)
    .bind(patch.is_primary)
    .bind(patch.status.map(|s| s.as_str()))
    .bind(patch.amount_cents)
    .bind(&patch.notes)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| DbError::not_found("deal", id))
}

/// Store remote ids after a successful push.
pub async fn set_bitrix_ids(
    conn: &mut PgConnection,
    id: Uuid,
    deal_id: Option<i64>,
    item_id: Option<i64>,
) -> Result<(), DbError> {
    sqlx::query(
        r#"
        UPDATE deals SET
            bitrix_deal_id = COALESCE($2, bitrix_deal_id),
            bitrix_item_id = COALESCE($3, bitrix_item_id),
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(deal_id)
    .bind(item_id)
    .execute(conn)
    .await?;
    Ok(())
}

/// Money totals of one tour's non-cancelled deals
#[derive(Debug, Clone, Copy, Default, PartialEq, FromRow, Serialize)]
pub struct DealTotals {
    pub deals: i64,
    pub revenue_cents: i64,
    pub collected_cents: i64,
}

/// Deal repository
pub struct DealRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> DealRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: Uuid) -> Result<DealDetails, DbError> {
        sqlx::query_as(&format!("SELECT {DETAIL_COLUMNS} {DETAIL_FROM} WHERE d.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("deal", id))
    }

    /// List deals with tourist and tour names, newest first.
    pub async fn list(
        &self,
        filter: &DealFilter,
        page: Pagination,
    ) -> Result<Paginated<DealDetails>, DbError> {
        let rows: Vec<Counted<DealDetails>> = sqlx::query_as(&format!(
            r#"
            SELECT {DETAIL_COLUMNS}, COUNT(*) OVER() AS total
            {DETAIL_FROM}
            WHERE ($1::uuid IS NULL OR d.event_id = $1)
              AND ($2::uuid IS NULL OR d.contact_id = $2)
              AND ($3::text IS NULL OR d.status = $3)
            ORDER BY d.created_at DESC
            LIMIT $4 OFFSET $5
            "#
        ))
        .bind(filter.event_id)
        .bind(filter.contact_id)
        .bind(filter.status.as_deref())
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;
        Ok(into_page(rows, page))
    }

    /// Every deal of a tour, for the summary report.
    pub async fn list_for_event(&self, event_id: Uuid) -> Result<Vec<DealDetails>, DbError> {
        let rows = sqlx::query_as(&format!(
            r#"
            SELECT {DETAIL_COLUMNS}
            {DETAIL_FROM}
            WHERE d.event_id = $1
            ORDER BY d.created_at, d.id
            "#
        ))
        .bind(event_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM deals WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("deal", id));
        }
        Ok(())
    }

    /// Add a payment atomically.
    ///
    /// The guard in the `UPDATE` keeps `paid <= amount` without a prior read;
    /// a miss is then classified as unknown deal or overpayment.
    pub async fn record_payment(&self, id: Uuid, amount_cents: i64) -> Result<Deal, DbError> {
        let updated: Option<Deal> = sqlx::query_as(&format!(
            r#"
            UPDATE deals SET
                paid_cents = paid_cents + $2,
                updated_at = NOW()
            WHERE id = $1 AND paid_cents + $2 <= amount_cents
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(amount_cents)
        .fetch_optional(self.pool)
        .await?;

        if let Some(deal) = updated {
            return Ok(deal);
        }

        let balance: Option<(i64, i64)> =
            sqlx::query_as("SELECT amount_cents, paid_cents FROM deals WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool)
                .await?;
        match balance {
            None => Err(DbError::not_found("deal", id)),
            Some((amount, paid)) => Err(DbError::Conflict(format!(
                "payment exceeds outstanding balance of {}",
                crate::models::money::format_cents(amount - paid)
            ))),
        }
    }

    /// Revenue and collected money of a tour, cancelled deals excluded.
    pub async fn totals_for_event(&self, event_id: Uuid) -> Result<DealTotals, DbError> {
        let totals = sqlx::query_as(
            r#"
            SELECT COUNT(*) AS deals,
                   COALESCE(SUM(amount_cents), 0)::BIGINT AS revenue_cents,
                   COALESCE(SUM(paid_cents), 0)::BIGINT AS collected_cents
            FROM deals
            WHERE event_id = $1 AND status <> 'cancelled'
            "#,
        )
        .bind(event_id)
        .fetch_one(self.pool)
        .await?;
        Ok(totals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deal(status: &str, amount: i64, paid: i64) -> Deal {
        Deal {
            id: Uuid::new_v4(),
            contact_id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            group_id: None,
            is_primary: true,
            status: status.into(),
            amount_cents: amount,
            paid_cents: paid,
            notes: None,
            bitrix_deal_id: None,
            bitrix_item_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn derived_state() {
        let d = deal("confirmed", 10_000, 2_500);
        assert_eq!(d.status(), DealStatus::Confirmed);
        assert_eq!(d.payment_state(), PaymentState::Partial);
        assert_eq!(deal("new", 10_000, 0).payment_state(), PaymentState::Unpaid);
    }
}
