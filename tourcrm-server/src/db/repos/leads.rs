//! Lead repository
//!
//! Status changes always append to `lead_status_history` in the same
//! transaction as the update.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::models::lead::{LeadPatch, NewLead};
use crate::models::{LeadStatus, Paginated, Pagination};

use super::{into_page, like_pattern, missing_reference, Counted, DbError};

/// Lead record from database
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Lead {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub source: String,
    pub status: String,
    pub event_id: Option<Uuid>,
    pub form_id: Option<Uuid>,
    pub assigned_to: Option<Uuid>,
    pub group_size: i32,
    pub notes: Option<String>,
    pub contact_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    /// Stored status; rows are guarded by a CHECK constraint.
    pub fn status(&self) -> LeadStatus {
        LeadStatus::parse(&self.status).unwrap_or(LeadStatus::New)
    }

    pub fn display_name(&self) -> String {
        match &self.last_name {
            Some(last) => format!("{} {}", self.first_name, last),
            None => self.first_name.clone(),
        }
    }
}

/// One entry of a lead's status history
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LeadStatusChange {
    pub id: Uuid,
    pub lead_id: Uuid,
    pub from_status: Option<String>,
    pub to_status: String,
    pub note: Option<String>,
    pub changed_at: DateTime<Utc>,
}

/// Filters for listing leads (query string of `GET /api/leads`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeadFilter {
    pub status: Option<String>,
    pub source: Option<String>,
    pub assigned_to: Option<Uuid>,
    pub event_id: Option<Uuid>,
    pub q: Option<String>,
}

const COLUMNS: &str = "id, first_name, last_name, phone, email, source, status, event_id, \
                       form_id, assigned_to, group_size, notes, contact_id, created_at, updated_at";

/// Insert a lead with status `new` and its first history row.
pub async fn insert(conn: &mut PgConnection, lead: &NewLead) -> Result<Lead, DbError> {
    let row: Lead = sqlx::query_as(&format!(
        r#"
        INSERT INTO leads
            (first_name, last_name, phone, email, source, event_id, form_id,
             assigned_to, group_size, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(&lead.first_name)
    .bind(&lead.last_name)
    .bind(&lead.phone)
    .bind(&lead.email)
    .bind(&lead.source)
    .bind(lead.event_id)
    .bind(lead.form_id)
    .bind(lead.assigned_to)
    .bind(lead.group_size)
    .bind(&lead.notes)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| {
        missing_reference(
            e,
            &[
                ("leads_event_id_fkey", "event", lead.event_id),
                ("leads_form_id_fkey", "form", lead.form_id),
                ("leads_assigned_to_fkey", "user", lead.assigned_to),
            ],
        )
    })?;

    append_history(conn, row.id, None, LeadStatus::New, None).await?;
    Ok(row)
}

/// Lock a lead row for the rest of the transaction.
pub async fn lock(conn: &mut PgConnection, id: Uuid) -> Result<Lead, DbError> {
    sqlx::query_as(&format!("SELECT {COLUMNS} FROM leads WHERE id = $1 FOR UPDATE"))
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| DbError::not_found("lead", id))
}

/// Set status (and, on conversion, the contact) without touching history.
pub async fn set_status(
    conn: &mut PgConnection,
    id: Uuid,
    status: LeadStatus,
    contact_id: Option<Uuid>,
) -> Result<Lead, DbError> {
    sqlx::query_as(&format!(
        r#"
        UPDATE leads SET
            status = $2,
            contact_id = COALESCE($3, contact_id),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(status.as_str())
    .bind(contact_id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| DbError::not_found("lead", id))
}

pub async fn apply_patch(conn: &mut PgConnection, id: Uuid, patch: &LeadPatch) -> Result<Lead, DbError> {
    sqlx::query_as(&format!(
        r#"
        UPDATE leads SET
            first_name = COALESCE($2, first_name),
            last_name = COALESCE($3, last_name),
            phone = COALESCE($4, phone),
            email = COALESCE($5, email),
            source = COALESCE($6, source),
            event_id = COALESCE($7, event_id),
            assigned_to = COALESCE($8, assigned_to),
            group_size = COALESCE($9, group_size),
            notes = COALESCE($10, notes),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(&patch.first_name)
    .bind(&patch.last_name)
    .bind(&patch.phone)
    .bind(&patch.email)
    .bind(&patch.source)
    .bind(patch.event_id)
    .bind(patch.assigned_to)
    .bind(patch.group_size)
    .bind(&patch.notes)
    .fetch_optional(conn)
    .await
    .map_err(|e| {
        missing_reference(
            e,
            &[
                ("leads_event_id_fkey", "event", patch.event_id),
                ("leads_assigned_to_fkey", "user", patch.assigned_to),
            ],
        )
    })?
    .ok_or_else(|| DbError::not_found("lead", id))
}

pub async fn append_history(
    conn: &mut PgConnection,
    lead_id: Uuid,
    from: Option<LeadStatus>,
    to: LeadStatus,
    note: Option<&str>,
) -> Result<(), DbError> {
    sqlx::query(
        r#"
        INSERT INTO lead_status_history (lead_id, from_status, to_status, note)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(lead_id)
    .bind(from.map(|s| s.as_str()))
    .bind(to.as_str())
    .bind(note)
    .execute(conn)
    .await?;
    Ok(())
}

/// Lead repository
pub struct LeadRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> LeadRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a lead and its initial history row atomically.
    pub async fn create(&self, lead: &NewLead) -> Result<Lead, DbError> {
        let mut tx = self.pool.begin().await?;
        let row = insert(&mut tx, lead).await?;
        tx.commit().await?;
        Ok(row)
    }

    pub async fn get(&self, id: Uuid) -> Result<Lead, DbError> {
        sqlx::query_as(&format!("SELECT {COLUMNS} FROM leads WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("lead", id))
    }

    /// List leads, newest first.
    ///
    /// `q` matches first/last name, phone and e-mail case-insensitively.
    pub async fn list(&self, filter: &LeadFilter, page: Pagination) -> Result<Paginated<Lead>, DbError> {
        let rows: Vec<Counted<Lead>> = sqlx::query_as(&format!(
            r#"
            SELECT {COLUMNS}, COUNT(*) OVER() AS total
            FROM leads
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::text IS NULL OR source = $2)
              AND ($3::uuid IS NULL OR assigned_to = $3)
              AND ($4::uuid IS NULL OR event_id = $4)
              AND ($5::text IS NULL
                   OR first_name ILIKE $5
                   OR last_name ILIKE $5
                   OR phone ILIKE $5
                   OR email ILIKE $5)
            ORDER BY created_at DESC
            LIMIT $6 OFFSET $7
            "#
        ))
        .bind(filter.status.as_deref())
        .bind(filter.source.as_deref())
        .bind(filter.assigned_to)
        .bind(filter.event_id)
        .bind(like_pattern(filter.q.as_deref()))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;
        Ok(into_page(rows, page))
    }

    pub async fn update(&self, id: Uuid, patch: &LeadPatch) -> Result<Lead, DbError> {
        let mut conn = self.pool.acquire().await?;
        apply_patch(&mut conn, id, patch).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM leads WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("lead", id));
        }
        Ok(())
    }

    /// Status history, oldest first.
    pub async fn history(&self, id: Uuid) -> Result<Vec<LeadStatusChange>, DbError> {
        // Distinguish "no lead" from "no history"
        self.get(id).await?;
        let rows = sqlx::query_as(
            r#"
            SELECT id, lead_id, from_status, to_status, note, changed_at
            FROM lead_status_history
            WHERE lead_id = $1
            ORDER BY changed_at, id
            "#,
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Lead count per status; statuses without leads are omitted.
    pub async fn count_by_status(&self) -> Result<Vec<(String, i64)>, DbError> {
        let rows = sqlx::query_as(
            "SELECT status, COUNT(*) FROM leads GROUP BY status ORDER BY status",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn count_created_since(&self, since: DateTime<Utc>) -> Result<i64, DbError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM leads WHERE created_at >= $1")
            .bind(since)
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lead(last_name: Option<&str>) -> Lead {
        Lead {
            id: Uuid::new_v4(),
            first_name: "Anna".into(),
            last_name: last_name.map(str::to_owned),
            phone: Some("+79001112233".into()),
            email: None,
            source: "manual".into(),
            status: "qualified".into(),
            event_id: None,
            form_id: None,
            assigned_to: None,
            group_size: 1,
            notes: None,
            contact_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn display_name_includes_surname() {
        assert_eq!(lead(Some("Ivanova")).display_name(), "Anna Ivanova");
        assert_eq!(lead(None).display_name(), "Anna");
    }

    #[test]
    fn status_parses_stored_text() {
        assert_eq!(lead(None).status(), LeadStatus::Qualified);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn create_writes_initial_history() {
        use crate::models::lead::CreateLeadRequest;

        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = crate::db::create_pool(&url).await.unwrap();
        crate::db::migrations::run(&pool).await.unwrap();

        let repo = LeadRepo::new(&pool);
        let new = CreateLeadRequest {
            first_name: "Anna".into(),
            email: Some("anna@example.com".into()),
            ..Default::default()
        }
        .validate()
        .unwrap();

        let lead = repo.create(&new).await.unwrap();
        let history = repo.history(lead.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].to_status, "new");
        assert!(history[0].from_status.is_none());
        repo.delete(lead.id).await.unwrap();
    }
}
