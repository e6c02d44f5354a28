//! Dictionary repository

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::models::dictionary::{EntryPatch, NewEntry};

use super::DbError;

/// Dictionary entry from database
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DictionaryEntry {
    pub id: Uuid,
    pub kind: String,
    pub value: String,
    pub label: String,
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

const COLUMNS: &str = "id, kind, value, label, sort_order, is_active, created_at";

/// Dictionary repository
pub struct DictionaryRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> DictionaryRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, entry: &NewEntry) -> Result<DictionaryEntry, DbError> {
        sqlx::query_as(&format!(
            r#"
            INSERT INTO dictionaries (kind, value, label, sort_order, is_active)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(&entry.kind)
        .bind(&entry.value)
        .bind(&entry.label)
        .bind(entry.sort_order)
        .bind(entry.is_active)
        .fetch_one(self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::Conflict(_) => DbError::Conflict(format!(
                "{} '{}' already exists",
                entry.kind, entry.value
            )),
            other => other,
        })
    }

    /// Entries ordered by kind, then `sort_order`, then label.
    ///
    /// Dictionaries are small, so the list is not paginated.
    pub async fn list(
        &self,
        kind: Option<&str>,
        active_only: bool,
    ) -> Result<Vec<DictionaryEntry>, DbError> {
        let rows = sqlx::query_as(&format!(
            r#"
            SELECT {COLUMNS} FROM dictionaries
            WHERE ($1::text IS NULL OR kind = $1)
              AND ($2 = FALSE OR is_active)
            ORDER BY kind, sort_order, label
            "#
        ))
        .bind(kind)
        .bind(active_only)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn update(&self, id: Uuid, patch: &EntryPatch) -> Result<DictionaryEntry, DbError> {
        sqlx::query_as(&format!(
            r#"
            UPDATE dictionaries SET
                label = COALESCE($2, label),
                sort_order = COALESCE($3, sort_order),
                is_active = COALESCE($4, is_active)
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&patch.label)
        .bind(patch.sort_order)
        .bind(patch.is_active)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("dictionary entry", id))
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM dictionaries WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("dictionary entry", id));
        }
        Ok(())
    }
}
