//! Tour expense repository

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::models::expense::{ExpensePatch, NewExpense};

use super::DbError;

/// Expense record from database
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Expense {
    pub id: Uuid,
    pub event_id: Uuid,
    pub category: String,
    pub description: Option<String>,
    pub amount_cents: i64,
    pub incurred_on: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Sum of expenses in one category
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub amount_cents: i64,
}

const COLUMNS: &str = "id, event_id, category, description, amount_cents, incurred_on, created_at";

/// Expense repository
pub struct ExpenseRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> ExpenseRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, event_id: Uuid, expense: &NewExpense) -> Result<Expense, DbError> {
        sqlx::query_as(&format!(
            r#"
            INSERT INTO expenses (event_id, category, description, amount_cents, incurred_on)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(event_id)
        .bind(&expense.category)
        .bind(&expense.description)
        .bind(expense.amount_cents)
        .bind(expense.incurred_on)
        .fetch_one(self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::Conflict(_) => DbError::not_found("event", event_id),
            other => other,
        })
    }

    /// Expenses of a tour by date.
    pub async fn list_for_event(&self, event_id: Uuid) -> Result<Vec<Expense>, DbError> {
        let rows = sqlx::query_as(&format!(
            r#"
            SELECT {COLUMNS} FROM expenses
            WHERE event_id = $1
            ORDER BY incurred_on, created_at
            "#
        ))
        .bind(event_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Per-category totals, largest first.
    pub async fn totals_by_category(&self, event_id: Uuid) -> Result<Vec<CategoryTotal>, DbError> {
        let rows = sqlx::query_as(
            r#"
            SELECT category, SUM(amount_cents)::BIGINT AS amount_cents
            FROM expenses
            WHERE event_id = $1
            GROUP BY category
            ORDER BY amount_cents DESC, category
            "#,
        )
        .bind(event_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn update(&self, id: Uuid, patch: &ExpensePatch) -> Result<Expense, DbError> {
        sqlx::query_as(&format!(
            r#"
            UPDATE expenses SET
                category = COALESCE($2, category),
                description = COALESCE($3, description),
                amount_cents = COALESCE($4, amount_cents),
                incurred_on = COALESCE($5, incurred_on)
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&patch.category)
        .bind(&patch.description)
        .bind(patch.amount_cents)
        .bind(patch.incurred_on)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("expense", id))
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM expenses WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("expense", id));
        }
        Ok(())
    }
}
