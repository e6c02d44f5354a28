//! Notification repository
//!
//! A row with `user_id IS NULL` is a broadcast visible to every user; read
//! state is tracked per row, so marking a broadcast read hides it for all.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::models::{NewNotification, Paginated, Pagination};

use super::{into_page, Counted, DbError};

/// Notification record from database
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub kind: String,
    pub title: String,
    pub body: Option<String>,
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Query string of `GET /api/notifications`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationFilter {
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub unread_only: bool,
}

const COLUMNS: &str =
    "id, user_id, kind, title, body, entity_type, entity_id, is_read, created_at";

pub async fn insert(conn: &mut PgConnection, n: &NewNotification) -> Result<Notification, DbError> {
    let row = sqlx::query_as(&format!(
        r#"
        INSERT INTO notifications (user_id, kind, title, body, entity_type, entity_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(n.user_id)
    .bind(n.kind.as_str())
    .bind(&n.title)
    .bind(&n.body)
    .bind(n.entity_type)
    .bind(n.entity_id)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

/// Notification repository
pub struct NotificationRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> NotificationRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, n: &NewNotification) -> Result<Notification, DbError> {
        let mut conn = self.pool.acquire().await?;
        insert(&mut conn, n).await
    }

    /// Notifications for a user (their own plus broadcasts), newest first.
    ///
    /// Without a user every notification is listed.
    pub async fn list(
        &self,
        filter: &NotificationFilter,
        page: Pagination,
    ) -> Result<Paginated<Notification>, DbError> {
        let rows: Vec<Counted<Notification>> = sqlx::query_as(&format!(
            r#"
            SELECT {COLUMNS}, COUNT(*) OVER() AS total
            FROM notifications
            WHERE ($1::uuid IS NULL OR user_id = $1 OR user_id IS NULL)
              AND ($2 = FALSE OR NOT is_read)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(filter.user_id)
        .bind(filter.unread_only)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;
        Ok(into_page(rows, page))
    }

    pub async fn mark_read(&self, id: Uuid) -> Result<Notification, DbError> {
        sqlx::query_as(&format!(
            "UPDATE notifications SET is_read = TRUE WHERE id = $1 RETURNING {COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("notification", id))
    }

    /// Mark everything visible to `user_id` read; returns the number changed.
    pub async fn mark_all_read(&self, user_id: Option<Uuid>) -> Result<u64, DbError> {
        let result = sqlx::query(
            r#"
            UPDATE notifications SET is_read = TRUE
            WHERE NOT is_read
              AND ($1::uuid IS NULL OR user_id = $1 OR user_id IS NULL)
            "#,
        )
        .bind(user_id)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn count_unread(&self, user_id: Option<Uuid>) -> Result<i64, DbError> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM notifications
            WHERE NOT is_read
              AND ($1::uuid IS NULL OR user_id = $1 OR user_id IS NULL)
            "#,
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_defaults_to_everything() {
        let filter: NotificationFilter = serde_json::from_str("{}").unwrap();
        assert!(filter.user_id.is_none());
        assert!(!filter.unread_only);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn broadcast_visible_to_any_user() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = crate::db::create_pool(&url).await.unwrap();
        crate::db::migrations::run(&pool).await.unwrap();

        let repo = NotificationRepo::new(&pool);
        let created = repo
            .create(&NewNotification::new_lead(Uuid::new_v4(), "Anna", "form"))
            .await
            .unwrap();

        let filter = NotificationFilter {
            user_id: Some(Uuid::new_v4()),
            unread_only: true,
        };
        let page = repo.list(&filter, Pagination::new(1, 200)).await.unwrap();
        assert!(page.items.iter().any(|n| n.id == created.id));

        let read = repo.mark_read(created.id).await.unwrap();
        assert!(read.is_read);
    }
}
