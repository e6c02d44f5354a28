//! Staff users (lead assignees, notification recipients)

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::models::user::{NewUser, UserPatch};
use crate::models::{Paginated, Pagination};

use super::{into_page, Counted, DbError};

/// User record from database
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub email: Option<String>,
    pub role: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

const COLUMNS: &str = "id, username, full_name, email, role, is_active, created_at";

/// User repository
pub struct UserRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a user; duplicate usernames are a conflict.
    pub async fn create(&self, user: &NewUser) -> Result<User, DbError> {
        let row = sqlx::query_as(&format!(
            r#"
            INSERT INTO users (username, full_name, email, role)
            VALUES ($1, $2, $3, $4)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(&user.username)
        .bind(&user.full_name)
        .bind(&user.email)
        .bind(user.role.as_str())
        .fetch_one(self.pool)
        .await?;
        Ok(row)
    }

    pub async fn get(&self, id: Uuid) -> Result<User, DbError> {
        sqlx::query_as(&format!("SELECT {COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("user", id))
    }

    /// List users, active ones first.
    pub async fn list(&self, active_only: bool, page: Pagination) -> Result<Paginated<User>, DbError> {
        let rows: Vec<Counted<User>> = sqlx::query_as(&format!(
            r#"
            SELECT {COLUMNS}, COUNT(*) OVER() AS total
            FROM users
            WHERE ($1 = FALSE OR is_active)
            ORDER BY is_active DESC, full_name
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(active_only)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;
        Ok(into_page(rows, page))
    }

    pub async fn update(&self, id: Uuid, patch: &UserPatch) -> Result<User, DbError> {
        sqlx::query_as(&format!(
            r#"
            UPDATE users SET
                full_name = COALESCE($2, full_name),
                email = COALESCE($3, email),
                role = COALESCE($4, role),
                is_active = COALESCE($5, is_active)
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&patch.full_name)
        .bind(&patch.email)
        .bind(patch.role.map(|r| r.as_str()))
        .bind(patch.is_active)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("user", id))
    }

    /// Delete a user; assigned leads are unassigned by the foreign key.
    pub async fn delete(&self, id: Uuid) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("user", id));
        }
        Ok(())
    }

    /// Whether an active user with this id exists.
    pub async fn is_active(&self, id: Uuid) -> Result<bool, DbError> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1 AND is_active)")
                .bind(id)
                .fetch_one(self.pool)
                .await?;
        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::CreateUserRequest;

    // Integration tests - run with DATABASE_URL set
    // cargo test -p tourcrm-server -- --ignored

    async fn pool() -> PgPool {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = crate::db::create_pool(&url).await.unwrap();
        crate::db::migrations::run(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn duplicate_username_conflicts() {
        let pool = pool().await;
        let repo = UserRepo::new(&pool);
        let username = format!("u{}", &Uuid::new_v4().simple().to_string()[..12]);
        let new = CreateUserRequest {
            username: username.clone(),
            full_name: "Olga Petrova".into(),
            email: None,
            role: None,
        }
        .validate()
        .unwrap();

        let user = repo.create(&new).await.unwrap();
        assert_eq!(user.role, "manager");
        assert!(matches!(repo.create(&new).await, Err(DbError::Conflict(_))));

        repo.delete(user.id).await.unwrap();
        assert!(matches!(repo.get(user.id).await, Err(DbError::NotFound { .. })));
    }
}
