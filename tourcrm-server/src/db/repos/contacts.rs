//! Contact (tourist) repository

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::models::contact::{ContactPatch, NewContact};
use crate::models::{Paginated, Pagination};

use super::{into_page, like_pattern, Counted, DbError};

/// Contact record from database
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Contact {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub passport: Option<String>,
    pub notes: Option<String>,
    pub lead_id: Option<Uuid>,
    pub bitrix_contact_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contact {
    /// "Last First Middle", the order used on tour documents
    pub fn full_name(&self) -> String {
        let mut name = format!("{} {}", self.last_name, self.first_name);
        if let Some(middle) = &self.middle_name {
            name.push(' ');
            name.push_str(middle);
        }
        name
    }
}

const COLUMNS: &str = "id, first_name, last_name, middle_name, phone, email, birth_date, \
                       passport, notes, lead_id, bitrix_contact_id, created_at, updated_at";

pub async fn insert(conn: &mut PgConnection, contact: &NewContact) -> Result<Contact, DbError> {
    let row = sqlx::query_as(&format!(
        r#"
        INSERT INTO contacts
            (first_name, last_name, middle_name, phone, email, birth_date, passport, notes, lead_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(&contact.first_name)
    .bind(&contact.last_name)
    .bind(&contact.middle_name)
    .bind(&contact.phone)
    .bind(&contact.email)
    .bind(contact.birth_date)
    .bind(&contact.passport)
    .bind(&contact.notes)
    .bind(contact.lead_id)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

pub async fn set_bitrix_id(conn: &mut PgConnection, id: Uuid, bitrix_id: i64) -> Result<(), DbError> {
    sqlx::query("UPDATE contacts SET bitrix_contact_id = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(bitrix_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Contact repository
pub struct ContactRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> ContactRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, contact: &NewContact) -> Result<Contact, DbError> {
        let mut conn = self.pool.acquire().await?;
        insert(&mut conn, contact).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Contact, DbError> {
        sqlx::query_as(&format!("SELECT {COLUMNS} FROM contacts WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("contact", id))
    }

    /// List contacts alphabetically, optionally matching `q` against
    /// names, phone, e-mail and passport.
    pub async fn list(&self, q: Option<&str>, page: Pagination) -> Result<Paginated<Contact>, DbError> {
        let rows: Vec<Counted<Contact>> = sqlx::query_as(&format!(
            r#"
            SELECT {COLUMNS}, COUNT(*) OVER() AS total
            FROM contacts
            WHERE ($1::text IS NULL
                   OR first_name ILIKE $1
                   OR last_name ILIKE $1
                   OR middle_name ILIKE $1
                   OR phone ILIKE $1
                   OR email ILIKE $1
                   OR passport ILIKE $1)
            ORDER BY last_name, first_name, created_at
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(like_pattern(q))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;
        Ok(into_page(rows, page))
    }

    pub async fn update(&self, id: Uuid, patch: &ContactPatch) -> Result<Contact, DbError> {
        sqlx::query_as(&format!(
            r#"
            UPDATE contacts SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                middle_name = COALESCE($4, middle_name),
                phone = COALESCE($5, phone),
                email = COALESCE($6, email),
                birth_date = COALESCE($7, birth_date),
                passport = COALESCE($8, passport),
                notes = COALESCE($9, notes),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&patch.first_name)
        .bind(&patch.last_name)
        .bind(&patch.middle_name)
        .bind(&patch.phone)
        .bind(&patch.email)
        .bind(patch.birth_date)
        .bind(&patch.passport)
        .bind(&patch.notes)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("contact", id))
    }

    /// Delete a contact together with its deals and their visits.
    pub async fn delete(&self, id: Uuid) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM contacts WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("contact", id));
        }
        Ok(())
    }

    pub async fn set_bitrix_id(&self, id: Uuid, bitrix_id: i64) -> Result<(), DbError> {
        let mut conn = self.pool.acquire().await?;
        set_bitrix_id(&mut conn, id, bitrix_id).await
    }

    /// Contacts never pushed to Bitrix24, oldest first.
    pub async fn list_unsynced(&self, limit: i64) -> Result<Vec<Contact>, DbError> {
        let rows = sqlx::query_as(&format!(
            r#"
            SELECT {COLUMNS} FROM contacts
            WHERE bitrix_contact_id IS NULL
            ORDER BY created_at
            LIMIT $1
            "#
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_name_puts_surname_first() {
        let contact = Contact {
            id: Uuid::new_v4(),
            first_name: "Ivan".into(),
            last_name: "Petrov".into(),
            middle_name: Some("Sergeevich".into()),
            phone: None,
            email: None,
            birth_date: None,
            passport: None,
            notes: None,
            lead_id: None,
            bitrix_contact_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(contact.full_name(), "Petrov Ivan Sergeevich");
        let contact = Contact {
            middle_name: None,
            ..contact
        };
        assert_eq!(contact.full_name(), "Petrov Ivan");
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn search_matches_phone_fragment() {
        use crate::models::contact::CreateContactRequest;

        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = crate::db::create_pool(&url).await.unwrap();
        crate::db::migrations::run(&pool).await.unwrap();

        let repo = ContactRepo::new(&pool);
        let new = CreateContactRequest {
            first_name: "Ivan".into(),
            last_name: "Petrov".into(),
            phone: Some("+7 999 555 01 02".into()),
            ..Default::default()
        }
        .validate()
        .unwrap();
        let contact = repo.create(&new).await.unwrap();

        let page = repo.list(Some("9995550102"), Pagination::default()).await.unwrap();
        assert!(page.items.iter().any(|c| c.id == contact.id));
        repo.delete(contact.id).await.unwrap();
    }
}
