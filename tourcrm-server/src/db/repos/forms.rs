//! Booking form repository (definitions and stored submissions)

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::models::form::{FormPatch, NewForm};
use crate::models::{FormField, Paginated, Pagination};

use super::{into_page, missing_reference, Counted, DbError};

/// Form record from database
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Form {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub event_id: Option<Uuid>,
    pub description: Option<String>,
    pub fields: Json<Vec<FormField>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Raw submission as received
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FormSubmission {
    pub id: Uuid,
    pub form_id: Uuid,
    pub lead_id: Option<Uuid>,
    pub data: Value,
    pub created_at: DateTime<Utc>,
}

const COLUMNS: &str =
    "id, name, slug, event_id, description, fields, is_active, created_at, updated_at";

/// Name the taken slug or the missing tour instead of the raw constraint.
fn write_error(err: sqlx::Error, slug: &str, event_id: Option<Uuid>) -> DbError {
    match missing_reference(err, &[("forms_event_id_fkey", "event", event_id)]) {
        DbError::Conflict(msg) if msg.contains("forms_slug_key") => {
            DbError::Conflict(format!("form slug '{}' is already used", slug))
        }
        other => other,
    }
}

pub async fn insert_submission(
    conn: &mut PgConnection,
    form_id: Uuid,
    lead_id: Uuid,
    data: &Value,
) -> Result<FormSubmission, DbError> {
    let row = sqlx::query_as(
        r#"
        INSERT INTO form_submissions (form_id, lead_id, data)
        VALUES ($1, $2, $3)
        RETURNING id, form_id, lead_id, data, created_at
        "#,
    )
    .bind(form_id)
    .bind(lead_id)
    .bind(data)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

/// Form repository
pub struct FormRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> FormRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, form: &NewForm) -> Result<Form, DbError> {
        sqlx::query_as(&format!(
            r#"
            INSERT INTO forms (name, slug, event_id, description, fields, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(&form.name)
        .bind(&form.slug)
        .bind(form.event_id)
        .bind(&form.description)
        .bind(Json(&form.fields))
        .bind(form.is_active)
        .fetch_one(self.pool)
        .await
        .map_err(|e| write_error(e, &form.slug, form.event_id))
    }

    pub async fn get(&self, id: Uuid) -> Result<Form, DbError> {
        sqlx::query_as(&format!("SELECT {COLUMNS} FROM forms WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("form", id))
    }

    /// Active form by public slug; inactive forms are reported as missing.
    pub async fn get_active_by_slug(&self, slug: &str) -> Result<Form, DbError> {
        sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM forms WHERE slug = $1 AND is_active"
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("form", slug))
    }

    pub async fn list(&self, page: Pagination) -> Result<Paginated<Form>, DbError> {
        let rows: Vec<Counted<Form>> = sqlx::query_as(&format!(
            r#"
            SELECT {COLUMNS}, COUNT(*) OVER() AS total
            FROM forms
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;
        Ok(into_page(rows, page))
    }

    pub async fn update(&self, id: Uuid, patch: &FormPatch) -> Result<Form, DbError> {
        sqlx::query_as(&format!(
            r#"
            UPDATE forms SET
                name = COALESCE($2, name),
                slug = COALESCE($3, slug),
                event_id = COALESCE($4, event_id),
                description = COALESCE($5, description),
                fields = COALESCE($6, fields),
                is_active = COALESCE($7, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&patch.name)
        .bind(&patch.slug)
        .bind(patch.event_id)
        .bind(&patch.description)
        .bind(patch.fields.as_ref().map(Json))
        .bind(patch.is_active)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| write_error(e, patch.slug.as_deref().unwrap_or_default(), patch.event_id))?
        .ok_or_else(|| DbError::not_found("form", id))
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM forms WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("form", id));
        }
        Ok(())
    }

    /// Submissions of a form, newest first.
    pub async fn submissions(
        &self,
        form_id: Uuid,
        page: Pagination,
    ) -> Result<Paginated<FormSubmission>, DbError> {
        self.get(form_id).await?;
        let rows: Vec<Counted<FormSubmission>> = sqlx::query_as(
            r#"
            SELECT id, form_id, lead_id, data, created_at, COUNT(*) OVER() AS total
            FROM form_submissions
            WHERE form_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(form_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;
        Ok(into_page(rows, page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FieldKind;

    #[test]
    fn fields_serialize_as_plain_array() {
        let form = Form {
            id: Uuid::new_v4(),
            name: "Summer".into(),
            slug: "summer".into(),
            event_id: None,
            description: None,
            fields: Json(vec![FormField {
                key: "first_name".into(),
                label: "Name".into(),
                kind: FieldKind::Text,
                required: true,
                options: Vec::new(),
            }]),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&form).unwrap();
        assert_eq!(json["fields"][0]["key"], "first_name");
        assert_eq!(json["fields"][0]["kind"], "text");
        assert!(json["fields"][0].get("options").is_none());
    }
}
