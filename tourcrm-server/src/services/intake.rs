//! Public booking form intake

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::db::repos::{forms, leads, notifications};
use crate::db::{Form, FormRepo};
use crate::models::form::validate_submission;
use crate::models::lead::{CreateLeadRequest, NewLead, SOURCE_FORM};
use crate::models::{NewNotification, ValidationError};

use super::Result;

/// Acknowledgement returned to the public client
#[derive(Debug, Clone, Serialize)]
pub struct Submitted {
    pub submission_id: Uuid,
    pub lead_id: Uuid,
}

/// Map validated form values onto a lead from `form`.
fn lead_from_values(form: &Form, values: &BTreeMap<String, String>) -> std::result::Result<NewLead, ValidationError> {
    let text = |key: &str| values.get(key).cloned();

    let group_size = values
        .get("group_size")
        .map(|raw| {
            raw.parse::<i32>()
                .map_err(|_| ValidationError::field("group_size", "must be a whole number"))
        })
        .transpose()?;

    let request = CreateLeadRequest {
        first_name: text("first_name").unwrap_or_default(),
        last_name: text("last_name"),
        phone: text("phone"),
        email: text("email"),
        source: Some(SOURCE_FORM.to_owned()),
        event_id: form.event_id,
        assigned_to: None,
        group_size,
        notes: text("notes"),
    };

    Ok(NewLead {
        form_id: Some(form.id),
        ..request.validate()?
    })
}

/// Accept a submission for the active form `slug`.
///
/// Stores the lead, the normalized submission and a broadcast
/// `form_submission` notification in one transaction.
pub async fn submit_form(pool: &PgPool, slug: &str, data: &Map<String, Value>) -> Result<Submitted> {
    let form = FormRepo::new(pool).get_active_by_slug(slug).await?;
    let values = validate_submission(&form.fields, data)?;
    let new_lead = lead_from_values(&form, &values)?;

    let stored: Value = values
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect::<Map<_, _>>()
        .into();

    let mut tx = pool.begin().await?;
    let lead = leads::insert(&mut tx, &new_lead).await?;
    let submission = forms::insert_submission(&mut tx, form.id, lead.id, &stored).await?;
    notifications::insert(
        &mut tx,
        &NewNotification::form_submission(lead.id, &lead.display_name(), &form.name),
    )
    .await?;
    tx.commit().await?;

    info!(form = %form.slug, lead_id = %lead.id, "Booking form submitted");
    Ok(Submitted {
        submission_id: submission.id,
        lead_id: lead.id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FieldKind, FormField};
    use chrono::Utc;
    use sqlx::types::Json;

    fn field(key: &str, kind: FieldKind, required: bool) -> FormField {
        FormField {
            key: key.into(),
            label: key.into(),
            kind,
            required,
            options: Vec::new(),
        }
    }

    fn form() -> Form {
        Form {
            id: Uuid::new_v4(),
            name: "Altai summer".into(),
            slug: "altai-summer".into(),
            event_id: Some(Uuid::new_v4()),
            description: None,
            fields: Json(vec![
                field("first_name", FieldKind::Text, true),
                field("phone", FieldKind::Phone, true),
                field("group_size", FieldKind::Number, false),
                field("diet", FieldKind::Text, false),
            ]),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn maps_known_keys_onto_lead() {
        let form = form();
        let lead = lead_from_values(
            &form,
            &values(&[
                ("first_name", "Maria"),
                ("phone", "+79001234567"),
                ("group_size", "3"),
                ("diet", "vegan"),
            ]),
        )
        .unwrap();

        assert_eq!(lead.first_name, "Maria");
        assert_eq!(lead.source, SOURCE_FORM);
        assert_eq!(lead.form_id, Some(form.id));
        assert_eq!(lead.event_id, form.event_id);
        assert_eq!(lead.group_size, 3);
        assert!(lead.notes.is_none());
    }

    #[test]
    fn fractional_group_size_rejected() {
        let err = lead_from_values(
            &form(),
            &values(&[("first_name", "Maria"), ("phone", "+79001234567"), ("group_size", "2.5")]),
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::Field { ref field, .. } if field == "group_size"));
    }

    #[test]
    fn submission_flows_through_field_validation() {
        let form = form();
        let mut data = Map::new();
        data.insert("first_name".into(), Value::from(" Maria "));
        data.insert("phone".into(), Value::from("+7 (900) 123-45-67"));
        data.insert("utm_source".into(), Value::from("ads"));

        let values = validate_submission(&form.fields, &data).unwrap();
        assert!(!values.contains_key("utm_source"));

        let lead = lead_from_values(&form, &values).unwrap();
        assert_eq!(lead.phone.as_deref(), Some("+79001234567"));
    }
}
