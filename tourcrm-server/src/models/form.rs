//! Public booking forms: field definitions and submission checks

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::text::{optional_text, Email, Name, Phone, Slug, MAX_NOTES_LEN};
use super::{FieldKind, ValidationError};

const MAX_FIELDS: usize = 40;
const MAX_VALUE_LEN: usize = 2000;

static FIELD_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]{0,63}$").expect("invalid field key regex"));

/// Keys every form must define so a lead can be created from it
pub const REQUIRED_KEYS: &[&str] = &["first_name"];

/// At least one of these keys must be defined
pub const CONTACT_KEYS: &[&str] = &["phone", "email"];

/// One input of a booking form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    pub key: String,
    pub label: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    /// Allowed values for `select` fields
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

/// Check a form's field list.
pub fn validate_fields(fields: &[FormField]) -> Result<(), ValidationError> {
    if fields.is_empty() {
        return Err(ValidationError::Empty { field: "fields" });
    }
    if fields.len() > MAX_FIELDS {
        return Err(ValidationError::out_of_range(
            "fields",
            format!("at most {} fields per form", MAX_FIELDS),
        ));
    }

    let mut seen = HashSet::new();
    for field in fields {
        if !FIELD_KEY_RE.is_match(&field.key) {
            return Err(ValidationError::field(
                &field.key,
                "key must be lowercase letters, digits and underscores, starting with a letter",
            ));
        }
        if !seen.insert(field.key.as_str()) {
            return Err(ValidationError::field(&field.key, "key used twice"));
        }
        if field.label.trim().is_empty() {
            return Err(ValidationError::field(&field.key, "label cannot be empty"));
        }
        if field.kind == FieldKind::Select && field.options.is_empty() {
            return Err(ValidationError::field(&field.key, "select field needs options"));
        }
    }

    for key in REQUIRED_KEYS {
        if !seen.contains(key) {
            return Err(ValidationError::field(*key, "form must define this field"));
        }
    }
    if !CONTACT_KEYS.iter().any(|k| seen.contains(k)) {
        return Err(ValidationError::field(
            "phone",
            "form must define a phone or email field",
        ));
    }

    Ok(())
}

/// Render a submitted JSON value as text; objects and arrays are refused.
fn scalar_text(key: &str, value: &Value) -> Result<Option<String>, ValidationError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s.trim().to_owned())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        _ => Err(ValidationError::field(key, "must be a single value")),
    }
}

/// Validate submitted values against the form definition.
///
/// Returns normalized values for defined fields only; unknown keys are
/// dropped. Phones and e-mails come back normalized.
pub fn validate_submission(
    fields: &[FormField],
    data: &Map<String, Value>,
) -> Result<BTreeMap<String, String>, ValidationError> {
    let mut values = BTreeMap::new();

    for field in fields {
        let raw = match data.get(&field.key) {
            Some(value) => scalar_text(&field.key, value)?,
            None => None,
        };

        let Some(raw) = raw else {
            if field.required {
                return Err(ValidationError::field(&field.key, "is required"));
            }
            continue;
        };

        if raw.chars().count() > MAX_VALUE_LEN {
            return Err(ValidationError::field(
                &field.key,
                format!("exceeds {} characters", MAX_VALUE_LEN),
            ));
        }

        let normalized = match field.kind {
            FieldKind::Text => raw,
            FieldKind::Email => Email::new(&raw)
                .map_err(|e| ValidationError::field(&field.key, e.to_string()))?
                .into_string(),
            FieldKind::Phone => Phone::new(&raw)
                .map_err(|e| ValidationError::field(&field.key, e.to_string()))?
                .into_string(),
            FieldKind::Date => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .map_err(|_| ValidationError::field(&field.key, "must be a date (YYYY-MM-DD)"))?
                .to_string(),
            FieldKind::Number => {
                raw.parse::<f64>()
                    .ok()
                    .filter(|n| n.is_finite())
                    .ok_or_else(|| ValidationError::field(&field.key, "must be a number"))?;
                raw
            }
            FieldKind::Select => {
                if !field.options.iter().any(|o| o == &raw) {
                    return Err(ValidationError::field(
                        &field.key,
                        format!("must be one of: {}", field.options.join(", ")),
                    ));
                }
                raw
            }
        };

        values.insert(field.key.clone(), normalized);
    }

    Ok(values)
}

#[derive(Debug, Deserialize)]
pub struct CreateFormRequest {
    pub name: String,
    pub slug: String,
    pub event_id: Option<Uuid>,
    pub description: Option<String>,
    pub fields: Vec<FormField>,
    pub is_active: Option<bool>,
}

/// Validated form insert
#[derive(Debug, Clone, PartialEq)]
pub struct NewForm {
    pub name: String,
    pub slug: String,
    pub event_id: Option<Uuid>,
    pub description: Option<String>,
    pub fields: Vec<FormField>,
    pub is_active: bool,
}

impl CreateFormRequest {
    pub fn validate(&self) -> Result<NewForm, ValidationError> {
        validate_fields(&self.fields)?;
        Ok(NewForm {
            name: Name::new("name", &self.name)?.into_string(),
            slug: Slug::new("slug", self.slug.trim())?.into_string(),
            event_id: self.event_id,
            description: optional_text("description", self.description.as_deref(), MAX_NOTES_LEN)?,
            fields: self.fields.clone(),
            is_active: self.is_active.unwrap_or(true),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateFormRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub event_id: Option<Uuid>,
    pub description: Option<String>,
    pub fields: Option<Vec<FormField>>,
    pub is_active: Option<bool>,
}

/// Validated partial update; `None` leaves the column unchanged
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormPatch {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub event_id: Option<Uuid>,
    pub description: Option<String>,
    pub fields: Option<Vec<FormField>>,
    pub is_active: Option<bool>,
}

impl UpdateFormRequest {
    pub fn validate(&self) -> Result<FormPatch, ValidationError> {
        if let Some(fields) = &self.fields {
            validate_fields(fields)?;
        }
        Ok(FormPatch {
            name: self
                .name
                .as_deref()
                .map(|s| Name::new("name", s).map(Name::into_string))
                .transpose()?,
            slug: self
                .slug
                .as_deref()
                .map(|s| Slug::new("slug", s.trim()).map(Slug::into_string))
                .transpose()?,
            event_id: self.event_id,
            description: optional_text("description", self.description.as_deref(), MAX_NOTES_LEN)?,
            fields: self.fields.clone(),
            is_active: self.is_active,
        })
    }
}
