//! Tourist (contact) requests

use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use super::text::{
    optional_email, optional_phone, optional_text, Email, Name, Phone, MAX_NAME_LEN,
    MAX_NOTES_LEN,
};
use super::ValidationError;

const MAX_PASSPORT_LEN: usize = 64;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateContactRequest {
    pub first_name: String,
    pub last_name: String,
    pub middle_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub passport: Option<String>,
    pub notes: Option<String>,
}

/// Validated contact insert
#[derive(Debug, Clone, PartialEq)]
pub struct NewContact {
    pub first_name: String,
    pub last_name: String,
    pub middle_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub passport: Option<String>,
    pub notes: Option<String>,
    pub lead_id: Option<uuid::Uuid>,
}

fn birth_date(value: Option<NaiveDate>) -> Result<Option<NaiveDate>, ValidationError> {
    match value {
        Some(date) if date > Utc::now().date_naive() => Err(ValidationError::out_of_range(
            "birth_date",
            "cannot be in the future",
        )),
        other => Ok(other),
    }
}

impl CreateContactRequest {
    pub fn validate(&self) -> Result<NewContact, ValidationError> {
        Ok(NewContact {
            first_name: Name::new("first_name", &self.first_name)?.into_string(),
            last_name: Name::new("last_name", &self.last_name)?.into_string(),
            middle_name: optional_text("middle_name", self.middle_name.as_deref(), MAX_NAME_LEN)?,
            phone: optional_phone(self.phone.as_deref())?,
            email: optional_email(self.email.as_deref())?,
            birth_date: birth_date(self.birth_date)?,
            passport: optional_text("passport", self.passport.as_deref(), MAX_PASSPORT_LEN)?,
            notes: optional_text("notes", self.notes.as_deref(), MAX_NOTES_LEN)?,
            lead_id: None,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateContactRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub middle_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub passport: Option<String>,
    pub notes: Option<String>,
}

/// Validated partial update; `None` leaves the column unchanged
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub middle_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub passport: Option<String>,
    pub notes: Option<String>,
}

impl UpdateContactRequest {
    pub fn validate(&self) -> Result<ContactPatch, ValidationError> {
        Ok(ContactPatch {
            first_name: self
                .first_name
                .as_deref()
                .map(|s| Name::new("first_name", s).map(Name::into_string))
                .transpose()?,
            last_name: self
                .last_name
                .as_deref()
                .map(|s| Name::new("last_name", s).map(Name::into_string))
                .transpose()?,
            middle_name: optional_text("middle_name", self.middle_name.as_deref(), MAX_NAME_LEN)?,
            phone: self
                .phone
                .as_deref()
                .map(|s| Phone::new(s).map(Phone::into_string))
                .transpose()?,
            email: self
                .email
                .as_deref()
                .map(|s| Email::new(s).map(Email::into_string))
                .transpose()?,
            birth_date: birth_date(self.birth_date)?,
            passport: optional_text("passport", self.passport.as_deref(), MAX_PASSPORT_LEN)?,
            notes: optional_text("notes", self.notes.as_deref(), MAX_NOTES_LEN)?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.middle_name.is_none()
            && self.phone.is_none()
            && self.email.is_none()
            && self.birth_date.is_none()
            && self.passport.is_none()
            && self.notes.is_none()
    }
}
