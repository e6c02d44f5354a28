//! Lead intake and workflow requests

use serde::Deserialize;
use uuid::Uuid;

use super::text::{
    optional_email, optional_phone, optional_text, Email, Name, Phone, Slug, MAX_NAME_LEN,
    MAX_NOTES_LEN,
};
use super::{LeadStatus, ValidationError};

/// Source recorded for leads created through public booking forms
pub const SOURCE_FORM: &str = "form";

/// Source recorded when staff enter a lead without choosing one
pub const SOURCE_MANUAL: &str = "manual";

const MAX_GROUP_SIZE: i32 = 50;

#[derive(Debug, Default, Deserialize)]
pub struct CreateLeadRequest {
    pub first_name: String,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub source: Option<String>,
    pub event_id: Option<Uuid>,
    pub assigned_to: Option<Uuid>,
    pub group_size: Option<i32>,
    pub notes: Option<String>,
}

/// Validated lead insert
#[derive(Debug, Clone, PartialEq)]
pub struct NewLead {
    pub first_name: String,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub source: String,
    pub event_id: Option<Uuid>,
    pub form_id: Option<Uuid>,
    pub assigned_to: Option<Uuid>,
    pub group_size: i32,
    pub notes: Option<String>,
}

fn group_size(value: Option<i32>) -> Result<i32, ValidationError> {
    let size = value.unwrap_or(1);
    if !(1..=MAX_GROUP_SIZE).contains(&size) {
        return Err(ValidationError::out_of_range(
            "group_size",
            format!("must be between 1 and {}", MAX_GROUP_SIZE),
        ));
    }
    Ok(size)
}

impl CreateLeadRequest {
    pub fn validate(&self) -> Result<NewLead, ValidationError> {
        let phone = optional_phone(self.phone.as_deref())?;
        let email = optional_email(self.email.as_deref())?;

        if phone.is_none() && email.is_none() {
            return Err(ValidationError::InvalidFormat {
                field: "contact",
                reason: "phone or email is required",
            });
        }

        let source = match self.source.as_deref().map(str::trim) {
            None | Some("") => SOURCE_MANUAL.to_owned(),
            Some(s) => Slug::new("source", &s.to_lowercase())?.into_string(),
        };

        Ok(NewLead {
            first_name: Name::new("first_name", &self.first_name)?.into_string(),
            last_name: optional_text("last_name", self.last_name.as_deref(), MAX_NAME_LEN)?,
            phone,
            email,
            source,
            event_id: self.event_id,
            form_id: None,
            assigned_to: self.assigned_to,
            group_size: group_size(self.group_size)?,
            notes: optional_text("notes", self.notes.as_deref(), MAX_NOTES_LEN)?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateLeadRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub source: Option<String>,
    pub event_id: Option<Uuid>,
    pub assigned_to: Option<Uuid>,
    pub group_size: Option<i32>,
    pub notes: Option<String>,
}

/// Validated partial update; `None` leaves the column unchanged
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeadPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub source: Option<String>,
    pub event_id: Option<Uuid>,
    pub assigned_to: Option<Uuid>,
    pub group_size: Option<i32>,
    pub notes: Option<String>,
}

impl UpdateLeadRequest {
    pub fn validate(&self) -> Result<LeadPatch, ValidationError> {
        Ok(LeadPatch {
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
            source: self
                .source
                .as_deref()
                .map(|s| Slug::new("source", &s.trim().to_lowercase()).map(Slug::into_string))
                .transpose()?,
            event_id: self.event_id,
            assigned_to: self.assigned_to,
            group_size: self.group_size.map(|g| group_size(Some(g))).transpose()?,
            notes: optional_text("notes", self.notes.as_deref(), MAX_NOTES_LEN)?,
        })
    }
}

/// POST /api/leads/{id}/status
#[derive(Debug, Deserialize)]
pub struct ChangeStatusRequest {
    pub status: String,
    pub note: Option<String>,
}

impl ChangeStatusRequest {
    /// Parse the requested status and trimmed note.
    ///
    /// `converted` is refused here; conversion has its own endpoint.
    pub fn validate(&self) -> Result<(LeadStatus, Option<String>), ValidationError> {
        let status = LeadStatus::parse(&self.status)?;
        if status == LeadStatus::Converted {
            return Err(ValidationError::InvalidFormat {
                field: "status",
                reason: "use the convert endpoint to convert a lead",
            });
        }
        Ok((status, optional_text("note", self.note.as_deref(), MAX_NOTES_LEN)?))
    }
}

/// POST /api/leads/{id}/convert
#[derive(Debug, Default, Deserialize)]
pub struct ConvertLeadRequest {
    /// Tour for the new deal; defaults to the lead's tour
    pub event_id: Option<Uuid>,
    /// Deal amount; defaults to the tour price
    pub amount_cents: Option<i64>,
    /// Surname for the contact when the lead has none
    pub last_name: Option<String>,
    /// Push the new tourist to Bitrix24 after conversion
    #[serde(default)]
    pub sync_to_bitrix: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> CreateLeadRequest {
        CreateLeadRequest {
            first_name: "Anna".into(),
            phone: Some("+7 900 111-22-33".into()),
            ..Default::default()
        }
    }

    #[test]
    fn valid_lead_gets_defaults() {
        let lead = base().validate().unwrap();
        assert_eq!(lead.phone.as_deref(), Some("+79001112233"));
        assert_eq!(lead.source, SOURCE_MANUAL);
        assert_eq!(lead.group_size, 1);
        assert!(lead.form_id.is_none());
    }

    #[test]
    fn requires_phone_or_email() {
        let req = CreateLeadRequest {
            phone: None,
            email: Some("  ".into()),
            ..base()
        };
        assert!(matches!(
            req.validate(),
            Err(ValidationError::InvalidFormat { field: "contact", .. })
        ));

        let req = CreateLeadRequest {
            phone: None,
            email: Some("anna@example.com".into()),
            ..base()
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn source_is_normalized() {
        let req = CreateLeadRequest {
            source: Some(" Instagram ".into()),
            ..base()
        };
        assert_eq!(req.validate().unwrap().source, "instagram");
    }

    #[test]
    fn group_size_bounds() {
        let req = CreateLeadRequest {
            group_size: Some(0),
            ..base()
        };
        assert!(req.validate().is_err());

        let req = CreateLeadRequest {
            group_size: Some(51),
            ..base()
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn status_request_refuses_conversion() {
        let req = ChangeStatusRequest {
            status: "converted".into(),
            note: None,
        };
        assert!(req.validate().is_err());

        let req = ChangeStatusRequest {
            status: "contacted".into(),
            note: Some(" called back ".into()),
        };
        let (status, note) = req.validate().unwrap();
        assert_eq!(status, LeadStatus::Contacted);
        assert_eq!(note.as_deref(), Some("called back"));
    }

    #[test]
    fn patch_rejects_blank_name() {
        let req = UpdateLeadRequest {
            first_name: Some(" ".into()),
            ..Default::default()
        };
        assert!(req.validate().is_err());
    }
}
