//! Notification drafts raised by services

use uuid::Uuid;

use super::NotificationKind;

/// Notification to insert; `user_id: None` addresses every user
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub user_id: Option<Uuid>,
    pub kind: NotificationKind,
    pub title: String,
    pub body: Option<String>,
    pub entity_type: Option<&'static str>,
    pub entity_id: Option<Uuid>,
}

impl NewNotification {
    pub fn new_lead(lead_id: Uuid, name: &str, source: &str) -> Self {
        Self {
            user_id: None,
            kind: NotificationKind::NewLead,
            title: format!("New lead: {}", name),
            body: Some(format!("Source: {}", source)),
            entity_type: Some("lead"),
            entity_id: Some(lead_id),
        }
    }

    pub fn form_submission(lead_id: Uuid, name: &str, form_name: &str) -> Self {
        Self {
            user_id: None,
            kind: NotificationKind::FormSubmission,
            title: format!("Booking form \"{}\" submitted", form_name),
            body: Some(format!("New lead: {}", name)),
            entity_type: Some("lead"),
            entity_id: Some(lead_id),
        }
    }

    pub fn lead_assigned(user_id: Uuid, lead_id: Uuid, name: &str) -> Self {
        Self {
            user_id: Some(user_id),
            kind: NotificationKind::LeadAssigned,
            title: format!("Lead assigned to you: {}", name),
            body: None,
            entity_type: Some("lead"),
            entity_id: Some(lead_id),
        }
    }

    pub fn sync_failed(contact_id: Uuid, name: &str, error: &str) -> Self {
        Self {
            user_id: None,
            kind: NotificationKind::SyncFailed,
            title: format!("Bitrix24 sync failed for {}", name),
            body: Some(error.to_owned()),
            entity_type: Some("contact"),
            entity_id: Some(contact_id),
        }
    }
}
