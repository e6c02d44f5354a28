//! Registering a tourist on a tour in one request

use serde::Deserialize;
use uuid::Uuid;

use super::contact::{CreateContactRequest, NewContact};
use super::deal::{CreateDealRequest, NewDeal};
use super::event::Itinerary;
use super::visit::{NewVisit, VisitRequest};
use super::ValidationError;

/// POST /api/events/{id}/tourists
///
/// Contact fields sit at the top level next to the booking fields.
#[derive(Debug, Deserialize)]
pub struct RegisterTouristRequest {
    #[serde(flatten)]
    pub contact: CreateContactRequest,
    pub group_id: Option<Uuid>,
    pub is_primary: Option<bool>,
    pub status: Option<String>,
    pub amount_cents: Option<i64>,
    pub paid_cents: Option<i64>,
    pub deal_notes: Option<String>,
    #[serde(default)]
    pub visits: Vec<VisitRequest>,
}

/// Validated registration: contact, booking and itinerary legs
#[derive(Debug, Clone, PartialEq)]
pub struct NewTourist {
    pub contact: NewContact,
    /// `contact_id` is a placeholder until the contact row exists
    pub deal: NewDeal,
    pub visits: Vec<NewVisit>,
}

impl RegisterTouristRequest {
    pub fn validate(&self, event_id: Uuid, itinerary: &Itinerary) -> Result<NewTourist, ValidationError> {
        let contact = self.contact.validate()?;

        let deal = CreateDealRequest {
            contact_id: Uuid::nil(),
            event_id,
            group_id: self.group_id,
            is_primary: self.is_primary,
            status: self.status.clone(),
            amount_cents: self.amount_cents,
            paid_cents: self.paid_cents,
            notes: self.deal_notes.clone(),
        }
        .validate()?;

        let mut visits = Vec::with_capacity(self.visits.len());
        for request in &self.visits {
            let visit = request.validate(itinerary)?;
            if visits.iter().any(|v: &NewVisit| v.city == visit.city) {
                return Err(ValidationError::field(
                    "visits",
                    format!("{} listed twice", visit.city),
                ));
            }
            visits.push(visit);
        }

        Ok(NewTourist {
            contact,
            deal,
            visits,
        })
    }
}
