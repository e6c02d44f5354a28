//! Deal (booking) requests

use serde::Deserialize;
use uuid::Uuid;

use super::money;
use super::text::{optional_text, MAX_NOTES_LEN};
use super::{DealStatus, ValidationError};

#[derive(Debug, Deserialize)]
pub struct CreateDealRequest {
    pub contact_id: Uuid,
    pub event_id: Uuid,
    pub group_id: Option<Uuid>,
    pub is_primary: Option<bool>,
    pub status: Option<String>,
    /// Defaults to the tour price
    pub amount_cents: Option<i64>,
    pub paid_cents: Option<i64>,
    pub notes: Option<String>,
}

/// Validated deal insert
#[derive(Debug, Clone, PartialEq)]
pub struct NewDeal {
    pub contact_id: Uuid,
    pub event_id: Uuid,
    pub group_id: Option<Uuid>,
    pub is_primary: bool,
    pub status: DealStatus,
    /// `None` until resolved against the tour price
    pub amount_cents: Option<i64>,
    pub paid_cents: i64,
    pub notes: Option<String>,
}

impl NewDeal {
    /// Deal for `contact_id` on `event_id` with defaults.
    pub fn for_tourist(contact_id: Uuid, event_id: Uuid) -> Self {
        Self {
            contact_id,
            event_id,
            group_id: None,
            is_primary: true,
            status: DealStatus::New,
            amount_cents: None,
            paid_cents: 0,
            notes: None,
        }
    }
}

/// Paid amount must stay within `0..=amount`.
pub fn check_paid(amount_cents: i64, paid_cents: i64) -> Result<(), ValidationError> {
    if paid_cents < 0 {
        return Err(ValidationError::out_of_range("paid_cents", "must not be negative"));
    }
    if paid_cents > amount_cents {
        return Err(ValidationError::out_of_range(
            "paid_cents",
            format!(
                "paid {} exceeds deal amount {}",
                money::format_cents(paid_cents),
                money::format_cents(amount_cents)
            ),
        ));
    }
    Ok(())
}

impl CreateDealRequest {
    pub fn validate(&self) -> Result<NewDeal, ValidationError> {
        Ok(NewDeal {
            contact_id: self.contact_id,
            event_id: self.event_id,
            group_id: self.group_id,
            is_primary: self.is_primary.unwrap_or(true),
            status: match self.status.as_deref() {
                Some(s) => DealStatus::parse(s)?,
                None => DealStatus::New,
            },
            amount_cents: self
                .amount_cents
                .map(|a| money::non_negative("amount_cents", a))
                .transpose()?,
            paid_cents: money::non_negative("paid_cents", self.paid_cents.unwrap_or(0))?,
            notes: optional_text("notes", self.notes.as_deref(), MAX_NOTES_LEN)?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateDealRequest {
    pub group_id: Option<Uuid>,
    pub is_primary: Option<bool>,
    pub status: Option<String>,
    pub amount_cents: Option<i64>,
    pub notes: Option<String>,
}

/// Validated partial update; `None` leaves the column unchanged
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DealPatch {
    pub group_id: Option<Uuid>,
    pub is_primary: Option<bool>,
    pub status: Option<DealStatus>,
    pub amount_cents: Option<i64>,
    pub notes: Option<String>,
}

impl UpdateDealRequest {
    pub fn validate(&self) -> Result<DealPatch, ValidationError> {
        Ok(DealPatch {
            group_id: self.group_id,
            is_primary: self.is_primary,
            status: self.status.as_deref().map(DealStatus::parse).transpose()?,
            amount_cents: self
                .amount_cents
                .map(|a| money::non_negative("amount_cents", a))
                .transpose()?,
            notes: optional_text("notes", self.notes.as_deref(), MAX_NOTES_LEN)?,
        })
    }
}

/// POST /api/deals/{id}/payments
#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub amount_cents: i64,
}

impl PaymentRequest {
    pub fn validate(&self) -> Result<i64, ValidationError> {
        money::positive("amount_cents", self.amount_cents)
    }
}
