//! Lead intake, workflow and conversion into a tourist booking

use serde::Serialize;
use sqlx::PgPool;
use tourcrm_bitrix::CrmGateway;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::repos::{contacts, leads, notifications};
use crate::db::{Contact, Deal, Lead};
use crate::models::contact::NewContact;
use crate::models::deal::NewDeal;
use crate::models::lead::{ConvertLeadRequest, LeadPatch, NewLead};
use crate::models::money;
use crate::models::text::Name;
use crate::models::{LeadStatus, NewNotification, ValidationError};

use super::sync::{sync_contact, SyncOutcome};
use super::{bookings, Result, ServiceError};

/// Create a lead (status `new`) and announce it.
pub async fn create_lead(pool: &PgPool, new: &NewLead) -> Result<Lead> {
    let mut tx = pool.begin().await?;
    let lead = leads::insert(&mut tx, new).await?;

    let name = lead.display_name();
    notifications::insert(&mut tx, &NewNotification::new_lead(lead.id, &name, &lead.source)).await?;
    if let Some(user_id) = lead.assigned_to {
        notifications::insert(&mut tx, &NewNotification::lead_assigned(user_id, lead.id, &name))
            .await?;
    }
    tx.commit().await?;

    info!(lead_id = %lead.id, source = %lead.source, "Lead created");
    Ok(lead)
}

/// Patch a lead; a new assignee gets a `lead_assigned` notification.
pub async fn update_lead(pool: &PgPool, id: Uuid, patch: &LeadPatch) -> Result<Lead> {
    let mut tx = pool.begin().await?;
    let before = leads::lock(&mut tx, id).await?;
    let lead = leads::apply_patch(&mut tx, id, patch).await?;

    if let Some(user_id) = lead.assigned_to.filter(|u| before.assigned_to != Some(*u)) {
        notifications::insert(
            &mut tx,
            &NewNotification::lead_assigned(user_id, lead.id, &lead.display_name()),
        )
        .await?;
    }
    tx.commit().await?;
    Ok(lead)
}

/// Move a lead through its workflow and record the change.
pub async fn change_status(
    pool: &PgPool,
    id: Uuid,
    status: LeadStatus,
    note: Option<&str>,
) -> Result<Lead> {
    let mut tx = pool.begin().await?;
    let lead = leads::lock(&mut tx, id).await?;
    let from = lead.status();
    let to = from.transition_to(status)?;

    let updated = leads::set_status(&mut tx, id, to, None).await?;
    leads::append_history(&mut tx, id, Some(from), to, note).await?;
    tx.commit().await?;

    info!(lead_id = %id, from = %from, to = %to, "Lead status changed");
    Ok(updated)
}

/// Result of converting a lead
#[derive(Debug, Clone, Serialize)]
pub struct Conversion {
    pub lead: Lead,
    pub contact: Contact,
    pub deal: Deal,
    /// Present when the Bitrix24 push was requested and succeeded
    pub bitrix: Option<SyncOutcome>,
    /// Present when the Bitrix24 push was requested and failed
    pub bitrix_error: Option<String>,
}

/// Contact fields taken over from a lead.
///
/// Contacts need a surname; `last_name` fills in when the lead has none.
fn contact_from_lead(lead: &Lead, last_name: Option<&str>) -> Result<NewContact> {
    let last_name = match (lead.last_name.as_deref(), last_name) {
        (_, Some(given)) => Name::new("last_name", given)?.into_string(),
        (Some(stored), None) => stored.to_owned(),
        (None, None) => return Err(ValidationError::Empty { field: "last_name" }.into()),
    };

    Ok(NewContact {
        first_name: lead.first_name.clone(),
        last_name,
        middle_name: None,
        phone: lead.phone.clone(),
        email: lead.email.clone(),
        birth_date: None,
        passport: None,
        notes: lead.notes.clone(),
        lead_id: Some(lead.id),
    })
}

/// Booking for a converted lead; groups get a shared `group_id` so
/// companions can be added to the same block later.
fn deal_for_lead(lead: &Lead, contact_id: Uuid, event_id: Uuid, amount_cents: Option<i64>) -> NewDeal {
    NewDeal {
        group_id: (lead.group_size > 1).then(Uuid::new_v4),
        amount_cents,
        ..NewDeal::for_tourist(contact_id, event_id)
    }
}

/// Convert a lead into a contact with a deal, atomically.
///
/// The optional Bitrix24 push runs after commit; its failure is reported
/// in the result and as a notification but keeps the conversion.
pub async fn convert_lead(
    pool: &PgPool,
    crm: Option<&dyn CrmGateway>,
    id: Uuid,
    request: &ConvertLeadRequest,
) -> Result<Conversion> {
    let amount = request
        .amount_cents
        .map(|a| money::non_negative("amount_cents", a))
        .transpose()?;

    let mut tx = pool.begin().await?;
    let lead = leads::lock(&mut tx, id).await?;
    let from = lead.status();
    if from == LeadStatus::Converted {
        return Err(ServiceError::Conflict(format!("lead {} is already converted", id)));
    }

    let event_id = request
        .event_id
        .or(lead.event_id)
        .ok_or(ValidationError::Empty { field: "event_id" })?;

    let contact = contacts::insert(&mut tx, &contact_from_lead(&lead, request.last_name.as_deref())?).await?;
    let deal = bookings::book(&mut tx, &deal_for_lead(&lead, contact.id, event_id, amount)).await?;

    let lead = leads::set_status(&mut tx, id, LeadStatus::Converted, Some(contact.id)).await?;
    leads::append_history(&mut tx, id, Some(from), LeadStatus::Converted, None).await?;
    tx.commit().await?;

    info!(lead_id = %id, contact_id = %contact.id, deal_id = %deal.id, "Lead converted");

    let (bitrix, bitrix_error) = if !request.sync_to_bitrix {
        (None, None)
    } else if let Some(crm) = crm {
        match sync_contact(pool, crm, contact.id).await {
            Ok(outcome) => (Some(outcome), None),
            Err(e) => (None, Some(e.to_string())),
        }
    } else {
        warn!(lead_id = %id, "Bitrix24 push requested but integration is not configured");
        (None, Some(ServiceError::NotConfigured.to_string()))
    };

    let contact = match bitrix {
        Some(outcome) => Contact {
            bitrix_contact_id: Some(outcome.bitrix_contact_id),
            ..contact
        },
        None => contact,
    };

    Ok(Conversion {
        lead,
        contact,
        deal,
        bitrix,
        bitrix_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn lead(last_name: Option<&str>, group_size: i32) -> Lead {
        Lead {
            id: Uuid::new_v4(),
            first_name: "Anna".into(),
            last_name: last_name.map(str::to_owned),
            phone: Some("+79001112233".into()),
            email: Some("anna@example.com".into()),
            source: "form".into(),
            status: "qualified".into(),
            event_id: None,
            form_id: None,
            assigned_to: None,
            group_size,
            notes: Some("vegetarian".into()),
            contact_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn contact_takes_lead_fields() {
        let lead = lead(Some("Ivanova"), 1);
        let contact = contact_from_lead(&lead, None).unwrap();
        assert_eq!(contact.last_name, "Ivanova");
        assert_eq!(contact.phone, lead.phone);
        assert_eq!(contact.notes.as_deref(), Some("vegetarian"));
        assert_eq!(contact.lead_id, Some(lead.id));
    }

    #[test]
    fn surname_required_for_contact() {
        let lead = lead(None, 1);
        assert!(matches!(
            contact_from_lead(&lead, None),
            Err(ServiceError::Validation(ValidationError::Empty { field: "last_name" }))
        ));
        let contact = contact_from_lead(&lead, Some(" Smirnova ")).unwrap();
        assert_eq!(contact.last_name, "Smirnova");
    }

    #[test]
    fn groups_get_shared_id() {
        let contact_id = Uuid::new_v4();
        let event_id = Uuid::new_v4();
        assert!(deal_for_lead(&lead(None, 1), contact_id, event_id, None).group_id.is_none());

        let deal = deal_for_lead(&lead(None, 3), contact_id, event_id, Some(100));
        assert!(deal.group_id.is_some());
        assert_eq!(deal.amount_cents, Some(100));
        assert!(deal.is_primary);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn conversion_is_one_shot() {
        use crate::db::EventRepo;
        use crate::models::event::CreateEventRequest;
        use crate::models::lead::CreateLeadRequest;
        use chrono::NaiveDate;

        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = crate::db::create_pool(&url).await.unwrap();
        crate::db::migrations::run(&pool).await.unwrap();

        let event = EventRepo::new(&pool)
            .create(
                &CreateEventRequest {
                    title: "Karelia".into(),
                    description: None,
                    start_date: NaiveDate::from_ymd_opt(2030, 8, 1).unwrap(),
                    end_date: NaiveDate::from_ymd_opt(2030, 8, 5).unwrap(),
                    cities: vec!["Petrozavodsk".into()],
                    price_cents: 7_500_000,
                    currency: None,
                    capacity: 10,
                }
                .validate()
                .unwrap(),
            )
            .await
            .unwrap();

        let lead = create_lead(
            &pool,
            &CreateLeadRequest {
                first_name: "Olga".into(),
                last_name: Some("Sidorova".into()),
                phone: Some("+79005554433".into()),
                event_id: Some(event.id),
                ..Default::default()
            }
            .validate()
            .unwrap(),
        )
        .await
        .unwrap();

        let converted = convert_lead(&pool, None, lead.id, &ConvertLeadRequest::default())
            .await
            .unwrap();
        assert_eq!(converted.lead.status, "converted");
        assert_eq!(converted.lead.contact_id, Some(converted.contact.id));
        assert_eq!(converted.deal.amount_cents, 7_500_000);

        let again = convert_lead(&pool, None, lead.id, &ConvertLeadRequest::default()).await;
        assert!(matches!(again, Err(ServiceError::Conflict(_))));
    }
}
