//! One-way contact push to Bitrix24

use sqlx::PgPool;
use tourcrm_bitrix::{ContactPayload, CrmGateway, MultiField};
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::repos::notifications;
use crate::db::{Contact, ContactRepo};
use crate::models::NewNotification;

use super::{Result, ServiceError};

/// Map a stored contact onto Bitrix24 contact fields.
pub fn contact_payload(contact: &Contact) -> ContactPayload {
    ContactPayload {
        first_name: contact.first_name.clone(),
        last_name: contact.last_name.clone(),
        middle_name: contact.middle_name.clone(),
        birth_date: contact.birth_date,
        phones: contact.phone.iter().map(MultiField::work).collect(),
        emails: contact.email.iter().map(MultiField::work).collect(),
        comments: contact.notes.clone(),
        passport: contact.passport.clone(),
        external_id: Some(contact.id.to_string()),
    }
}

/// Result of pushing one contact
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct SyncOutcome {
    pub bitrix_contact_id: i64,
    /// `false` when an existing Bitrix24 contact was updated
    pub created: bool,
}

/// Create or update the contact in Bitrix24 and remember its id.
///
/// Failures raise a `sync_failed` notification before the error is returned.
pub async fn sync_contact(pool: &PgPool, crm: &dyn CrmGateway, contact_id: Uuid) -> Result<SyncOutcome> {
    let repo = ContactRepo::new(pool);
    let contact = repo.get(contact_id).await?;
    let payload = contact_payload(&contact);

    let pushed = match contact.bitrix_contact_id {
        Some(id) => crm.update_contact(id, &payload).await.map(|_| SyncOutcome {
            bitrix_contact_id: id,
            created: false,
        }),
        None => crm.add_contact(&payload).await.map(|id| SyncOutcome {
            bitrix_contact_id: id,
            created: true,
        }),
    };

    match pushed {
        Ok(outcome) => {
            if outcome.created {
                repo.set_bitrix_id(contact.id, outcome.bitrix_contact_id).await?;
            }
            info!(
                contact_id = %contact.id,
                bitrix_contact_id = outcome.bitrix_contact_id,
                created = outcome.created,
                "Contact pushed to Bitrix24"
            );
            Ok(outcome)
        }
        Err(err) => {
            warn!(contact_id = %contact.id, error = %err, "Bitrix24 contact push failed");
            record_sync_failure(pool, &contact, &err.to_string()).await;
            Err(ServiceError::Upstream(err))
        }
    }
}

/// Store a `sync_failed` notification; a failure here is only logged.
pub async fn record_sync_failure(pool: &PgPool, contact: &Contact, error: &str) {
    let notification =
        NewNotification::sync_failed(contact.id, &contact.full_name(), error);
    let stored = match pool.acquire().await {
        Ok(mut conn) => notifications::insert(&mut conn, &notification).await.map(|_| ()),
        Err(e) => Err(e.into()),
    };
    if let Err(e) = stored {
        warn!(contact_id = %contact.id, error = %e, "Could not store sync failure notification");
    }
}

/// Counts from a batch push
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct BatchSync {
    pub synced: usize,
    pub failed: usize,
}

/// Push up to `limit` contacts that have no Bitrix24 id yet.
///
/// A failing contact is counted and skipped; database errors abort.
pub async fn sync_unsynced(pool: &PgPool, crm: &dyn CrmGateway, limit: i64) -> Result<BatchSync> {
    let pending = ContactRepo::new(pool).list_unsynced(limit).await?;
    let mut batch = BatchSync::default();

    for contact in pending {
        match sync_contact(pool, crm, contact.id).await {
            Ok(_) => batch.synced += 1,
            Err(ServiceError::Upstream(_)) => batch.failed += 1,
            Err(other) => return Err(other),
        }
    }

    info!(synced = batch.synced, failed = batch.failed, "Batch contact sync finished");
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    #[test]
    fn payload_carries_multifields_and_external_id() {
        let contact = Contact {
            id: Uuid::new_v4(),
            first_name: "Ivan".into(),
            last_name: "Petrov".into(),
            middle_name: None,
            phone: Some("+79001112233".into()),
            email: None,
            birth_date: NaiveDate::from_ymd_opt(1990, 5, 17),
            passport: Some("4510 123456".into()),
            notes: None,
            lead_id: None,
            bitrix_contact_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let payload = contact_payload(&contact);
        let fields = payload.to_fields();
        assert_eq!(fields["NAME"], "Ivan");
        assert_eq!(fields["PHONE"][0]["VALUE"], "+79001112233");
        assert_eq!(fields["PHONE"][0]["VALUE_TYPE"], "WORK");
        assert!(fields.get("EMAIL").is_none());
        assert_eq!(fields["UF_CRM_TOUR_PASSPORT"], "4510 123456");
        assert_eq!(fields["UF_CRM_TOUR_CONTACT_ID"], contact.id.to_string());
    }
}
