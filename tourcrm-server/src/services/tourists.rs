//! Tourist registration with Bitrix24 push and rollback
//!
//! Registration first stores contact, deal and visits locally in one
//! transaction. With Bitrix24 enabled it then creates, in order, the remote
//! contact, the smart-process item linking contact and tour, and the remote
//! deal. When any remote step fails, every remote entity created so far is
//! deleted in reverse order and the local contact (cascading to its deal
//! and visits) is removed, so neither side keeps a half-registered tourist.

use async_trait::async_trait;
use serde::Serialize;
use sqlx::PgPool;
use tourcrm_bitrix::fields::cents_to_opportunity;
use tourcrm_bitrix::{BitrixError, CrmGateway, DealPayload, TouristItemPayload};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::db::repos::{contacts, deals, visits};
use crate::db::{CityVisit, Contact, ContactRepo, Deal, Event};
use crate::models::tourist::NewTourist;

use super::bookings;
use super::sync::contact_payload;
use super::{Result, ServiceError};

/// Locally stored part of a registration
#[derive(Debug, Clone, Serialize)]
pub struct RegisteredTourist {
    pub contact: Contact,
    pub deal: Deal,
    pub visits: Vec<CityVisit>,
}

/// Bitrix24 ids created for a registration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RemoteIds {
    pub contact_id: Option<i64>,
    pub item_id: Option<i64>,
    pub deal_id: Option<i64>,
}

/// Registration result
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    #[serde(flatten)]
    pub tourist: RegisteredTourist,
    /// `None` when Bitrix24 is not configured
    pub bitrix: Option<RemoteIds>,
}

/// Local persistence needed by the registration flow
#[async_trait]
pub trait TouristStore: Send + Sync {
    /// Store contact, deal and visits atomically (seat limit enforced).
    async fn insert_tourist(&self, event_id: Uuid, tourist: &NewTourist) -> Result<RegisteredTourist>;

    async fn attach_remote_ids(&self, tourist: &RegisteredTourist, ids: &RemoteIds) -> Result<()>;

    /// Delete the contact with everything hanging off it.
    async fn remove_tourist(&self, contact_id: Uuid) -> Result<()>;
}

/// Postgres-backed store
pub struct PgTouristStore<'a> {
    pool: &'a PgPool,
}

impl<'a> PgTouristStore<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TouristStore for PgTouristStore<'_> {
    async fn insert_tourist(&self, event_id: Uuid, tourist: &NewTourist) -> Result<RegisteredTourist> {
        let mut tx = self.pool.begin().await?;

        let contact = contacts::insert(&mut tx, &tourist.contact).await?;

        let mut new_deal = tourist.deal.clone();
        new_deal.contact_id = contact.id;
        new_deal.event_id = event_id;
        let deal = bookings::book(&mut tx, &new_deal).await?;

        let mut stored = Vec::with_capacity(tourist.visits.len());
        for visit in &tourist.visits {
            stored.push(visits::insert(&mut tx, deal.id, visit).await?);
        }

        tx.commit().await?;
        Ok(RegisteredTourist {
            contact,
            deal,
            visits: stored,
        })
    }

    async fn attach_remote_ids(&self, tourist: &RegisteredTourist, ids: &RemoteIds) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        if let Some(contact_id) = ids.contact_id {
            contacts::set_bitrix_id(&mut tx, tourist.contact.id, contact_id).await?;
        }
        deals::set_bitrix_ids(&mut tx, tourist.deal.id, ids.deal_id, ids.item_id).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn remove_tourist(&self, contact_id: Uuid) -> Result<()> {
        Ok(ContactRepo::new(self.pool).delete(contact_id).await?)
    }
}

/// Create the remote entities, recording each id as soon as it exists.
async fn push_remote(
    crm: &dyn CrmGateway,
    event: &Event,
    tourist: &RegisteredTourist,
    ids: &mut RemoteIds,
) -> std::result::Result<(), BitrixError> {
    let contact_id = crm.add_contact(&contact_payload(&tourist.contact)).await?;
    ids.contact_id = Some(contact_id);

    let title = format!("{} - {}", event.title, tourist.contact.full_name());

    ids.item_id = crm
        .add_tourist_item(&TouristItemPayload {
            title: title.clone(),
            contact_id,
            event_title: event.title.clone(),
        })
        .await?;

    let deal_id = crm
        .add_deal(&DealPayload {
            title,
            contact_id,
            opportunity: cents_to_opportunity(tourist.deal.amount_cents),
            currency: event.currency.clone(),
            stage: None,
            comments: tourist.deal.notes.clone(),
        })
        .await?;
    ids.deal_id = Some(deal_id);

    Ok(())
}

/// Delete remote entities in reverse creation order.
///
/// Compensation failures are logged and otherwise ignored.
async fn rollback_remote(crm: &dyn CrmGateway, ids: &RemoteIds) {
    if let Some(id) = ids.deal_id {
        if let Err(e) = crm.delete_deal(id).await {
            warn!(bitrix_deal_id = id, error = %e, "Rollback: failed to delete Bitrix24 deal");
        }
    }
    if let Some(id) = ids.item_id {
        if let Err(e) = crm.delete_tourist_item(id).await {
            warn!(bitrix_item_id = id, error = %e, "Rollback: failed to delete Bitrix24 item");
        }
    }
    if let Some(id) = ids.contact_id {
        if let Err(e) = crm.delete_contact(id).await {
            warn!(bitrix_contact_id = id, error = %e, "Rollback: failed to delete Bitrix24 contact");
        }
    }
}

async fn remove_local(store: &dyn TouristStore, contact_id: Uuid) {
    if let Err(e) = store.remove_tourist(contact_id).await {
        error!(contact_id = %contact_id, error = %e, "Rollback: failed to delete local tourist");
    }
}

/// Register a tourist on `event`.
pub async fn register_tourist(
    store: &dyn TouristStore,
    crm: Option<&dyn CrmGateway>,
    event: &Event,
    tourist: &NewTourist,
) -> Result<Registration> {
    let local = store.insert_tourist(event.id, tourist).await?;
    info!(
        contact_id = %local.contact.id,
        deal_id = %local.deal.id,
        event_id = %event.id,
        "Tourist registered locally"
    );

    let Some(crm) = crm else {
        return Ok(Registration {
            tourist: local,
            bitrix: None,
        });
    };

    let mut ids = RemoteIds::default();
    if let Err(err) = push_remote(crm, event, &local, &mut ids).await {
        warn!(contact_id = %local.contact.id, error = %err, ?ids, "Bitrix24 push failed, rolling back");
        rollback_remote(crm, &ids).await;
        remove_local(store, local.contact.id).await;
        return Err(ServiceError::Upstream(err));
    }

    if let Err(err) = store.attach_remote_ids(&local, &ids).await {
        error!(contact_id = %local.contact.id, error = %err, "Storing Bitrix24 ids failed, rolling back");
        rollback_remote(crm, &ids).await;
        remove_local(store, local.contact.id).await;
        return Err(err);
    }

    info!(contact_id = %local.contact.id, ?ids, "Tourist pushed to Bitrix24");
    Ok(Registration {
        tourist: RegisteredTourist {
            contact: Contact {
                bitrix_contact_id: ids.contact_id,
                ..local.contact
            },
            deal: Deal {
                bitrix_deal_id: ids.deal_id,
                bitrix_item_id: ids.item_id,
                ..local.deal
            },
            visits: local.visits,
        },
        bitrix: Some(ids),
    })
}
