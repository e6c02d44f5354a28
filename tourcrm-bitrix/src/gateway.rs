//! CRM gateway abstraction used by tourcrm services

use async_trait::async_trait;

use crate::error::Result;
use crate::fields::{ContactPayload, DealPayload, TouristItemPayload};

/// Push-side operations tourcrm performs against an external CRM.
///
/// `Bitrix24Client` is the production implementation; services only see
/// this trait so registration and rollback can be exercised without a portal.
#[async_trait]
pub trait CrmGateway: Send + Sync {
    async fn add_contact(&self, contact: &ContactPayload) -> Result<i64>;

    async fn update_contact(&self, id: i64, contact: &ContactPayload) -> Result<()>;

    async fn delete_contact(&self, id: i64) -> Result<()>;

    /// Create the smart-process item linking a contact to a tour.
    ///
    /// Returns `Ok(None)` when no smart process is configured.
    async fn add_tourist_item(&self, item: &TouristItemPayload) -> Result<Option<i64>>;

    async fn delete_tourist_item(&self, id: i64) -> Result<()>;

    async fn add_deal(&self, deal: &DealPayload) -> Result<i64>;

    async fn delete_deal(&self, id: i64) -> Result<()>;
}
