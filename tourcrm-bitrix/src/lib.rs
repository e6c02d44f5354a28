//! tourcrm-bitrix: Bitrix24 integration for tourcrm
//!
//! Pushes tourists (contacts), tour bookings (deals) and the smart-process
//! items that link them into a Bitrix24 portal through an inbound webhook.

pub mod client;
pub mod config;
pub mod error;
pub mod fields;
pub mod gateway;

pub use client::Bitrix24Client;
pub use config::BitrixConfig;
pub use error::{BitrixError, Result};
pub use fields::{
    ContactPayload, DealPayload, MultiField, TouristItemPayload, UserFieldDef,
    TOURIST_CONTACT_FIELDS,
};
pub use gateway::CrmGateway;
