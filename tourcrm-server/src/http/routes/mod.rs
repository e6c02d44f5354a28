//! Route handlers organized by resource

pub mod health;
pub mod users;
pub mod leads;
pub mod contacts;
pub mod events;
pub mod deals;
pub mod forms;
pub mod public;
pub mod notifications;
pub mod dictionaries;
pub mod dashboard;
pub mod bitrix;
