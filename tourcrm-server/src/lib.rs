//! tourcrm-server: tour-operator CRM backend
//!
//! Leads arrive from staff or public booking forms, get converted into
//! contacts and deals on a tour, and tourists are tracked city by city along
//! the itinerary. Contacts, deals and tourist records are pushed to Bitrix24
//! when the integration is configured.
//!
//! Layers, top to bottom:
//! - [`http`]: axum routes and JSON errors
//! - [`services`]: transactions and cross-entity rules
//! - [`report`]: per-tour summary with grouping and CSV export
//! - [`db`]: Postgres pool, migrations and repositories
//! - [`models`]: request validation and domain enums

pub mod db;
pub mod http;
pub mod models;
pub mod report;
pub mod services;

pub use db::{create_pool, create_pool_with_options, DbError};
pub use http::{build_router, run_server, AppState, ServerConfig, ServerError};
pub use services::ServiceError;
