//! JSON API over axum
//!
//! `/api/*` is the staff API, `/public/*` serves booking forms to the
//! website and `/health` is for probes. Errors render as
//! `{"error": kind, "message": text}`.

pub mod error;
pub mod extractors;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use server::{build_router, run_server, AppState, ServerConfig, ServerError};
