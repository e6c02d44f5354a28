//! Database layer - connection pool, migrations and repositories
//!
//! # Design Principles
//!
//! - Connection pool, no shared `Mutex<Connection>`
//! - All list operations use JOINs - no N+1 queries
//! - Rely on DB constraints, map violations to conflicts
//! - Transactions for multi-step operations (conversion, bookings, intake)

pub mod migrations;
pub mod pool;
pub mod repos;

pub use pool::{create_pool, create_pool_with_options, lazy_pool, DEFAULT_MAX_CONNECTIONS};
pub use sqlx::PgPool;
pub use repos::*;
