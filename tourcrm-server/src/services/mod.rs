//! Business operations spanning several repositories
//!
//! Handlers stay thin: they validate input into models and call into these
//! functions, which own transactions and cross-entity rules (seat limits,
//! lead conversion, Bitrix24 pushes with rollback).

pub mod bookings;
pub mod dashboard;
pub mod events;
pub mod finance;
pub mod intake;
pub mod leads;
pub mod sync;
pub mod tourists;

use tourcrm_bitrix::BitrixError;

use crate::db::DbError;
use crate::models::ValidationError;

/// Error type of service operations
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Db(DbError),

    /// Request clashes with current state (seat limit, already converted)
    #[error("{0}")]
    Conflict(String),

    /// Bitrix24 call failed
    #[error("Bitrix24 request failed: {0}")]
    Upstream(#[from] BitrixError),

    /// Bitrix24 integration is switched off
    #[error("Bitrix24 integration is not configured")]
    NotConfigured,
}

impl From<DbError> for ServiceError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Conflict(msg) => Self::Conflict(msg),
            other => Self::Db(other),
        }
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        DbError::from(err).into()
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_conflicts_surface_as_conflicts() {
        let err: ServiceError = DbError::Conflict("taken".into()).into();
        assert!(matches!(err, ServiceError::Conflict(ref m) if m == "taken"));

        let err: ServiceError = DbError::not_found("deal", "x").into();
        assert!(matches!(err, ServiceError::Db(DbError::NotFound { .. })));
    }
}
