//! Repository implementations for database access
//!
//! Each repository follows these patterns:
//! - Uses JOINs for list operations (no N+1)
//! - Relies on constraints and maps violations to `DbError::Conflict`,
//!   except a dangling reference on write, which is `DbError::NotFound`
//! - Statements needed inside a caller's transaction are free functions
//!   taking `&mut PgConnection`

use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};
use uuid::Uuid;

use crate::models::{Paginated, Pagination};

pub mod users;
pub mod events;
pub mod leads;
pub mod contacts;
pub mod deals;
pub mod visits;
pub mod forms;
pub mod notifications;
pub mod dictionaries;
pub mod expenses;

pub use users::{User, UserRepo};
pub use events::{Event, EventRepo, EventWithBookings, SeatLock};
pub use leads::{Lead, LeadFilter, LeadRepo, LeadStatusChange};
pub use contacts::{Contact, ContactRepo};
pub use deals::{Deal, DealDetails, DealFilter, DealRepo, DealTotals};
pub use visits::{CityVisit, VisitRepo};
pub use forms::{Form, FormRepo, FormSubmission};
pub use notifications::{Notification, NotificationFilter, NotificationRepo};
pub use dictionaries::{DictionaryEntry, DictionaryRepo};
pub use expenses::{CategoryTotal, Expense, ExpenseRepo};

/// Database error type
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(sqlx::Error),

    #[error("not found: {resource} '{id}'")]
    NotFound { resource: &'static str, id: String },

    #[error("conflict: {0}")]
    Conflict(String),
}

impl DbError {
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            let constraint = db.constraint().unwrap_or("constraint").to_owned();
            if db.is_unique_violation() {
                return Self::Conflict(format!("duplicate value violates {}", constraint));
            }
            if db.is_foreign_key_violation() {
                return Self::Conflict(format!("referenced record missing or in use ({})", constraint));
            }
            if db.is_check_violation() {
                return Self::Conflict(format!("value rejected by {}", constraint));
            }
        }
        Self::Sqlx(err)
    }
}

/// Foreign key set by a write: constraint name, referenced resource and the
/// id written (if any)
pub(crate) type Reference = (&'static str, &'static str, Option<Uuid>);

fn missing(constraint: Option<&str>, refs: &[Reference]) -> Option<DbError> {
    refs.iter()
        .find(|&&(name, _, _)| constraint == Some(name))
        .and_then(|&(_, resource, id)| id.map(|id| DbError::not_found(resource, id)))
}

/// Report a foreign-key violation on one of `refs` as the referenced row
/// being missing. Other errors map as usual.
pub(crate) fn missing_reference(err: sqlx::Error, refs: &[Reference]) -> DbError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_foreign_key_violation() {
            if let Some(not_found) = missing(db.constraint(), refs) {
                return not_found;
            }
        }
    }
    DbError::from(err)
}

/// Escape a free-text search term for `ILIKE`.
pub(crate) fn like_pattern(q: Option<&str>) -> Option<String> {
    q.map(str::trim).filter(|s| !s.is_empty()).map(|s| {
        let escaped = s
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        format!("%{}%", escaped)
    })
}

/// Row of a list query carrying `COUNT(*) OVER() AS total`.
pub(crate) struct Counted<T> {
    pub item: T,
    pub total: i64,
}

impl<'r, T: FromRow<'r, PgRow>> FromRow<'r, PgRow> for Counted<T> {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            item: T::from_row(row)?,
            total: row.try_get("total")?,
        })
    }
}

/// Unwrap counted rows into a page.
pub(crate) fn into_page<T>(rows: Vec<Counted<T>>, page: Pagination) -> Paginated<T> {
    let total = rows.first().map(|r| r.total).unwrap_or(0);
    Paginated::new(rows.into_iter().map(|r| r.item).collect(), total, page)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(Some(" anna ")).as_deref(), Some("%anna%"));
        assert_eq!(like_pattern(Some("50%_off")).as_deref(), Some("%50\\%\\_off%"));
        assert_eq!(like_pattern(Some("   ")), None);
        assert_eq!(like_pattern(None), None);
    }

    #[test]
    fn violated_reference_names_the_missing_row() {
        let event = Uuid::new_v4();
        let refs: [Reference; 2] = [
            ("leads_event_id_fkey", "event", Some(event)),
            ("leads_assigned_to_fkey", "user", None),
        ];

        let err = missing(Some("leads_event_id_fkey"), &refs).unwrap();
        assert!(matches!(err, DbError::NotFound { resource: "event", ref id } if *id == event.to_string()));

        assert!(missing(Some("leads_assigned_to_fkey"), &refs).is_none());
        assert!(missing(Some("deals_event_id_fkey"), &refs).is_none());
        assert!(missing(None, &refs).is_none());
    }

    #[test]
    fn not_found_message() {
        let err = DbError::not_found("lead", "abc");
        assert_eq!(err.to_string(), "not found: lead 'abc'");
    }

    #[test]
    fn empty_page_has_zero_total() {
        let page = into_page::<u8>(Vec::new(), Pagination::default());
        assert_eq!(page.total, 0);
        assert!(page.items.is_empty());
    }

    #[test]
    fn non_database_errors_stay_sqlx() {
        let err: DbError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DbError::Sqlx(_)));
    }
}
