//! Domain models with validation at construction
//!
//! Request bodies deserialize into `*Request` types; `validate()` turns them
//! into insert (`New*`) or patch (`*Patch`) values. Invalid input returns
//! `ValidationError`, never a panic.

pub mod validation;
pub mod pagination;
pub mod status;
pub mod text;
pub mod money;
pub mod user;
pub mod lead;
pub mod contact;
pub mod event;
pub mod deal;
pub mod visit;
pub mod form;
pub mod dictionary;
pub mod expense;
pub mod notification;
pub mod tourist;

pub use validation::ValidationError;
pub use pagination::{Paginated, Pagination, PaginationParams};
pub use status::{
    DealStatus, FieldKind, LeadStatus, NotificationKind, PaymentState, Role, TransportKind,
};
pub use text::{Email, Name, Phone, Slug};
pub use event::Itinerary;
pub use form::FormField;
pub use notification::NewNotification;
