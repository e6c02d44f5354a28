//! Enumerations stored as TEXT columns
//!
//! Each enum round-trips through `as_str()`/`parse()` and serializes with the
//! same snake_case names used in the database CHECK constraints.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::ValidationError;

macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident($field:literal) { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }

            pub fn parse(s: &str) -> Result<Self, ValidationError> {
                match s.trim().to_lowercase().as_str() {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(ValidationError::InvalidVariant {
                        field: $field,
                        value: s.to_owned(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

text_enum! {
    /// Staff role
    Role("role") {
        Admin => "admin",
        Manager => "manager",
        Viewer => "viewer",
    }
}

text_enum! {
    /// Lead workflow state
    LeadStatus("status") {
        New => "new",
        Contacted => "contacted",
        Qualified => "qualified",
        Converted => "converted",
        Lost => "lost",
    }
}

impl LeadStatus {
    /// Whether a manual status change from `self` to `next` is allowed.
    ///
    /// `Converted` is terminal and only reachable through lead conversion.
    pub fn can_transition_to(self, next: LeadStatus) -> bool {
        use LeadStatus::*;
        match (self, next) {
            (a, b) if a == b => false,
            (Converted, _) | (_, Converted) => false,
            (New, Contacted | Qualified | Lost) => true,
            (Contacted, Qualified | Lost) => true,
            (Qualified, Contacted | Lost) => true,
            (Lost, New) => true,
            _ => false,
        }
    }

    /// Validate a manual transition.
    pub fn transition_to(self, next: LeadStatus) -> Result<LeadStatus, ValidationError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(ValidationError::InvalidTransition {
                from: self.as_str().to_owned(),
                to: next.as_str().to_owned(),
            })
        }
    }
}

text_enum! {
    /// Booking state of a deal
    DealStatus("status") {
        New => "new",
        Confirmed => "confirmed",
        Cancelled => "cancelled",
        Completed => "completed",
    }
}

impl DealStatus {
    /// Cancelled deals release their seat on the tour.
    pub fn occupies_seat(self) -> bool {
        self != DealStatus::Cancelled
    }
}

text_enum! {
    /// Derived payment progress of a deal
    PaymentState("payment_state") {
        Unpaid => "unpaid",
        Partial => "partial",
        Paid => "paid",
    }
}

impl PaymentState {
    pub fn from_amounts(amount_cents: i64, paid_cents: i64) -> Self {
        if paid_cents >= amount_cents {
            PaymentState::Paid
        } else if paid_cents <= 0 {
            PaymentState::Unpaid
        } else {
            PaymentState::Partial
        }
    }
}

text_enum! {
    /// How a tourist arrives in or leaves a city
    TransportKind("transport") {
        Plane => "plane",
        Train => "train",
        Bus => "bus",
        Car => "car",
        Ship => "ship",
        Other => "other",
    }
}

text_enum! {
    NotificationKind("kind") {
        NewLead => "new_lead",
        FormSubmission => "form_submission",
        SyncFailed => "sync_failed",
        LeadAssigned => "lead_assigned",
    }
}

text_enum! {
    /// Input kind of a booking form field
    FieldKind("kind") {
        Text => "text",
        Email => "email",
        Phone => "phone",
        Date => "date",
        Number => "number",
        Select => "select",
    }
}

/// Comma-separated list of variants for CHECK constraints.
pub fn sql_values<T: Copy>(all: &[T], as_str: impl Fn(&T) -> &'static str) -> String {
    all.iter()
        .map(|v| format!("'{}'", as_str(v)))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trip_matches_serde() {
        for status in LeadStatus::ALL {
            assert_eq!(LeadStatus::parse(status.as_str()).unwrap(), *status);
            let json = serde_json::to_value(status).unwrap();
            assert_eq!(json, status.as_str());
        }
        assert_eq!(
            serde_json::to_value(NotificationKind::FormSubmission).unwrap(),
            "form_submission"
        );
    }

    #[test]
    fn parse_is_case_insensitive_and_reports_field() {
        assert_eq!(DealStatus::parse(" Confirmed ").unwrap(), DealStatus::Confirmed);
        let err = TransportKind::parse("teleport").unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidVariant {
                field: "transport",
                value: "teleport".into()
            }
        );
    }

    #[test]
    fn lead_transitions() {
        use LeadStatus::*;
        assert!(New.can_transition_to(Contacted));
        assert!(New.can_transition_to(Lost));
        assert!(Contacted.can_transition_to(Qualified));
        assert!(Qualified.can_transition_to(Contacted));
        assert!(Lost.can_transition_to(New));

        assert!(!New.can_transition_to(New));
        assert!(!Contacted.can_transition_to(New));
        assert!(!Lost.can_transition_to(Qualified));
        assert!(!Qualified.can_transition_to(Converted));
        assert!(!Converted.can_transition_to(New));

        assert!(matches!(
            Converted.transition_to(Lost),
            Err(ValidationError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn payment_state() {
        assert_eq!(PaymentState::from_amounts(1000, 0), PaymentState::Unpaid);
        assert_eq!(PaymentState::from_amounts(1000, 400), PaymentState::Partial);
        assert_eq!(PaymentState::from_amounts(1000, 1000), PaymentState::Paid);
        assert_eq!(PaymentState::from_amounts(0, 0), PaymentState::Paid);
    }

    #[test]
    fn cancelled_deals_free_seats() {
        assert!(DealStatus::New.occupies_seat());
        assert!(DealStatus::Completed.occupies_seat());
        assert!(!DealStatus::Cancelled.occupies_seat());
    }

    #[test]
    fn sql_values_lists_all() {
        assert_eq!(
            sql_values(Role::ALL, Role::as_str),
            "'admin', 'manager', 'viewer'"
        );
    }
}
