//! Validation error types

use std::fmt;

/// Validation error for domain models
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Field is empty when it shouldn't be
    Empty { field: &'static str },

    /// Field exceeds maximum length
    TooLong { field: &'static str, max: usize },

    /// String doesn't match required format (e.g., slug, phone)
    InvalidFormat { field: &'static str, reason: &'static str },

    /// Invalid enum variant
    InvalidVariant { field: &'static str, value: String },

    /// Numeric or date value outside the allowed range
    OutOfRange { field: &'static str, reason: String },

    /// Lead status change that the workflow does not allow
    InvalidTransition { from: String, to: String },

    /// Field of a dynamic definition (booking form) failed
    Field { field: String, reason: String },
}

impl ValidationError {
    pub fn out_of_range(field: &'static str, reason: impl Into<String>) -> Self {
        Self::OutOfRange {
            field,
            reason: reason.into(),
        }
    }

    pub fn field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Field {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { field } => write!(f, "{} cannot be empty", field),
            Self::TooLong { field, max } => {
                write!(f, "{} exceeds maximum length of {} characters", field, max)
            }
            Self::InvalidFormat { field, reason } => {
                write!(f, "{}: {}", field, reason)
            }
            Self::InvalidVariant { field, value } => {
                write!(f, "invalid {} value: '{}'", field, value)
            }
            Self::OutOfRange { field, reason } => write!(f, "{}: {}", field, reason),
            Self::InvalidTransition { from, to } => {
                write!(f, "cannot change status from '{}' to '{}'", from, to)
            }
            Self::Field { field, reason } => write!(f, "field '{}': {}", field, reason),
        }
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ValidationError::TooLong {
            field: "first_name",
            max: 128,
        };
        assert_eq!(
            err.to_string(),
            "first_name exceeds maximum length of 128 characters"
        );

        let err = ValidationError::InvalidTransition {
            from: "converted".into(),
            to: "new".into(),
        };
        assert_eq!(
            err.to_string(),
            "cannot change status from 'converted' to 'new'"
        );
    }
}
