//! Validated text values: names, slugs, phones, e-mails

use once_cell::sync::Lazy;
use regex::Regex;

use super::ValidationError;

/// Maximum length for person names and titles
pub const MAX_NAME_LEN: usize = 128;

/// Maximum length for free-form notes
pub const MAX_NOTES_LEN: usize = 4000;

const MAX_EMAIL_LEN: usize = 254;

/// Slug pattern: starts with alphanumeric, allows hyphens/underscores
/// Matches DB constraint: ^[a-z0-9][a-z0-9_-]{0,63}$
static SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9_-]{0,63}$").expect("invalid slug regex"));

/// Trimmed, non-empty name (person, tour title, form name)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name(String);

impl Name {
    pub fn new(field: &'static str, s: &str) -> Result<Self, ValidationError> {
        let trimmed = s.trim();

        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field });
        }

        if trimmed.chars().count() > MAX_NAME_LEN {
            return Err(ValidationError::TooLong {
                field,
                max: MAX_NAME_LEN,
            });
        }

        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// URL-safe identifier (public form slug, username, dictionary kind)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Slug(String);

impl Slug {
    /// # Example
    /// ```
    /// use tourcrm_server::models::Slug;
    ///
    /// assert!(Slug::new("slug", "golden-ring-2025").is_ok());
    /// assert!(Slug::new("slug", "Golden Ring").is_err());
    /// ```
    pub fn new(field: &'static str, s: &str) -> Result<Self, ValidationError> {
        if s.is_empty() {
            return Err(ValidationError::Empty { field });
        }

        if s.len() > 64 {
            return Err(ValidationError::TooLong { field, max: 64 });
        }

        if !SLUG_RE.is_match(s) {
            return Err(ValidationError::InvalidFormat {
                field,
                reason: "must be lowercase alphanumeric with hyphens/underscores, starting with alphanumeric",
            });
        }

        Ok(Self(s.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Normalized phone number.
///
/// Separators (spaces, dashes, parentheses) are dropped; an optional
/// leading `+` is kept. 7 to 15 digits are accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phone(String);

impl Phone {
    /// # Example
    /// ```
    /// use tourcrm_server::models::Phone;
    ///
    /// let phone = Phone::new("+7 (900) 123-45-67").unwrap();
    /// assert_eq!(phone.as_str(), "+79001234567");
    /// ```
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: "phone" });
        }

        let (plus, rest) = match trimmed.strip_prefix('+') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };

        let mut digits = String::with_capacity(rest.len());
        for c in rest.chars() {
            match c {
                '0'..='9' => digits.push(c),
                ' ' | '-' | '(' | ')' => {}
                _ => {
                    return Err(ValidationError::InvalidFormat {
                        field: "phone",
                        reason: "may only contain digits, spaces, dashes, parentheses and a leading '+'",
                    })
                }
            }
        }

        if !(7..=15).contains(&digits.len()) {
            return Err(ValidationError::InvalidFormat {
                field: "phone",
                reason: "must contain 7 to 15 digits",
            });
        }

        Ok(Self(if plus { format!("+{}", digits) } else { digits }))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Lower-cased e-mail address with a minimal shape check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email(String);

impl Email {
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: "email" });
        }
        if trimmed.len() > MAX_EMAIL_LEN {
            return Err(ValidationError::TooLong {
                field: "email",
                max: MAX_EMAIL_LEN,
            });
        }

        const BAD_SHAPE: ValidationError = ValidationError::InvalidFormat {
            field: "email",
            reason: "must look like name@domain.tld",
        };

        if trimmed.chars().any(char::is_whitespace) {
            return Err(BAD_SHAPE);
        }

        let mut parts = trimmed.split('@');
        let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(BAD_SHAPE);
        };

        if local.is_empty()
            || !domain.contains('.')
            || domain.starts_with('.')
            || domain.ends_with('.')
        {
            return Err(BAD_SHAPE);
        }

        Ok(Self(trimmed.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Trim optional free text; blank becomes `None`.
pub fn optional_text(
    field: &'static str,
    value: Option<&str>,
    max: usize,
) -> Result<Option<String>, ValidationError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) if s.chars().count() > max => Err(ValidationError::TooLong { field, max }),
        Some(s) => Ok(Some(s.to_owned())),
    }
}

/// Validate an optional phone; blank becomes `None`.
pub fn optional_phone(value: Option<&str>) -> Result<Option<String>, ValidationError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => Phone::new(s).map(|p| Some(p.into_string())),
    }
}

/// Validate an optional e-mail; blank becomes `None`.
pub fn optional_email(value: Option<&str>) -> Result<Option<String>, ValidationError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => Email::new(s).map(|e| Some(e.into_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_trimmed() {
        assert_eq!(Name::new("first_name", "  Ivan ").unwrap().as_str(), "Ivan");
        assert!(matches!(
            Name::new("first_name", "   "),
            Err(ValidationError::Empty { field: "first_name" })
        ));
        let long = "я".repeat(129);
        assert!(matches!(
            Name::new("last_name", &long),
            Err(ValidationError::TooLong { max: 128, .. })
        ));
    }

    #[test]
    fn slugs() {
        assert!(Slug::new("slug", "summer-tour_1").is_ok());
        assert!(Slug::new("slug", "-tour").is_err());
        assert!(Slug::new("slug", "Tour").is_err());
        assert!(Slug::new("slug", "").is_err());
    }

    #[test]
    fn phone_normalization() {
        assert_eq!(Phone::new("8 900 123 45 67").unwrap().as_str(), "89001234567");
        assert_eq!(Phone::new("+44 (20) 7946-0958").unwrap().as_str(), "+442079460958");
        assert!(Phone::new("+44 20 7946.0958").is_err());
        assert!(Phone::new("12345").is_err());
        assert!(Phone::new("+7 900 CALL ME").is_err());
        assert!(Phone::new("1234567890123456").is_err());
    }

    #[test]
    fn email_shape() {
        assert_eq!(Email::new(" Anna@Mail.RU ").unwrap().as_str(), "anna@mail.ru");
        assert!(Email::new("anna@mail").is_err());
        assert!(Email::new("@mail.ru").is_err());
        assert!(Email::new("a@b@c.ru").is_err());
        assert!(Email::new("an na@mail.ru").is_err());
        assert!(Email::new("anna@.ru").is_err());
    }

    #[test]
    fn optional_helpers() {
        assert_eq!(optional_text("notes", Some("  "), 10).unwrap(), None);
        assert_eq!(optional_text("notes", None, 10).unwrap(), None);
        assert_eq!(
            optional_text("notes", Some(" hi "), 10).unwrap(),
            Some("hi".to_string())
        );
        assert!(optional_text("notes", Some("0123456789ab"), 10).is_err());
        assert_eq!(optional_phone(Some("")).unwrap(), None);
        assert!(optional_email(Some("nope")).is_err());
    }
}
