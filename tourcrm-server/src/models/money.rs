//! Money amounts in minor units (cents/kopecks)

use super::ValidationError;

/// Default currency for tours
pub const DEFAULT_CURRENCY: &str = "RUB";

/// Reject negative amounts.
pub fn non_negative(field: &'static str, cents: i64) -> Result<i64, ValidationError> {
    if cents < 0 {
        return Err(ValidationError::out_of_range(field, "must not be negative"));
    }
    Ok(cents)
}

/// Reject zero and negative amounts.
pub fn positive(field: &'static str, cents: i64) -> Result<i64, ValidationError> {
    if cents <= 0 {
        return Err(ValidationError::out_of_range(field, "must be greater than zero"));
    }
    Ok(cents)
}

/// ISO 4217 style code: three ASCII letters, upper-cased.
pub fn currency(code: Option<&str>) -> Result<String, ValidationError> {
    let code = code.map(str::trim).unwrap_or(DEFAULT_CURRENCY);
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ValidationError::InvalidFormat {
            field: "currency",
            reason: "must be a three-letter currency code",
        });
    }
    Ok(code.to_ascii_uppercase())
}

/// Render minor units as `units.cents` (e.g. `-12.05`).
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_cents() {
        assert_eq!(format_cents(0), "0.00");
        assert_eq!(format_cents(5), "0.05");
        assert_eq!(format_cents(12_345_050), "123450.50");
        assert_eq!(format_cents(-1205), "-12.05");
    }

    #[test]
    fn amount_checks() {
        assert_eq!(non_negative("price", 0).unwrap(), 0);
        assert!(non_negative("price", -1).is_err());
        assert!(positive("amount", 0).is_err());
        assert_eq!(positive("amount", 10).unwrap(), 10);
    }

    #[test]
    fn currency_codes() {
        assert_eq!(currency(None).unwrap(), "RUB");
        assert_eq!(currency(Some("eur")).unwrap(), "EUR");
        assert!(currency(Some("EURO")).is_err());
        assert!(currency(Some("E1R")).is_err());
    }
}
