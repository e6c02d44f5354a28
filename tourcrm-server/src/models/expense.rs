//! Tour expenses

use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use super::money;
use super::text::{optional_text, Slug, MAX_NOTES_LEN};
use super::ValidationError;

#[derive(Debug, Deserialize)]
pub struct CreateExpenseRequest {
    pub category: String,
    pub description: Option<String>,
    pub amount_cents: i64,
    pub incurred_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    pub category: String,
    pub description: Option<String>,
    pub amount_cents: i64,
    pub incurred_on: NaiveDate,
}

impl CreateExpenseRequest {
    pub fn validate(&self) -> Result<NewExpense, ValidationError> {
        Ok(NewExpense {
            category: Slug::new("category", &self.category.trim().to_lowercase())?.into_string(),
            description: optional_text("description", self.description.as_deref(), MAX_NOTES_LEN)?,
            amount_cents: money::positive("amount_cents", self.amount_cents)?,
            incurred_on: self.incurred_on.unwrap_or_else(|| Utc::now().date_naive()),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateExpenseRequest {
    pub category: Option<String>,
    pub description: Option<String>,
    pub amount_cents: Option<i64>,
    pub incurred_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpensePatch {
    pub category: Option<String>,
    pub description: Option<String>,
    pub amount_cents: Option<i64>,
    pub incurred_on: Option<NaiveDate>,
}

impl UpdateExpenseRequest {
    pub fn validate(&self) -> Result<ExpensePatch, ValidationError> {
        Ok(ExpensePatch {
            category: self
                .category
                .as_deref()
                .map(|s| Slug::new("category", &s.trim().to_lowercase()).map(Slug::into_string))
                .transpose()?,
            description: optional_text("description", self.description.as_deref(), MAX_NOTES_LEN)?,
            amount_cents: self
                .amount_cents
                .map(|a| money::positive("amount_cents", a))
                .transpose()?,
            incurred_on: self.incurred_on,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expense_needs_positive_amount() {
        let req = CreateExpenseRequest {
            category: "Transport".into(),
            description: Some("Bus rental".into()),
            amount_cents: 0,
            incurred_on: None,
        };
        assert!(req.validate().is_err());

        let req = CreateExpenseRequest {
            amount_cents: 1_500_000,
            ..req
        };
        let expense = req.validate().unwrap();
        assert_eq!(expense.category, "transport");
        assert_eq!(expense.incurred_on, Utc::now().date_naive());
    }
}
