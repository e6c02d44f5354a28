//! Reference dictionaries (lead sources, hotels, expense categories, ...)

use serde::Deserialize;

use super::text::{Name, Slug};
use super::ValidationError;

/// Dictionary kinds the application itself reads
pub mod kinds {
    pub const LEAD_SOURCE: &str = "lead_source";
    pub const HOTEL: &str = "hotel";
    pub const TRANSPORT: &str = "transport";
    pub const EXPENSE_CATEGORY: &str = "expense_category";
}

#[derive(Debug, Deserialize)]
pub struct CreateEntryRequest {
    pub kind: String,
    pub value: String,
    pub label: String,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    pub kind: String,
    pub value: String,
    pub label: String,
    pub sort_order: i32,
    pub is_active: bool,
}

impl CreateEntryRequest {
    pub fn validate(&self) -> Result<NewEntry, ValidationError> {
        Ok(NewEntry {
            kind: Slug::new("kind", self.kind.trim())?.into_string(),
            value: Slug::new("value", &self.value.trim().to_lowercase())?.into_string(),
            label: Name::new("label", &self.label)?.into_string(),
            sort_order: self.sort_order.unwrap_or(0),
            is_active: self.is_active.unwrap_or(true),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateEntryRequest {
    pub label: Option<String>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryPatch {
    pub label: Option<String>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
}

impl UpdateEntryRequest {
    pub fn validate(&self) -> Result<EntryPatch, ValidationError> {
        Ok(EntryPatch {
            label: self
                .label
                .as_deref()
                .map(|s| Name::new("label", s).map(Name::into_string))
                .transpose()?,
            sort_order: self.sort_order,
            is_active: self.is_active,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_lowercased_and_checked() {
        let req = CreateEntryRequest {
            kind: "hotel".into(),
            value: "Kosmos".into(),
            label: "Hotel Kosmos".into(),
            sort_order: None,
            is_active: None,
        };
        let entry = req.validate().unwrap();
        assert_eq!(entry.value, "kosmos");
        assert!(entry.is_active);

        let req = CreateEntryRequest {
            kind: "Hotel".into(),
            value: "kosmos".into(),
            label: "Hotel Kosmos".into(),
            sort_order: None,
            is_active: None,
        };
        assert!(req.validate().is_err());
    }
}
