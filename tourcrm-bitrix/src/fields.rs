//! Mapping between tourcrm records and Bitrix24 field conventions
//!
//! Classic CRM entities (contact, deal) use UPPER_SNAKE field names and
//! multi-value arrays for phones/e-mails. Smart-process items (`crm.item.*`)
//! use camelCase names.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};

/// Prefix Bitrix24 adds to custom contact fields
pub const USER_FIELD_PREFIX: &str = "UF_CRM_";

/// Custom contact field holding passport data
pub const PASSPORT_FIELD: &str = "UF_CRM_TOUR_PASSPORT";

/// Custom contact field holding the internal contact id
pub const EXTERNAL_ID_FIELD: &str = "UF_CRM_TOUR_CONTACT_ID";

/// One entry of a multi-value field (`PHONE`, `EMAIL`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiField {
    #[serde(rename = "VALUE")]
    pub value: String,
    #[serde(rename = "VALUE_TYPE")]
    pub value_type: String,
}

impl MultiField {
    pub fn work(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            value_type: "WORK".to_owned(),
        }
    }
}

/// Tourist as a Bitrix24 contact
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContactPayload {
    #[serde(rename = "NAME")]
    pub first_name: String,
    #[serde(rename = "LAST_NAME")]
    pub last_name: String,
    #[serde(rename = "SECOND_NAME", skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    #[serde(rename = "BIRTHDATE", skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    #[serde(rename = "PHONE", skip_serializing_if = "Vec::is_empty")]
    pub phones: Vec<MultiField>,
    #[serde(rename = "EMAIL", skip_serializing_if = "Vec::is_empty")]
    pub emails: Vec<MultiField>,
    #[serde(rename = "COMMENTS", skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    #[serde(rename = "UF_CRM_TOUR_PASSPORT", skip_serializing_if = "Option::is_none")]
    pub passport: Option<String>,
    #[serde(rename = "UF_CRM_TOUR_CONTACT_ID", skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

impl ContactPayload {
    pub fn to_fields(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| json!({}))
    }
}

/// Booking as a Bitrix24 deal
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DealPayload {
    #[serde(rename = "TITLE")]
    pub title: String,
    #[serde(rename = "CONTACT_ID")]
    pub contact_id: i64,
    /// Amount in major units, as Bitrix24 expects
    #[serde(rename = "OPPORTUNITY")]
    pub opportunity: f64,
    #[serde(rename = "CURRENCY_ID")]
    pub currency: String,
    #[serde(rename = "STAGE_ID", skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(rename = "COMMENTS", skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
}

impl DealPayload {
    pub fn to_fields(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| json!({}))
    }
}

/// Convert minor units to the decimal amount Bitrix24 stores.
pub fn cents_to_opportunity(cents: i64) -> f64 {
    cents as f64 / 100.0
}

/// Smart-process item linking a tourist contact to a tour
#[derive(Debug, Clone, PartialEq)]
pub struct TouristItemPayload {
    pub title: String,
    pub contact_id: i64,
    pub event_title: String,
}

impl TouristItemPayload {
    /// Item fields with the tour reference stored under `event_field`.
    pub fn to_fields(&self, event_field: &str) -> Value {
        let mut fields = Map::new();
        fields.insert("title".into(), Value::String(self.title.clone()));
        fields.insert("contactId".into(), json!(self.contact_id));
        fields.insert(
            event_field.to_owned(),
            Value::String(self.event_title.clone()),
        );
        Value::Object(fields)
    }
}

/// Custom contact field definition used by field setup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserFieldDef {
    /// Name without the `UF_CRM_` prefix
    pub name: &'static str,
    /// Bitrix24 user type (`string`, `date`, `double`, ...)
    pub user_type: &'static str,
    pub label: &'static str,
}

impl UserFieldDef {
    /// Name as it appears on records (`UF_CRM_...`).
    pub fn full_name(&self) -> String {
        format!("{}{}", USER_FIELD_PREFIX, self.name)
    }

    pub fn to_fields(&self) -> Value {
        json!({
            "FIELD_NAME": self.name,
            "USER_TYPE_ID": self.user_type,
            "XML_ID": self.name,
            "EDIT_FORM_LABEL": self.label,
            "LIST_COLUMN_LABEL": self.label,
        })
    }
}

/// Custom fields tourist contacts rely on
pub const TOURIST_CONTACT_FIELDS: &[UserFieldDef] = &[
    UserFieldDef {
        name: "TOUR_PASSPORT",
        user_type: "string",
        label: "Passport",
    },
    UserFieldDef {
        name: "TOUR_CONTACT_ID",
        user_type: "string",
        label: "Tourcrm contact id",
    },
];

/// Existing custom field as listed by `crm.contact.userfield.list`
#[derive(Debug, Clone, Deserialize)]
pub struct UserField {
    #[serde(rename = "ID", deserialize_with = "de_id")]
    pub id: i64,
    #[serde(rename = "FIELD_NAME")]
    pub field_name: String,
    #[serde(rename = "USER_TYPE_ID", default)]
    pub user_type: Option<String>,
}

/// Webhook owner as returned by `profile`
#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    #[serde(rename = "ID", deserialize_with = "de_id")]
    pub id: i64,
    #[serde(rename = "NAME", default)]
    pub name: Option<String>,
    #[serde(rename = "LAST_NAME", default)]
    pub last_name: Option<String>,
    #[serde(rename = "ADMIN", default)]
    pub admin: bool,
}

/// Bitrix24 returns ids as numbers or numeric strings depending on the method.
pub fn parse_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn de_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    parse_id(&value).ok_or_else(|| serde::de::Error::custom(format!("invalid id: {}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contact_uses_bitrix_names() {
        let payload = ContactPayload {
            first_name: "Ivan".into(),
            last_name: "Petrov".into(),
            birth_date: NaiveDate::from_ymd_opt(1990, 5, 17),
            phones: vec![MultiField::work("+79001234567")],
            passport: Some("4510 123456".into()),
            ..Default::default()
        };

        let fields = payload.to_fields();
        assert_eq!(fields["NAME"], "Ivan");
        assert_eq!(fields["LAST_NAME"], "Petrov");
        assert_eq!(fields["BIRTHDATE"], "1990-05-17");
        assert_eq!(fields["PHONE"][0]["VALUE"], "+79001234567");
        assert_eq!(fields["PHONE"][0]["VALUE_TYPE"], "WORK");
        assert_eq!(fields[PASSPORT_FIELD], "4510 123456");
        // Empty optionals are omitted rather than sent as null
        assert!(fields.get("EMAIL").is_none());
        assert!(fields.get("SECOND_NAME").is_none());
    }

    #[test]
    fn deal_amount_in_major_units() {
        let payload = DealPayload {
            title: "Golden Ring: Petrov".into(),
            contact_id: 42,
            opportunity: cents_to_opportunity(12_345_050),
            currency: "RUB".into(),
            stage: None,
            comments: None,
        };
        let fields = payload.to_fields();
        assert_eq!(fields["CONTACT_ID"], 42);
        assert_eq!(fields["OPPORTUNITY"], 123450.5);
        assert_eq!(fields["CURRENCY_ID"], "RUB");
    }

    #[test]
    fn item_uses_configured_event_field() {
        let item = TouristItemPayload {
            title: "Petrov Ivan".into(),
            contact_id: 7,
            event_title: "Golden Ring".into(),
        };
        let fields = item.to_fields("ufCrm5Tour");
        assert_eq!(fields["contactId"], 7);
        assert_eq!(fields["ufCrm5Tour"], "Golden Ring");
    }

    #[test]
    fn ids_from_numbers_and_strings() {
        assert_eq!(parse_id(&json!(15)), Some(15));
        assert_eq!(parse_id(&json!("15")), Some(15));
        assert_eq!(parse_id(&json!("abc")), None);
        assert_eq!(parse_id(&json!(null)), None);
    }

    #[test]
    fn user_field_full_name() {
        assert_eq!(TOURIST_CONTACT_FIELDS[0].full_name(), PASSPORT_FIELD);
        assert_eq!(TOURIST_CONTACT_FIELDS[1].full_name(), EXTERNAL_ID_FIELD);
    }
}
