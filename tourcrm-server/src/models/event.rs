//! Tours (events) and their itinerary

use chrono::NaiveDate;
use serde::Deserialize;

use super::money;
use super::text::{optional_text, Name, MAX_NOTES_LEN};
use super::ValidationError;

const MAX_CITIES: usize = 30;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub cities: Vec<String>,
    pub price_cents: i64,
    pub currency: Option<String>,
    pub capacity: i32,
}

/// Validated event insert
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub title: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub cities: Vec<String>,
    pub price_cents: i64,
    pub currency: String,
    pub capacity: i32,
}

/// Trim city names and reject blanks and case-insensitive duplicates.
///
/// Order is kept: it is the order of the itinerary.
pub fn normalize_cities(cities: &[String]) -> Result<Vec<String>, ValidationError> {
    if cities.is_empty() {
        return Err(ValidationError::Empty { field: "cities" });
    }
    if cities.len() > MAX_CITIES {
        return Err(ValidationError::out_of_range(
            "cities",
            format!("at most {} cities per tour", MAX_CITIES),
        ));
    }

    let mut out: Vec<String> = Vec::with_capacity(cities.len());
    for city in cities {
        let name = Name::new("cities", city)?.into_string();
        if out.iter().any(|c| c.to_lowercase() == name.to_lowercase()) {
            return Err(ValidationError::field(name, "city listed twice"));
        }
        out.push(name);
    }
    Ok(out)
}

fn date_order(start: NaiveDate, end: NaiveDate) -> Result<(), ValidationError> {
    if end < start {
        return Err(ValidationError::out_of_range(
            "end_date",
            "must not be before start_date",
        ));
    }
    Ok(())
}

fn capacity(value: i32) -> Result<i32, ValidationError> {
    if value <= 0 {
        return Err(ValidationError::out_of_range(
            "capacity",
            "must be greater than zero",
        ));
    }
    Ok(value)
}

impl CreateEventRequest {
    pub fn validate(&self) -> Result<NewEvent, ValidationError> {
        date_order(self.start_date, self.end_date)?;

        Ok(NewEvent {
            title: Name::new("title", &self.title)?.into_string(),
            description: optional_text("description", self.description.as_deref(), MAX_NOTES_LEN)?,
            start_date: self.start_date,
            end_date: self.end_date,
            cities: normalize_cities(&self.cities)?,
            price_cents: money::non_negative("price_cents", self.price_cents)?,
            currency: money::currency(self.currency.as_deref())?,
            capacity: capacity(self.capacity)?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub cities: Option<Vec<String>>,
    pub price_cents: Option<i64>,
    pub currency: Option<String>,
    pub capacity: Option<i32>,
    pub is_active: Option<bool>,
}

/// Validated partial update; `None` leaves the column unchanged
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub cities: Option<Vec<String>>,
    pub price_cents: Option<i64>,
    pub currency: Option<String>,
    pub capacity: Option<i32>,
    pub is_active: Option<bool>,
}

impl UpdateEventRequest {
    /// Validate against the stored date window so that a patch touching only
    /// one date still keeps `start_date <= end_date`.
    pub fn validate(
        &self,
        current_start: NaiveDate,
        current_end: NaiveDate,
    ) -> Result<EventPatch, ValidationError> {
        date_order(
            self.start_date.unwrap_or(current_start),
            self.end_date.unwrap_or(current_end),
        )?;

        Ok(EventPatch {
            title: self
                .title
                .as_deref()
                .map(|s| Name::new("title", s).map(Name::into_string))
                .transpose()?,
            description: optional_text("description", self.description.as_deref(), MAX_NOTES_LEN)?,
            start_date: self.start_date,
            end_date: self.end_date,
            cities: self.cities.as_deref().map(normalize_cities).transpose()?,
            price_cents: self
                .price_cents
                .map(|p| money::non_negative("price_cents", p))
                .transpose()?,
            currency: self
                .currency
                .as_deref()
                .map(|c| money::currency(Some(c)))
                .transpose()?,
            capacity: self.capacity.map(capacity).transpose()?,
            is_active: self.is_active,
        })
    }
}

impl EventPatch {
    pub fn changes_itinerary(&self) -> bool {
        self.start_date.is_some() || self.end_date.is_some() || self.cities.is_some()
    }

    /// Itinerary after applying this patch to `current`.
    pub fn itinerary(&self, current: &Itinerary) -> Itinerary {
        Itinerary {
            start_date: self.start_date.unwrap_or(current.start_date),
            end_date: self.end_date.unwrap_or(current.end_date),
            cities: self.cities.clone().unwrap_or_else(|| current.cities.clone()),
        }
    }
}

/// Date window and ordered cities a city visit must fit into
#[derive(Debug, Clone, PartialEq)]
pub struct Itinerary {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub cities: Vec<String>,
}

impl Itinerary {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }

    /// Canonical spelling of `city` as listed on the tour.
    pub fn find_city(&self, city: &str) -> Option<&str> {
        let wanted = city.trim().to_lowercase();
        self.cities
            .iter()
            .find(|c| c.to_lowercase() == wanted)
            .map(String::as_str)
    }

    /// Whether a stay in `city` from `arrival` to `departure` fits the tour.
    pub fn admits(&self, city: &str, arrival: NaiveDate, departure: NaiveDate) -> bool {
        self.find_city(city).is_some() && self.contains(arrival) && self.contains(departure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn request() -> CreateEventRequest {
        CreateEventRequest {
            title: "Golden Ring".into(),
            description: None,
            start_date: date(2025, 6, 1),
            end_date: date(2025, 6, 10),
            cities: vec!["Moscow".into(), " Suzdal ".into(), "Vladimir".into()],
            price_cents: 9_500_000,
            currency: None,
            capacity: 20,
        }
    }

    #[test]
    fn valid_event() {
        let event = request().validate().unwrap();
        assert_eq!(event.cities, vec!["Moscow", "Suzdal", "Vladimir"]);
        assert_eq!(event.currency, "RUB");
    }

    #[test]
    fn rejects_reversed_dates() {
        let req = CreateEventRequest {
            end_date: date(2025, 5, 31),
            ..request()
        };
        assert!(matches!(
            req.validate(),
            Err(ValidationError::OutOfRange { field: "end_date", .. })
        ));
    }

    #[test]
    fn rejects_duplicate_cities() {
        let req = CreateEventRequest {
            cities: vec!["Moscow".into(), "moscow".into()],
            ..request()
        };
        assert!(matches!(req.validate(), Err(ValidationError::Field { .. })));

        let req = CreateEventRequest {
            cities: vec![],
            ..request()
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn rejects_bad_capacity_and_price() {
        let req = CreateEventRequest {
            capacity: 0,
            ..request()
        };
        assert!(req.validate().is_err());
        let req = CreateEventRequest {
            price_cents: -1,
            ..request()
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn patch_checks_merged_window() {
        let patch = UpdateEventRequest {
            end_date: Some(date(2025, 5, 1)),
            ..Default::default()
        };
        assert!(patch.validate(date(2025, 6, 1), date(2025, 6, 10)).is_err());

        let patch = UpdateEventRequest {
            start_date: Some(date(2025, 6, 5)),
            ..Default::default()
        };
        assert!(patch.validate(date(2025, 6, 1), date(2025, 6, 10)).is_ok());
    }

    #[test]
    fn itinerary_lookup() {
        let it = Itinerary {
            start_date: date(2025, 6, 1),
            end_date: date(2025, 6, 10),
            cities: vec!["Moscow".into(), "Suzdal".into()],
        };
        assert_eq!(it.find_city(" suzdal"), Some("Suzdal"));
        assert_eq!(it.find_city("Kazan"), None);
        assert!(it.contains(date(2025, 6, 10)));
        assert!(!it.contains(date(2025, 6, 11)));
        assert!(it.admits("SUZDAL", date(2025, 6, 2), date(2025, 6, 4)));
        assert!(!it.admits("Suzdal", date(2025, 6, 9), date(2025, 6, 11)));
        assert!(!it.admits("Kazan", date(2025, 6, 2), date(2025, 6, 4)));
    }

    #[test]
    fn patch_merges_itinerary() {
        let current = Itinerary {
            start_date: date(2025, 6, 1),
            end_date: date(2025, 6, 10),
            cities: vec!["Vladimir".into(), "Suzdal".into()],
        };
        let patch = UpdateEventRequest {
            end_date: Some(date(2025, 6, 5)),
            cities: Some(vec!["Vladimir".into()]),
            ..Default::default()
        }
        .validate(current.start_date, current.end_date)
        .unwrap();
        assert!(patch.changes_itinerary());

        let next = patch.itinerary(&current);
        assert_eq!(next.start_date, date(2025, 6, 1));
        assert_eq!(next.end_date, date(2025, 6, 5));
        assert_eq!(next.cities, vec!["Vladimir"]);

        let price_only = UpdateEventRequest {
            price_cents: Some(1),
            ..Default::default()
        }
        .validate(current.start_date, current.end_date)
        .unwrap();
        assert!(!price_only.changes_itinerary());
        assert_eq!(price_only.itinerary(&current), current);
    }
}
