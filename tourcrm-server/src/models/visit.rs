//! City visits: one itinerary leg of a tourist's deal

use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;

use super::event::Itinerary;
use super::text::optional_text;
use super::{TransportKind, ValidationError};

const MAX_DETAILS_LEN: usize = 256;

#[derive(Debug, Clone, Deserialize)]
pub struct VisitRequest {
    pub city: String,
    pub arrival_date: NaiveDate,
    pub arrival_time: Option<NaiveTime>,
    pub arrival_transport: Option<String>,
    pub arrival_details: Option<String>,
    pub departure_date: NaiveDate,
    pub departure_time: Option<NaiveTime>,
    pub departure_transport: Option<String>,
    pub departure_details: Option<String>,
    pub hotel: Option<String>,
}

/// Validated city visit
#[derive(Debug, Clone, PartialEq)]
pub struct NewVisit {
    pub city: String,
    pub arrival_date: NaiveDate,
    pub arrival_time: Option<NaiveTime>,
    pub arrival_transport: Option<TransportKind>,
    pub arrival_details: Option<String>,
    pub departure_date: NaiveDate,
    pub departure_time: Option<NaiveTime>,
    pub departure_transport: Option<TransportKind>,
    pub departure_details: Option<String>,
    pub hotel: Option<String>,
}

impl VisitRequest {
    /// Validate against the tour the deal belongs to.
    ///
    /// The city must be on the tour (its spelling is taken from the tour),
    /// both dates must fall inside the tour window and departure must not
    /// precede arrival.
    pub fn validate(&self, itinerary: &Itinerary) -> Result<NewVisit, ValidationError> {
        let city = itinerary
            .find_city(&self.city)
            .ok_or_else(|| {
                ValidationError::field(
                    "city",
                    format!(
                        "'{}' is not on this tour (cities: {})",
                        self.city.trim(),
                        itinerary.cities.join(", ")
                    ),
                )
            })?
            .to_owned();

        for (field, date) in [
            ("arrival_date", self.arrival_date),
            ("departure_date", self.departure_date),
        ] {
            if !itinerary.contains(date) {
                return Err(ValidationError::out_of_range(
                    field,
                    format!(
                        "{} is outside the tour dates {} - {}",
                        date, itinerary.start_date, itinerary.end_date
                    ),
                ));
            }
        }

        let departs_early = self.departure_date < self.arrival_date
            || (self.departure_date == self.arrival_date
                && matches!(
                    (self.arrival_time, self.departure_time),
                    (Some(a), Some(d)) if d < a
                ));
        if departs_early {
            return Err(ValidationError::out_of_range(
                "departure_date",
                "departure must not be before arrival",
            ));
        }

        Ok(NewVisit {
            city,
            arrival_date: self.arrival_date,
            arrival_time: self.arrival_time,
            arrival_transport: self
                .arrival_transport
                .as_deref()
                .map(TransportKind::parse)
                .transpose()?,
            arrival_details: optional_text(
                "arrival_details",
                self.arrival_details.as_deref(),
                MAX_DETAILS_LEN,
            )?,
            departure_date: self.departure_date,
            departure_time: self.departure_time,
            departure_transport: self
                .departure_transport
                .as_deref()
                .map(TransportKind::parse)
                .transpose()?,
            departure_details: optional_text(
                "departure_details",
                self.departure_details.as_deref(),
                MAX_DETAILS_LEN,
            )?,
            hotel: optional_text("hotel", self.hotel.as_deref(), MAX_DETAILS_LEN)?,
        })
    }
}

/// Partial update of a visit; merged with the stored visit and then
/// validated as a whole.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateVisitRequest {
    pub city: Option<String>,
    pub arrival_date: Option<NaiveDate>,
    pub arrival_time: Option<NaiveTime>,
    pub arrival_transport: Option<String>,
    pub arrival_details: Option<String>,
    pub departure_date: Option<NaiveDate>,
    pub departure_time: Option<NaiveTime>,
    pub departure_transport: Option<String>,
    pub departure_details: Option<String>,
    pub hotel: Option<String>,
}

impl UpdateVisitRequest {
    /// Overlay the present fields on `current`.
    pub fn merge_into(self, current: VisitRequest) -> VisitRequest {
        VisitRequest {
            city: self.city.unwrap_or(current.city),
            arrival_date: self.arrival_date.unwrap_or(current.arrival_date),
            arrival_time: self.arrival_time.or(current.arrival_time),
            arrival_transport: self.arrival_transport.or(current.arrival_transport),
            arrival_details: self.arrival_details.or(current.arrival_details),
            departure_date: self.departure_date.unwrap_or(current.departure_date),
            departure_time: self.departure_time.or(current.departure_time),
            departure_transport: self.departure_transport.or(current.departure_transport),
            departure_details: self.departure_details.or(current.departure_details),
            hotel: self.hotel.or(current.hotel),
        }
    }
}
