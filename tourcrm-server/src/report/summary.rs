//! Tour summary: tourists grouped by booking, one column block per city
//!
//! Layout rules:
//! - a group is the set of deals sharing `group_id` (a deal without one is
//!   its own group); its rowspan is its row count
//! - rows inside a group: primary tourist first, then by last and first name
//! - groups by earliest arrival (groups without visits last), then by the
//!   earliest booking time
//! - within a group, consecutive identical visits to a city merge into one
//!   cell: the first row carries `span = n`, the merged rows `span = 0`

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{CityVisit, DealDetails, Event};
use crate::models::DealStatus;

/// One deal with its tourist and city visits
#[derive(Debug, Clone)]
pub struct SummaryInput {
    pub deal: DealDetails,
    pub visits: Vec<CityVisit>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct SummaryOptions {
    #[serde(default)]
    pub include_cancelled: bool,
}

/// Arrival or departure of one visit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Movement {
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub transport: Option<String>,
    pub details: Option<String>,
}

impl Movement {
    /// `2025-06-01 14:30 plane SU-1234`
    pub fn display(&self) -> String {
        let mut parts = vec![self.date.format("%Y-%m-%d").to_string()];
        if let Some(time) = self.time {
            parts.push(time.format("%H:%M").to_string());
        }
        parts.extend(self.transport.iter().cloned());
        parts.extend(self.details.iter().cloned());
        parts.join(" ")
    }
}

/// Cell of one city column; empty when the tourist skips the city
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisitCell {
    pub arrival: Option<Movement>,
    pub departure: Option<Movement>,
    pub hotel: Option<String>,
    /// Rows covered by this cell; 0 when merged into the cell above
    pub span: usize,
}

impl VisitCell {
    fn empty() -> Self {
        Self {
            arrival: None,
            departure: None,
            hotel: None,
            span: 1,
        }
    }

    fn from_visit(visit: &CityVisit) -> Self {
        Self {
            arrival: Some(Movement {
                date: visit.arrival_date,
                time: visit.arrival_time,
                transport: visit.arrival_transport.clone(),
                details: visit.arrival_details.clone(),
            }),
            departure: Some(Movement {
                date: visit.departure_date,
                time: visit.departure_time,
                transport: visit.departure_transport.clone(),
                details: visit.departure_details.clone(),
            }),
            hotel: visit.hotel.clone(),
            span: 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.arrival.is_none()
    }

    /// Same stay: arrival, departure and hotel match.
    fn same_stay(&self, other: &VisitCell) -> bool {
        !self.is_empty()
            && self.arrival == other.arrival
            && self.departure == other.departure
            && self.hotel == other.hotel
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryRow {
    pub deal_id: Uuid,
    pub contact_id: Uuid,
    pub tourist: String,
    pub phone: Option<String>,
    pub is_primary: bool,
    pub status: String,
    pub payment_state: String,
    pub amount_cents: i64,
    pub paid_cents: i64,
    /// Aligned with the report's `cities`
    pub cells: Vec<VisitCell>,
    #[serde(skip)]
    last_name: String,
    #[serde(skip)]
    first_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryGroup {
    /// 1-based position in the report
    pub number: usize,
    pub group_id: Uuid,
    pub rowspan: usize,
    pub amount_cents: i64,
    pub paid_cents: i64,
    pub rows: Vec<SummaryRow>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SummaryTotals {
    pub tourists: usize,
    pub groups: usize,
    pub amount_cents: i64,
    pub paid_cents: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryReport {
    pub event_id: Uuid,
    pub event_title: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub currency: String,
    pub cities: Vec<String>,
    pub groups: Vec<SummaryGroup>,
    pub totals: SummaryTotals,
}

fn tourist_name(deal: &DealDetails) -> String {
    let mut name = format!("{} {}", deal.last_name, deal.first_name);
    if let Some(middle) = &deal.middle_name {
        name.push(' ');
        name.push_str(middle);
    }
    name
}

fn build_row(input: &SummaryInput, cities: &[String]) -> SummaryRow {
    let deal = &input.deal;
    let cells = cities
        .iter()
        .map(|city| {
            let city = city.to_lowercase();
            input
                .visits
                .iter()
                .find(|v| v.city.to_lowercase() == city)
                .map(VisitCell::from_visit)
                .unwrap_or_else(VisitCell::empty)
        })
        .collect();

    SummaryRow {
        deal_id: deal.deal.id,
        contact_id: deal.deal.contact_id,
        tourist: tourist_name(deal),
        phone: deal.phone.clone(),
        is_primary: deal.deal.is_primary,
        status: deal.deal.status.clone(),
        payment_state: deal.payment_state.clone(),
        amount_cents: deal.deal.amount_cents,
        paid_cents: deal.deal.paid_cents,
        cells,
        last_name: deal.last_name.clone(),
        first_name: deal.first_name.clone(),
    }
}

fn row_order(a: &SummaryRow, b: &SummaryRow) -> Ordering {
    b.is_primary
        .cmp(&a.is_primary)
        .then_with(|| a.last_name.cmp(&b.last_name))
        .then_with(|| a.first_name.cmp(&b.first_name))
}

/// Merge runs of identical stays per city column.
fn merge_cells(rows: &mut [SummaryRow], columns: usize) {
    for col in 0..columns {
        let mut start = 0;
        while start < rows.len() {
            let mut end = start + 1;
            while end < rows.len() && rows[start].cells[col].same_stay(&rows[end].cells[col]) {
                end += 1;
            }
            rows[start].cells[col].span = end - start;
            for row in &mut rows[start + 1..end] {
                row.cells[col].span = 0;
            }
            start = end;
        }
    }
}

/// Sort key of a group: earliest arrival (none sorts last), earliest booking.
struct GroupKey {
    first_arrival: Option<NaiveDate>,
    first_booked: DateTime<Utc>,
}

fn group_order(a: &GroupKey, b: &GroupKey) -> Ordering {
    match (a.first_arrival, b.first_arrival) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.first_booked.cmp(&b.first_booked))
}

/// Lay out the summary of `event` from its deals.
pub fn build_summary(event: &Event, inputs: &[SummaryInput], options: SummaryOptions) -> SummaryReport {
    let mut order: Vec<Uuid> = Vec::new();
    let mut buckets: HashMap<Uuid, Vec<&SummaryInput>> = HashMap::new();

    for input in inputs {
        if !options.include_cancelled && input.deal.deal.status() == DealStatus::Cancelled {
            continue;
        }
        let key = input.deal.deal.group_id.unwrap_or(input.deal.deal.id);
        buckets
            .entry(key)
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(input);
    }

    let mut keyed: Vec<(GroupKey, SummaryGroup)> = order
        .into_iter()
        .filter_map(|group_id| buckets.remove(&group_id).map(|members| (group_id, members)))
        .map(|(group_id, members)| {
            let key = GroupKey {
                first_arrival: members
                    .iter()
                    .flat_map(|m| m.visits.iter().map(|v| v.arrival_date))
                    .min(),
                first_booked: members
                    .iter()
                    .map(|m| m.deal.deal.created_at)
                    .min()
                    .unwrap_or_else(Utc::now),
            };

            let mut rows: Vec<SummaryRow> = members.iter().map(|m| build_row(m, &event.cities)).collect();
            rows.sort_by(row_order);
            merge_cells(&mut rows, event.cities.len());

            let group = SummaryGroup {
                number: 0,
                group_id,
                rowspan: rows.len(),
                amount_cents: rows.iter().map(|r| r.amount_cents).sum(),
                paid_cents: rows.iter().map(|r| r.paid_cents).sum(),
                rows,
            };
            (key, group)
        })
        .collect();

    keyed.sort_by(|a, b| group_order(&a.0, &b.0));

    let groups: Vec<SummaryGroup> = keyed
        .into_iter()
        .enumerate()
        .map(|(i, (_, group))| SummaryGroup { number: i + 1, ..group })
        .collect();

    let totals = SummaryTotals {
        tourists: groups.iter().map(|g| g.rowspan).sum(),
        groups: groups.len(),
        amount_cents: groups.iter().map(|g| g.amount_cents).sum(),
        paid_cents: groups.iter().map(|g| g.paid_cents).sum(),
    };

    SummaryReport {
        event_id: event.id,
        event_title: event.title.clone(),
        start_date: event.start_date,
        end_date: event.end_date,
        currency: event.currency.clone(),
        cities: event.cities.clone(),
        groups,
        totals,
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::db::Deal;
    use chrono::TimeZone;

    pub fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    pub fn event() -> Event {
        Event {
            id: Uuid::new_v4(),
            title: "Golden Ring".into(),
            description: None,
            start_date: date(1),
            end_date: date(10),
            cities: vec!["Vladimir".into(), "Suzdal".into(), "Yaroslavl".into()],
            price_cents: 5_000_000,
            currency: "RUB".into(),
            capacity: 20,
            is_active: true,
            bitrix_item_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    pub struct Tourist<'a> {
        pub last: &'a str,
        pub first: &'a str,
        pub group: Option<Uuid>,
        pub primary: bool,
        pub status: &'a str,
        pub booked_minute: u32,
        pub amount: i64,
        pub paid: i64,
    }

    impl Default for Tourist<'_> {
        fn default() -> Self {
            Self {
                last: "Ivanov",
                first: "Ivan",
                group: None,
                primary: true,
                status: "confirmed",
                booked_minute: 0,
                amount: 5_000_000,
                paid: 0,
            }
        }
    }

    pub fn input(t: Tourist<'_>, visits: &[(&str, u32, u32, Option<&str>)]) -> SummaryInput {
        let deal_id = Uuid::new_v4();
        let created_at = Utc.with_ymd_and_hms(2025, 1, 10, 12, t.booked_minute, 0).unwrap();
        let deal = Deal {
            id: deal_id,
            contact_id: Uuid::new_v4(),
            event_id: Uuid::nil(),
            group_id: t.group,
            is_primary: t.primary,
            status: t.status.into(),
            amount_cents: t.amount,
            paid_cents: t.paid,
            notes: None,
            bitrix_deal_id: None,
            bitrix_item_id: None,
            created_at,
            updated_at: created_at,
        };
        let payment_state = deal.payment_state().as_str().to_owned();
        SummaryInput {
            deal: DealDetails {
                deal,
                first_name: t.first.into(),
                last_name: t.last.into(),
                middle_name: None,
                phone: Some("+79000000000".into()),
                event_title: "Golden Ring".into(),
                payment_state,
            },
            visits: visits
                .iter()
                .map(|(city, arrive, depart, hotel)| CityVisit {
                    id: Uuid::new_v4(),
                    deal_id,
                    city: (*city).into(),
                    arrival_date: date(*arrive),
                    arrival_time: None,
                    arrival_transport: Some("bus".into()),
                    arrival_details: None,
                    departure_date: date(*depart),
                    departure_time: None,
                    departure_transport: None,
                    departure_details: None,
                    hotel: hotel.map(str::to_owned),
                    created_at,
                })
                .collect(),
        }
    }
}
