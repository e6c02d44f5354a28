//! Tour updates that must keep recorded city visits valid

use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::db::repos::{events, visits};
use crate::db::{CityVisit, Event};
use crate::models::event::UpdateEventRequest;
use crate::models::Itinerary;

use super::{Result, ServiceError};

/// Visits that no longer fit `itinerary`.
fn stranded<'v>(itinerary: &Itinerary, visits: &'v [CityVisit]) -> Vec<&'v CityVisit> {
    visits
        .iter()
        .filter(|v| !itinerary.admits(&v.city, v.arrival_date, v.departure_date))
        .collect()
}

fn ensure_visits_fit(itinerary: &Itinerary, visits: &[CityVisit]) -> Result<()> {
    let stranded = stranded(itinerary, visits);
    if stranded.is_empty() {
        return Ok(());
    }
    let listed: Vec<String> = stranded
        .iter()
        .map(|v| format!("{} {}..{} (visit {})", v.city, v.arrival_date, v.departure_date, v.id))
        .collect();
    Err(ServiceError::Conflict(format!(
        "new itinerary excludes {} recorded city visit(s): {}",
        stranded.len(),
        listed.join(", ")
    )))
}

/// Patch a tour under its row lock.
///
/// The date order is checked against the locked row, and a change to the
/// cities or dates is refused while a recorded visit would fall outside it.
pub async fn update_event(pool: &PgPool, id: Uuid, request: &UpdateEventRequest) -> Result<Event> {
    let mut tx = pool.begin().await?;
    let current = events::lock(&mut tx, id).await?;
    let patch = request.validate(current.start_date, current.end_date)?;

    if patch.changes_itinerary() {
        let next = patch.itinerary(&current.itinerary());
        let recorded = visits::list_for_event(&mut tx, id).await?;
        ensure_visits_fit(&next, &recorded)?;
    }

    let updated = events::apply_patch(&mut tx, id, &patch).await?;
    tx.commit().await?;

    if patch.changes_itinerary() {
        info!(event_id = %id, cities = ?updated.cities, "Tour itinerary changed");
    }
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 6, d).unwrap()
    }

    fn stay(city: &str, arrive: u32, depart: u32) -> CityVisit {
        CityVisit {
            id: Uuid::new_v4(),
            deal_id: Uuid::new_v4(),
            city: city.into(),
            arrival_date: date(arrive),
            arrival_time: None,
            arrival_transport: None,
            arrival_details: None,
            departure_date: date(depart),
            departure_time: None,
            departure_transport: None,
            departure_details: None,
            hotel: None,
            created_at: Utc::now(),
        }
    }

    fn itinerary(cities: &[&str], end: u32) -> Itinerary {
        Itinerary {
            start_date: date(1),
            end_date: date(end),
            cities: cities.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn removed_city_strands_its_visits() {
        let visits = vec![stay("Vladimir", 2, 4), stay("Suzdal", 5, 6)];
        let left = stranded(&itinerary(&["Vladimir"], 10), &visits);
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].city, "Suzdal");
    }

    #[test]
    fn shrunk_window_strands_late_departures() {
        let visits = vec![stay("Suzdal", 3, 7)];
        assert!(stranded(&itinerary(&["Suzdal"], 10), &visits).is_empty());
        assert_eq!(stranded(&itinerary(&["Suzdal"], 6), &visits).len(), 1);
    }

    #[test]
    fn conflict_names_each_visit() {
        let visits = vec![stay("Suzdal", 7, 9)];
        let err = ensure_visits_fit(&itinerary(&["Vladimir"], 5), &visits).unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("new itinerary excludes 1 recorded city visit(s): Suzdal 2030-06-07..2030-06-09"));
        assert!(message.contains(&visits[0].id.to_string()));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn itinerary_change_keeps_visits_valid() {
        use crate::db::{ContactRepo, EventRepo};
        use crate::models::contact::CreateContactRequest;
        use crate::models::deal::NewDeal;
        use crate::models::event::CreateEventRequest;
        use crate::models::visit::VisitRequest;
        use crate::services::bookings::{add_visit, create_deal};

        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = crate::db::create_pool(&url).await.unwrap();
        crate::db::migrations::run(&pool).await.unwrap();

        let event = EventRepo::new(&pool)
            .create(
                &CreateEventRequest {
                    title: "Golden Ring".into(),
                    description: None,
                    start_date: date(1),
                    end_date: date(10),
                    cities: vec!["Vladimir".into(), "Suzdal".into()],
                    price_cents: 10_000,
                    currency: None,
                    capacity: 5,
                }
                .validate()
                .unwrap(),
            )
            .await
            .unwrap();
        let contacts = ContactRepo::new(&pool);
        let contact = contacts
            .create(
                &CreateContactRequest {
                    first_name: "Test".into(),
                    last_name: "Traveller".into(),
                    ..Default::default()
                }
                .validate()
                .unwrap(),
            )
            .await
            .unwrap();
        let deal = create_deal(&pool, &NewDeal::for_tourist(contact.id, event.id))
            .await
            .unwrap();
        let visit = add_visit(
            &pool,
            deal.id,
            &VisitRequest {
                city: "Suzdal".into(),
                arrival_date: date(7),
                arrival_time: None,
                arrival_transport: None,
                arrival_details: None,
                departure_date: date(9),
                departure_time: None,
                departure_transport: None,
                departure_details: None,
                hotel: None,
            },
        )
        .await
        .unwrap();

        let drop_city = UpdateEventRequest {
            cities: Some(vec!["Vladimir".into()]),
            ..Default::default()
        };
        let err = update_event(&pool, event.id, &drop_city).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(ref m) if m.contains(&visit.id.to_string())));

        let shrink = UpdateEventRequest {
            end_date: Some(date(8)),
            ..Default::default()
        };
        let err = update_event(&pool, event.id, &shrink).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let stored = EventRepo::new(&pool).get(event.id).await.unwrap().event;
        assert_eq!(stored.end_date, date(10));
        assert_eq!(stored.cities, vec!["Vladimir", "Suzdal"]);

        let extend = UpdateEventRequest {
            end_date: Some(date(12)),
            cities: Some(vec!["Vladimir".into(), "Suzdal".into(), "Rostov".into()]),
            ..Default::default()
        };
        let updated = update_event(&pool, event.id, &extend).await.unwrap();
        assert_eq!(updated.end_date, date(12));
        assert_eq!(updated.cities.len(), 3);

        contacts.delete(contact.id).await.unwrap();
        EventRepo::new(&pool).delete(event.id).await.unwrap();
    }
}
