//! Home screen figures

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{EventRepo, LeadRepo, NotificationRepo};
use crate::models::{LeadStatus, Pagination};

use super::Result;

const RECENT_DAYS: i64 = 7;
const UPCOMING_LIMIT: u32 = 10;

#[derive(Debug, Clone, Serialize)]
pub struct UpcomingEvent {
    pub id: Uuid,
    pub title: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub booked: i64,
    pub capacity: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    /// Every status is present, zero when no lead has it
    pub leads_by_status: BTreeMap<&'static str, i64>,
    pub leads_last_7_days: i64,
    pub upcoming_events: Vec<UpcomingEvent>,
    pub unread_notifications: i64,
}

/// Fill in zero counts for statuses that have no leads.
fn status_counts(rows: Vec<(String, i64)>) -> BTreeMap<&'static str, i64> {
    let mut counts: BTreeMap<&'static str, i64> =
        LeadStatus::ALL.iter().map(|s| (s.as_str(), 0)).collect();
    for (status, count) in rows {
        if let Ok(status) = LeadStatus::parse(&status) {
            counts.insert(status.as_str(), count);
        }
    }
    counts
}

pub async fn dashboard(pool: &PgPool, user_id: Option<Uuid>) -> Result<Dashboard> {
    let leads = LeadRepo::new(pool);
    let now = Utc::now();

    let leads_by_status = status_counts(leads.count_by_status().await?);
    let leads_last_7_days = leads
        .count_created_since(now - Duration::days(RECENT_DAYS))
        .await?;

    let upcoming = EventRepo::new(pool)
        .list(true, Some(now.date_naive()), Pagination::new(1, UPCOMING_LIMIT))
        .await?;
    let upcoming_events = upcoming
        .items
        .into_iter()
        .map(|e| UpcomingEvent {
            id: e.event.id,
            title: e.event.title,
            start_date: e.event.start_date,
            end_date: e.event.end_date,
            booked: e.booked,
            capacity: e.event.capacity,
        })
        .collect();

    let unread_notifications = NotificationRepo::new(pool).count_unread(user_id).await?;

    Ok(Dashboard {
        leads_by_status,
        leads_last_7_days,
        upcoming_events,
        unread_notifications,
    })
}
