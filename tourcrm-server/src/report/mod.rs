//! Tour summary report and its CSV export

pub mod csv;
pub mod summary;

use std::collections::HashMap;

use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{CityVisit, DbError, DealRepo, EventRepo, VisitRepo};

pub use summary::{build_summary, SummaryInput, SummaryOptions, SummaryReport};

/// Load a tour's deals and visits and lay out its summary.
pub async fn load_summary(
    pool: &PgPool,
    event_id: Uuid,
    options: SummaryOptions,
) -> Result<SummaryReport, DbError> {
    let event = EventRepo::new(pool).get(event_id).await?.event;
    let deals = DealRepo::new(pool).list_for_event(event_id).await?;

    let mut visits: HashMap<Uuid, Vec<CityVisit>> = HashMap::new();
    for visit in VisitRepo::new(pool).list_for_event(event_id).await? {
        visits.entry(visit.deal_id).or_default().push(visit);
    }

    let inputs: Vec<SummaryInput> = deals
        .into_iter()
        .map(|deal| SummaryInput {
            visits: visits.remove(&deal.deal.id).unwrap_or_default(),
            deal,
        })
        .collect();

    Ok(build_summary(&event, &inputs, options))
}
