//! Per-tour money overview

use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{CategoryTotal, DealRepo, DealTotals, EventRepo, ExpenseRepo};

use super::Result;

/// Finance figures of one tour, all in minor units
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventFinance {
    pub event_id: Uuid,
    pub currency: String,
    pub deals: i64,
    pub revenue_cents: i64,
    pub collected_cents: i64,
    pub outstanding_cents: i64,
    pub expenses_cents: i64,
    pub expenses_by_category: Vec<CategoryTotal>,
    /// Collected money minus expenses
    pub profit_cents: i64,
}

impl EventFinance {
    pub fn compute(
        event_id: Uuid,
        currency: String,
        totals: DealTotals,
        expenses_by_category: Vec<CategoryTotal>,
    ) -> Self {
        let expenses_cents = expenses_by_category.iter().map(|c| c.amount_cents).sum();
        Self {
            event_id,
            currency,
            deals: totals.deals,
            revenue_cents: totals.revenue_cents,
            collected_cents: totals.collected_cents,
            outstanding_cents: totals.revenue_cents - totals.collected_cents,
            expenses_cents,
            expenses_by_category,
            profit_cents: totals.collected_cents - expenses_cents,
        }
    }
}

pub async fn event_finance(pool: &PgPool, event_id: Uuid) -> Result<EventFinance> {
    let event = EventRepo::new(pool).get(event_id).await?.event;
    let totals = DealRepo::new(pool).totals_for_event(event_id).await?;
    let by_category = ExpenseRepo::new(pool).totals_by_category(event_id).await?;
    Ok(EventFinance::compute(event.id, event.currency, totals, by_category))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profit_counts_collected_money_only() {
        let totals = DealTotals {
            deals: 3,
            revenue_cents: 300_000,
            collected_cents: 180_000,
        };
        let categories = vec![
            CategoryTotal {
                category: "transport".into(),
                amount_cents: 50_000,
            },
            CategoryTotal {
                category: "guides".into(),
                amount_cents: 20_000,
            },
        ];

        let finance = EventFinance::compute(Uuid::nil(), "RUB".into(), totals, categories);
        assert_eq!(finance.outstanding_cents, 120_000);
        assert_eq!(finance.expenses_cents, 70_000);
        assert_eq!(finance.profit_cents, 110_000);
    }

    #[test]
    fn empty_tour_is_zero() {
        let finance = EventFinance::compute(Uuid::nil(), "RUB".into(), DealTotals::default(), vec![]);
        assert_eq!(finance.profit_cents, 0);
        assert_eq!(finance.outstanding_cents, 0);
        assert!(finance.expenses_by_category.is_empty());
    }
}
