//! Schema migrations
//!
//! Idempotent `CREATE ... IF NOT EXISTS` statements, run at startup and by
//! `tourcrm migrate`. CHECK constraints for enum-like columns are generated
//! from the Rust enums so both sides always agree.

use sqlx::PgPool;
use tracing::info;

use crate::models::status::sql_values;
use crate::models::{DealStatus, LeadStatus, NotificationKind, Role, TransportKind};

use super::repos::DbError;

/// Dictionary entries every installation starts with
const SEED_DICTIONARY: &[(&str, &str, &str, i32)] = &[
    ("lead_source", "manual", "Entered by staff", 0),
    ("lead_source", "form", "Booking form", 1),
    ("lead_source", "website", "Website", 2),
    ("lead_source", "phone", "Phone call", 3),
    ("lead_source", "referral", "Referral", 4),
    ("transport", "plane", "Plane", 0),
    ("transport", "train", "Train", 1),
    ("transport", "bus", "Bus", 2),
    ("expense_category", "transport", "Transport", 0),
    ("expense_category", "accommodation", "Accommodation", 1),
    ("expense_category", "guides", "Guides", 2),
    ("expense_category", "other", "Other", 3),
];

fn schema() -> Vec<String> {
    let roles = sql_values(Role::ALL, Role::as_str);
    let lead_statuses = sql_values(LeadStatus::ALL, LeadStatus::as_str);
    let deal_statuses = sql_values(DealStatus::ALL, DealStatus::as_str);
    let transports = sql_values(TransportKind::ALL, TransportKind::as_str);
    let notification_kinds = sql_values(NotificationKind::ALL, NotificationKind::as_str);

    vec![
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                username TEXT NOT NULL UNIQUE,
                full_name TEXT NOT NULL,
                email TEXT,
                role TEXT NOT NULL DEFAULT 'manager' CHECK (role IN ({roles})),
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#
        ),
        r#"
        CREATE TABLE IF NOT EXISTS events (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            title TEXT NOT NULL,
            description TEXT,
            start_date DATE NOT NULL,
            end_date DATE NOT NULL,
            cities TEXT[] NOT NULL DEFAULT '{}',
            price_cents BIGINT NOT NULL DEFAULT 0 CHECK (price_cents >= 0),
            currency TEXT NOT NULL DEFAULT 'RUB',
            capacity INTEGER NOT NULL CHECK (capacity > 0),
            is_active BOOLEAN NOT NULL DEFAULT TRUE,
            bitrix_item_id BIGINT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            CHECK (end_date >= start_date)
        )
        "#
        .to_owned(),
        r#"
        CREATE TABLE IF NOT EXISTS forms (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            name TEXT NOT NULL,
            slug TEXT NOT NULL UNIQUE CHECK (slug ~ '^[a-z0-9][a-z0-9_-]{0,63}$'),
            event_id UUID REFERENCES events(id) ON DELETE SET NULL,
            description TEXT,
            fields JSONB NOT NULL DEFAULT '[]',
            is_active BOOLEAN NOT NULL DEFAULT TRUE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#
        .to_owned(),
        r#"
        CREATE TABLE IF NOT EXISTS contacts (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            middle_name TEXT,
            phone TEXT,
            email TEXT,
            birth_date DATE,
            passport TEXT,
            notes TEXT,
            lead_id UUID,
            bitrix_contact_id BIGINT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#
        .to_owned(),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS leads (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                first_name TEXT NOT NULL,
                last_name TEXT,
                phone TEXT,
                email TEXT,
                source TEXT NOT NULL DEFAULT 'manual',
                status TEXT NOT NULL DEFAULT 'new' CHECK (status IN ({lead_statuses})),
                event_id UUID REFERENCES events(id) ON DELETE SET NULL,
                form_id UUID REFERENCES forms(id) ON DELETE SET NULL,
                assigned_to UUID REFERENCES users(id) ON DELETE SET NULL,
                group_size INTEGER NOT NULL DEFAULT 1 CHECK (group_size BETWEEN 1 AND 50),
                notes TEXT,
                contact_id UUID REFERENCES contacts(id) ON DELETE SET NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                CHECK (phone IS NOT NULL OR email IS NOT NULL)
            )
            "#
        ),
        r#"
        CREATE TABLE IF NOT EXISTS lead_status_history (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            lead_id UUID NOT NULL REFERENCES leads(id) ON DELETE CASCADE,
            from_status TEXT,
            to_status TEXT NOT NULL,
            note TEXT,
            changed_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#
        .to_owned(),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS deals (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                contact_id UUID NOT NULL REFERENCES contacts(id) ON DELETE CASCADE,
                event_id UUID NOT NULL REFERENCES events(id) ON DELETE RESTRICT,
                group_id UUID,
                is_primary BOOLEAN NOT NULL DEFAULT TRUE,
                status TEXT NOT NULL DEFAULT 'new' CHECK (status IN ({deal_statuses})),
                amount_cents BIGINT NOT NULL CHECK (amount_cents >= 0),
                paid_cents BIGINT NOT NULL DEFAULT 0,
                notes TEXT,
                bitrix_deal_id BIGINT,
                bitrix_item_id BIGINT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                UNIQUE (contact_id, event_id),
                CHECK (paid_cents >= 0 AND paid_cents <= amount_cents)
            )
            "#
        ),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS city_visits (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                deal_id UUID NOT NULL REFERENCES deals(id) ON DELETE CASCADE,
                city TEXT NOT NULL,
                arrival_date DATE NOT NULL,
                arrival_time TIME,
                arrival_transport TEXT CHECK (arrival_transport IN ({transports})),
                arrival_details TEXT,
                departure_date DATE NOT NULL,
                departure_time TIME,
                departure_transport TEXT CHECK (departure_transport IN ({transports})),
                departure_details TEXT,
                hotel TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                UNIQUE (deal_id, city),
                CHECK (departure_date >= arrival_date)
            )
            "#
        ),
        r#"
        CREATE TABLE IF NOT EXISTS form_submissions (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            form_id UUID NOT NULL REFERENCES forms(id) ON DELETE CASCADE,
            lead_id UUID REFERENCES leads(id) ON DELETE SET NULL,
            data JSONB NOT NULL DEFAULT '{}',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#
        .to_owned(),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS notifications (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                user_id UUID REFERENCES users(id) ON DELETE CASCADE,
                kind TEXT NOT NULL CHECK (kind IN ({notification_kinds})),
                title TEXT NOT NULL,
                body TEXT,
                entity_type TEXT,
                entity_id UUID,
                is_read BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#
        ),
        r#"
        CREATE TABLE IF NOT EXISTS dictionaries (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            kind TEXT NOT NULL,
            value TEXT NOT NULL,
            label TEXT NOT NULL,
            sort_order INTEGER NOT NULL DEFAULT 0,
            is_active BOOLEAN NOT NULL DEFAULT TRUE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            UNIQUE (kind, value)
        )
        "#
        .to_owned(),
        r#"
        CREATE TABLE IF NOT EXISTS expenses (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            event_id UUID NOT NULL REFERENCES events(id) ON DELETE CASCADE,
            category TEXT NOT NULL,
            description TEXT,
            amount_cents BIGINT NOT NULL CHECK (amount_cents > 0),
            incurred_on DATE NOT NULL DEFAULT CURRENT_DATE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#
        .to_owned(),
        "CREATE INDEX IF NOT EXISTS idx_leads_status ON leads(status)".to_owned(),
        "CREATE INDEX IF NOT EXISTS idx_leads_created_at ON leads(created_at DESC)".to_owned(),
        "CREATE INDEX IF NOT EXISTS idx_deals_event ON deals(event_id)".to_owned(),
        "CREATE INDEX IF NOT EXISTS idx_city_visits_deal ON city_visits(deal_id)".to_owned(),
        "CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications(user_id, is_read)"
            .to_owned(),
        "CREATE INDEX IF NOT EXISTS idx_expenses_event ON expenses(event_id)".to_owned(),
    ]
}

/// Run all migrations and seed default dictionary entries.
pub async fn run(pool: &PgPool) -> Result<(), DbError> {
    info!("Running tourcrm migrations...");

    let mut tx = pool.begin().await?;
    for statement in schema() {
        sqlx::query(&statement).execute(&mut *tx).await?;
    }

    for (kind, value, label, sort_order) in SEED_DICTIONARY {
        sqlx::query(
            r#"
            INSERT INTO dictionaries (kind, value, label, sort_order)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (kind, value) DO NOTHING
            "#,
        )
        .bind(kind)
        .bind(value)
        .bind(label)
        .bind(sort_order)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    info!("Migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_constraints_follow_enums() {
        let schema = schema().join("\n");
        assert!(schema.contains("'new', 'contacted', 'qualified', 'converted', 'lost'"));
        assert!(schema.contains("'plane', 'train', 'bus', 'car', 'ship', 'other'"));
        assert!(schema.contains("'new_lead', 'form_submission', 'sync_failed', 'lead_assigned'"));
    }

    #[test]
    fn tables_created_before_references() {
        let statements = schema();
        let position = |table: &str| {
            statements
                .iter()
                .position(|s| s.contains(&format!("CREATE TABLE IF NOT EXISTS {} (", table)))
                .unwrap()
        };
        assert!(position("users") < position("leads"));
        assert!(position("forms") < position("leads"));
        assert!(position("contacts") < position("leads"));
        assert!(position("deals") < position("city_visits"));
        assert!(position("leads") < position("form_submissions"));
    }

    #[test]
    fn seeds_cover_form_source() {
        assert!(SEED_DICTIONARY
            .iter()
            .any(|(kind, value, _, _)| *kind == "lead_source" && *value == "form"));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn migrations_are_idempotent() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = crate::db::create_pool(&url).await.unwrap();
        run(&pool).await.unwrap();
        run(&pool).await.unwrap();
    }
}
