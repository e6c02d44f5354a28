//! Bitrix24 integration endpoints
//!
//! Every handler here may call the portal, so they are instrumented and
//! answer 503 when the integration is switched off. Status is the exception:
//! it reports `enabled: false` instead.

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tourcrm_bitrix::{Bitrix24Client, TOURIST_CONTACT_FIELDS};
use tracing::{instrument, warn};

use crate::http::error::ApiError;
use crate::http::extractors::ValidUuid;
use crate::http::server::AppState;
use crate::services::sync::{self, SyncOutcome};

/// Webhook owner as reported by the portal
#[derive(Debug, Serialize)]
pub struct PortalUser {
    pub id: i64,
    pub name: String,
    pub admin: bool,
}

#[derive(Debug, Default, Serialize)]
pub struct BitrixStatus {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tourist_entity_type_id: Option<i64>,
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<PortalUser>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SetupFields {
    /// Field names created by this call; empty when all existed
    pub added: Vec<String>,
}

fn client(state: &AppState) -> Result<&Bitrix24Client, ApiError> {
    state.bitrix.as_ref().ok_or(ApiError::NotConfigured)
}

/// GET /api/integrations/bitrix/status
#[instrument(skip(state))]
async fn status(State(state): State<Arc<AppState>>) -> Json<BitrixStatus> {
    let Some(client) = state.bitrix.as_ref() else {
        return Json(BitrixStatus::default());
    };

    let config = client.config();
    let mut status = BitrixStatus {
        enabled: true,
        portal: Some(config.portal()),
        tourist_entity_type_id: config.tourist_entity_type_id,
        ..Default::default()
    };

    match client.profile().await {
        Ok(profile) => {
            let name = [profile.name, profile.last_name]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ");
            status.connected = true;
            status.user = Some(PortalUser {
                id: profile.id,
                name,
                admin: profile.admin,
            });
        }
        Err(e) => {
            warn!(error = %e, "Bitrix24 connectivity check failed");
            status.error = Some(e.to_string());
        }
    }

    Json(status)
}

/// POST /api/integrations/bitrix/setup-fields
#[instrument(skip(state))]
async fn setup_fields(State(state): State<Arc<AppState>>) -> Result<Json<SetupFields>, ApiError> {
    let added = client(&state)?
        .ensure_contact_fields(TOURIST_CONTACT_FIELDS)
        .await?;
    Ok(Json(SetupFields { added }))
}

/// POST /api/integrations/bitrix/contacts/{id}/sync
#[instrument(skip(state))]
async fn sync_contact(
    State(state): State<Arc<AppState>>,
    ValidUuid(id): ValidUuid,
) -> Result<Json<SyncOutcome>, ApiError> {
    let crm = state.crm().ok_or(ApiError::NotConfigured)?;
    Ok(Json(sync::sync_contact(&state.pool, crm, id).await?))
}

/// Integration routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/integrations/bitrix/status", get(status))
        .route("/api/integrations/bitrix/setup-fields", post(setup_fields))
        .route(
            "/api/integrations/bitrix/contacts/{id}/sync",
            post(sync_contact),
        )
}
