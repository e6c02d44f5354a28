//! Bitrix24 REST client over an inbound webhook
//!
//! Every method is a `POST <webhook>/<method>.json` with a JSON body.
//! Successful calls answer `{"result": ..., "time": {...}}`; failures answer
//! `{"error": "CODE", "error_description": "..."}`, usually with HTTP 400.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::config::BitrixConfig;
use crate::error::{BitrixError, Result};
use crate::fields::{
    parse_id, ContactPayload, DealPayload, Profile, TouristItemPayload, UserField, UserFieldDef,
};
use crate::gateway::CrmGateway;

/// Bitrix24 webhook client
#[derive(Debug, Clone)]
pub struct Bitrix24Client {
    http: Client,
    config: BitrixConfig,
}

impl Bitrix24Client {
    pub fn new(config: BitrixConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|source| BitrixError::Http {
                method: "client.build".into(),
                source,
            })?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &BitrixConfig {
        &self.config
    }

    /// Call a REST method and decode its `result`.
    pub async fn call<T: DeserializeOwned>(&self, method: &str, params: &Value) -> Result<T> {
        let result = self.call_raw(method, params).await?;
        serde_json::from_value(result).map_err(|source| BitrixError::Decode {
            method: method.to_owned(),
            source,
        })
    }

    /// Call a REST method and return `result` undecoded.
    pub async fn call_raw(&self, method: &str, params: &Value) -> Result<Value> {
        let url = self.config.method_url(method)?;
        debug!(method, portal = %self.config.portal(), "calling Bitrix24");

        let response = self
            .http
            .post(url)
            .json(params)
            .send()
            .await
            .map_err(|source| BitrixError::Http {
                method: method.to_owned(),
                source,
            })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|source| BitrixError::Http {
            method: method.to_owned(),
            source,
        })?;

        let envelope: Value = match serde_json::from_slice(&body) {
            Ok(value) => value,
            Err(source) if status.is_success() => {
                return Err(BitrixError::Decode {
                    method: method.to_owned(),
                    source,
                })
            }
            Err(_) => {
                return Err(BitrixError::Status {
                    method: method.to_owned(),
                    status: status.as_u16(),
                })
            }
        };

        if let Some(code) = envelope.get("error").and_then(Value::as_str) {
            let description = envelope
                .get("error_description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned();
            warn!(method, code, %description, "Bitrix24 returned an error");
            return Err(BitrixError::Api {
                method: method.to_owned(),
                code: code.to_owned(),
                description,
            });
        }

        if !status.is_success() {
            return Err(BitrixError::Status {
                method: method.to_owned(),
                status: status.as_u16(),
            });
        }

        Ok(envelope.get("result").cloned().unwrap_or(Value::Null))
    }

    /// Call a method whose `result` is a new record id.
    async fn call_for_id(&self, method: &str, params: &Value) -> Result<i64> {
        let result = self.call_raw(method, params).await?;
        parse_id(&result).ok_or_else(|| BitrixError::unexpected(method, format!("expected id, got {}", result)))
    }

    /// Call a method whose `result` is `true` on success.
    async fn call_for_ack(&self, method: &str, params: &Value) -> Result<()> {
        let result = self.call_raw(method, params).await?;
        match result {
            Value::Bool(true) => Ok(()),
            other => Err(BitrixError::unexpected(method, format!("expected true, got {}", other))),
        }
    }

    /// Webhook owner; used as a connectivity check.
    pub async fn profile(&self) -> Result<Profile> {
        self.call("profile", &json!({})).await
    }

    pub async fn list_contact_user_fields(&self) -> Result<Vec<UserField>> {
        self.call("crm.contact.userfield.list", &json!({ "order": { "SORT": "ASC" } }))
            .await
    }

    pub async fn add_contact_user_field(&self, def: &UserFieldDef) -> Result<i64> {
        self.call_for_id("crm.contact.userfield.add", &json!({ "fields": def.to_fields() }))
            .await
    }

    /// Create the custom contact fields that do not exist yet.
    ///
    /// Returns the full names of the fields that were added.
    pub async fn ensure_contact_fields(&self, defs: &[UserFieldDef]) -> Result<Vec<String>> {
        let existing = self.list_contact_user_fields().await?;
        let mut added = Vec::new();

        for def in defs {
            let full_name = def.full_name();
            if existing.iter().any(|f| f.field_name == full_name) {
                debug!(field = %full_name, "custom field already present");
                continue;
            }

            let id = self.add_contact_user_field(def).await?;
            info!(field = %full_name, id, "created Bitrix24 contact field");
            added.push(full_name);
        }

        Ok(added)
    }
}

#[async_trait]
impl CrmGateway for Bitrix24Client {
    async fn add_contact(&self, contact: &ContactPayload) -> Result<i64> {
        self.call_for_id(
            "crm.contact.add",
            &json!({ "fields": contact.to_fields(), "params": { "REGISTER_SONET_EVENT": "N" } }),
        )
        .await
    }

    async fn update_contact(&self, id: i64, contact: &ContactPayload) -> Result<()> {
        self.call_for_ack(
            "crm.contact.update",
            &json!({ "id": id, "fields": contact.to_fields() }),
        )
        .await
    }

    async fn delete_contact(&self, id: i64) -> Result<()> {
        self.call_for_ack("crm.contact.delete", &json!({ "id": id }))
            .await
    }

    async fn add_tourist_item(&self, item: &TouristItemPayload) -> Result<Option<i64>> {
        let Some(entity_type_id) = self.config.tourist_entity_type_id else {
            debug!("no smart process configured, skipping tourist item");
            return Ok(None);
        };

        let method = "crm.item.add";
        let result = self
            .call_raw(
                method,
                &json!({
                    "entityTypeId": entity_type_id,
                    "fields": item.to_fields(&self.config.event_field),
                }),
            )
            .await?;

        result
            .get("item")
            .and_then(|item| item.get("id"))
            .and_then(parse_id)
            .map(Some)
            .ok_or_else(|| BitrixError::unexpected(method, format!("missing item.id in {}", result)))
    }

    async fn delete_tourist_item(&self, id: i64) -> Result<()> {
        let Some(entity_type_id) = self.config.tourist_entity_type_id else {
            return Ok(());
        };

        // crm.item.delete answers an empty array on success
        self.call_raw(
            "crm.item.delete",
            &json!({ "entityTypeId": entity_type_id, "id": id }),
        )
        .await
        .map(|_| ())
    }

    async fn add_deal(&self, deal: &DealPayload) -> Result<i64> {
        self.call_for_id("crm.deal.add", &json!({ "fields": deal.to_fields() }))
            .await
    }

    async fn delete_deal(&self, id: i64) -> Result<()> {
        self.call_for_ack("crm.deal.delete", &json!({ "id": id }))
            .await
    }
}
