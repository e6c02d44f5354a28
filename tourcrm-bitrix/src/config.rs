//! Bitrix24 webhook settings

use std::time::Duration;

use url::Url;

use crate::error::{BitrixError, Result};

/// Default request timeout for portal calls
const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Default smart-process field that stores the tour reference
pub const DEFAULT_EVENT_FIELD: &str = "ufCrmTourEvent";

/// Connection settings for an inbound Bitrix24 webhook.
///
/// The webhook URL has the form `https://<portal>/rest/<user>/<token>/`.
/// Method names are appended to it (`crm.contact.add.json`).
#[derive(Debug, Clone)]
pub struct BitrixConfig {
    pub webhook_url: Url,
    /// Smart-process entity type used to link tourists with tours.
    /// Without it the item step of tourist registration is skipped.
    pub tourist_entity_type_id: Option<i64>,
    /// Smart-process field receiving the tour title
    pub event_field: String,
    pub timeout: Duration,
}

impl BitrixConfig {
    /// Build settings from a webhook URL.
    ///
    /// A missing trailing slash is added so that method names join onto the
    /// token segment instead of replacing it.
    pub fn new(webhook_url: &str) -> Result<Self> {
        let trimmed = webhook_url.trim();
        if trimmed.is_empty() {
            return Err(BitrixError::not_configured("webhook url is empty"));
        }

        let normalized = if trimmed.ends_with('/') {
            trimmed.to_owned()
        } else {
            format!("{}/", trimmed)
        };

        let url = Url::parse(&normalized)
            .map_err(|e| BitrixError::not_configured(format!("invalid webhook url: {}", e)))?;

        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(BitrixError::not_configured(format!(
                "webhook url must be http(s), got '{}'",
                url.scheme()
            )));
        }

        Ok(Self {
            webhook_url: url,
            tourist_entity_type_id: None,
            event_field: DEFAULT_EVENT_FIELD.to_owned(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    pub fn with_tourist_entity_type(mut self, entity_type_id: Option<i64>) -> Self {
        self.tourist_entity_type_id = entity_type_id;
        self
    }

    pub fn with_event_field(mut self, field: impl Into<String>) -> Self {
        self.event_field = field.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Full URL for a REST method.
    pub fn method_url(&self, method: &str) -> Result<Url> {
        self.webhook_url
            .join(&format!("{}.json", method))
            .map_err(|e| BitrixError::not_configured(format!("cannot build url for {}: {}", method, e)))
    }

    /// Portal host, for display without leaking the token.
    pub fn portal(&self) -> String {
        self.webhook_url.host_str().unwrap_or("unknown").to_owned()
    }
}
