//! Command implementations for the tourcrm CLI

pub mod bitrix;
pub mod migrate;
pub mod report;
pub mod serve;

pub use bitrix::run_bitrix;
pub use migrate::run_migrate;
pub use report::run_report;
pub use serve::run_serve;

use anyhow::{Context, Result};
use tourcrm_bitrix::Bitrix24Client;
use tourcrm_server::db::{create_pool_with_options, PgPool, DEFAULT_MAX_CONNECTIONS};

use crate::config::TourcrmConfig;

/// Connect to Postgres using the flag or configured URL.
pub async fn connect(config: &TourcrmConfig, database_url: Option<String>) -> Result<PgPool> {
    let url = config.database_url(database_url)?;
    let max_connections = config
        .server
        .max_connections
        .unwrap_or(DEFAULT_MAX_CONNECTIONS);
    create_pool_with_options(&url, max_connections)
        .await
        .context("Failed to create database pool")
}

/// Bitrix24 client if the integration is configured.
pub fn bitrix_client(config: &TourcrmConfig) -> Result<Option<Bitrix24Client>> {
    config
        .bitrix_config()?
        .map(|cfg| Bitrix24Client::new(cfg).context("Failed to build Bitrix24 client"))
        .transpose()
}

/// Bitrix24 client, or an error telling how to configure it.
pub fn require_bitrix(config: &TourcrmConfig) -> Result<Bitrix24Client> {
    bitrix_client(config)?.context(
        "Bitrix24 integration is not configured. Set BITRIX24_WEBHOOK_URL or [bitrix] webhook_url",
    )
}
