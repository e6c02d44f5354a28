//! Bitrix24 maintenance: connectivity check, custom fields, contact push

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tourcrm_bitrix::TOURIST_CONTACT_FIELDS;
use tourcrm_server::services::sync;

use super::{connect, require_bitrix};
use crate::config::TourcrmConfig;

#[derive(Parser, Debug)]
pub struct BitrixArgs {
    #[command(subcommand)]
    pub command: BitrixCommand,
}

#[derive(Subcommand, Debug)]
pub enum BitrixCommand {
    /// Call the portal with the configured webhook and show its owner
    Check,
    /// Create the custom contact fields tourcrm writes to
    SetupFields,
    /// Push contacts that have no Bitrix24 id yet
    SyncContacts(SyncContactsArgs),
}

#[derive(Parser, Debug)]
pub struct SyncContactsArgs {
    /// Maximum number of contacts to push
    #[arg(long, default_value_t = 100)]
    pub limit: i64,

    /// Database URL (overrides config/environment)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,
}

pub async fn run_bitrix(args: BitrixArgs, config: &TourcrmConfig) -> Result<()> {
    let client = require_bitrix(config)?;

    match args.command {
        BitrixCommand::Check => {
            let profile = client
                .profile()
                .await
                .context("Bitrix24 connectivity check failed")?;
            let name = [profile.name, profile.last_name]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ");
            println!("Portal:  {}", client.config().portal());
            println!("User:    {} (id {}{})", name, profile.id, if profile.admin { ", admin" } else { "" });
            match client.config().tourist_entity_type_id {
                Some(id) => println!("Tourist smart process: {}", id),
                None => println!("Tourist smart process: not configured (item step skipped)"),
            }
        }
        BitrixCommand::SetupFields => {
            let added = client
                .ensure_contact_fields(TOURIST_CONTACT_FIELDS)
                .await
                .context("Failed to create Bitrix24 contact fields")?;
            if added.is_empty() {
                println!("All contact fields already exist");
            } else {
                for field in added {
                    println!("Added {}", field);
                }
            }
        }
        BitrixCommand::SyncContacts(sync_args) => {
            if sync_args.limit <= 0 {
                anyhow::bail!("--limit must be positive");
            }
            let pool = connect(config, sync_args.database_url).await?;
            let batch = sync::sync_unsynced(&pool, &client, sync_args.limit)
                .await
                .context("Contact sync failed")?;
            println!("Synced {} contacts, {} failed", batch.synced, batch.failed);
        }
    }

    Ok(())
}
