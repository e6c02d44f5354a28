//! Apply database migrations

use anyhow::{Context, Result};
use clap::Parser;
use tourcrm_server::db::migrations;

use super::connect;
use crate::config::TourcrmConfig;

#[derive(Parser, Debug)]
pub struct MigrateArgs {
    /// Database URL (overrides config/environment)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,
}

pub async fn run_migrate(args: MigrateArgs, config: &TourcrmConfig) -> Result<()> {
    let pool = connect(config, args.database_url).await?;
    migrations::run(&pool)
        .await
        .context("Failed to apply migrations")?;
    println!("Database schema is up to date");
    Ok(())
}
