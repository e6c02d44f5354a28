//! HTTP server command

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;
use tourcrm_server::db::migrations;
use tourcrm_server::http::{run_server, AppState, ServerConfig};

use super::{bitrix_client, connect};
use crate::config::TourcrmConfig;

#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to bind to (default: [server] bind, else 127.0.0.1:8080)
    #[arg(long, short = 'b')]
    pub bind: Option<SocketAddr>,

    /// Allow permissive CORS (all origins), needed when forms are embedded on a website
    #[arg(long)]
    pub cors_permissive: bool,

    /// Database URL (overrides config/environment)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Do not apply pending migrations on startup
    #[arg(long)]
    pub skip_migrations: bool,
}

pub async fn run_serve(args: ServeArgs, config: &TourcrmConfig) -> Result<()> {
    let pool = connect(config, args.database_url).await?;

    if !args.skip_migrations {
        migrations::run(&pool)
            .await
            .context("Failed to apply migrations")?;
    }

    let server = ServerConfig {
        bind_addr: args
            .bind
            .or(config.server.bind)
            .unwrap_or(ServerConfig::default().bind_addr),
        cors_permissive: args.cors_permissive || config.server.cors_permissive,
    };

    let state = AppState::new(pool, bitrix_client(config)?);

    tracing::info!("Starting tourcrm server on {}", server.bind_addr);
    run_server(state, server).await.context("Server error")?;

    Ok(())
}
