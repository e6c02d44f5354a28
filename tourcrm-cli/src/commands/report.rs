//! Offline reports

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tourcrm_server::report::{self, SummaryOptions};
use uuid::Uuid;

use super::connect;
use crate::config::TourcrmConfig;

#[derive(Parser, Debug)]
pub struct ReportArgs {
    #[command(subcommand)]
    pub command: ReportCommand,
}

#[derive(Subcommand, Debug)]
pub enum ReportCommand {
    /// Tourist summary of one tour: groups, payments and city stays
    Summary(SummaryArgs),
}

#[derive(Parser, Debug)]
pub struct SummaryArgs {
    /// Tour (event) id
    #[arg(long)]
    pub event: Uuid,

    /// Write to this file instead of stdout
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,

    /// Keep cancelled deals in the report
    #[arg(long)]
    pub include_cancelled: bool,

    /// Emit JSON instead of CSV
    #[arg(long)]
    pub json: bool,

    /// Database URL (overrides config/environment)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,
}

pub async fn run_report(args: ReportArgs, config: &TourcrmConfig) -> Result<()> {
    match args.command {
        ReportCommand::Summary(summary) => run_summary(summary, config).await,
    }
}

async fn run_summary(args: SummaryArgs, config: &TourcrmConfig) -> Result<()> {
    let pool = connect(config, args.database_url).await?;
    let options = SummaryOptions {
        include_cancelled: args.include_cancelled,
    };
    let summary = report::load_summary(&pool, args.event, options)
        .await
        .with_context(|| format!("Failed to build summary for tour {}", args.event))?;

    let rendered = if args.json {
        serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?
    } else {
        report::csv::to_csv(&summary)
    };

    match args.out {
        Some(path) => {
            fs::write(&path, rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!(
                tourists = summary.totals.tourists,
                groups = summary.totals.groups,
                "Summary written to {}",
                path.display()
            );
        }
        None => print!("{}", rendered),
    }

    Ok(())
}
