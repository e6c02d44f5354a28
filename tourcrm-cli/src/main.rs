//! tourcrm CLI - tour-operator CRM server and maintenance tool
//!
//! - `serve`: run the HTTP API (applies migrations first)
//! - `migrate`: create or upgrade the database schema
//! - `bitrix`: connectivity check, custom fields and contact push
//! - `report summary`: tourist summary of a tour as CSV or JSON
//! - `completions`: shell completion scripts

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

mod commands;
mod config;
mod tracing_setup;

use config::TourcrmConfig;
use tracing_setup::TracingConfig;

#[derive(Parser, Debug)]
#[command(
    name = "tourcrm",
    author,
    version,
    about = "Tour-operator CRM: leads, tourists, tours and Bitrix24 sync",
    long_about = "Run the tourcrm HTTP API, manage the database schema, push contacts to \
                  Bitrix24 and export per-tour tourist summaries."
)]
struct Cli {
    /// Debug logging (unless RUST_LOG is set)
    #[arg(long, global = true)]
    debug: bool,

    /// Export traces over OTLP (requires the `telemetry` feature)
    #[arg(long, global = true)]
    otel: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API server
    Serve(commands::serve::ServeArgs),
    /// Apply database migrations
    Migrate(commands::migrate::MigrateArgs),
    /// Bitrix24 integration maintenance (check, setup-fields, sync-contacts)
    Bitrix(commands::bitrix::BitrixArgs),
    /// Generate reports
    Report(commands::report::ReportArgs),
    /// Generate shell completion scripts
    Completions(CompletionsArgs),
}

#[derive(Parser, Debug)]
struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    shell: Shell,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)] // PowerShell is a proper noun, not a suffix
enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

fn run_completions(args: CompletionsArgs) -> Result<()> {
    use clap::CommandFactory;
    use clap_complete::{generate, Shell as CompletionShell};
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();

    let shell = match args.shell {
        Shell::Bash => CompletionShell::Bash,
        Shell::Zsh => CompletionShell::Zsh,
        Shell::Fish => CompletionShell::Fish,
        Shell::PowerShell => CompletionShell::PowerShell,
        Shell::Elvish => CompletionShell::Elvish,
    };

    generate(shell, &mut cmd, bin_name, &mut io::stdout());

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Before parsing, so `env = "DATABASE_URL"` flags see .env values
    config::load_env();
    let cli = Cli::parse();

    tracing_setup::init(&TracingConfig {
        debug: cli.debug,
        otel: cli.otel,
    })
    .ok();

    // Completions must work without a readable config file
    let result = match cli.command {
        Commands::Completions(args) => run_completions(args),
        Commands::Serve(args) => commands::run_serve(args, &TourcrmConfig::load()?).await,
        Commands::Migrate(args) => commands::run_migrate(args, &TourcrmConfig::load()?).await,
        Commands::Bitrix(args) => commands::run_bitrix(args, &TourcrmConfig::load()?).await,
        Commands::Report(args) => commands::run_report(args, &TourcrmConfig::load()?).await,
    };

    tracing_setup::shutdown_otel();
    result
}
