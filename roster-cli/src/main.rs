//! Roster CLI - Command line interface for reviewer assignment
//!
//! Manages teams and pull requests and assigns reviewers from the author's team.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use roster_core::Config;
use roster_db::{Database, DatabaseConfig};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{print_json, PrArgs, Services, StatsArgs, TeamArgs, UserArgs};

/// Roster: reviewer assignment for pull requests
#[derive(Parser, Debug)]
#[command(name = "roster")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the SQLite database (overrides config and env)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Operation timeout, e.g. `10s` (overrides config and env)
    #[arg(long, global = true, value_parser = parse_timeout)]
    timeout: Option<Duration>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show version information
    Version,

    /// Show current configuration
    Config,

    /// Manage teams
    Team(TeamArgs),

    /// Manage users
    User(UserArgs),

    /// Create, merge and reassign pull requests
    Pr(PrArgs),

    /// Assignment statistics
    Stats(StatsArgs),
}

fn parse_timeout(raw: &str) -> Result<Duration, String> {
    roster_core::config::parse_duration(raw).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing; stdout carries command output only
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if cli.verbose {
        tracing::info!("Verbose mode enabled");
    }

    // Load configuration with overrides
    let config = Config::load_with_overrides(cli.database.clone(), cli.timeout)?;
    let db_config = DatabaseConfig::from(&config.database);

    if cli.verbose {
        tracing::info!(
            database = %db_config.path.display(),
            max_connections = db_config.max_connections,
            operation_timeout = ?config.engine.operation_timeout,
            "Configuration loaded"
        );
    }

    let command = match cli.command {
        Commands::Version => {
            println!("roster {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Commands::Config => {
            return print_json(&serde_json::json!({
                "config_file": Config::default_config_path().map(|p| p.display().to_string()),
                "database_path": db_config.path.display().to_string(),
                "config": config,
            }));
        }
        other => other,
    };

    let db = Database::connect(db_config).await?;
    db.migrate().await?;
    let services = Services::new(db.store(), &config);

    let result = match command {
        Commands::Team(args) => args.execute(&services).await,
        Commands::User(args) => args.execute(&services).await,
        Commands::Pr(args) => args.execute(&services).await,
        Commands::Stats(args) => args.execute(&services).await,
        Commands::Version | Commands::Config => Ok(()),
    };

    drop(services);
    db.close().await;
    result
}

/// Print a failure as `{"error":{"code","message"}}` on stderr
fn report(err: &anyhow::Error) {
    let code = err
        .downcast_ref::<roster_core::Error>()
        .map_or("INTERNAL_ERROR", roster_core::Error::code);
    eprintln!(
        "{}",
        serde_json::json!({
            "error": {
                "code": code,
                "message": err.to_string(),
            }
        })
    );
}
