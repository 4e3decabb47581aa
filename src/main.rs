//! # ghstats entry point
//!
//! `serve` runs the read API, `ingest` runs a single ingestion pass,
//! `schedule` runs passes on an interval and `migrate` applies migrations.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ghstats::{
    config::{AppConfig, ConfigLoader},
    db::{ensure_schema, health_check, init_pool},
    ingestion::IngestionOrchestrator,
    migration::{Migrator, MigratorTrait},
    scheduler::IngestionScheduler,
    server::run_server,
    telemetry,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "ghstats")]
#[command(about = "Top GitHub repositories and their commit activity", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the read API
    Serve,

    /// Run one ingestion pass and exit (status 1 if the pass aborts)
    Ingest,

    /// Run ingestion passes on the configured interval until Ctrl-C
    Schedule,

    /// Apply pending database migrations
    Migrate,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = ConfigLoader::new()
        .load()
        .context("Failed to load configuration")?;
    telemetry::init_tracing(&config)?;

    if let Ok(redacted) = config.redacted_json() {
        info!(profile = %config.profile, config = %redacted, "Loaded configuration");
    }

    let db = Arc::new(init_pool(&config).await?);
    health_check(&db).await?;
    if !matches!(cli.command, Commands::Migrate) {
        ensure_schema(&db).await?;
    }

    let exit = match cli.command {
        Commands::Serve => {
            let shutdown = shutdown_on_ctrl_c();
            run_server(&config, Arc::clone(&db), shutdown).await?;
            ExitCode::SUCCESS
        }
        Commands::Ingest => ingest_once(&config, Arc::clone(&db)).await?,
        Commands::Schedule => {
            let orchestrator = IngestionOrchestrator::from_config(Arc::clone(&db), &config)
                .context("Failed to build GitHub client")?;
            let scheduler = IngestionScheduler::new(Arc::new(orchestrator), &config.scheduler);
            scheduler.run(shutdown_on_ctrl_c()).await;
            ExitCode::SUCCESS
        }
        Commands::Migrate => {
            Migrator::up(&*db, None)
                .await
                .context("Failed to apply migrations")?;
            info!("Migrations applied");
            ExitCode::SUCCESS
        }
    };

    if let Ok(db) = Arc::try_unwrap(db) {
        db.close().await.context("Failed to close database pool")?;
    }

    Ok(exit)
}

async fn ingest_once(
    config: &AppConfig,
    db: Arc<sea_orm::DatabaseConnection>,
) -> Result<ExitCode> {
    let orchestrator =
        IngestionOrchestrator::from_config(db, config).context("Failed to build GitHub client")?;

    match orchestrator.run_ingestion_pass().await {
        Ok(result) => {
            println!(
                "Ingestion committed: {} repositories, {} activity records, {} degraded",
                result.repositories_processed,
                result.activity_records_saved,
                result.degraded_repositories
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            error!(error = %err, "Ingestion pass aborted");
            println!("Ingestion aborted: {}", err);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn shutdown_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
        }
        trigger.cancel();
    });
    token
}
