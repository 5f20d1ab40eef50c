// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! insights-ingest: Ubuntu Insights ingest daemon.
//!
//! Watches the spool the web service writes into, classifies each
//! report, and persists it to PostgreSQL.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use insights_config::ServiceFile;
use insights_ingest::config::{IngestConfig, IngestOverrides};
use insights_ingest::IngestService;
use insights_storage::Database;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{info, warn};

#[derive(Parser)]
#[command(
    name = "insights-ingest",
    version,
    about = "Ubuntu Insights ingest daemon"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to the allow-list daemon config (JSON)
    #[arg(long, value_name = "FILE", global = true)]
    daemon_config: Option<PathBuf>,

    /// Path to the service config (YAML)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Directory reports are spooled under
    #[arg(long, value_name = "DIR")]
    reports_dir: Option<PathBuf>,

    /// Database host [default: localhost]
    #[arg(long, global = true)]
    db_host: Option<String>,

    /// Database port [default: 5432]
    #[arg(long, global = true)]
    db_port: Option<u16>,

    /// Database user [default: postgres]
    #[arg(long, global = true)]
    db_user: Option<String>,

    /// Database password
    #[arg(long, global = true)]
    db_password: Option<String>,

    /// Database name [default: insights]
    #[arg(long, global = true)]
    db_name: Option<String>,

    /// Database sslmode [default: prefer]
    #[arg(long, global = true)]
    db_sslmode: Option<String>,

    /// Metrics listen host [default: 0.0.0.0]
    #[arg(long)]
    metrics_host: Option<String>,

    /// Metrics listen port [default: 2113]
    #[arg(long)]
    metrics_port: Option<u16>,

    /// Increase log verbosity (-v: debug, -vv: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the SQL migrations under <DIR> and exit
    Migrate {
        /// Directory containing the migration files
        dir: PathBuf,
    },
    /// Print version information
    Version,
}

impl Cli {
    fn overrides(&self) -> IngestOverrides {
        IngestOverrides {
            reports_dir: self.reports_dir.clone(),
            db_host: self.db_host.clone(),
            db_port: self.db_port,
            db_user: self.db_user.clone(),
            db_password: self.db_password.clone(),
            db_name: self.db_name.clone(),
            db_sslmode: self.db_sslmode.clone(),
            metrics_host: self.metrics_host.clone(),
            metrics_port: self.metrics_port,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Some(Commands::Version) = cli.command {
        println!("insights-ingest {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let file = ServiceFile::load_optional(cli.config.as_deref())
        .context("failed to load service config")?;

    let verbosity = if cli.verbose > 0 {
        cli.verbose
    } else {
        file.verbosity.unwrap_or(0)
    };
    setup_logging(verbosity);

    match &cli.command {
        Some(Commands::Migrate { dir }) => {
            // Migrations only need the database connection.
            let config = IngestConfig::resolve(
                cli.daemon_config.clone().unwrap_or_default(),
                cli.overrides(),
                &file,
            );
            migrate(&config, dir).await
        }
        Some(Commands::Version) => Ok(()),
        None => {
            let daemon_config = cli
                .daemon_config
                .clone()
                .context("--daemon-config is required")?;
            let config = IngestConfig::resolve(daemon_config, cli.overrides(), &file);
            run(config).await
        }
    }
}

async fn migrate(config: &IngestConfig, dir: &std::path::Path) -> anyhow::Result<()> {
    info!(dir = %dir.display(), "running migrations");
    let database = Database::connect(&config.database)
        .await
        .context("failed to connect to the database")?;
    database.migrate(dir).await.context("migrations failed")?;
    database.close().await;
    info!("migrations complete");
    Ok(())
}

async fn run(config: IngestConfig) -> anyhow::Result<()> {
    let database = Database::connect(&config.database)
        .await
        .context("failed to connect to the database")?;

    let service = Arc::new(IngestService::new(config, Arc::new(database))?);
    spawn_signal_handler(Arc::clone(&service))?;

    info!("starting ingest daemon");
    service.run().await?;
    Ok(())
}

fn setup_logging(verbosity: u8) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
}

/// First SIGINT/SIGTERM drains; a second one forces shutdown.
fn spawn_signal_handler(service: Arc<IngestService<Database>>) -> anyhow::Result<()> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => {}
            _ = sigint.recv() => {}
        }
        info!("signal received; draining");
        service.quit(false);

        tokio::select! {
            _ = sigterm.recv() => {}
            _ = sigint.recv() => {}
        }
        warn!("second signal; forcing shutdown");
        service.quit(true);
    });
    Ok(())
}
