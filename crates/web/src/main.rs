// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! insights-web: Ubuntu Insights web ingest service.
//!
//! Accepts JSON report uploads, validates them against the allow-list,
//! and persists them to the spool for the ingest daemon.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use insights_config::ServiceFile;
use insights_web::config::{WebConfig, WebOverrides};
use insights_web::WebService;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{info, warn};

#[derive(Parser)]
#[command(
    name = "insights-web",
    version,
    about = "Ubuntu Insights web ingest service"
)]
struct Cli {
    /// Path to the allow-list daemon config (JSON)
    #[arg(long, value_name = "FILE")]
    daemon_config: PathBuf,

    /// Path to the service config (YAML)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory reports are spooled under
    #[arg(long, value_name = "DIR")]
    reports_dir: Option<PathBuf>,

    /// Primary listen host [default: 0.0.0.0]
    #[arg(long)]
    listen_host: Option<String>,

    /// Primary listen port [default: 8080]
    #[arg(long)]
    listen_port: Option<u16>,

    /// Metrics listen host [default: the listen host]
    #[arg(long)]
    metrics_host: Option<String>,

    /// Metrics listen port [default: 2112]
    #[arg(long)]
    metrics_port: Option<u16>,

    /// Header read timeout in seconds [default: 5]
    #[arg(long, value_name = "SECONDS")]
    read_timeout: Option<u64>,

    /// Response drain timeout in seconds [default: 10]
    #[arg(long, value_name = "SECONDS")]
    write_timeout: Option<u64>,

    /// Per-request handler timeout in seconds [default: 3]
    #[arg(long, value_name = "SECONDS")]
    request_timeout: Option<u64>,

    /// Maximum request header size [default: 8192]
    #[arg(long, value_name = "BYTES")]
    max_header_bytes: Option<usize>,

    /// Maximum upload body size [default: 131072]
    #[arg(long, value_name = "BYTES")]
    max_upload_bytes: Option<usize>,

    /// Increase log verbosity (-v: debug, -vv: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn overrides(&self) -> WebOverrides {
        WebOverrides {
            reports_dir: self.reports_dir.clone(),
            listen_host: self.listen_host.clone(),
            listen_port: self.listen_port,
            metrics_host: self.metrics_host.clone(),
            metrics_port: self.metrics_port,
            read_timeout: self.read_timeout,
            write_timeout: self.write_timeout,
            request_timeout: self.request_timeout,
            max_header_bytes: self.max_header_bytes,
            max_upload_bytes: self.max_upload_bytes,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let file = ServiceFile::load_optional(cli.config.as_deref())
        .context("failed to load service config")?;

    let verbosity = if cli.verbose > 0 {
        cli.verbose
    } else {
        file.verbosity.unwrap_or(0)
    };
    setup_logging(verbosity);

    let config = WebConfig::resolve(cli.daemon_config.clone(), cli.overrides(), &file);
    let service = Arc::new(WebService::new(config)?);

    spawn_signal_handler(Arc::clone(&service))?;

    info!("starting web ingest service");
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
fn spawn_signal_handler(service: Arc<WebService>) -> anyhow::Result<()> {
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
