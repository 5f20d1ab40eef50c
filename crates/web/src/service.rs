// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Web service lifecycle: two HTTP servers, one run.
//!
//! The primary and metrics servers run as independent tasks sharing
//! one metrics registry. The first of {server exit, watcher error,
//! graceful quit} starts the drain; a forced quit cuts the drain
//! short. A service instance is single-use: after any quit or run,
//! `run` fails.

use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;

use axum_server::Handle;
use insights_config::{AllowListManager, ConfigError};
use insights_telemetry::WebMetrics;
use parking_lot::Mutex;
use prometheus::Registry;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::WebConfig;
use crate::handlers::{self, AppState};

// hyper refuses read buffers below 8KiB.
const MIN_HEADER_BYTES: usize = 8192;

/// Errors that can occur running the web service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("service already ran; create a new instance")]
    AlreadyRun,
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
    #[error("cannot resolve {host}:{port}: {source}")]
    Resolve {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },
    #[error("{server} server error: {source}")]
    Server {
        server: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("{server} server task failed: {message}")]
    Task {
        server: &'static str,
        message: String,
    },
    #[error("config watcher failed: {0}")]
    Watcher(notify::Error),
    #[error("{}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ServiceError>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    New,
    Running,
    Draining,
    Stopped,
}

/// Which task ended first and triggered the drain.
enum StopCause {
    Primary,
    Metrics,
    External,
}

/// The web ingest service. Owns both HTTP servers.
pub struct WebService {
    config: WebConfig,
    allow_list: AllowListManager,
    registry: Registry,
    metrics: Arc<WebMetrics>,
    state: Mutex<ServiceState>,
    graceful: CancellationToken,
    forced: CancellationToken,
    primary_handle: Handle<SocketAddr>,
    metrics_handle: Handle<SocketAddr>,
}

impl WebService {
    pub fn new(config: WebConfig) -> Result<Self, ServiceError> {
        let registry = Registry::new();
        let metrics = Arc::new(WebMetrics::register(&registry)?);
        let allow_list = AllowListManager::new(&config.daemon_config);
        Ok(Self {
            config,
            allow_list,
            registry,
            metrics,
            state: Mutex::new(ServiceState::New),
            graceful: CancellationToken::new(),
            forced: CancellationToken::new(),
            primary_handle: Handle::new(),
            metrics_handle: Handle::new(),
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn allow_list(&self) -> &AllowListManager {
        &self.allow_list
    }

    pub fn state(&self) -> ServiceState {
        *self.state.lock()
    }

    /// Address the primary server is accepting on, once it is.
    pub async fn listening(&self) -> Option<SocketAddr> {
        self.primary_handle.listening().await
    }

    /// Request shutdown. `force = false` drains in-flight requests;
    /// `force = true` closes both listeners immediately. Either way
    /// the service cannot be run again.
    pub fn quit(&self, force: bool) {
        {
            let mut state = self.state.lock();
            if *state == ServiceState::New {
                // Never ran; make sure it never does.
                *state = ServiceState::Stopped;
            }
        }
        info!(force, "web service quit requested");
        self.graceful.cancel();
        if force {
            self.forced.cancel();
        }
    }

    /// Load the allow-list, start the watcher and both servers, and
    /// block until shutdown. Independent failures are joined into the
    /// returned error.
    pub async fn run(&self) -> Result<(), ServiceError> {
        {
            let mut state = self.state.lock();
            if *state != ServiceState::New {
                return Err(ServiceError::AlreadyRun);
            }
            *state = ServiceState::Running;
        }

        let result = self.run_inner().await;
        *self.state.lock() = ServiceState::Stopped;
        info!("web service stopped");
        result
    }

    async fn run_inner(&self) -> Result<(), ServiceError> {
        self.allow_list.load()?;

        // Reload signals need no handling here: requests read the new
        // snapshot through is_allowed as soon as load commits it.
        let watch_cancel = CancellationToken::new();
        let _watch_guard = watch_cancel.clone().drop_guard();
        let (_reload_rx, mut watch_err_rx) = self.allow_list.watch(watch_cancel)?;

        let read_timeout = self.config.read_timeout;
        let max_buf_size = self.config.max_header_bytes.max(MIN_HEADER_BYTES);

        let app_state = AppState {
            allow_list: self.allow_list.clone(),
            reports_dir: self.config.reports_dir.clone(),
            max_upload_bytes: self.config.max_upload_bytes,
        };
        let primary_router = handlers::primary_router(
            app_state,
            Arc::clone(&self.metrics),
            self.config.request_timeout,
        );
        let metrics_router = insights_telemetry::metrics_router(self.registry.clone());

        let primary_addr = resolve_addr(&self.config.listen_host, self.config.listen_port)?;
        let metrics_addr = resolve_addr(&self.config.metrics_host, self.config.metrics_port)?;
        info!(%primary_addr, %metrics_addr, "starting HTTP servers");

        let mut primary_server = axum_server::bind(primary_addr).handle(self.primary_handle.clone());
        primary_server
            .http_builder()
            .http1()
            .header_read_timeout(read_timeout)
            .max_buf_size(max_buf_size);
        let mut primary_task = tokio::spawn(primary_server.serve(primary_router.into_make_service()));

        let mut metrics_server = axum_server::bind(metrics_addr).handle(self.metrics_handle.clone());
        metrics_server
            .http_builder()
            .http1()
            .header_read_timeout(read_timeout)
            .max_buf_size(max_buf_size);
        let mut metrics_task = tokio::spawn(metrics_server.serve(metrics_router.into_make_service()));

        let mut errors = Vec::new();

        let cause = tokio::select! {
            res = &mut primary_task => {
                record_server_result("primary", res, &mut errors);
                StopCause::Primary
            }
            res = &mut metrics_task => {
                record_server_result("metrics", res, &mut errors);
                StopCause::Metrics
            }
            Some(e) = watch_err_rx.recv() => {
                error!(error = %e, "config watcher failed; tearing down");
                errors.push(ServiceError::Watcher(e));
                StopCause::External
            }
            _ = self.graceful.cancelled() => StopCause::External,
        };

        *self.state.lock() = ServiceState::Draining;
        // Drain in-flight requests, bounded by the write timeout; the
        // request timeout inside has usually fired well before that.
        self.primary_handle
            .graceful_shutdown(Some(self.config.write_timeout));
        self.metrics_handle
            .graceful_shutdown(Some(self.config.write_timeout));

        match cause {
            StopCause::Primary => self.wait_for("metrics", metrics_task, &mut errors).await,
            StopCause::Metrics => self.wait_for("primary", primary_task, &mut errors).await,
            StopCause::External => {
                self.wait_for("primary", primary_task, &mut errors).await;
                self.wait_for("metrics", metrics_task, &mut errors).await;
            }
        }

        join_errors(errors)
    }

    async fn wait_for(
        &self,
        server: &'static str,
        mut task: JoinHandle<std::io::Result<()>>,
        errors: &mut Vec<ServiceError>,
    ) {
        tokio::select! {
            res = &mut task => {
                record_server_result(server, res, errors);
                return;
            }
            _ = self.forced.cancelled() => {
                warn!(server, "forced shutdown; aborting in-flight connections");
                self.primary_handle.shutdown();
                self.metrics_handle.shutdown();
            }
        }
        // The listeners are closed; the task ends promptly.
        record_server_result(server, task.await, errors);
    }
}

fn record_server_result(
    server: &'static str,
    result: Result<std::io::Result<()>, tokio::task::JoinError>,
    errors: &mut Vec<ServiceError>,
) {
    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => errors.push(ServiceError::Server { server, source: e }),
        Err(e) => errors.push(ServiceError::Task {
            server,
            message: e.to_string(),
        }),
    }
}

fn join_errors(mut errors: Vec<ServiceError>) -> Result<(), ServiceError> {
    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(ServiceError::Multiple(errors)),
    }
}

fn resolve_addr(host: &str, port: u16) -> Result<SocketAddr, ServiceError> {
    let resolve_err = |source| ServiceError::Resolve {
        host: host.to_string(),
        port,
        source,
    };
    (host, port)
        .to_socket_addrs()
        .map_err(resolve_err)?
        .next()
        .ok_or_else(|| {
            resolve_err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no addresses resolved",
            ))
        })
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
