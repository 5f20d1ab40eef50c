// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ingest daemon lifecycle: worker pool plus metrics surface under one
//! supervisor.
//!
//! The supervisor owns the app-to-worker map and keeps it aligned with
//! the allow-list (reconciliation is serial: it only ever runs from
//! the supervisor loop). When either collaborator ends abnormally the
//! supervisor goes degraded and drains the other within
//! `max_degraded`; overrunning that budget is an error and forces
//! close. Like the web service, an instance runs at most once.

use std::collections::{HashMap, HashSet};
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use axum_server::Handle;
use insights_config::{AllowListManager, ConfigError};
use insights_core::AppTag;
use insights_storage::ReportSink;
use insights_telemetry::IngestMetrics;
use parking_lot::Mutex;
use prometheus::Registry;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::IngestConfig;
use crate::processor::Processor;
use crate::worker::Worker;

/// Errors that can occur running the ingest daemon.
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
    #[error("metrics server stopped unexpectedly")]
    MetricsStopped,
    #[error("config watcher failed: {0}")]
    Watcher(notify::Error),
    #[error("teardown timed out after {0:?}")]
    TeardownTimeout(Duration),
    #[error("{}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ServiceError>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    New,
    Running,
    Degraded,
    TornDown,
}

/// The ingest daemon. Owns the worker map and the metrics server.
pub struct IngestService<S: ReportSink + 'static> {
    config: IngestConfig,
    allow_list: AllowListManager,
    registry: Registry,
    processor: Arc<Processor<S>>,
    workers: Mutex<HashMap<String, Worker>>,
    state: Mutex<SupervisorState>,
    graceful: CancellationToken,
    forced: CancellationToken,
    workers_cancel: CancellationToken,
    metrics_handle: Handle<std::net::SocketAddr>,
}

impl<S: ReportSink + 'static> IngestService<S> {
    /// Build the service around an already-connected sink.
    pub fn new(config: IngestConfig, sink: Arc<S>) -> Result<Self, ServiceError> {
        let registry = Registry::new();
        let metrics = Arc::new(IngestMetrics::register(&registry)?);
        let allow_list = AllowListManager::new(&config.daemon_config);
        let processor = Arc::new(Processor::new(
            sink,
            metrics,
            config.reports_dir.clone(),
            config.max_in_flight,
        ));
        Ok(Self {
            config,
            allow_list,
            registry,
            processor,
            workers: Mutex::new(HashMap::new()),
            state: Mutex::new(SupervisorState::New),
            graceful: CancellationToken::new(),
            forced: CancellationToken::new(),
            workers_cancel: CancellationToken::new(),
            metrics_handle: Handle::new(),
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn state(&self) -> SupervisorState {
        *self.state.lock()
    }

    /// Apps with a live worker, sorted.
    pub fn active_apps(&self) -> Vec<String> {
        let mut apps: Vec<String> = self.workers.lock().keys().cloned().collect();
        apps.sort();
        apps
    }

    /// Request shutdown; mirrors the web service's quit semantics.
    pub fn quit(&self, force: bool) {
        {
            let mut state = self.state.lock();
            if *state == SupervisorState::New {
                *state = SupervisorState::TornDown;
            }
        }
        info!(force, "ingest service quit requested");
        self.graceful.cancel();
        if force {
            self.forced.cancel();
        }
    }

    /// Load the allow-list, start the metrics server and the worker
    /// pool, and supervise until shutdown.
    pub async fn run(&self) -> Result<(), ServiceError> {
        {
            let mut state = self.state.lock();
            if *state != SupervisorState::New {
                return Err(ServiceError::AlreadyRun);
            }
            *state = SupervisorState::Running;
        }

        let result = self.run_inner().await;
        *self.state.lock() = SupervisorState::TornDown;
        info!("ingest service torn down");
        result
    }

    async fn run_inner(&self) -> Result<(), ServiceError> {
        self.allow_list.load()?;

        let watch_cancel = CancellationToken::new();
        let _watch_guard = watch_cancel.clone().drop_guard();
        let (mut reload_rx, mut watch_err_rx) = self.allow_list.watch(watch_cancel)?;

        let metrics_addr = resolve_addr(&self.config.metrics_host, self.config.metrics_port)?;
        info!(%metrics_addr, "starting metrics server");
        let mut metrics_task = tokio::spawn(
            axum_server::bind(metrics_addr)
                .handle(self.metrics_handle.clone())
                .serve(insights_telemetry::metrics_router(self.registry.clone()).into_make_service()),
        );

        self.reconcile().await;

        let mut errors = Vec::new();
        let mut metrics_finished = false;
        let mut degraded = false;

        loop {
            tokio::select! {
                Some(()) = reload_rx.recv() => {
                    info!("allow-list reloaded; reconciling workers");
                    self.reconcile().await;
                }
                Some(e) = watch_err_rx.recv() => {
                    error!(error = %e, "config watcher failed; tearing down");
                    errors.push(ServiceError::Watcher(e));
                    degraded = true;
                    break;
                }
                res = &mut metrics_task => {
                    metrics_finished = true;
                    degraded = true;
                    if !record_server_result("metrics", res, &mut errors) {
                        errors.push(ServiceError::MetricsStopped);
                    }
                    error!("metrics server ended; tearing down workers");
                    break;
                }
                _ = self.graceful.cancelled() => break,
            }
        }

        if degraded {
            *self.state.lock() = SupervisorState::Degraded;
        }
        self.teardown(&mut metrics_task, metrics_finished, &mut errors)
            .await;

        join_errors(errors)
    }

    /// Align the worker map with the current allow-list snapshot.
    async fn reconcile(&self) {
        let desired = self.allow_list.allow_list();

        let to_stop: Vec<Worker> = {
            let mut workers = self.workers.lock();
            let desired_set: HashSet<&str> = desired.iter().map(String::as_str).collect();
            let removed: Vec<String> = workers
                .keys()
                .filter(|name| !desired_set.contains(name.as_str()))
                .cloned()
                .collect();
            removed
                .into_iter()
                .filter_map(|name| workers.remove(&name))
                .collect()
        };
        for worker in to_stop {
            info!(app = %worker.app, "stopping worker; app removed from allow-list");
            worker.stop().await;
        }

        let mut workers = self.workers.lock();
        for name in desired {
            if !workers.contains_key(&name) {
                info!(app = %name, "starting worker");
                let worker = Worker::spawn(
                    AppTag::new(name.clone()),
                    Arc::clone(&self.processor),
                    self.config.worker_interval,
                    &self.workers_cancel,
                );
                workers.insert(name, worker);
            }
        }
    }

    /// Drain both collaborators, bounded by `max_degraded`. A forced
    /// quit or an exhausted budget closes everything immediately.
    async fn teardown(
        &self,
        metrics_task: &mut JoinHandle<std::io::Result<()>>,
        metrics_finished: bool,
        errors: &mut Vec<ServiceError>,
    ) {
        self.workers_cancel.cancel();
        self.metrics_handle
            .graceful_shutdown(Some(self.config.max_degraded));

        let mut workers: Vec<Worker> = self.workers.lock().drain().map(|(_, w)| w).collect();

        let mut timed_out = false;
        let mut force = false;
        let mut metrics_result = None;

        {
            let graceful = async {
                for worker in &mut workers {
                    let _ = (&mut worker.handle).await;
                }
                if metrics_finished {
                    None
                } else {
                    Some((&mut *metrics_task).await)
                }
            };
            tokio::select! {
                result = graceful => metrics_result = result,
                _ = tokio::time::sleep(self.config.max_degraded) => timed_out = true,
                _ = self.forced.cancelled() => force = true,
            }
        }

        if timed_out || force {
            warn!(timed_out, force, "closing collaborators immediately");
            self.metrics_handle.shutdown();
            for worker in &workers {
                worker.handle.abort();
            }
            metrics_task.abort();
            if timed_out {
                errors.push(ServiceError::TeardownTimeout(self.config.max_degraded));
            }
        }
        if let Some(result) = metrics_result {
            record_server_result("metrics", result, errors);
        }
    }
}

/// Record a server task result; returns true when an error was pushed.
fn record_server_result(
    server: &'static str,
    result: Result<std::io::Result<()>, tokio::task::JoinError>,
    errors: &mut Vec<ServiceError>,
) -> bool {
    match result {
        Ok(Ok(())) => false,
        Ok(Err(e)) => {
            errors.push(ServiceError::Server { server, source: e });
            true
        }
        Err(e) => {
            errors.push(ServiceError::Task {
                server,
                message: e.to_string(),
            });
            true
        }
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
