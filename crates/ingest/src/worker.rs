// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-app worker task: periodic processing passes until cancelled.

use std::sync::Arc;
use std::time::Duration;

use insights_core::AppTag;
use insights_storage::ReportSink;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::processor::{ProcessError, Processor};

/// A running per-app worker. Owns its spool directory between passes.
pub(crate) struct Worker {
    pub app: AppTag,
    pub cancel: CancellationToken,
    pub handle: JoinHandle<()>,
}

impl Worker {
    /// Spawn a worker for `app`. Its token is a child of `parent`, so
    /// cancelling the parent stops every worker.
    pub fn spawn<S: ReportSink + 'static>(
        app: AppTag,
        processor: Arc<Processor<S>>,
        interval: Duration,
        parent: &CancellationToken,
    ) -> Self {
        let cancel = parent.child_token();
        let handle = tokio::spawn(run_worker(
            app.clone(),
            processor,
            interval,
            cancel.clone(),
        ));
        Self {
            app,
            cancel,
            handle,
        }
    }

    /// Cancel and join.
    pub async fn stop(self) {
        self.cancel.cancel();
        let _ = self.handle.await;
    }
}

async fn run_worker<S: ReportSink + 'static>(
    app: AppTag,
    processor: Arc<Processor<S>>,
    interval: Duration,
    cancel: CancellationToken,
) {
    info!(app = %app, ?interval, "worker started");
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                match processor.process_app(&app, &cancel).await {
                    Ok(()) => {}
                    Err(ProcessError::MissingTable { .. }) => {
                        // Configuration error; retrying cannot help.
                        error!(app = %app, "table missing; worker aborting");
                        break;
                    }
                    Err(e) => {
                        warn!(app = %app, error = %e, "processing pass failed; will retry");
                    }
                }
            }
        }
    }
    info!(app = %app, "worker stopped");
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
