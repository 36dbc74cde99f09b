//! Runner for fire-and-forget sync work.

use crate::error::CatalogResult;
use crate::server::metrics::record_background_task;
use std::future::Future;
use std::time::Duration;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, warn};

/// Detached tasks whose outcome nobody awaits.
///
/// Failures end here: they are logged and counted, never propagated. Tasks are
/// tracked so that shutdown (and tests) can wait for them to drain.
#[derive(Clone, Default)]
pub struct BackgroundTasks {
    tracker: TaskTracker,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<F>(&self, name: &'static str, task: F)
    where
        F: Future<Output = CatalogResult<()>> + Send + 'static,
    {
        self.tracker.spawn(async move {
            match task.await {
                Ok(()) => {
                    debug!("Background task {} completed", name);
                    record_background_task(name, true);
                }
                Err(e) => {
                    error!("Background task {} failed: {}", name, e);
                    record_background_task(name, false);
                }
            }
        });
    }

    /// Number of tasks still running.
    pub fn len(&self) -> usize {
        self.tracker.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracker.is_empty()
    }

    /// Wait for every task spawned so far. New tasks can still be spawned afterwards.
    pub async fn wait_idle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Give running tasks `timeout` to finish.
    ///
    /// Returns false if some tasks were still running when the timeout hit.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.tracker.close();
        if tokio::time::timeout(timeout, self.tracker.wait())
            .await
            .is_err()
        {
            warn!(
                "{} background tasks still running after {:?}",
                self.tracker.len(),
                timeout
            );
            return false;
        }
        true
    }
}
