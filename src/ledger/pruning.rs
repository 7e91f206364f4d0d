/// Retention sweep: removes terminal tasks and their artifacts once they age out
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::observability::Metrics;
use crate::queue::Scheduler;
use crate::worker::runner::task_dir;

pub const DEFAULT_RETENTION_HOURS: u64 = 2;
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 3600;

/// Pruning statistics for one sweep
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PruneStats {
    pub tasks_pruned: usize,
    pub dirs_failed: usize,
}

/// Recursively delete a task directory; an absent directory is not an error
pub async fn remove_task_dir(dir: &Path) -> io::Result<()> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

pub struct Reaper {
    scheduler: Arc<Scheduler>,
    metrics: Arc<Metrics>,
    retention: chrono::Duration,
    interval: Duration,
}

impl Reaper {
    pub fn new(
        scheduler: Arc<Scheduler>,
        metrics: Arc<Metrics>,
        retention: Duration,
        interval: Duration,
    ) -> Self {
        // Beyond chrono's range nothing can ever expire
        let retention = chrono::Duration::from_std(retention).unwrap_or(chrono::Duration::MAX);
        Self {
            scheduler,
            metrics,
            retention,
            interval,
        }
    }

    /// Sweep every `interval` until `shutdown` fires. The first sweep runs immediately.
    pub fn start(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(
                interval_secs = self.interval.as_secs(),
                retention_mins = self.retention.num_minutes(),
                "Reaper started"
            );

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.prune_expired().await;
                    }
                    _ = shutdown.cancelled() => break,
                }
            }

            info!("Reaper stopped");
        })
    }

    pub async fn prune_expired(&self) -> PruneStats {
        self.prune_expired_at(Utc::now()).await
    }

    /// Remove every terminal task that finished more than the retention window before `now`.
    ///
    /// A task whose directory cannot be removed keeps its record, so the next
    /// sweep retries it; the other tasks are still processed.
    pub async fn prune_expired_at(&self, now: DateTime<Utc>) -> PruneStats {
        let mut stats = PruneStats::default();

        let expired: Vec<String> = self
            .scheduler
            .list()
            .await
            .into_iter()
            .filter(|record| record.is_expired(now, self.retention))
            .map(|record| record.id)
            .collect();

        for task_id in expired {
            let dir = task_dir(self.scheduler.download_dir(), &task_id);
            if let Err(e) = remove_task_dir(&dir).await {
                warn!(task_id = %task_id, dir = %dir.display(), error = %e, "Failed to remove expired task directory");
                stats.dirs_failed += 1;
                continue;
            }

            if self
                .scheduler
                .remove_expired(&task_id, now, self.retention)
                .await
            {
                debug!(task_id = %task_id, "Expired task removed");
                stats.tasks_pruned += 1;
            }
        }

        self.metrics.tasks_reaped(stats.tasks_pruned);
        if stats.tasks_pruned > 0 || stats.dirs_failed > 0 {
            info!(
                pruned = stats.tasks_pruned,
                failed = stats.dirs_failed,
                "Pruning complete"
            );
        }

        stats
    }
}
