//! Strictly-serial task scheduler
//!
//! Owns the task store, the pending queue and the "currently processing"
//! slot behind one lock. A single worker loop pulls the queue head, drives it
//! through the fetcher and loops again, so at most one fetch is ever in
//! flight. The blocking fetch itself runs on tokio's blocking pool, never
//! while the state lock is held.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bon::Builder;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::store::PendingQueue;
use crate::ledger::{self, LedgerError, TaskRecord, TaskResult, TaskStore, checkpoint};
use crate::observability::Metrics;
use crate::worker::{Fetcher, TaskError, runner};

pub const DEFAULT_QUEUE_CAPACITY: usize = 5;
pub const DEFAULT_QUALITY_CEILING: u32 = 720;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("queue is full ({capacity} tasks pending), try again later")]
    QueueFull { capacity: usize },

    #[error("task not found: {0}")]
    NotFound(String),

    #[error("task {0} is being processed and cannot be cancelled")]
    TaskBusy(String),

    #[error("cannot remove files of task {task_id}: {source}")]
    Filesystem {
        task_id: String,
        #[source]
        source: std::io::Error,
    },

    #[error("task store error: {0}")]
    Ledger(#[from] LedgerError),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;

#[derive(Debug, Clone, Builder)]
pub struct SchedulerSettings {
    #[builder(default = DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,
    #[builder(default = DEFAULT_QUALITY_CEILING)]
    pub quality_ceiling: u32,
    #[builder(into)]
    pub download_dir: PathBuf,
}

/// Admission receipt returned by [`Scheduler::submit`]
#[derive(Debug, Clone)]
pub struct Submitted {
    pub task_id: String,
    pub queue_position: usize,
}

/// A task record plus its derived queue position
#[derive(Debug, Clone)]
pub struct TaskView {
    pub record: TaskRecord,
    pub queue_position: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct QueueOverview {
    pub queue_size: usize,
    pub max_queue_size: usize,
    pub processing_task: Option<String>,
    pub total_tasks: usize,
    pub queue: Vec<String>,
}

/// Work handed from the queue to the worker loop
#[derive(Debug, Clone)]
struct Dispatch {
    task_id: String,
    url: String,
    quality: u32,
}

#[derive(Debug)]
struct SchedulerState {
    store: TaskStore,
    queue: PendingQueue,
    processing: Option<String>,
}

pub struct Scheduler {
    settings: SchedulerSettings,
    state: Mutex<SchedulerState>,
    wake: Notify,
    fetcher: Arc<dyn Fetcher>,
    metrics: Arc<Metrics>,
    shutdown: CancellationToken,
}

impl Scheduler {
    /// Build a scheduler. Nothing runs until [`Scheduler::start`] is called.
    pub fn new(
        settings: SchedulerSettings,
        fetcher: Arc<dyn Fetcher>,
        metrics: Arc<Metrics>,
    ) -> Arc<Self> {
        info!(
            queue_capacity = settings.queue_capacity,
            quality_ceiling = settings.quality_ceiling,
            download_dir = %settings.download_dir.display(),
            "Creating scheduler"
        );

        let state = SchedulerState {
            store: TaskStore::new(),
            queue: PendingQueue::new(settings.queue_capacity),
            processing: None,
        };

        Arc::new(Self {
            settings,
            state: Mutex::new(state),
            wake: Notify::new(),
            fetcher,
            metrics,
            shutdown: CancellationToken::new(),
        })
    }

    /// Spawn the worker loop
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let scheduler = Arc::clone(self);
        tokio::spawn(async move { scheduler.run().await })
    }

    /// Ask the worker loop to exit after its current step
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    pub fn download_dir(&self) -> &Path {
        &self.settings.download_dir
    }

    /// Admit a new task or reject it when the queue is at capacity.
    ///
    /// The capacity check happens before anything is created. On success the
    /// worker loop is woken so an idle scheduler starts the task right away.
    pub async fn submit(&self, url: impl Into<String>, quality: u32) -> Result<Submitted> {
        let url = url.into();
        let submitted = {
            let mut state = self.state.lock().await;

            if state.queue.is_full() {
                self.metrics.task_rejected();
                warn!(
                    url = %url,
                    capacity = state.queue.capacity(),
                    "Queue full, task rejected"
                );
                return Err(SchedulerError::QueueFull {
                    capacity: state.queue.capacity(),
                });
            }

            let task_id = state.store.create(url.clone(), quality)?;
            let queue_position = match state.queue.push(task_id.clone()) {
                Ok(position) => position,
                Err(_) => {
                    state.store.delete(&task_id)?;
                    return Err(SchedulerError::QueueFull {
                        capacity: state.queue.capacity(),
                    });
                }
            };

            info!(
                task_id = %task_id,
                url = %url,
                quality,
                queue_len = state.queue.len(),
                "Task queued"
            );

            Submitted {
                task_id,
                queue_position,
            }
        };

        self.metrics.task_submitted();
        self.wake.notify_one();
        Ok(submitted)
    }

    pub async fn get(&self, id: &str) -> Option<TaskRecord> {
        self.state.lock().await.store.get(id).cloned()
    }

    /// Record plus queue position (only for queued tasks)
    pub async fn status(&self, id: &str) -> Option<TaskView> {
        let state = self.state.lock().await;
        let record = state.store.get(id)?.clone();
        let queue_position = match record.status {
            ledger::TaskStatus::Queued => state.queue.position(id),
            _ => None,
        };
        Some(TaskView {
            record,
            queue_position,
        })
    }

    pub async fn list(&self) -> Vec<TaskRecord> {
        self.state.lock().await.store.list()
    }

    pub async fn queue_overview(&self) -> QueueOverview {
        let state = self.state.lock().await;
        QueueOverview {
            queue_size: state.queue.len(),
            max_queue_size: state.queue.capacity(),
            processing_task: state.processing.clone(),
            total_tasks: state.store.len(),
            queue: state.queue.ids(),
        }
    }

    /// Remove a task outright.
    ///
    /// Queued tasks leave the queue and the store; terminal tasks lose their
    /// directory and then their record. If the directory cannot be removed
    /// the record stays. A processing task cannot be interrupted.
    pub async fn cancel(&self, id: &str) -> Result<TaskRecord> {
        let mut state = self.state.lock().await;
        let record = state
            .store
            .get(id)
            .ok_or_else(|| SchedulerError::NotFound(id.to_string()))?;

        if state.processing.as_deref() == Some(id)
            || record.status == ledger::TaskStatus::Processing
        {
            return Err(SchedulerError::TaskBusy(id.to_string()));
        }

        let dir = runner::task_dir(self.download_dir(), id);
        if let Err(e) = ledger::remove_task_dir(&dir).await {
            warn!(task_id = %id, dir = %dir.display(), error = %e, "Failed to remove task directory");
            return Err(SchedulerError::Filesystem {
                task_id: id.to_string(),
                source: e,
            });
        }

        state.queue.remove(id);
        let removed = state.store.delete(id)?;
        drop(state);

        self.metrics.task_cancelled();
        info!(task_id = %id, status = %removed.status, "Task cancelled");
        Ok(removed)
    }

    /// Delete a record if it is still terminal and past `retention`.
    ///
    /// Used by the reaper after it removed the task directory.
    pub async fn remove_expired(
        &self,
        id: &str,
        now: DateTime<Utc>,
        retention: chrono::Duration,
    ) -> bool {
        let mut state = self.state.lock().await;
        let expired = state
            .store
            .get(id)
            .is_some_and(|record| record.is_expired(now, retention));
        expired && state.store.delete(id).is_ok()
    }

    async fn run(&self) {
        info!("Scheduler worker started");
        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            match self.advance().await {
                Some(dispatch) => self.execute(dispatch).await,
                None => {
                    tokio::select! {
                        _ = self.wake.notified() => {}
                        _ = self.shutdown.cancelled() => break,
                    }
                }
            }
        }
        info!("Scheduler worker stopped");
    }

    /// Start the queue head if nothing is processing.
    ///
    /// Heads whose record is gone or no longer queued are skipped.
    async fn advance(&self) -> Option<Dispatch> {
        let mut state = self.state.lock().await;
        if state.processing.is_some() {
            return None;
        }

        while let Some(task_id) = state.queue.pop_front() {
            let started = state.store.update(&task_id, |record| {
                record
                    .start()
                    .then(|| (record.url.clone(), record.quality_requested))
            });

            match started {
                Ok(Some((url, quality))) => {
                    state.processing = Some(task_id.clone());
                    info!(
                        task_id = %task_id,
                        url = %url,
                        queue_len = state.queue.len(),
                        "Task processing"
                    );
                    return Some(Dispatch {
                        task_id,
                        url,
                        quality,
                    });
                }
                Ok(None) => warn!(task_id = %task_id, "Skipping queue entry that is no longer queued"),
                Err(_) => warn!(task_id = %task_id, "Skipping queue entry without a task record"),
            }
        }

        None
    }

    /// Run one task to a terminal state and free the processing slot
    async fn execute(&self, dispatch: Dispatch) {
        let outcome = self.run_step(&dispatch).await;
        let now = Utc::now();

        let mut state = self.state.lock().await;
        let task_id = dispatch.task_id.as_str();
        let recorded = match outcome {
            Ok(result) => {
                info!(task_id, quality = %result.quality, size = %result.size, "Task completed");
                self.metrics.task_completed();
                state.store.update(task_id, |record| record.complete(result, now))
            }
            Err(e) => {
                warn!(task_id, error = %e, "Task failed");
                self.metrics.task_failed();
                state
                    .store
                    .update(task_id, |record| record.fail(e.to_string(), now))
            }
        };

        if recorded.is_err() {
            warn!(task_id, "Task record vanished while processing");
        }
        state.processing = None;
    }

    async fn run_step(&self, dispatch: &Dispatch) -> std::result::Result<TaskResult, TaskError> {
        let plan = runner::plan(
            &dispatch.task_id,
            &dispatch.url,
            dispatch.quality,
            self.settings.quality_ceiling,
            &self.settings.download_dir,
        )
        .await?;

        let platform = plan.request.platform;
        self.record_progress(&dispatch.task_id, checkpoint::PLANNED, |record| {
            record.platform = Some(platform);
        })
        .await;

        let media = runner::fetch(Arc::clone(&self.fetcher), &plan).await?;
        self.record_progress(&dispatch.task_id, checkpoint::FETCHED, |_| {})
            .await;

        runner::finalize(&plan, media).await
    }

    async fn record_progress<F>(&self, task_id: &str, progress: u8, extra: F)
    where
        F: FnOnce(&mut TaskRecord),
    {
        let mut state = self.state.lock().await;
        let updated = state.store.update(task_id, |record| {
            record.advance_progress(progress);
            extra(record);
        });
        match updated {
            Ok(()) => debug!(task_id, progress, "Progress updated"),
            Err(_) => warn!(task_id, "Progress update for missing task"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::TaskStatus;
    use crate::worker::{FetchError, FetchRequest, FetchedMedia};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Writes a small artifact and records the order of calls
    #[derive(Default)]
    struct RecordingFetcher {
        calls: std::sync::Mutex<Vec<String>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl Fetcher for RecordingFetcher {
        fn fetch(&self, request: &FetchRequest) -> std::result::Result<FetchedMedia, FetchError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            self.calls.lock().unwrap().push(request.url.clone());

            std::thread::sleep(Duration::from_millis(5));
            std::fs::write(request.output_dir.join("video.mp4"), b"payload").unwrap();

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(FetchedMedia {
                title: Some(request.url.clone()),
                duration_secs: Some(75),
            })
        }
    }

    /// Blocks each fetch until the test releases it
    struct GatedFetcher {
        gate: std::sync::Mutex<mpsc::Receiver<()>>,
    }

    impl Fetcher for GatedFetcher {
        fn fetch(&self, request: &FetchRequest) -> std::result::Result<FetchedMedia, FetchError> {
            self.gate
                .lock()
                .unwrap()
                .recv()
                .map_err(|_| FetchError::Failed("gate closed".into()))?;
            std::fs::write(request.output_dir.join("video.mp4"), b"payload").unwrap();
            Ok(FetchedMedia::default())
        }
    }

    struct FailingFetcher;

    impl Fetcher for FailingFetcher {
        fn fetch(&self, _request: &FetchRequest) -> std::result::Result<FetchedMedia, FetchError> {
            Err(FetchError::Failed("ERROR: Video unavailable".into()))
        }
    }

    fn settings(dir: &Path, capacity: usize) -> SchedulerSettings {
        SchedulerSettings::builder()
            .queue_capacity(capacity)
            .download_dir(dir)
            .build()
    }

    async fn wait_for_status(scheduler: &Scheduler, id: &str, status: TaskStatus) -> TaskRecord {
        tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                if let Some(record) = scheduler.get(id).await {
                    if record.status == status {
                        return record;
                    }
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("task did not reach expected status")
    }

    #[tokio::test]
    async fn test_submit_until_capacity() {
        let temp_dir = TempDir::new().unwrap();
        let scheduler = Scheduler::new(
            settings(temp_dir.path(), 3),
            Arc::new(FailingFetcher),
            Arc::new(Metrics::new()),
        );

        for expected in 1..=3 {
            let submitted = scheduler.submit("https://youtu.be/x", 720).await.unwrap();
            assert_eq!(submitted.queue_position, expected);
        }

        let err = scheduler.submit("https://youtu.be/x", 720).await.unwrap_err();
        assert!(matches!(err, SchedulerError::QueueFull { capacity: 3 }));

        let overview = scheduler.queue_overview().await;
        assert_eq!(overview.queue_size, 3);
        assert_eq!(overview.total_tasks, 3);
        assert!(overview.processing_task.is_none());
    }

    #[tokio::test]
    async fn test_tasks_complete_in_submission_order() {
        let temp_dir = TempDir::new().unwrap();
        let fetcher = Arc::new(RecordingFetcher::default());
        let scheduler = Scheduler::new(
            settings(temp_dir.path(), 5),
            fetcher.clone(),
            Arc::new(Metrics::new()),
        );

        let a = scheduler.submit("https://youtu.be/a", 720).await.unwrap();
        let b = scheduler.submit("https://youtu.be/b", 720).await.unwrap();
        let c = scheduler.submit("https://youtu.be/c", 720).await.unwrap();
        scheduler.start();

        let ra = wait_for_status(&scheduler, &a.task_id, TaskStatus::Completed).await;
        let rb = wait_for_status(&scheduler, &b.task_id, TaskStatus::Completed).await;
        let rc = wait_for_status(&scheduler, &c.task_id, TaskStatus::Completed).await;

        assert_eq!(
            *fetcher.calls.lock().unwrap(),
            vec!["https://youtu.be/a", "https://youtu.be/b", "https://youtu.be/c"]
        );
        assert!(ra.completed_at <= rb.completed_at);
        assert!(rb.completed_at <= rc.completed_at);
        assert_eq!(fetcher.max_in_flight.load(Ordering::SeqCst), 1);
        scheduler.shutdown();
    }

    #[tokio::test]
    async fn test_completed_task_result() {
        let temp_dir = TempDir::new().unwrap();
        let scheduler = Scheduler::new(
            settings(temp_dir.path(), 5),
            Arc::new(RecordingFetcher::default()),
            Arc::new(Metrics::new()),
        );
        scheduler.start();

        let submitted = scheduler.submit("https://youtube.com/x", 1080).await.unwrap();
        let record = wait_for_status(&scheduler, &submitted.task_id, TaskStatus::Completed).await;

        assert_eq!(record.progress, 100);
        assert!(record.completed_at.is_some());
        let result = record.result.unwrap();
        assert_eq!(result.quality, "720p");
        assert_eq!(result.duration, "1:15");
        assert_eq!(result.size, "7.0 Bytes");
        let root = std::fs::canonicalize(temp_dir.path()).unwrap();
        assert_eq!(
            result.file_path,
            root.join(&submitted.task_id).join("video.mp4")
        );
        scheduler.shutdown();
    }

    #[tokio::test]
    async fn test_unsupported_platform_fails_without_fetch() {
        let temp_dir = TempDir::new().unwrap();
        let fetcher = Arc::new(RecordingFetcher::default());
        let scheduler = Scheduler::new(
            settings(temp_dir.path(), 5),
            fetcher.clone(),
            Arc::new(Metrics::new()),
        );
        scheduler.start();

        let submitted = scheduler.submit("https://example.com/v.mp4", 720).await.unwrap();
        let record = wait_for_status(&scheduler, &submitted.task_id, TaskStatus::Error).await;

        assert!(record.error_message.unwrap().contains("unsupported platform"));
        assert!(record.completed_at.is_some());
        assert!(fetcher.calls.lock().unwrap().is_empty());
        scheduler.shutdown();
    }

    #[tokio::test]
    async fn test_fetch_failure_is_recorded_and_next_task_runs() {
        let temp_dir = TempDir::new().unwrap();
        let metrics = Arc::new(Metrics::new());
        let scheduler = Scheduler::new(
            settings(temp_dir.path(), 5),
            Arc::new(FailingFetcher),
            metrics.clone(),
        );

        let a = scheduler.submit("https://youtu.be/a", 720).await.unwrap();
        let b = scheduler.submit("https://youtu.be/b", 720).await.unwrap();
        scheduler.start();

        let ra = wait_for_status(&scheduler, &a.task_id, TaskStatus::Error).await;
        wait_for_status(&scheduler, &b.task_id, TaskStatus::Error).await;

        assert_eq!(ra.progress, checkpoint::PLANNED);
        assert!(ra.error_message.unwrap().contains("Video unavailable"));
        assert!(ra.result.is_none());
        assert_eq!(metrics.snapshot().tasks_failed, 2);
        scheduler.shutdown();
    }

    #[tokio::test]
    async fn test_queue_positions_shift_as_tasks_start() {
        let temp_dir = TempDir::new().unwrap();
        let (release, gate) = mpsc::channel();
        let scheduler = Scheduler::new(
            settings(temp_dir.path(), 5),
            Arc::new(GatedFetcher {
                gate: std::sync::Mutex::new(gate),
            }),
            Arc::new(Metrics::new()),
        );

        let a = scheduler.submit("https://youtu.be/a", 720).await.unwrap();
        let b = scheduler.submit("https://youtu.be/b", 720).await.unwrap();
        let c = scheduler.submit("https://youtu.be/c", 720).await.unwrap();
        assert_eq!(scheduler.status(&c.task_id).await.unwrap().queue_position, Some(3));

        scheduler.start();
        wait_for_status(&scheduler, &a.task_id, TaskStatus::Processing).await;
        assert_eq!(scheduler.status(&a.task_id).await.unwrap().queue_position, None);
        assert_eq!(scheduler.status(&b.task_id).await.unwrap().queue_position, Some(1));
        assert_eq!(scheduler.status(&c.task_id).await.unwrap().queue_position, Some(2));
        assert_eq!(
            scheduler.queue_overview().await.processing_task.as_deref(),
            Some(a.task_id.as_str())
        );

        release.send(()).unwrap();
        wait_for_status(&scheduler, &b.task_id, TaskStatus::Processing).await;
        assert_eq!(scheduler.status(&c.task_id).await.unwrap().queue_position, Some(1));

        release.send(()).unwrap();
        release.send(()).unwrap();
        wait_for_status(&scheduler, &c.task_id, TaskStatus::Completed).await;
        scheduler.shutdown();
    }

    #[tokio::test]
    async fn test_cancel_queued_task_shifts_positions() {
        let temp_dir = TempDir::new().unwrap();
        let scheduler = Scheduler::new(
            settings(temp_dir.path(), 5),
            Arc::new(FailingFetcher),
            Arc::new(Metrics::new()),
        );

        let a = scheduler.submit("https://youtu.be/a", 720).await.unwrap();
        let b = scheduler.submit("https://youtu.be/b", 720).await.unwrap();
        let c = scheduler.submit("https://youtu.be/c", 720).await.unwrap();

        let removed = scheduler.cancel(&a.task_id).await.unwrap();
        assert_eq!(removed.status, TaskStatus::Queued);
        assert!(scheduler.get(&a.task_id).await.is_none());
        assert_eq!(scheduler.status(&b.task_id).await.unwrap().queue_position, Some(1));
        assert_eq!(scheduler.status(&c.task_id).await.unwrap().queue_position, Some(2));

        let err = scheduler.cancel(&a.task_id).await.unwrap_err();
        assert!(matches!(err, SchedulerError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_cancel_processing_task_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let (release, gate) = mpsc::channel();
        let scheduler = Scheduler::new(
            settings(temp_dir.path(), 5),
            Arc::new(GatedFetcher {
                gate: std::sync::Mutex::new(gate),
            }),
            Arc::new(Metrics::new()),
        );
        scheduler.start();

        let a = scheduler.submit("https://youtu.be/a", 720).await.unwrap();
        wait_for_status(&scheduler, &a.task_id, TaskStatus::Processing).await;

        let err = scheduler.cancel(&a.task_id).await.unwrap_err();
        assert!(matches!(err, SchedulerError::TaskBusy(_)));

        release.send(()).unwrap();
        wait_for_status(&scheduler, &a.task_id, TaskStatus::Completed).await;
        scheduler.shutdown();
    }

    #[tokio::test]
    async fn test_cancel_terminal_task_removes_directory() {
        let temp_dir = TempDir::new().unwrap();
        let scheduler = Scheduler::new(
            settings(temp_dir.path(), 5),
            Arc::new(RecordingFetcher::default()),
            Arc::new(Metrics::new()),
        );
        scheduler.start();

        let a = scheduler.submit("https://youtu.be/a", 720).await.unwrap();
        wait_for_status(&scheduler, &a.task_id, TaskStatus::Completed).await;
        let dir = temp_dir.path().join(&a.task_id);
        assert!(dir.exists());

        scheduler.cancel(&a.task_id).await.unwrap();
        assert!(!dir.exists());
        assert!(scheduler.get(&a.task_id).await.is_none());
        scheduler.shutdown();
    }

    #[tokio::test]
    async fn test_cancel_keeps_record_when_directory_removal_fails() {
        let temp_dir = TempDir::new().unwrap();
        let metrics = Arc::new(Metrics::new());
        let scheduler = Scheduler::new(
            settings(temp_dir.path(), 5),
            Arc::new(RecordingFetcher::default()),
            metrics.clone(),
        );
        scheduler.start();

        let a = scheduler.submit("https://youtu.be/a", 720).await.unwrap();
        wait_for_status(&scheduler, &a.task_id, TaskStatus::Completed).await;

        // A regular file where the task directory should be
        let dir = temp_dir.path().join(&a.task_id);
        std::fs::remove_dir_all(&dir).unwrap();
        std::fs::write(&dir, b"not a directory").unwrap();

        let err = scheduler.cancel(&a.task_id).await.unwrap_err();
        match err {
            SchedulerError::Filesystem { task_id, .. } => assert_eq!(task_id, a.task_id),
            other => panic!("unexpected error: {other:?}"),
        }
        let record = scheduler.get(&a.task_id).await.unwrap();
        assert_eq!(record.status, TaskStatus::Completed);
        assert_eq!(metrics.snapshot().tasks_cancelled, 0);

        std::fs::remove_file(&dir).unwrap();
        scheduler.cancel(&a.task_id).await.unwrap();
        assert!(scheduler.get(&a.task_id).await.is_none());
        scheduler.shutdown();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_at_most_one_processing_under_concurrent_submits() {
        let temp_dir = TempDir::new().unwrap();
        let fetcher = Arc::new(RecordingFetcher::default());
        let scheduler = Scheduler::new(
            settings(temp_dir.path(), 20),
            fetcher.clone(),
            Arc::new(Metrics::new()),
        );
        scheduler.start();

        let mut handles = Vec::new();
        for i in 0..16 {
            let scheduler = Arc::clone(&scheduler);
            handles.push(tokio::spawn(async move {
                scheduler
                    .submit(format!("https://youtu.be/{i}"), 720)
                    .await
                    .unwrap()
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().task_id);
        }

        for _ in 0..50 {
            let processing = scheduler
                .list()
                .await
                .iter()
                .filter(|r| r.status == TaskStatus::Processing)
                .count();
            assert!(processing <= 1);
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        for id in &ids {
            wait_for_status(&scheduler, id, TaskStatus::Completed).await;
        }
        assert_eq!(fetcher.max_in_flight.load(Ordering::SeqCst), 1);
        scheduler.shutdown();
    }
}
