use crate::worker::Platform;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Progress checkpoints written by the scheduler
pub mod checkpoint {
    pub const DISPATCHED: u8 = 20;
    pub const PLANNED: u8 = 30;
    pub const FETCHED: u8 = 90;
    pub const DONE: u8 = 100;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    Processing,
    Completed,
    Error,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Queued => "queued",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Error => "error",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a successful fetch, all fields preformatted for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub title: String,
    pub duration: String,
    pub quality: String,
    pub size: String,
    pub file_path: PathBuf,
}

/// Lifecycle record of one fetch task.
///
/// Transitions only move forward: `queued → processing → completed | error`.
/// `completed_at` is set exactly when the status becomes terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    pub url: String,
    pub quality_requested: u32,
    pub status: TaskStatus,
    pub progress: u8,
    pub platform: Option<Platform>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub result: Option<TaskResult>,
    pub error_message: Option<String>,
}

impl TaskRecord {
    pub fn new(id: String, url: String, quality_requested: u32, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            url,
            quality_requested,
            status: TaskStatus::Queued,
            progress: 0,
            platform: None,
            created_at,
            completed_at: None,
            result: None,
            error_message: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// `queued → processing`; returns false for any other starting state
    pub fn start(&mut self) -> bool {
        if self.status != TaskStatus::Queued {
            return false;
        }
        self.status = TaskStatus::Processing;
        self.progress = checkpoint::DISPATCHED;
        true
    }

    /// Raise progress while processing; never lowers it
    pub fn advance_progress(&mut self, progress: u8) {
        if self.status == TaskStatus::Processing {
            self.progress = self.progress.max(progress.min(checkpoint::DONE));
        }
    }

    pub fn complete(&mut self, result: TaskResult, at: DateTime<Utc>) {
        if self.is_terminal() {
            return;
        }
        self.status = TaskStatus::Completed;
        self.progress = checkpoint::DONE;
        self.result = Some(result);
        self.completed_at = Some(at);
    }

    /// Terminal failure; the last progress value is kept
    pub fn fail(&mut self, message: impl Into<String>, at: DateTime<Utc>) {
        if self.is_terminal() {
            return;
        }
        self.status = TaskStatus::Error;
        self.error_message = Some(message.into());
        self.completed_at = Some(at);
    }

    /// Terminal and finished strictly longer ago than `retention`
    pub fn is_expired(&self, now: DateTime<Utc>, retention: chrono::Duration) -> bool {
        match self.completed_at {
            Some(at) if self.is_terminal() => now - at > retention,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record() -> TaskRecord {
        TaskRecord::new("t1".into(), "https://youtu.be/x".into(), 720, Utc::now())
    }

    fn result() -> TaskResult {
        TaskResult {
            title: "Clip".into(),
            duration: "3:32".into(),
            quality: "720p".into(),
            size: "1.0 MB".into(),
            file_path: PathBuf::from("downloads/t1/Clip.mp4"),
        }
    }

    #[test]
    fn test_new_record_is_queued() {
        let record = record();
        assert_eq!(record.status, TaskStatus::Queued);
        assert_eq!(record.progress, 0);
        assert!(record.completed_at.is_none());
    }

    #[test]
    fn test_start_only_from_queued() {
        let mut record = record();
        assert!(record.start());
        assert_eq!(record.status, TaskStatus::Processing);
        assert_eq!(record.progress, checkpoint::DISPATCHED);
        assert!(!record.start());
    }

    #[test]
    fn test_progress_is_monotonic() {
        let mut record = record();
        record.advance_progress(50);
        assert_eq!(record.progress, 0);

        record.start();
        record.advance_progress(checkpoint::FETCHED);
        record.advance_progress(checkpoint::PLANNED);
        assert_eq!(record.progress, checkpoint::FETCHED);
    }

    #[test]
    fn test_complete_sets_terminal_fields() {
        let mut record = record();
        record.start();
        let now = Utc::now();
        record.complete(result(), now);

        assert_eq!(record.status, TaskStatus::Completed);
        assert_eq!(record.progress, 100);
        assert_eq!(record.completed_at, Some(now));
        assert!(record.result.is_some());
    }

    #[test]
    fn test_fail_keeps_progress_and_is_final() {
        let mut record = record();
        record.start();
        record.advance_progress(checkpoint::PLANNED);
        let now = Utc::now();
        record.fail("boom", now);

        assert_eq!(record.status, TaskStatus::Error);
        assert_eq!(record.progress, checkpoint::PLANNED);
        assert_eq!(record.error_message.as_deref(), Some("boom"));
        assert_eq!(record.completed_at, Some(now));

        record.complete(result(), Utc::now());
        assert_eq!(record.status, TaskStatus::Error);
        assert!(record.result.is_none());
    }

    #[test]
    fn test_is_expired() {
        let mut record = record();
        let now = Utc::now();
        assert!(!record.is_expired(now + Duration::days(1), Duration::hours(2)));

        record.start();
        record.fail("boom", now);
        assert!(!record.is_expired(now + Duration::hours(2), Duration::hours(2)));
        assert!(record.is_expired(now + Duration::hours(3), Duration::hours(2)));
    }
}
