//! Request and response bodies of the HTTP surface.
//!
//! - `POST /api/download` accepts a [`DownloadRequest`] and answers with a [`SubmitResponse`]
//! - `GET /api/status/{task_id}` returns a [`StatusResponse`]
//! - `GET /api/queue` returns a [`QueueResponse`]
//! - Every failure is an [`ErrorResponse`]

use std::collections::BTreeMap;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ledger::{TaskResult, TaskStatus};
use crate::observability::MetricsSnapshot;
use crate::queue::{QueueOverview, TaskView};

pub const QUEUED_MESSAGE: &str = "Task added to queue";
pub const CANCELLED_MESSAGE: &str = "Task cancelled";

/// `quality` stays untyped here so both `1080` and `"1080"` are accepted;
/// see [`super::validation::parse_quality`].
#[derive(Debug, Deserialize, Clone, Default)]
pub struct DownloadRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub quality: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SubmitResponse {
    pub task_id: String,
    pub status: TaskStatus,
    pub queue_position: usize,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct VideoInfo {
    pub title: String,
    pub duration: String,
    pub quality: String,
    pub size: String,
}

impl From<&TaskResult> for VideoInfo {
    fn from(result: &TaskResult) -> Self {
        Self {
            title: result.title.clone(),
            duration: result.duration.clone(),
            quality: result.quality.clone(),
            size: result.size.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StatusResponse {
    pub task_id: String,
    pub status: TaskStatus,
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_position: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_info: Option<VideoInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<TaskView> for StatusResponse {
    fn from(view: TaskView) -> Self {
        let record = view.record;
        let video_info = match record.status {
            TaskStatus::Completed => record.result.as_ref().map(VideoInfo::from),
            _ => None,
        };
        let error = match record.status {
            TaskStatus::Error => Some(
                record
                    .error_message
                    .unwrap_or_else(|| "Unknown error".to_string()),
            ),
            _ => None,
        };

        Self {
            task_id: record.id,
            status: record.status,
            progress: record.progress,
            queue_position: view.queue_position,
            video_info,
            error,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct QueueResponse {
    pub queue_size: usize,
    pub max_queue_size: usize,
    pub processing_task: Option<String>,
    pub total_tasks: usize,
    pub queue: Vec<String>,
}

impl From<QueueOverview> for QueueResponse {
    fn from(overview: QueueOverview) -> Self {
        Self {
            queue_size: overview.queue_size,
            max_queue_size: overview.max_queue_size,
            processing_task: overview.processing_task,
            total_tasks: overview.total_tasks,
            queue: overview.queue,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub message: &'static str,
    pub version: &'static str,
    pub endpoints: BTreeMap<&'static str, &'static str>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: HashMap<String, String>,
    pub version: String,
    pub metrics: MetricsSnapshot,
}
