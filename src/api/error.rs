use axum::{Json, http::StatusCode, response::IntoResponse};
use thiserror::Error;

use super::models::ErrorResponse;
use crate::ledger::TaskStatus;
use crate::queue::SchedulerError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("payload invalid: {0}")]
    InvalidPayload(String),
    #[error("payload exceeds limit of {0} bytes")]
    PayloadTooLarge(usize),
    #[error("queue is full ({0} tasks pending), try again later")]
    QueueFull(usize),
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("video is not ready yet, status: {0}")]
    NotReady(TaskStatus),
    #[error("file not found: {0}")]
    ArtifactMissing(String),
    #[error("task {0} is being processed and cannot be cancelled")]
    TaskBusy(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidPayload(_) | ApiError::NotReady(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::QueueFull(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::NotFound(_) | ApiError::ArtifactMissing(_) => StatusCode::NOT_FOUND,
            ApiError::TaskBusy(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidPayload(_) => "INVALID_PAYLOAD",
            ApiError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ApiError::QueueFull(_) => "QUEUE_FULL",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::NotReady(_) => "NOT_READY",
            ApiError::ArtifactMissing(_) => "FILE_NOT_FOUND",
            ApiError::TaskBusy(_) => "TASK_BUSY",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = ErrorResponse {
            code: self.code(),
            error: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(value: serde_json::Error) -> Self {
        ApiError::InvalidPayload(value.to_string())
    }
}

impl From<SchedulerError> for ApiError {
    fn from(value: SchedulerError) -> Self {
        match value {
            SchedulerError::QueueFull { capacity } => ApiError::QueueFull(capacity),
            SchedulerError::NotFound(id) => ApiError::NotFound(format!("task {id}")),
            SchedulerError::TaskBusy(id) => ApiError::TaskBusy(id),
            e @ SchedulerError::Filesystem { .. } => ApiError::Internal(e.to_string()),
            SchedulerError::Ledger(e) => ApiError::Internal(e.to_string()),
        }
    }
}
