use std::collections::{BTreeMap, HashMap};
use std::io;

use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use super::{
    models::{
        CANCELLED_MESSAGE, DownloadRequest, HealthResponse, MessageResponse, QUEUED_MESSAGE,
        QueueResponse, ServiceInfo, StatusResponse, SubmitResponse,
    },
    state::AppState,
    utils::{content_disposition, parse_content_type},
    validation::{RequestValidationError, parse_quality, validate_url},
};
use crate::api::error::ApiError;
use crate::ledger::TaskStatus;

/// Task submission endpoint (POST /api/download)
///
/// ## Flow:
/// 1. Validate Content-Type, read the (already decompressed) body under the size limit
/// 2. Validate `url`, parse `quality` (default from config)
/// 3. Hand the task to the scheduler, which rejects it when the queue is full
/// 4. Return 202 Accepted with the task id and its 1-based queue position
pub async fn submit_download(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> Result<impl IntoResponse, ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::InvalidPayload("missing Content-Type header".into()))?;
    parse_content_type(content_type)?;

    let max_size = state.config.server.api.max_payload_bytes.as_u64() as usize;
    let body_bytes = read_body(body, max_size).await?;

    let request: DownloadRequest = serde_json::from_slice(&body_bytes)?;
    let url = validate_url(request.url.as_deref()).map_err(map_validation_error)?;
    let quality = parse_quality(
        request.quality.as_ref(),
        state.config.scheduler.default_quality,
    )
    .map_err(map_validation_error)?;

    let submitted = state.scheduler.submit(url, quality).await?;

    let response = SubmitResponse {
        task_id: submitted.task_id,
        status: TaskStatus::Queued,
        queue_position: submitted.queue_position,
        message: QUEUED_MESSAGE.to_string(),
    };

    Ok((StatusCode::ACCEPTED, Json(response)))
}

fn map_validation_error(err: RequestValidationError) -> ApiError {
    ApiError::InvalidPayload(err.to_string())
}

/// Reads request body and validates size
///
/// Decompression is handled by RequestDecompressionLayer, so the limit
/// applies to the decoded JSON. Reading stops as soon as the limit is passed.
async fn read_body(body: Body, max_size: usize) -> Result<Vec<u8>, ApiError> {
    let collected = Limited::new(body, max_size).collect().await.map_err(|err| {
        if err.downcast_ref::<LengthLimitError>().is_some() {
            ApiError::PayloadTooLarge(max_size)
        } else {
            ApiError::InvalidPayload(err.to_string())
        }
    })?;

    Ok(collected.to_bytes().to_vec())
}

/// Task status endpoint (GET /api/status/{task_id})
///
/// `queue_position` is present only while queued, `video_info` only once
/// completed, `error` only after a failure.
pub async fn task_status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state
        .scheduler
        .status(&task_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("task {task_id}")))?;

    Ok(Json(StatusResponse::from(view)))
}

/// Artifact download endpoint (GET /api/download/{task_id})
///
/// Streams the fetched file from disk as an attachment.
pub async fn download_file(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Response, ApiError> {
    let record = state
        .scheduler
        .get(&task_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("task {task_id}")))?;

    if record.status != TaskStatus::Completed {
        return Err(ApiError::NotReady(record.status));
    }

    let path = record
        .result
        .map(|result| result.file_path)
        .ok_or_else(|| ApiError::ArtifactMissing(format!("task {task_id}")))?;

    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ApiError::ArtifactMissing(path.display().to_string()));
        }
        Err(e) => return Err(ApiError::Internal(format!("Failed to open file: {e}"))),
    };
    let metadata = file
        .metadata()
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to stat file: {e}")))?;
    if !metadata.is_file() {
        return Err(ApiError::ArtifactMissing(path.display().to_string()));
    }

    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let disposition = HeaderValue::from_str(&content_disposition(&filename))
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    debug!(task_id = %task_id, file = %path.display(), bytes = metadata.len(), "Serving artifact");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, mime::APPLICATION_OCTET_STREAM.as_ref())
        .header(header::CONTENT_LENGTH, metadata.len())
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| ApiError::Internal(e.to_string()))
}

/// Task removal endpoint (DELETE /api/task/{task_id})
///
/// Queued and finished tasks are removed with their files; a task that is
/// currently processing answers 409.
pub async fn cancel_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.scheduler.cancel(&task_id).await?;
    info!(task_id = %task_id, "Task removed via API");

    Ok(Json(MessageResponse {
        message: CANCELLED_MESSAGE.to_string(),
    }))
}

/// Queue snapshot (GET /api/queue)
pub async fn queue_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(QueueResponse::from(state.scheduler.queue_overview().await))
}

/// Service metadata (GET /)
pub async fn service_info() -> impl IntoResponse {
    let endpoints = BTreeMap::from([
        ("download", "/api/download"),
        ("status", "/api/status/{task_id}"),
        ("download_file", "/api/download/{task_id}"),
        ("cancel", "/api/task/{task_id}"),
        ("queue", "/api/queue"),
        ("health", "/health"),
    ]);

    Json(ServiceInfo {
        message: "Video Downloader API",
        version: env!("CARGO_PKG_VERSION"),
        endpoints,
    })
}

/// Health check endpoint (GET /health)
///
/// Components:
/// - api: Axum HTTP server
/// - scheduler: worker loop not shut down
/// - download_dir: root download directory present
///
/// Returns 503 Service Unavailable if any component is unhealthy.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let mut components = HashMap::new();

    components.insert("api".to_string(), "healthy".to_string());

    let scheduler_status = if state.scheduler.shutdown_token().is_cancelled() {
        "stopped"
    } else {
        "healthy"
    };
    components.insert("scheduler".to_string(), scheduler_status.to_string());

    let dir_status = match tokio::fs::metadata(state.scheduler.download_dir()).await {
        Ok(meta) if meta.is_dir() => "healthy",
        _ => "missing",
    };
    components.insert("download_dir".to_string(), dir_status.to_string());

    let all_healthy = components.values().all(|status| status == "healthy");
    let (overall_status, status_code) = if all_healthy {
        ("healthy", StatusCode::OK)
    } else {
        ("unhealthy", StatusCode::SERVICE_UNAVAILABLE)
    };

    let response = HealthResponse {
        status: overall_status.to_string(),
        components,
        version: env!("CARGO_PKG_VERSION").to_string(),
        metrics: state.metrics.snapshot(),
    };

    (status_code, Json(response))
}
