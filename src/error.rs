//! Scheduler Error Taxonomy
//!
//! Every failure the dispatcher, the broker or the remote client can report.
//! Each variant maps onto one HTTP status so the error survives the round trip
//! between `handlers` (server side) and `SchedulerClient` (client side).

use crate::dispatcher::protocol::ErrorResponse;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Malformed task or result at submission time.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The worker id is unknown to the `WorkerRegistry`.
    #[error("worker {0} is not authorized")]
    PermissionDenied(String),

    /// Unknown or already consumed task id.
    #[error("no pending result for task {0}")]
    NotFound(String),

    /// The caller's deadline elapsed before the operation completed.
    #[error("deadline of {0:?} exceeded")]
    Timeout(Duration),

    /// The bounded queue refused the task.
    #[error("task queue is full: {0}")]
    QueueFull(String),

    /// Payload or wire body could not be encoded/decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The worker reported the task as FAILED.
    #[error("task failed on worker: {0}")]
    TaskFailed(String),

    /// Connection level failure talking to the dispatcher.
    #[error("transport error: {0}")]
    Transport(String),
}

impl SchedulerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            SchedulerError::Validation(_) => StatusCode::BAD_REQUEST,
            SchedulerError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            SchedulerError::NotFound(_) => StatusCode::NOT_FOUND,
            SchedulerError::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            SchedulerError::QueueFull(_) => StatusCode::SERVICE_UNAVAILABLE,
            SchedulerError::Serialization(_) => StatusCode::UNPROCESSABLE_ENTITY,
            SchedulerError::TaskFailed(_) | SchedulerError::Transport(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// The variant's inner message, without the display prefix.
    pub fn detail(&self) -> String {
        match self {
            SchedulerError::Validation(s)
            | SchedulerError::PermissionDenied(s)
            | SchedulerError::NotFound(s)
            | SchedulerError::QueueFull(s)
            | SchedulerError::Serialization(s)
            | SchedulerError::TaskFailed(s)
            | SchedulerError::Transport(s) => s.clone(),
            SchedulerError::Timeout(d) => d.as_millis().to_string(),
        }
    }

    /// Rebuilds an error from an HTTP status received by the client.
    ///
    /// `deadline` is the caller's own deadline, used for timeout statuses.
    pub fn from_status(status: StatusCode, detail: String, deadline: Duration) -> Self {
        match status {
            StatusCode::BAD_REQUEST => SchedulerError::Validation(detail),
            StatusCode::FORBIDDEN => SchedulerError::PermissionDenied(detail),
            StatusCode::NOT_FOUND => SchedulerError::NotFound(detail),
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
                SchedulerError::Timeout(deadline)
            }
            StatusCode::SERVICE_UNAVAILABLE => SchedulerError::QueueFull(detail),
            StatusCode::UNPROCESSABLE_ENTITY => SchedulerError::Serialization(detail),
            other => SchedulerError::Transport(format!("HTTP {}: {}", other, detail)),
        }
    }
}

impl From<bincode::Error> for SchedulerError {
    fn from(e: bincode::Error) -> Self {
        SchedulerError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for SchedulerError {
    fn from(e: serde_json::Error) -> Self {
        SchedulerError::Serialization(e.to_string())
    }
}

/// A request body that does not parse is a malformed request, whatever the
/// reason (missing field, wrong type, bad JSON, wrong content type).
impl From<JsonRejection> for SchedulerError {
    fn from(rejection: JsonRejection) -> Self {
        SchedulerError::Validation(rejection.body_text())
    }
}

impl IntoResponse for SchedulerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.to_string(),
            detail: self.detail(),
        };
        (status, Json(body)).into_response()
    }
}
