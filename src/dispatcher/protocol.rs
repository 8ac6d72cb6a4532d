//! Network Protocol Definitions
//!
//! Defines the Data Transfer Objects (DTOs) exchanged between the dispatcher,
//! workers and clients over HTTP, plus the endpoint paths.

use super::types::*;
use serde::{Deserialize, Serialize};

pub const ENDPOINT_STATUS: &str = "/status";
pub const ENDPOINT_SUBMIT_TASK: &str = "/task/submit";
pub const ENDPOINT_SUBMIT_RESULT: &str = "/task/result";
/// Followed by `/{task_id}?timeout_ms=N`.
pub const ENDPOINT_STREAM_RESULT: &str = "/task/result";
pub const ENDPOINT_REGISTER_WORKER: &str = "/worker/register";
pub const ENDPOINT_REQUEST_TASK: &str = "/worker/request_task";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerStatus {
    pub active_workers: usize,
    pub queued_tasks: usize,
    pub total_completed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitTaskResponse {
    pub task_id: TaskId,
    pub status: TaskStatus,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterWorkerRequest {
    pub hostname: String,
    pub core_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterWorkerResponse {
    pub worker_id: WorkerId,
    pub authorized: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestTaskRequest {
    pub worker_id: WorkerId,
}

/// `task` is `None` when the queue had nothing ready.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestTaskResponse {
    pub task: Option<Task>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResultResponse {
    /// `false` when no pending slot existed for the task.
    pub accepted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamResultQuery {
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub detail: String,
}
