use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a task.
///
/// Either supplied by the client (e.g. `mandelbrot-3-<uuid>`) or generated
/// at submission time from a UUID v4.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct TaskId(pub String);

impl TaskId {
    /// Generates a new random UUID v4-based TaskId.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier handed out by the `WorkerRegistry`. Random, never sequential.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct WorkerId(pub String);

impl WorkerId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for WorkerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Dequeue ordering attribute. Declaration order is the ordering:
/// `Low < Normal < High < Critical`.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

/// Status reported back to a submitting client and stored in job records.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Accepted and waiting in the queue (or executing on a worker).
    Queued,
    Completed,
    Failed,
}

/// What a client sends to `SubmitTask`. The id is optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRequest {
    #[serde(default)]
    pub task_id: Option<String>,
    pub task_type: String,
    pub payload: Vec<u8>,
    #[serde(default)]
    pub priority: Priority,
}

impl TaskRequest {
    pub fn new(task_type: impl Into<String>, payload: Vec<u8>, priority: Priority) -> Self {
        Self {
            task_id: None,
            task_type: task_type.into(),
            payload,
            priority,
        }
    }

    pub fn with_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }
}

/// The unit of work handed to a worker.
///
/// Immutable after submission. The payload is an opaque blob the scheduler
/// never looks into; `task_type` tells the worker which handler decodes it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: TaskId,
    pub task_type: String,
    pub payload: Vec<u8>,
    pub priority: Priority,
    /// Wall clock (ms) at submission, informational only. Queue ordering uses
    /// a monotonic stamp kept inside the queue.
    pub submitted_at: u64,
}

/// Outcome of a task as reported by the worker that executed it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultStatus {
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskResult {
    pub task_id: TaskId,
    pub status: ResultStatus,
    /// Output blob when `Completed`, empty otherwise.
    #[serde(default)]
    pub payload: Vec<u8>,
    #[serde(default)]
    pub error_message: Option<String>,
    /// 0-100, informational.
    #[serde(default)]
    pub progress: u8,
}

impl TaskResult {
    pub fn completed(task_id: TaskId, payload: Vec<u8>) -> Self {
        Self {
            task_id,
            status: ResultStatus::Completed,
            payload,
            error_message: None,
            progress: 100,
        }
    }

    pub fn failed(task_id: TaskId, error: impl Into<String>) -> Self {
        Self {
            task_id,
            status: ResultStatus::Failed,
            payload: Vec::new(),
            error_message: Some(error.into()),
            progress: 100,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == ResultStatus::Completed
    }
}

/// A registered worker process.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Worker {
    pub id: WorkerId,
    pub hostname: String,
    pub core_count: u32,
    pub authorized: bool,
    pub registered_at: u64,
}

/// Helper to get the current system time in milliseconds.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
