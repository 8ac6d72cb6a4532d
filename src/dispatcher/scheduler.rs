//! Scheduler
//!
//! The one object owning all mutable scheduling state: the priority queue,
//! the worker registry, the result broker and the job store handle. It is
//! built once in `main` and shared as `Arc<Scheduler>` with every handler.
//!
//! ## Flow
//! 1. **Submit**: validate, reserve a broker slot, enqueue, record the job.
//! 2. **Poll**: check the worker is authorized, pop the head of the queue.
//! 3. **Result**: resolve the broker slot, count completions, record the job.
//! 4. **Await**: the client waits on the broker slot under its deadline.

use super::broker::ResultBroker;
use super::jobs::{InMemoryJobStore, JobRecord, JobStore};
use super::protocol::{ServerStatus, SubmitTaskResponse};
use super::queue::TaskQueue;
use super::registry::WorkerRegistry;
use super::types::*;
use crate::error::SchedulerError;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Cap on a single StreamResult wait unless configured otherwise.
pub const DEFAULT_MAX_STREAM_WAIT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// `None` keeps the queue unbounded.
    pub max_queued: Option<usize>,
    /// Upper bound applied to deadlines requested by StreamResult callers.
    pub max_stream_wait: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_queued: None,
            max_stream_wait: DEFAULT_MAX_STREAM_WAIT,
        }
    }
}

pub struct Scheduler {
    queue: TaskQueue,
    workers: WorkerRegistry,
    broker: ResultBroker,
    jobs: Arc<dyn JobStore>,
    total_completed: AtomicU64,
    config: SchedulerConfig,
}

impl Scheduler {
    /// Creates a scheduler backed by an in-memory job store.
    pub fn new(config: SchedulerConfig) -> Arc<Self> {
        Self::with_job_store(config, Arc::new(InMemoryJobStore::new()))
    }

    pub fn with_job_store(config: SchedulerConfig, jobs: Arc<dyn JobStore>) -> Arc<Self> {
        Arc::new(Self {
            queue: TaskQueue::with_capacity(config.max_queued),
            workers: WorkerRegistry::new(),
            broker: ResultBroker::new(),
            jobs,
            total_completed: AtomicU64::new(0),
            config,
        })
    }

    /// Accepts a task into the queue.
    ///
    /// Rejects empty type tags, empty payloads, empty ids and ids already in
    /// use. The job record write is best-effort.
    pub fn submit(
        &self,
        request: TaskRequest,
        owner_id: &str,
    ) -> Result<SubmitTaskResponse, SchedulerError> {
        if request.task_type.trim().is_empty() {
            return Err(SchedulerError::Validation("task_type is required".into()));
        }
        if request.payload.is_empty() {
            return Err(SchedulerError::Validation("payload is required".into()));
        }

        let task_id = match request.task_id {
            Some(id) if id.trim().is_empty() => {
                return Err(SchedulerError::Validation("task_id must not be blank".into()));
            }
            Some(id) => TaskId(id),
            None => TaskId::new(),
        };

        let task = Task {
            id: task_id.clone(),
            task_type: request.task_type,
            payload: request.payload,
            priority: request.priority,
            submitted_at: now_ms(),
        };

        // Reserve the slot first: it doubles as the uniqueness check.
        self.broker.create_pending(&task_id)?;

        let record = JobRecord {
            task_id: task_id.clone(),
            task_type: task.task_type.clone(),
            status: TaskStatus::Queued,
            owner_id: owner_id.to_string(),
            priority: task.priority,
            submitted_at: task.submitted_at,
            completed_at: None,
        };
        let priority = task.priority;

        if let Err(e) = self.queue.push(task) {
            self.broker.discard(&task_id);
            tracing::warn!("Rejected task {}: {}", task_id.0, e);
            return Err(e);
        }

        if let Err(e) = self.jobs.record_submitted(record) {
            tracing::warn!("Job store write failed for task {}: {}", task_id.0, e);
        }

        tracing::debug!(
            "Queued task {} (priority {:?}, owner {})",
            task_id.0,
            priority,
            owner_id
        );

        Ok(SubmitTaskResponse {
            task_id,
            status: TaskStatus::Queued,
            message: format!("Task queued ({} waiting)", self.queue.len()),
        })
    }

    pub fn register_worker(&self, hostname: &str, core_count: u32) -> Worker {
        self.workers.register(hostname, core_count)
    }

    /// Hands the head of the queue to an authorized worker.
    ///
    /// `Ok(None)` means the queue is empty. An unauthorized worker gets
    /// `PermissionDenied` and the queue is not touched.
    pub fn poll(&self, worker_id: &WorkerId) -> Result<Option<Task>, SchedulerError> {
        if !self.workers.is_authorized(worker_id) {
            tracing::warn!("Rejected poll from unknown worker {}", worker_id.0);
            return Err(SchedulerError::PermissionDenied(worker_id.0.clone()));
        }

        let task = self.queue.pop();

        if let Some(task) = &task {
            tracing::debug!("Dispatched task {} to worker {}", task.id.0, worker_id.0);
        }

        Ok(task)
    }

    /// Records a worker's result.
    ///
    /// Returns whether a pending slot took the result. Results for unknown or
    /// consumed ids are dropped and not counted as completions, but the job
    /// record update is still attempted.
    pub fn submit_result(&self, result: TaskResult) -> Result<bool, SchedulerError> {
        if result.task_id.0.trim().is_empty() {
            return Err(SchedulerError::Validation("task_id is required".into()));
        }

        let task_id = result.task_id.clone();
        let status = match result.status {
            ResultStatus::Completed => TaskStatus::Completed,
            ResultStatus::Failed => TaskStatus::Failed,
        };

        if status == TaskStatus::Failed {
            tracing::warn!(
                "Task {} failed on worker: {}",
                task_id.0,
                result.error_message.as_deref().unwrap_or("unknown error")
            );
        }

        let accepted = self.broker.resolve(result);

        // Only the report that resolves the slot counts.
        if accepted && status == TaskStatus::Completed {
            self.total_completed.fetch_add(1, Ordering::SeqCst);
        }

        if let Err(e) = self.jobs.record_finished(&task_id, status, now_ms()) {
            tracing::warn!("Job store update failed for task {}: {}", task_id.0, e);
        }

        Ok(accepted)
    }

    /// Waits for the result of `task_id`, capped at `max_stream_wait`.
    pub async fn await_result(
        &self,
        task_id: &TaskId,
        deadline: Duration,
    ) -> Result<TaskResult, SchedulerError> {
        let deadline = deadline.min(self.config.max_stream_wait);
        self.broker.await_and_consume(task_id, deadline).await
    }

    pub fn status(&self) -> ServerStatus {
        ServerStatus {
            active_workers: self.workers.active_count(),
            queued_tasks: self.queue.len(),
            total_completed: self.total_completed.load(Ordering::SeqCst),
        }
    }

    pub fn queue(&self) -> &TaskQueue {
        &self.queue
    }

    pub fn workers(&self) -> &WorkerRegistry {
        &self.workers
    }

    pub fn broker(&self) -> &ResultBroker {
        &self.broker
    }

    pub fn jobs(&self) -> &Arc<dyn JobStore> {
        &self.jobs
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }
}
