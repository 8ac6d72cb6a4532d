//! Worker Pool Implementation
//!
//! Drives the worker side of the grid. Registers once with the dispatcher,
//! then spawns loops that continuously poll for tasks, execute them through
//! the `TaskHandlerRegistry` and post the results back.
//!
//! ## Responsibilities
//! - **Registration**: obtaining an authorized worker id.
//! - **Polling**: pulling the next task, sleeping while the queue is empty.
//! - **Execution**: invoking the handler registered for the task type.
//! - **Reporting**: submitting a `COMPLETED` or `FAILED` result.

use super::registry::TaskHandlerRegistry;
use crate::dispatcher::service::GridService;
use crate::dispatcher::types::*;
use crate::error::SchedulerError;

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

/// Longest pause between polls after repeated transport errors.
const MAX_ERROR_BACKOFF: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Reported to the dispatcher at registration.
    pub hostname: String,
    /// Number of concurrent poll loops (and advertised core count).
    pub worker_count: usize,
    /// Sleep between polls when the queue is empty.
    pub poll_interval: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            hostname: "localhost".to_string(),
            worker_count: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// The engine that drives task execution on a worker host.
pub struct TaskExecutor {
    /// Dispatcher handle (in-process or over HTTP).
    service: Arc<dyn GridService>,
    /// Registry containing the actual code (closures) for tasks.
    handlers: Arc<TaskHandlerRegistry>,
    config: ExecutorConfig,
}

impl TaskExecutor {
    pub fn new(
        service: Arc<dyn GridService>,
        handlers: Arc<TaskHandlerRegistry>,
        config: ExecutorConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            service,
            handlers,
            config,
        })
    }

    /// Registers this host as a single worker.
    pub async fn register(&self) -> Result<WorkerId> {
        let response = self
            .service
            .register_worker(&self.config.hostname, self.config.worker_count as u32)
            .await?;

        if !response.authorized {
            anyhow::bail!("Dispatcher refused to authorize worker {}", response.worker_id.0);
        }

        tracing::info!(
            "Registered as worker {} on {}",
            response.worker_id.0,
            self.config.hostname
        );

        Ok(response.worker_id)
    }

    /// Registers, then spawns the poll loops and returns their handles.
    /// All loops share the one worker id.
    pub async fn start(self: Arc<Self>) -> Result<Vec<tokio::task::JoinHandle<()>>> {
        let worker_id = self.register().await?;

        tracing::info!("Starting {} task loops", self.config.worker_count);

        let handles = (0..self.config.worker_count.max(1))
            .map(|slot| {
                let executor = self.clone();
                let worker_id = worker_id.clone();
                tokio::spawn(async move {
                    executor.worker_loop(worker_id, slot).await;
                })
            })
            .collect();

        tracing::info!(
            "Task executor started with {} loops, handlers: {:?}",
            self.config.worker_count,
            self.handlers.list_handlers()
        );

        Ok(handles)
    }

    /// The main loop for a single poll slot.
    ///
    /// 1. Requests the next task.
    /// 2. Sleeps when nothing is queued, backs off on transport errors.
    /// 3. Stops if the dispatcher no longer recognises the worker id.
    async fn worker_loop(&self, worker_id: WorkerId, slot: usize) {
        tracing::info!("Worker loop {} started", slot);

        let mut error_backoff = self.config.poll_interval;

        loop {
            match self.run_once(&worker_id).await {
                Ok(true) => {
                    error_backoff = self.config.poll_interval;
                }
                Ok(false) => {
                    // Sleep if no work to avoid busy-waiting
                    tokio::time::sleep(self.config.poll_interval).await;
                }
                Err(SchedulerError::PermissionDenied(id)) => {
                    tracing::error!(
                        "Worker {} is no longer authorized, stopping loop {}",
                        id,
                        slot
                    );
                    return;
                }
                Err(e) => {
                    tracing::warn!("Worker loop {} poll failed: {}", slot, e);
                    tokio::time::sleep(error_backoff).await;
                    error_backoff = (error_backoff * 2).min(MAX_ERROR_BACKOFF);
                }
            }
        }
    }

    /// Polls once and, if a task came back, executes and reports it.
    ///
    /// Returns `Ok(true)` when a task was processed, `Ok(false)` when the
    /// queue was empty.
    pub async fn run_once(&self, worker_id: &WorkerId) -> Result<bool, SchedulerError> {
        let Some(task) = self.service.request_task(worker_id).await? else {
            return Ok(false);
        };

        tracing::info!(
            "Worker {} picked task {} (type: {}, priority: {:?})",
            worker_id.0,
            task.id.0,
            task.task_type,
            task.priority
        );

        let result = self.execute_task(&task).await;

        // A lost result is not retried: the client falls back on its own.
        match self.service.submit_result(result).await {
            Ok(true) => tracing::debug!("Result for task {} delivered", task.id.0),
            Ok(false) => tracing::debug!("Nobody was waiting for task {}", task.id.0),
            Err(e) => tracing::error!("Failed to submit result for task {}: {}", task.id.0, e),
        }

        Ok(true)
    }

    /// Invokes the registered closure and wraps its outcome as a `TaskResult`.
    async fn execute_task(&self, task: &Task) -> TaskResult {
        match self.handlers.execute(task).await {
            Ok(payload) => {
                tracing::info!("Task {} completed ({} bytes)", task.id.0, payload.len());
                TaskResult::completed(task.id.clone(), payload)
            }
            Err(e) => {
                tracing::error!("Task {} failed: {}", task.id.0, e);
                TaskResult::failed(task.id.clone(), e.to_string())
            }
        }
    }
}
