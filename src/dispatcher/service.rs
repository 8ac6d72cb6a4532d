//! Grid Service Abstraction
//!
//! The six remote operations as a trait, so workers and the client
//! orchestrator run unchanged against the in-process `Scheduler` or against
//! a dispatcher reached over HTTP (`client::remote::SchedulerClient`).

use super::jobs::ANONYMOUS;
use super::protocol::*;
use super::scheduler::Scheduler;
use super::types::*;
use crate::error::SchedulerError;

use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait GridService: Send + Sync {
    async fn status(&self, deadline: Duration) -> Result<ServerStatus, SchedulerError>;

    async fn submit_task(
        &self,
        request: TaskRequest,
        deadline: Duration,
    ) -> Result<SubmitTaskResponse, SchedulerError>;

    async fn register_worker(
        &self,
        hostname: &str,
        core_count: u32,
    ) -> Result<RegisterWorkerResponse, SchedulerError>;

    /// `Ok(None)` when nothing is queued.
    async fn request_task(&self, worker_id: &WorkerId) -> Result<Option<Task>, SchedulerError>;

    /// Returns whether the dispatcher had a pending slot for the result.
    async fn submit_result(&self, result: TaskResult) -> Result<bool, SchedulerError>;

    /// Blocks until the task is resolved or `deadline` elapses.
    async fn stream_result(
        &self,
        task_id: &TaskId,
        deadline: Duration,
    ) -> Result<TaskResult, SchedulerError>;
}

#[async_trait]
impl GridService for Scheduler {
    async fn status(&self, _deadline: Duration) -> Result<ServerStatus, SchedulerError> {
        Ok(Scheduler::status(self))
    }

    async fn submit_task(
        &self,
        request: TaskRequest,
        _deadline: Duration,
    ) -> Result<SubmitTaskResponse, SchedulerError> {
        self.submit(request, ANONYMOUS)
    }

    async fn register_worker(
        &self,
        hostname: &str,
        core_count: u32,
    ) -> Result<RegisterWorkerResponse, SchedulerError> {
        let worker = Scheduler::register_worker(self, hostname, core_count);
        Ok(RegisterWorkerResponse {
            worker_id: worker.id,
            authorized: worker.authorized,
        })
    }

    async fn request_task(&self, worker_id: &WorkerId) -> Result<Option<Task>, SchedulerError> {
        self.poll(worker_id)
    }

    async fn submit_result(&self, result: TaskResult) -> Result<bool, SchedulerError> {
        Scheduler::submit_result(self, result)
    }

    async fn stream_result(
        &self,
        task_id: &TaskId,
        deadline: Duration,
    ) -> Result<TaskResult, SchedulerError> {
        self.await_result(task_id, deadline).await
    }
}
