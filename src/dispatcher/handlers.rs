use super::jobs::caller_identity;
use super::protocol::*;
use super::scheduler::Scheduler;
use super::types::*;
use crate::error::SchedulerError;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use std::sync::Arc;
use std::time::Duration;

/// Builds the dispatcher's HTTP surface around a shared scheduler.
pub fn router(scheduler: Arc<Scheduler>) -> Router {
    Router::new()
        .route(ENDPOINT_STATUS, get(handle_get_status))
        .route(ENDPOINT_SUBMIT_TASK, post(handle_submit_task))
        .route(ENDPOINT_SUBMIT_RESULT, post(handle_submit_result))
        .route(
            &format!("{}/:task_id", ENDPOINT_STREAM_RESULT),
            get(handle_stream_result),
        )
        .route(ENDPOINT_REGISTER_WORKER, post(handle_register_worker))
        .route(ENDPOINT_REQUEST_TASK, post(handle_request_task))
        .layer(Extension(scheduler))
}

pub async fn handle_get_status(
    Extension(scheduler): Extension<Arc<Scheduler>>,
) -> (StatusCode, Json<ServerStatus>) {
    (StatusCode::OK, Json(scheduler.status()))
}

pub async fn handle_submit_task(
    Extension(scheduler): Extension<Arc<Scheduler>>,
    headers: HeaderMap,
    body: Result<Json<TaskRequest>, JsonRejection>,
) -> Result<Json<SubmitTaskResponse>, SchedulerError> {
    let Json(req) = body?;
    let owner = caller_identity(&headers);

    match scheduler.submit(req, &owner) {
        Ok(response) => {
            tracing::info!("Task submitted successfully: {}", response.task_id.0);
            Ok(Json(response))
        }
        Err(e) => {
            tracing::error!("Failed to submit task: {}", e);
            Err(e)
        }
    }
}

pub async fn handle_register_worker(
    Extension(scheduler): Extension<Arc<Scheduler>>,
    body: Result<Json<RegisterWorkerRequest>, JsonRejection>,
) -> Result<Json<RegisterWorkerResponse>, SchedulerError> {
    let Json(req) = body?;
    let worker = scheduler.register_worker(&req.hostname, req.core_count);

    Ok(Json(RegisterWorkerResponse {
        worker_id: worker.id,
        authorized: worker.authorized,
    }))
}

pub async fn handle_request_task(
    Extension(scheduler): Extension<Arc<Scheduler>>,
    body: Result<Json<RequestTaskRequest>, JsonRejection>,
) -> Result<Json<RequestTaskResponse>, SchedulerError> {
    let Json(req) = body?;
    let task = scheduler.poll(&req.worker_id)?;
    Ok(Json(RequestTaskResponse { task }))
}

pub async fn handle_submit_result(
    Extension(scheduler): Extension<Arc<Scheduler>>,
    body: Result<Json<TaskResult>, JsonRejection>,
) -> Result<Json<SubmitResultResponse>, SchedulerError> {
    let Json(result) = body?;
    tracing::debug!(
        "Received result for task {} ({:?})",
        result.task_id.0,
        result.status
    );

    let accepted = scheduler.submit_result(result)?;
    Ok(Json(SubmitResultResponse { accepted }))
}

/// Long-poll for a task's result.
///
/// If the client disconnects, axum drops this future and with it the broker
/// wait; the slot itself stays untouched.
pub async fn handle_stream_result(
    Extension(scheduler): Extension<Arc<Scheduler>>,
    Path(task_id_str): Path<String>,
    Query(query): Query<StreamResultQuery>,
) -> Result<Json<TaskResult>, SchedulerError> {
    let task_id = TaskId(task_id_str);
    let deadline = query
        .timeout_ms
        .map(Duration::from_millis)
        .unwrap_or(scheduler.config().max_stream_wait);

    match scheduler.await_result(&task_id, deadline).await {
        Ok(result) => {
            tracing::debug!("Streamed result for task {}", task_id.0);
            Ok(Json(result))
        }
        Err(e) => {
            tracing::debug!("Result stream for task {} ended: {}", task_id.0, e);
            Err(e)
        }
    }
}
