//! HTTP Dispatcher Client
//!
//! `GridService` over HTTP. Every call carries its own deadline, enforced as
//! the reqwest request timeout. Idempotent calls (status, registration,
//! result submission) are retried with jittered backoff; submit and poll are
//! sent once, since a retry could enqueue twice or drop a dequeued task.

use crate::dispatcher::protocol::*;
use crate::dispatcher::service::GridService;
use crate::dispatcher::types::*;
use crate::error::SchedulerError;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Deadline for calls that do not take one from the caller.
pub const DEFAULT_CALL_DEADLINE: Duration = Duration::from_secs(5);

/// Extra time granted to the HTTP request on top of a StreamResult deadline,
/// so the server's own timeout response arrives first.
const STREAM_SLACK: Duration = Duration::from_millis(500);

const RETRY_ATTEMPTS: usize = 3;

#[derive(Clone)]
pub struct SchedulerClient {
    base_url: String,
    http_client: reqwest::Client,
    /// Sent as `x-user-id` on submissions when set.
    user_id: Option<String>,
}

impl SchedulerClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client: reqwest::Client::new(),
            user_id: None,
        }
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Turns a non-success response into the matching `SchedulerError`.
    async fn decode<T: DeserializeOwned>(
        response: reqwest::Response,
        deadline: Duration,
    ) -> Result<T, SchedulerError> {
        let status = response.status();

        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| transport_error(e, deadline));
        }

        let text = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorResponse>(&text)
            .map(|body| body.detail)
            .unwrap_or(text);

        // reqwest and axum share the `http` crate's StatusCode.
        Err(SchedulerError::from_status(status, detail, deadline))
    }

    // --- HTTP Helpers with Backoff ---

    async fn post_with_retry<T: Serialize>(
        &self,
        url: String,
        payload: &T,
        timeout: Duration,
        attempts: usize,
    ) -> Result<reqwest::Response, SchedulerError> {
        let mut delay_ms = 150u64;

        for attempt in 0..attempts {
            let response = self
                .http_client
                .post(url.clone())
                .json(payload)
                .timeout(timeout)
                .send()
                .await;

            match response {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    if attempt + 1 == attempts || e.is_timeout() {
                        return Err(transport_error(e, timeout));
                    }
                    // Simple jitter to prevent thundering herd
                    let jitter = rand::random::<u64>() % 50;
                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms = (delay_ms * 2).min(1200);
                }
            }
        }

        Err(SchedulerError::Transport("Retry attempts exhausted".into()))
    }

    async fn get_with_retry(
        &self,
        url: String,
        timeout: Duration,
        attempts: usize,
    ) -> Result<reqwest::Response, SchedulerError> {
        let mut delay_ms = 150u64;

        for attempt in 0..attempts {
            let response = self
                .http_client
                .get(url.clone())
                .timeout(timeout)
                .send()
                .await;

            match response {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    if attempt + 1 == attempts || e.is_timeout() {
                        return Err(transport_error(e, timeout));
                    }
                    let jitter = rand::random::<u64>() % 50;
                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms = (delay_ms * 2).min(1200);
                }
            }
        }

        Err(SchedulerError::Transport("Retry attempts exhausted".into()))
    }
}

fn transport_error(e: reqwest::Error, deadline: Duration) -> SchedulerError {
    if e.is_timeout() {
        SchedulerError::Timeout(deadline)
    } else if e.is_decode() {
        SchedulerError::Serialization(e.to_string())
    } else {
        SchedulerError::Transport(e.to_string())
    }
}

#[async_trait]
impl GridService for SchedulerClient {
    async fn status(&self, deadline: Duration) -> Result<ServerStatus, SchedulerError> {
        let response = self
            .get_with_retry(self.url(ENDPOINT_STATUS), deadline, RETRY_ATTEMPTS)
            .await?;
        Self::decode(response, deadline).await
    }

    async fn submit_task(
        &self,
        request: TaskRequest,
        deadline: Duration,
    ) -> Result<SubmitTaskResponse, SchedulerError> {
        let mut builder = self
            .http_client
            .post(self.url(ENDPOINT_SUBMIT_TASK))
            .json(&request)
            .timeout(deadline);

        if let Some(user_id) = &self.user_id {
            builder = builder.header(crate::dispatcher::jobs::USER_ID_HEADER, user_id);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| transport_error(e, deadline))?;
        Self::decode(response, deadline).await
    }

    async fn register_worker(
        &self,
        hostname: &str,
        core_count: u32,
    ) -> Result<RegisterWorkerResponse, SchedulerError> {
        let payload = RegisterWorkerRequest {
            hostname: hostname.to_string(),
            core_count,
        };
        let response = self
            .post_with_retry(
                self.url(ENDPOINT_REGISTER_WORKER),
                &payload,
                DEFAULT_CALL_DEADLINE,
                RETRY_ATTEMPTS,
            )
            .await?;
        Self::decode(response, DEFAULT_CALL_DEADLINE).await
    }

    async fn request_task(&self, worker_id: &WorkerId) -> Result<Option<Task>, SchedulerError> {
        let payload = RequestTaskRequest {
            worker_id: worker_id.clone(),
        };
        let response = self
            .post_with_retry(
                self.url(ENDPOINT_REQUEST_TASK),
                &payload,
                DEFAULT_CALL_DEADLINE,
                1,
            )
            .await?;
        let body: RequestTaskResponse = Self::decode(response, DEFAULT_CALL_DEADLINE).await?;
        Ok(body.task)
    }

    async fn submit_result(&self, result: TaskResult) -> Result<bool, SchedulerError> {
        let response = self
            .post_with_retry(
                self.url(ENDPOINT_SUBMIT_RESULT),
                &result,
                DEFAULT_CALL_DEADLINE,
                RETRY_ATTEMPTS,
            )
            .await?;
        let body: SubmitResultResponse = Self::decode(response, DEFAULT_CALL_DEADLINE).await?;
        Ok(body.accepted)
    }

    async fn stream_result(
        &self,
        task_id: &TaskId,
        deadline: Duration,
    ) -> Result<TaskResult, SchedulerError> {
        let url = format!(
            "{}/{}?timeout_ms={}",
            self.url(ENDPOINT_STREAM_RESULT),
            task_id.0,
            deadline.as_millis()
        );

        let response = self
            .http_client
            .get(url)
            .timeout(deadline + STREAM_SLACK)
            .send()
            .await
            .map_err(|e| transport_error(e, deadline))?;
        Self::decode(response, deadline).await
    }
}
