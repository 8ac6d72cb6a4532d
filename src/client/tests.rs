//! Client Module Tests
//!
//! ## Test Scopes
//! - **Slicing**: row partitioning covers the image exactly.
//! - **Orchestrator**: local-only runs, fully distributed runs and fallback
//!   all produce the same image.
//! - **HTTP**: `SchedulerClient` against a live dispatcher router, including
//!   error status mapping.

#[cfg(test)]
mod tests {
    use crate::client::orchestrator::*;
    use crate::client::remote::SchedulerClient;
    use crate::dispatcher::handlers::router;
    use crate::dispatcher::protocol::*;
    use crate::dispatcher::scheduler::{Scheduler, SchedulerConfig};
    use crate::dispatcher::service::GridService;
    use crate::dispatcher::types::*;
    use crate::error::SchedulerError;
    use crate::executor::executor::{ExecutorConfig, TaskExecutor};
    use crate::executor::registry::TaskHandlerRegistry;
    use crate::mandelbrot::types::{MandelbrotParams, Viewport};
    use crate::mandelbrot::{register_handlers, MandelbrotWorkload, TASK_TYPE};

    use axum::http::StatusCode;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn image(width: usize, height: usize, max_iter: u32) -> Arc<MandelbrotWorkload> {
        Arc::new(MandelbrotWorkload::new(MandelbrotParams {
            width,
            height,
            max_iter,
            viewport: Viewport::default(),
        }))
    }

    fn fast_config() -> OrchestratorConfig {
        OrchestratorConfig {
            submit_deadline: Duration::from_secs(2),
            result_deadline: Duration::from_secs(10),
            status_check_deadline: Duration::from_secs(1),
            ..OrchestratorConfig::default()
        }
    }

    fn worker_config(worker_count: usize) -> ExecutorConfig {
        ExecutorConfig {
            hostname: "test-worker".to_string(),
            worker_count,
            poll_interval: Duration::from_millis(5),
        }
    }

    fn grid(scheduler: &Arc<Scheduler>) -> Option<Arc<dyn GridService>> {
        Some(scheduler.clone())
    }

    /// Starts an executor with the Mandelbrot handler against `service`.
    async fn start_worker(
        service: Arc<dyn GridService>,
        worker_count: usize,
    ) -> Vec<tokio::task::JoinHandle<()>> {
        let registry = TaskHandlerRegistry::new();
        register_handlers(&registry);
        TaskExecutor::new(service, registry, worker_config(worker_count))
            .start()
            .await
            .unwrap()
    }

    /// Serves the dispatcher router on an ephemeral port.
    async fn spawn_dispatcher(scheduler: Arc<Scheduler>) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(scheduler)).await.unwrap();
        });
        format!("http://{}", addr)
    }

    // ============================================================
    // TEST 1: Row slicing
    // ============================================================

    #[test]
    fn test_split_rows_even() {
        let slices = split_rows(600, 30);

        assert_eq!(slices.len(), 30);
        assert!(slices.iter().all(|s| s.len() == 20));
        assert_eq!(slices[0], 0..20);
        assert_eq!(slices[29], 580..600);
    }

    #[test]
    fn test_split_rows_distributes_remainder() {
        // ARRANGE + ACT
        let slices = split_rows(10, 3);

        // ASSERT: Contiguous, complete, sizes differ by at most one
        assert_eq!(slices, vec![0..4, 4..7, 7..10]);
    }

    #[test]
    fn test_split_rows_clamps_slice_count() {
        assert_eq!(split_rows(3, 10), vec![0..1, 1..2, 2..3]);
        assert_eq!(split_rows(5, 0), vec![0..5]);
        assert!(split_rows(0, 4).is_empty());
    }

    #[test]
    fn test_split_rows_covers_every_row_once() {
        for (height, count) in [(599, 30), (601, 30), (37, 7), (1, 1)] {
            let slices = split_rows(height, count);
            let mut next = 0;
            for slice in &slices {
                assert_eq!(slice.start, next);
                assert!(!slice.is_empty());
                next = slice.end;
            }
            assert_eq!(next, height);
        }
    }

    #[test]
    fn test_run_report_mode() {
        let report = |remote_slices, local_slices| RunReport {
            output: Vec::new(),
            width: 0,
            height: 0,
            elapsed: Duration::ZERO,
            slice_modes: Vec::new(),
            remote_slices,
            local_slices,
        };

        assert_eq!(report(0, 30).mode(), RunMode::Local);
        assert_eq!(report(30, 0).mode(), RunMode::Distributed);
        assert_eq!(report(12, 18).mode(), RunMode::Mixed);
        assert_eq!(RunMode::Mixed.to_string(), "mixed");
        assert!(!report(0, 30).used_remote());
    }

    // ============================================================
    // TEST 2: Local-only run (no workers registered)
    // ============================================================

    #[tokio::test]
    async fn test_no_workers_computes_everything_locally() {
        // ARRANGE: Dispatcher is up but empty
        let scheduler = Scheduler::new(SchedulerConfig::default());
        let orchestrator = Orchestrator::new(grid(&scheduler), fast_config());
        let workload = image(800, 600, 64);

        // ACT
        let report = orchestrator.run(workload.clone(), 30, true).await.unwrap();

        // ASSERT
        assert_eq!(report.output.len(), 800 * 600);
        assert_eq!(report.remote_slices, 0);
        assert_eq!(report.local_slices, 30);
        assert_eq!(report.mode(), RunMode::Local);
        assert!(report.slice_modes.iter().all(|m| *m == SliceMode::Local));
        assert_eq!(report.output, workload.compute_rows(0..600));
        // Nothing was submitted
        assert_eq!(scheduler.status().queued_tasks, 0);
    }

    #[tokio::test]
    async fn test_local_only_orchestrator_ignores_remote_flag() {
        let orchestrator = Orchestrator::local_only(fast_config());
        let workload = image(64, 48, 32);

        let report = orchestrator.run(workload.clone(), 5, true).await.unwrap();

        assert_eq!(report.mode(), RunMode::Local);
        assert_eq!(report.output, workload.compute_rows(0..48));
        assert!(!orchestrator.remote_available().await);
    }

    #[tokio::test]
    async fn test_progress_reports_every_slice() {
        // ARRANGE
        let calls = Arc::new(Mutex::new(Vec::new()));
        let calls_clone = calls.clone();
        let orchestrator = Orchestrator::local_only(fast_config()).with_progress(Arc::new(
            move |done: usize, total: usize| {
                calls_clone.lock().unwrap().push((done, total));
            },
        ));

        // ACT
        orchestrator.run(image(32, 20, 16), 7, false).await.unwrap();

        // ASSERT: Strictly increasing counter ending at total
        let mut calls = calls.lock().unwrap().clone();
        calls.sort();
        let expected: Vec<(usize, usize)> = (1..=7).map(|done| (done, 7)).collect();
        assert_eq!(calls, expected);
    }

    // ============================================================
    // TEST 3: Distributed run with one worker
    // ============================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_single_worker_computes_every_slice() {
        // ARRANGE
        let scheduler = Scheduler::new(SchedulerConfig::default());
        let handles = start_worker(scheduler.clone(), 2).await;
        let orchestrator = Orchestrator::new(grid(&scheduler), fast_config());
        let workload = image(800, 600, 64);
        let before = scheduler.status().total_completed;

        // ACT
        let report = orchestrator.run(workload.clone(), 30, true).await.unwrap();

        // ASSERT: Same image as a local run, but every slice came from the worker
        assert_eq!(report.remote_slices, 30);
        assert_eq!(report.mode(), RunMode::Distributed);
        assert_eq!(scheduler.status().total_completed - before, 30);
        assert_eq!(report.output, workload.compute_rows(0..600));
        assert_eq!(scheduler.broker().pending_count(), 0);

        for handle in handles {
            handle.abort();
        }
    }

    // ============================================================
    // TEST 4: Fallback paths
    // ============================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_failing_worker_falls_back_to_local() {
        // ARRANGE: A worker whose handler always fails
        let scheduler = Scheduler::new(SchedulerConfig::default());
        let registry = TaskHandlerRegistry::new();
        registry.register(TASK_TYPE, |_payload: Vec<u8>| async {
            Err(anyhow::anyhow!("GPU on fire"))
        });
        let handles = TaskExecutor::new(scheduler.clone(), registry, worker_config(2))
            .start()
            .await
            .unwrap();

        let orchestrator = Orchestrator::new(grid(&scheduler), fast_config());
        let workload = image(120, 90, 48);

        // ACT
        let report = orchestrator.run(workload.clone(), 9, true).await.unwrap();

        // ASSERT
        assert_eq!(report.remote_slices, 0);
        assert_eq!(report.local_slices, 9);
        assert_eq!(report.output, workload.compute_rows(0..90));
        assert_eq!(scheduler.status().total_completed, 0);

        for handle in handles {
            handle.abort();
        }
    }

    #[tokio::test]
    async fn test_silent_worker_times_out_and_falls_back() {
        // ARRANGE: Registered worker that never polls
        let scheduler = Scheduler::new(SchedulerConfig::default());
        scheduler.register_worker("ghost", 4);
        let config = OrchestratorConfig {
            result_deadline: Duration::from_millis(100),
            ..fast_config()
        };
        let orchestrator = Orchestrator::new(grid(&scheduler), config);
        let workload = image(40, 30, 32);

        // ACT
        let report = orchestrator.run(workload.clone(), 3, true).await.unwrap();

        // ASSERT: Tasks stay queued but the image is complete
        assert_eq!(report.mode(), RunMode::Local);
        assert_eq!(report.output, workload.compute_rows(0..30));
        assert_eq!(scheduler.status().queued_tasks, 3);
    }

    #[tokio::test]
    async fn test_unreachable_dispatcher_falls_back() {
        // ARRANGE: Nothing listens on this port
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = SchedulerClient::new(&format!("http://{}", addr));
        let service: Arc<dyn GridService> = Arc::new(client);
        let orchestrator = Orchestrator::new(Some(service), fast_config());
        let workload = image(40, 30, 32);

        // ACT
        let report = orchestrator.run(workload.clone(), 4, true).await.unwrap();

        // ASSERT
        assert_eq!(report.mode(), RunMode::Local);
        assert_eq!(report.output, workload.compute_rows(0..30));
    }

    // ============================================================
    // TEST 5: SchedulerClient over HTTP
    // ============================================================

    #[tokio::test]
    async fn test_http_round_trip() {
        // ARRANGE
        let scheduler = Scheduler::new(SchedulerConfig::default());
        let base_url = spawn_dispatcher(scheduler.clone()).await;
        let client = SchedulerClient::new(&base_url).with_user_id("alice");
        let deadline = Duration::from_secs(2);

        // ACT
        let registered = client.register_worker("http-host", 8).await.unwrap();
        let submitted = client
            .submit_task(
                TaskRequest::new("TEST", vec![1, 2, 3], Priority::Critical).with_id("http-1"),
                deadline,
            )
            .await
            .unwrap();
        let task = client.request_task(&registered.worker_id).await.unwrap().unwrap();
        let empty = client.request_task(&registered.worker_id).await.unwrap();
        let accepted = client
            .submit_result(TaskResult::completed(task.id.clone(), vec![9, 9]))
            .await
            .unwrap();
        let result = client.stream_result(&submitted.task_id, deadline).await.unwrap();
        let status = client.status(deadline).await.unwrap();

        // ASSERT
        assert!(registered.authorized);
        assert_eq!(submitted.status, TaskStatus::Queued);
        assert_eq!(task.id.0, "http-1");
        assert_eq!(task.payload, vec![1, 2, 3]);
        assert_eq!(task.priority, Priority::Critical);
        assert!(empty.is_none());
        assert!(accepted);
        assert_eq!(result.payload, vec![9, 9]);
        assert_eq!(status.active_workers, 1);
        assert_eq!(status.total_completed, 1);
        assert_eq!(
            scheduler.jobs().get(&submitted.task_id).unwrap().owner_id,
            "alice"
        );
    }

    #[tokio::test]
    async fn test_http_error_statuses_map_back() {
        // ARRANGE
        let scheduler = Scheduler::new(SchedulerConfig::default());
        let base_url = spawn_dispatcher(scheduler.clone()).await;
        let client = SchedulerClient::new(&base_url);
        let deadline = Duration::from_secs(2);

        // ACT + ASSERT: Unknown worker
        let denied = client.request_task(&WorkerId("forged".to_string())).await;
        assert!(matches!(denied, Err(SchedulerError::PermissionDenied(_))));

        // Invalid submission
        let invalid = client
            .submit_task(TaskRequest::new("TEST", vec![], Priority::Normal), deadline)
            .await;
        assert!(matches!(invalid, Err(SchedulerError::Validation(_))));

        // Unknown task id
        let missing = client
            .stream_result(&TaskId("nope".to_string()), deadline)
            .await;
        assert!(matches!(missing, Err(SchedulerError::NotFound(_))));

        // Pending task, short deadline
        let submitted = client
            .submit_task(TaskRequest::new("TEST", vec![1], Priority::Normal), deadline)
            .await
            .unwrap();
        let timed_out = client
            .stream_result(&submitted.task_id, Duration::from_millis(50))
            .await;
        assert!(matches!(timed_out, Err(SchedulerError::Timeout(_))));
        assert!(scheduler.broker().contains(&submitted.task_id));
    }

    #[tokio::test]
    async fn test_malformed_bodies_are_validation_errors() {
        // ARRANGE
        let scheduler = Scheduler::new(SchedulerConfig::default());
        let base_url = spawn_dispatcher(scheduler.clone()).await;
        let client = SchedulerClient::new(&base_url);
        let http = reqwest::Client::new();

        // ACT: A task with no task_type
        let response = http
            .post(format!("{}{}", client.base_url(), ENDPOINT_SUBMIT_TASK))
            .json(&serde_json::json!({"payload": [1, 2, 3], "priority": "HIGH"}))
            .send()
            .await
            .unwrap();
        let status = response.status();
        let body: ErrorResponse = response.json().await.unwrap();
        let mapped = SchedulerError::from_status(status, body.detail.clone(), Duration::from_secs(1));

        // ASSERT
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.detail.contains("task_type"));
        assert!(matches!(mapped, SchedulerError::Validation(_)));
        assert!(scheduler.queue().is_empty());
        assert_eq!(scheduler.broker().pending_count(), 0);

        // ACT + ASSERT: Unparseable bodies on the worker endpoints
        for endpoint in [ENDPOINT_SUBMIT_RESULT, ENDPOINT_REQUEST_TASK, ENDPOINT_REGISTER_WORKER] {
            let response = http
                .post(format!("{}{}", client.base_url(), endpoint))
                .header("content-type", "application/json")
                .body("{not json")
                .send()
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", endpoint);
        }
        assert_eq!(scheduler.status().total_completed, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_distributed_run_over_http() {
        // ARRANGE: Dispatcher, worker and client all talk HTTP
        let scheduler = Scheduler::new(SchedulerConfig::default());
        let base_url = spawn_dispatcher(scheduler.clone()).await;
        let handles = start_worker(Arc::new(SchedulerClient::new(&base_url)), 2).await;

        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = seen.clone();
        let service: Arc<dyn GridService> = Arc::new(SchedulerClient::new(&base_url));
        let orchestrator = Orchestrator::new(Some(service), fast_config()).with_progress(
            Arc::new(move |_: usize, _: usize| {
                seen_clone.fetch_add(1, Ordering::SeqCst);
            }),
        );
        let workload = image(160, 120, 48);

        // ACT
        let report = orchestrator.run(workload.clone(), 12, true).await.unwrap();

        // ASSERT
        assert_eq!(report.remote_slices, 12);
        assert_eq!(seen.load(Ordering::SeqCst), 12);
        assert_eq!(report.output, workload.compute_rows(0..120));

        for handle in handles {
            handle.abort();
        }
    }
}
