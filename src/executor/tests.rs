//! Executor Module Tests
//!
//! ## Test Scopes
//! - **Registry**: handler registration, lookup and execution on raw payloads.
//! - **Executor**: one poll/execute/report cycle against an in-process scheduler.
//! - **Worker loops**: a started executor drains the queue on its own.

#[cfg(test)]
mod tests {
    use crate::dispatcher::jobs::ANONYMOUS;
    use crate::dispatcher::scheduler::{Scheduler, SchedulerConfig};
    use crate::dispatcher::service::GridService;
    use crate::dispatcher::types::*;
    use crate::error::SchedulerError;
    use crate::executor::executor::{ExecutorConfig, TaskExecutor};
    use crate::executor::registry::TaskHandlerRegistry;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn task(task_type: &str, payload: Vec<u8>) -> Task {
        Task {
            id: TaskId::new(),
            task_type: task_type.to_string(),
            payload,
            priority: Priority::Normal,
            submitted_at: now_ms(),
        }
    }

    fn executor_config() -> ExecutorConfig {
        ExecutorConfig {
            hostname: "test-host".to_string(),
            worker_count: 2,
            poll_interval: Duration::from_millis(5),
        }
    }

    /// Registry with an "ECHO" handler that reverses the payload.
    fn echo_registry() -> Arc<TaskHandlerRegistry> {
        let registry = TaskHandlerRegistry::new();
        registry.register("ECHO", |mut payload: Vec<u8>| async move {
            payload.reverse();
            Ok(payload)
        });
        registry
    }

    // ============================================================
    // TEST 1: TaskHandlerRegistry - Registration and Execution
    // ============================================================

    #[tokio::test]
    async fn test_registry_register_and_execute() {
        // ARRANGE: Create registry and call counter
        let registry = TaskHandlerRegistry::new();
        let call_count = Arc::new(AtomicUsize::new(0));
        let call_count_clone = call_count.clone();

        // ACT: Register handler
        registry.register("COUNT", move |payload: Vec<u8>| {
            let count = call_count_clone.clone();
            async move {
                count.fetch_add(1, Ordering::SeqCst);
                Ok(vec![payload.len() as u8])
            }
        });

        // ASSERT: Handler is registered
        assert!(registry.has_handler("COUNT"));
        assert_eq!(registry.handler_count(), 1);
        assert_eq!(registry.list_handlers(), vec!["COUNT".to_string()]);

        // ACT: Execute task
        let result = registry.execute(&task("COUNT", vec![1, 2, 3])).await;

        // ASSERT: Handler was called with the payload
        assert_eq!(result.unwrap(), vec![3]);
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_registry_unknown_handler_returns_error() {
        // ARRANGE
        let registry = TaskHandlerRegistry::new();

        // ACT
        let result = registry.execute(&task("X", vec![1])).await;

        // ASSERT: Should return an error
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().to_string(), "Unknown task handler: X");
    }

    #[tokio::test]
    async fn test_registry_handler_can_fail() {
        // ARRANGE
        let registry = TaskHandlerRegistry::new();

        registry.register("FAILING", |_payload: Vec<u8>| async {
            Err(anyhow::anyhow!("Intentional error"))
        });

        // ACT
        let result = registry.execute(&task("FAILING", vec![1])).await;

        // ASSERT
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Intentional error"));
    }

    #[tokio::test]
    async fn test_registry_reregistration_replaces_handler() {
        let registry = echo_registry();
        registry.register("ECHO", |_payload: Vec<u8>| async { Ok(vec![0]) });

        let result = registry.execute(&task("ECHO", vec![1, 2])).await.unwrap();

        assert_eq!(result, vec![0]);
        assert_eq!(registry.handler_count(), 1);
    }

    // ============================================================
    // TEST 2: TaskExecutor - Single Cycle
    // ============================================================

    #[tokio::test]
    async fn test_run_once_executes_and_reports() {
        // ARRANGE
        let scheduler = Scheduler::new(SchedulerConfig::default());
        let executor = TaskExecutor::new(scheduler.clone(), echo_registry(), executor_config());
        let worker_id = executor.register().await.unwrap();

        let submitted = scheduler
            .submit(TaskRequest::new("ECHO", vec![1, 2, 3], Priority::High), ANONYMOUS)
            .unwrap();

        // ACT
        let processed = executor.run_once(&worker_id).await.unwrap();
        let result = scheduler
            .await_result(&submitted.task_id, Duration::from_secs(1))
            .await
            .unwrap();

        // ASSERT
        assert!(processed);
        assert!(result.is_completed());
        assert_eq!(result.payload, vec![3, 2, 1]);
        assert_eq!(result.progress, 100);
        assert_eq!(scheduler.status().total_completed, 1);
    }

    #[tokio::test]
    async fn test_run_once_on_empty_queue() {
        let scheduler = Scheduler::new(SchedulerConfig::default());
        let executor = TaskExecutor::new(scheduler.clone(), echo_registry(), executor_config());
        let worker_id = executor.register().await.unwrap();

        let processed = executor.run_once(&worker_id).await.unwrap();

        assert!(!processed);
    }

    #[tokio::test]
    async fn test_unknown_task_type_reports_failure() {
        // ARRANGE
        let scheduler = Scheduler::new(SchedulerConfig::default());
        let executor = TaskExecutor::new(scheduler.clone(), echo_registry(), executor_config());
        let worker_id = executor.register().await.unwrap();

        let submitted = scheduler
            .submit(TaskRequest::new("X", vec![1], Priority::Normal), ANONYMOUS)
            .unwrap();

        // ACT
        executor.run_once(&worker_id).await.unwrap();
        let result = scheduler
            .await_result(&submitted.task_id, Duration::from_secs(1))
            .await
            .unwrap();

        // ASSERT: Failure travels back as a FAILED result, not a transport error
        assert_eq!(result.status, ResultStatus::Failed);
        assert_eq!(result.error_message.as_deref(), Some("Unknown task handler: X"));
        assert_eq!(scheduler.status().total_completed, 0);
    }

    #[tokio::test]
    async fn test_unregistered_worker_is_denied() {
        let scheduler = Scheduler::new(SchedulerConfig::default());
        let executor = TaskExecutor::new(scheduler.clone(), echo_registry(), executor_config());

        let result = executor.run_once(&WorkerId::new()).await;

        assert!(matches!(result, Err(SchedulerError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_registration_advertises_worker_count() {
        let scheduler = Scheduler::new(SchedulerConfig::default());
        let executor = TaskExecutor::new(scheduler.clone(), echo_registry(), executor_config());

        let worker_id = executor.register().await.unwrap();

        let worker = scheduler.workers().get(&worker_id).unwrap();
        assert_eq!(worker.core_count, 2);
        assert_eq!(worker.hostname, "test-host");
    }

    // ============================================================
    // TEST 3: Worker loops drain the queue
    // ============================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_started_executor_processes_backlog() {
        // ARRANGE: Queue work before any worker exists
        let scheduler = Scheduler::new(SchedulerConfig::default());
        let mut ids = Vec::new();
        for i in 0..20u8 {
            let response = scheduler
                .submit(TaskRequest::new("ECHO", vec![i, 0], Priority::Normal), ANONYMOUS)
                .unwrap();
            ids.push((i, response.task_id));
        }

        // ACT
        let service: Arc<dyn GridService> = scheduler.clone();
        let executor = TaskExecutor::new(service, echo_registry(), executor_config());
        let handles = executor.start().await.unwrap();

        // ASSERT: Every task comes back with its own payload reversed
        for (i, task_id) in ids {
            let result = scheduler
                .await_result(&task_id, Duration::from_secs(5))
                .await
                .unwrap();
            assert_eq!(result.payload, vec![0, i]);
        }
        assert!(scheduler.queue().is_empty());
        assert_eq!(scheduler.status().total_completed, 20);
        assert_eq!(scheduler.status().active_workers, 1);

        for handle in handles {
            handle.abort();
        }
    }
}
