//! Task Handler Registry
//!
//! A dynamic registry that maps task type tags (e.g., "MANDELBROT") to
//! executable Rust closures. The worker stays generic: it never knows what a
//! payload means, it only looks up the handler for the task's type.

use crate::dispatcher::types::Task;

use anyhow::Result;
use dashmap::DashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Type alias for a thread-safe, asynchronous task handler function.
/// It takes the task's opaque payload and resolves to the opaque result payload.
pub type TaskHandlerFn =
    Arc<dyn Fn(Vec<u8>) -> Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send>> + Send + Sync>;

/// Registry holding the mapping between task types and their implementation.
pub struct TaskHandlerRegistry {
    handlers: DashMap<String, TaskHandlerFn>,
}

impl TaskHandlerRegistry {
    /// Creates a new, empty registry.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            handlers: DashMap::new(),
        })
    }

    /// Registers a new handler function under a task type.
    ///
    /// # Arguments
    /// * `task_type` - The type tag carried by tasks (e.g., "MANDELBROT").
    /// * `handler` - The closure/function that turns a payload into a result payload.
    pub fn register<F, Fut>(&self, task_type: &str, handler: F)
    where
        F: Fn(Vec<u8>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<u8>>> + Send + 'static,
    {
        // Box::pin type-erases the concrete future so different async
        // functions can live in the same map.
        let handler_fn: TaskHandlerFn = Arc::new(move |payload: Vec<u8>| {
            Box::pin(handler(payload)) as Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send>>
        });

        self.handlers.insert(task_type.to_string(), handler_fn);

        tracing::info!("Registered task handler: {}", task_type);
    }

    /// Looks up the handler for the task's type and runs it on the payload.
    ///
    /// # Returns
    /// * `Ok(payload)` with the handler's output.
    /// * `Err` if the handler failed or no handler exists for the type.
    pub async fn execute(&self, task: &Task) -> Result<Vec<u8>> {
        // Clone the Arc out so the map guard is not held across the await.
        let handler_fn = self
            .handlers
            .get(&task.task_type)
            .map(|entry| entry.value().clone());

        match handler_fn {
            Some(handler_fn) => {
                tracing::debug!(
                    "Executing task {} with handler '{}' (payload size: {} bytes)",
                    task.id.0,
                    task.task_type,
                    task.payload.len()
                );
                handler_fn(task.payload.clone()).await
            }
            None => {
                let error = format!("Unknown task handler: {}", task.task_type);
                tracing::error!("{}", error);
                Err(anyhow::anyhow!(error))
            }
        }
    }

    /// Returns a list of all registered task types.
    pub fn list_handlers(&self) -> Vec<String> {
        self.handlers
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    pub fn has_handler(&self, task_type: &str) -> bool {
        self.handlers.contains_key(task_type)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

impl Default for TaskHandlerRegistry {
    fn default() -> Self {
        Self {
            handlers: DashMap::new(),
        }
    }
}
