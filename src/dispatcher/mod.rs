//! Task Dispatcher Module
//!
//! The server side of the grid: a central dispatcher that accepts tasks from
//! clients, keeps them in a priority queue, hands them to pull-polling workers
//! and brokers each worker's result back to the waiting client.
//!
//! ## Architecture Overview
//! 1. **Submission**: A client submits a `Task`; the `Scheduler` reserves a result
//!    slot in the `ResultBroker` and pushes the task into the `TaskQueue`.
//! 2. **Dispatch**: A worker registered in the `WorkerRegistry` polls; the head of the
//!    queue (highest priority, oldest first) is removed and returned.
//! 3. **Resolution**: The worker posts a `TaskResult`; the broker resolves the slot once.
//! 4. **Consumption**: The client's StreamResult call waits on the slot under a deadline
//!    and consumes it exactly once.
//!
//! Delivery is at-most-once: a task pulled by a worker that then dies is lost.
//!
//! ## Submodules
//! - **`types`**: Task, TaskResult, Priority, Worker.
//! - **`queue`**: The priority queue.
//! - **`registry`**: Worker identities and authorization.
//! - **`broker`**: Per-task single-resolution result slots.
//! - **`jobs`**: Best-effort job record store and caller identity.
//! - **`scheduler`**: The object owning all of the above.
//! - **`service`**: The `GridService` trait over the six remote operations.
//! - **`protocol`**: HTTP DTOs and endpoint paths.
//! - **`handlers`**: axum handlers and router.

pub mod broker;
pub mod handlers;
pub mod jobs;
pub mod protocol;
pub mod queue;
pub mod registry;
pub mod scheduler;
pub mod service;
pub mod types;
