//! Worker-Side Task Executor Module
//!
//! Everything a worker process needs to serve the dispatcher.
//!
//! ## Architecture Overview
//! The executor follows a **Pull-based** model with no lease:
//! 1. **Registration**: The host registers once and receives an authorized worker id.
//! 2. **Polling**: Each loop asks the dispatcher for the next task, sleeping when none is ready.
//! 3. **Execution**: The task's type tag selects a handler from the `TaskHandlerRegistry`.
//! 4. **Reporting**: The handler output (or error) goes back as a `TaskResult`.
//!
//! A worker that crashes mid-task loses that task; the submitting client
//! notices through its own deadline and computes the work itself.
//!
//! ## Submodules
//! - **`executor`**: Manages the poll loops and the execution lifecycle (poll -> run -> report).
//! - **`registry`**: Maps task type tags (e.g. "MANDELBROT") to executable Rust code.

pub mod executor;
pub mod registry;

#[cfg(test)]
mod tests;
