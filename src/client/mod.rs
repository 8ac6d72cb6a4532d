//! Grid Client Module
//!
//! The client half of the grid: an HTTP handle on the dispatcher and the
//! orchestrator that spreads a workload over it with a local safety net.
//!
//! ## Submodules
//! - **`remote`**: `SchedulerClient`, the `GridService` implementation over HTTP.
//! - **`orchestrator`**: Slicing, remote/local racing and merging of results.

pub mod orchestrator;
pub mod remote;

#[cfg(test)]
mod tests;
