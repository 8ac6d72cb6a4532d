//! Compute Grid Library
//!
//! A small distributed compute grid: a central dispatcher keeps a priority
//! queue of opaque tasks, workers pull and execute them, and clients split
//! their work into slices, submit them and merge the results, computing any
//! slice locally when the grid cannot deliver it.
//!
//! ## Architecture Modules
//!
//! - **`dispatcher`**: The central scheduler. Priority queue, worker registry,
//!   result broker, job records and the HTTP surface serving them.
//! - **`executor`**: The worker side. A handler registry keyed by task type and
//!   the poll/execute/report loops.
//! - **`client`**: The HTTP client for the dispatcher and the orchestrator that
//!   slices a workload, races it against local fallback and merges results.
//! - **`mandelbrot`**: The demo workload used by the binaries.
//! - **`error`**: The shared error taxonomy and its HTTP status mapping.

pub mod client;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod mandelbrot;
