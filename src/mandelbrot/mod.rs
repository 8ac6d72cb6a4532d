//! Mandelbrot Demo Workload
//!
//! The reference computation shipped with the grid: an escape-time render of
//! the Mandelbrot set, cut into row slices.
//!
//! ## Overview
//! The client encodes each slice as a `SliceTask` (bincode) carrying the full
//! image parameters, workers decode it and return a `SliceOutput`. The same
//! `engine::compute_rows` runs on both sides, so a locally computed slice and
//! a remotely computed slice are identical.
//!
//! ## Submodules
//! - **`engine`**: Escape-time iteration and row computation.
//! - **`types`**: Viewport, image parameters and the slice wire payloads.
//! - **`workload`**: `SliceWorkload` implementation and the worker handler.

pub mod engine;
pub mod types;
pub mod workload;

pub use workload::{register_handlers, MandelbrotWorkload, TASK_TYPE};
