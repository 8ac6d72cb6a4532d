//! Mandelbrot as a grid workload: the client-side `SliceWorkload` and the
//! worker-side handler share `engine::compute_rows`.

use super::engine::compute_rows;
use super::types::*;
use crate::client::orchestrator::SliceWorkload;
use crate::error::SchedulerError;
use crate::executor::registry::TaskHandlerRegistry;

use anyhow::Result;
use std::ops::Range;

pub const TASK_TYPE: &str = "MANDELBROT";

#[derive(Debug, Clone)]
pub struct MandelbrotWorkload {
    params: MandelbrotParams,
}

impl MandelbrotWorkload {
    pub fn new(params: MandelbrotParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &MandelbrotParams {
        &self.params
    }
}

impl SliceWorkload for MandelbrotWorkload {
    fn task_type(&self) -> &str {
        TASK_TYPE
    }

    fn width(&self) -> usize {
        self.params.width
    }

    fn height(&self) -> usize {
        self.params.height
    }

    fn encode_slice(&self, rows: Range<usize>) -> Result<Vec<u8>, SchedulerError> {
        let task = SliceTask {
            params: self.params,
            start_row: rows.start,
            end_row: rows.end,
        };
        Ok(bincode::serialize(&task)?)
    }

    fn decode_result(&self, rows: Range<usize>, payload: &[u8]) -> Result<Vec<u32>, SchedulerError> {
        let output: SliceOutput = bincode::deserialize(payload)?;

        if output.start_row != rows.start
            || output.end_row != rows.end
            || output.width != self.params.width
        {
            return Err(SchedulerError::Serialization(format!(
                "result covers rows {}..{} (width {}), expected {}..{} (width {})",
                output.start_row,
                output.end_row,
                output.width,
                rows.start,
                rows.end,
                self.params.width
            )));
        }

        Ok(output.escape)
    }

    fn compute_rows(&self, rows: Range<usize>) -> Vec<u32> {
        compute_rows(&self.params, rows)
    }
}

/// Worker-side handler: decodes a `SliceTask`, computes it on the blocking
/// pool and encodes the `SliceOutput`.
pub async fn handle_slice_task(payload: Vec<u8>) -> Result<Vec<u8>> {
    let task: SliceTask = bincode::deserialize(&payload)?;

    anyhow::ensure!(
        task.start_row < task.end_row && task.end_row <= task.params.height,
        "invalid row range {}..{} for height {}",
        task.start_row,
        task.end_row,
        task.params.height
    );
    task.params.viewport.validate()?;

    let params = task.params;
    let rows = task.start_row..task.end_row;
    let escape = tokio::task::spawn_blocking(move || compute_rows(&params, rows)).await?;

    let output = SliceOutput {
        start_row: task.start_row,
        end_row: task.end_row,
        width: task.params.width,
        escape,
    };

    Ok(bincode::serialize(&output)?)
}

/// Registers every Mandelbrot task type on a worker.
pub fn register_handlers(registry: &TaskHandlerRegistry) {
    registry.register(TASK_TYPE, handle_slice_task);
}
