//! Client Orchestrator
//!
//! Splits a workload into contiguous row slices and resolves every slice
//! independently and concurrently:
//! 1. **Remote**: submit the slice as a CRITICAL task (short deadline), then
//!    wait on its result (longer deadline).
//! 2. **Fallback**: on any remote failure, compute the slice locally on a
//!    bounded blocking pool.
//! 3. **Merge**: copy the slice into the shared output at its row offset and
//!    bump the completion counter.
//!
//! Output content is the same whichever path each slice took, as long as the
//! workload's remote handler and `compute_rows` are the same function.

use crate::dispatcher::service::GridService;
use crate::dispatcher::types::*;
use crate::error::SchedulerError;

use anyhow::Result;
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;

/// A workload that can be cut into independent row ranges.
///
/// `compute_rows` is the local fallback and must produce exactly what the
/// worker-side handler for `task_type` produces for the same rows.
pub trait SliceWorkload: Send + Sync + 'static {
    /// Type tag attached to every slice task.
    fn task_type(&self) -> &str;

    /// Cells per row.
    fn width(&self) -> usize;

    /// Total number of rows.
    fn height(&self) -> usize;

    /// Encodes the sub-problem for `rows` as an opaque task payload.
    fn encode_slice(&self, rows: Range<usize>) -> Result<Vec<u8>, SchedulerError>;

    /// Decodes a worker's result payload for `rows`.
    fn decode_result(&self, rows: Range<usize>, payload: &[u8]) -> Result<Vec<u32>, SchedulerError>;

    /// Computes `rows` in-process. Returns `rows.len() * width()` cells.
    fn compute_rows(&self, rows: Range<usize>) -> Vec<u32>;
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub slice_count: usize,
    pub submit_deadline: Duration,
    pub result_deadline: Duration,
    /// Deadline of the GetStatus check run before a remote-enabled run.
    pub status_check_deadline: Duration,
    /// Upper bound on concurrent local computations.
    pub local_parallelism: usize,
    pub priority: Priority,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            slice_count: 30,
            submit_deadline: Duration::from_secs(5),
            result_deadline: Duration::from_secs(30),
            status_check_deadline: Duration::from_secs(2),
            local_parallelism: 4,
            priority: Priority::Critical,
        }
    }
}

/// How one slice was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceMode {
    Remote,
    Local,
}

/// Reporting mode for a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Local,
    Distributed,
    Mixed,
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunMode::Local => f.write_str("local"),
            RunMode::Distributed => f.write_str("distributed"),
            RunMode::Mixed => f.write_str("mixed"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    /// Row-major cells, `width * height` long.
    pub output: Vec<u32>,
    pub width: usize,
    pub height: usize,
    /// Wall clock from the start of the run to the last slice merge.
    pub elapsed: Duration,
    pub slice_modes: Vec<SliceMode>,
    pub remote_slices: usize,
    pub local_slices: usize,
}

impl RunReport {
    pub fn used_remote(&self) -> bool {
        self.remote_slices > 0
    }

    pub fn mode(&self) -> RunMode {
        match (self.remote_slices, self.local_slices) {
            (0, _) => RunMode::Local,
            (_, 0) => RunMode::Distributed,
            _ => RunMode::Mixed,
        }
    }
}

/// Called with `(completed, total)` after every slice merge.
pub type ProgressFn = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Splits `height` rows into at most `slice_count` contiguous ranges whose
/// sizes differ by at most one row. Never yields an empty range.
pub fn split_rows(height: usize, slice_count: usize) -> Vec<Range<usize>> {
    if height == 0 {
        return Vec::new();
    }

    let count = slice_count.clamp(1, height);
    let base = height / count;
    let extra = height % count;

    let mut start = 0;
    (0..count)
        .map(|index| {
            let len = base + usize::from(index < extra);
            let range = start..start + len;
            start += len;
            range
        })
        .collect()
}

pub struct Orchestrator {
    service: Option<Arc<dyn GridService>>,
    config: OrchestratorConfig,
    local_pool: Arc<Semaphore>,
    progress: Option<ProgressFn>,
}

/// State shared by all slices of one run.
struct RunState {
    output: Mutex<Vec<u32>>,
    completed: AtomicUsize,
    remote: AtomicUsize,
    started: Instant,
    finished_after: OnceLock<Duration>,
}

/// Everything a spawned slice needs, cloned once per run.
struct SliceContext<W> {
    service: Option<Arc<dyn GridService>>,
    config: OrchestratorConfig,
    local_pool: Arc<Semaphore>,
    progress: Option<ProgressFn>,
    workload: Arc<W>,
    state: Arc<RunState>,
    use_remote: bool,
    total: usize,
}

impl Orchestrator {
    pub fn new(service: Option<Arc<dyn GridService>>, config: OrchestratorConfig) -> Self {
        let local_pool = Arc::new(Semaphore::new(config.local_parallelism.max(1)));
        Self {
            service,
            config,
            local_pool,
            progress: None,
        }
    }

    /// An orchestrator with no dispatcher: every slice runs locally.
    pub fn local_only(config: OrchestratorConfig) -> Self {
        Self::new(None, config)
    }

    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Asks the dispatcher whether any worker is registered.
    pub async fn remote_available(&self) -> bool {
        let Some(service) = &self.service else {
            return false;
        };

        let deadline = self.config.status_check_deadline;
        match tokio::time::timeout(deadline, service.status(deadline)).await {
            Ok(Ok(status)) => {
                tracing::info!("Server status: {} workers available", status.active_workers);
                status.active_workers > 0
            }
            Ok(Err(e)) => {
                tracing::info!("Server not available, will use local computation: {}", e);
                false
            }
            Err(_) => {
                tracing::info!("Server status check timed out after {:?}", deadline);
                false
            }
        }
    }

    /// Resolves every slice of `workload` and returns the merged output.
    ///
    /// With `remote_enabled` the dispatcher status is checked first; remote is only
    /// attempted when it reports at least one worker. Fails only if a local
    /// computation itself fails.
    pub async fn run<W: SliceWorkload>(
        &self,
        workload: Arc<W>,
        slice_count: usize,
        remote_enabled: bool,
    ) -> Result<RunReport> {
        let width = workload.width();
        let height = workload.height();
        let slices = split_rows(height, slice_count);
        let total = slices.len();

        let use_remote = remote_enabled && self.remote_available().await;

        tracing::info!(
            "Computing {}x{} in {} slices ({})",
            width,
            height,
            total,
            if use_remote { "grid" } else { "local" }
        );

        let state = Arc::new(RunState {
            output: Mutex::new(vec![0; width * height]),
            completed: AtomicUsize::new(0),
            remote: AtomicUsize::new(0),
            started: Instant::now(),
            finished_after: OnceLock::new(),
        });

        let context = Arc::new(SliceContext {
            service: self.service.clone(),
            config: self.config.clone(),
            local_pool: self.local_pool.clone(),
            progress: self.progress.clone(),
            workload,
            state: state.clone(),
            use_remote,
            total,
        });

        let mut set = JoinSet::new();
        for (index, rows) in slices.into_iter().enumerate() {
            let context = context.clone();
            set.spawn(async move { context.run_slice(index, rows).await });
        }

        let mut slice_modes = vec![SliceMode::Local; total];
        while let Some(joined) = set.join_next().await {
            let (index, mode) = joined??;
            slice_modes[index] = mode;
        }

        let output = std::mem::take(&mut *state.output.lock().await);
        let remote_slices = state.remote.load(Ordering::SeqCst);
        let elapsed = state
            .finished_after
            .get()
            .copied()
            .unwrap_or_else(|| state.started.elapsed());

        Ok(RunReport {
            output,
            width,
            height,
            elapsed,
            slice_modes,
            remote_slices,
            local_slices: total - remote_slices,
        })
    }
}

impl<W: SliceWorkload> SliceContext<W> {
    async fn run_slice(&self, index: usize, rows: Range<usize>) -> Result<(usize, SliceMode)> {
        let remote = match (&self.service, self.use_remote) {
            (Some(service), true) => match self.try_remote(service.as_ref(), index, rows.clone()).await {
                Ok(data) => Some(data),
                Err(e) => {
                    tracing::debug!("Slice {} falls back to local computation: {}", index, e);
                    None
                }
            },
            _ => None,
        };

        let (data, mode) = match remote {
            Some(data) => (data, SliceMode::Remote),
            None => (self.compute_local(rows.clone()).await?, SliceMode::Local),
        };

        self.merge(index, rows, data, mode).await?;
        Ok((index, mode))
    }

    /// Submit, then wait for the worker's result. Any error means "fall back".
    async fn try_remote(
        &self,
        service: &dyn GridService,
        index: usize,
        rows: Range<usize>,
    ) -> Result<Vec<u32>, SchedulerError> {
        let workload = self.workload.as_ref();
        let payload = workload.encode_slice(rows.clone())?;
        let task_id = format!(
            "{}-{}-{}",
            workload.task_type().to_lowercase(),
            index,
            uuid::Uuid::new_v4()
        );
        let request =
            TaskRequest::new(workload.task_type(), payload, self.config.priority).with_id(task_id);

        let submit_deadline = self.config.submit_deadline;
        let submitted = tokio::time::timeout(
            submit_deadline,
            service.submit_task(request, submit_deadline),
        )
        .await
        .map_err(|_| SchedulerError::Timeout(submit_deadline))??;

        if submitted.status != TaskStatus::Queued {
            return Err(SchedulerError::Transport(format!(
                "task {} not queued ({:?}): {}",
                submitted.task_id.0, submitted.status, submitted.message
            )));
        }

        let result_deadline = self.config.result_deadline;
        let result = tokio::time::timeout(
            result_deadline,
            service.stream_result(&submitted.task_id, result_deadline),
        )
        .await
        .map_err(|_| SchedulerError::Timeout(result_deadline))??;

        if !result.is_completed() {
            return Err(SchedulerError::TaskFailed(
                result
                    .error_message
                    .unwrap_or_else(|| "no error message".to_string()),
            ));
        }

        let expected = rows.len() * workload.width();
        let data = workload.decode_result(rows, &result.payload)?;
        if data.len() != expected {
            return Err(SchedulerError::Serialization(format!(
                "slice {} returned {} cells, expected {}",
                index,
                data.len(),
                expected
            )));
        }

        Ok(data)
    }

    /// Runs the slice on the blocking pool, at most `local_parallelism` at once.
    async fn compute_local(&self, rows: Range<usize>) -> Result<Vec<u32>> {
        let _permit = self.local_pool.clone().acquire_owned().await?;
        let workload = self.workload.clone();
        let data = tokio::task::spawn_blocking(move || workload.compute_rows(rows)).await?;
        Ok(data)
    }

    async fn merge(
        &self,
        index: usize,
        rows: Range<usize>,
        data: Vec<u32>,
        mode: SliceMode,
    ) -> Result<()> {
        let width = self.workload.width();
        let offset = rows.start * width;
        anyhow::ensure!(
            data.len() == rows.len() * width,
            "slice {} produced {} cells, expected {}",
            index,
            data.len(),
            rows.len() * width
        );

        {
            let mut output = self.state.output.lock().await;
            output[offset..offset + data.len()].copy_from_slice(&data);
        }

        if mode == SliceMode::Remote {
            self.state.remote.fetch_add(1, Ordering::SeqCst);
        }

        let done = self.state.completed.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(progress) = &self.progress {
            progress(done, self.total);
        }

        if done == self.total {
            let elapsed = self.state.started.elapsed();
            let _ = self.state.finished_after.set(elapsed);
            tracing::info!(
                "Computation complete: {} slices ({} remote) in {:.2}s",
                self.total,
                self.state.remote.load(Ordering::SeqCst),
                elapsed.as_secs_f64()
            );
        }

        Ok(())
    }
}
