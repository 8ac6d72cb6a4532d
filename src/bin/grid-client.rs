//! grid-client: computes one Mandelbrot image through the orchestrator.

use clap::Parser;
use compute_grid::client::orchestrator::{Orchestrator, OrchestratorConfig};
use compute_grid::client::remote::SchedulerClient;
use compute_grid::dispatcher::service::GridService;
use compute_grid::mandelbrot::types::{MandelbrotParams, Viewport};
use compute_grid::mandelbrot::MandelbrotWorkload;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Compute grid client: slices one image over the grid with local fallback.
#[derive(Parser, Debug)]
#[command(name = "grid-client", version, about)]
struct Cli {
    /// Dispatcher base URL.
    #[arg(long, env = "GRID_SERVER", default_value = "http://127.0.0.1:50051")]
    server: String,

    /// Skip the dispatcher and compute every slice locally.
    #[arg(long, env = "GRID_LOCAL_ONLY")]
    local_only: bool,

    /// Number of row slices.
    #[arg(long, env = "GRID_SLICES", default_value_t = 30)]
    slices: usize,

    #[arg(long, env = "GRID_WIDTH", default_value_t = 800)]
    width: usize,

    #[arg(long, env = "GRID_HEIGHT", default_value_t = 600)]
    height: usize,

    #[arg(long, env = "GRID_MAX_ITER", default_value_t = 200)]
    max_iter: u32,

    /// Viewport JSON to load (`{"minRe", "maxRe", "minIm", "maxIm"}`).
    #[arg(long, env = "GRID_VIEWPORT")]
    viewport: Option<PathBuf>,

    /// Write the viewport used for this run to a JSON file.
    #[arg(long, env = "GRID_SAVE_VIEWPORT")]
    save_viewport: Option<PathBuf>,

    /// Sent as `x-user-id` with every submission.
    #[arg(long, env = "GRID_USER_ID")]
    user_id: Option<String>,

    /// Seconds to wait for each slice result before computing it locally.
    #[arg(long, env = "GRID_RESULT_TIMEOUT", default_value_t = 30)]
    result_timeout: u64,

    /// Upper bound on concurrent local slice computations.
    #[arg(long, env = "GRID_LOCAL_PARALLELISM", default_value_t = 4)]
    local_parallelism: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let viewport = match &cli.viewport {
        Some(path) => {
            let viewport = Viewport::load(path)?;
            tracing::info!("Loaded viewport from {}", path.display());
            viewport
        }
        None => Viewport::default(),
    };

    if let Some(path) = &cli.save_viewport {
        viewport.save(path)?;
        tracing::info!("Saved viewport to {}", path.display());
    }

    anyhow::ensure!(cli.width > 0 && cli.height > 0, "image must not be empty");

    let workload = Arc::new(MandelbrotWorkload::new(MandelbrotParams {
        width: cli.width,
        height: cli.height,
        max_iter: cli.max_iter,
        viewport,
    }));

    let config = OrchestratorConfig {
        slice_count: cli.slices,
        result_deadline: Duration::from_secs(cli.result_timeout),
        local_parallelism: cli.local_parallelism,
        ..OrchestratorConfig::default()
    };

    let orchestrator = if cli.local_only {
        Orchestrator::local_only(config)
    } else {
        let mut client = SchedulerClient::new(&cli.server);
        if let Some(user_id) = &cli.user_id {
            client = client.with_user_id(user_id.clone());
        }
        let service: Arc<dyn GridService> = Arc::new(client);
        Orchestrator::new(Some(service), config)
    };

    let orchestrator = orchestrator.with_progress(Arc::new(|done: usize, total: usize| {
        tracing::debug!("Progress: {}/{} slices", done, total);
    }));

    let slice_count = orchestrator.config().slice_count;
    let report = orchestrator
        .run(workload.clone(), slice_count, !cli.local_only)
        .await?;

    let max_iter = workload.params().max_iter;
    let inside = report.output.iter().filter(|&&n| n == max_iter).count();

    tracing::info!(
        "Rendered {}x{} ({}) in {:.2}s: {} remote slices, {} local slices, {} points inside the set",
        report.width,
        report.height,
        report.mode(),
        report.elapsed.as_secs_f64(),
        report.remote_slices,
        report.local_slices,
        inside
    );

    Ok(())
}
