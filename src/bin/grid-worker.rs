//! grid-worker: registers with a dispatcher and executes MANDELBROT tasks.

use clap::Parser;
use compute_grid::client::remote::SchedulerClient;
use compute_grid::dispatcher::service::GridService;
use compute_grid::executor::executor::{ExecutorConfig, TaskExecutor};
use compute_grid::executor::registry::TaskHandlerRegistry;
use compute_grid::mandelbrot;
use std::sync::Arc;
use std::time::Duration;

/// Compute grid worker.
#[derive(Parser, Debug)]
#[command(name = "grid-worker", version, about)]
struct Cli {
    /// Dispatcher base URL.
    #[arg(long, env = "GRID_SERVER", default_value = "http://127.0.0.1:50051")]
    server: String,

    /// Concurrent task loops. Defaults to the number of cores.
    #[arg(long, env = "GRID_WORKERS")]
    workers: Option<usize>,

    /// Hostname reported at registration.
    #[arg(long, env = "GRID_HOSTNAME")]
    hostname: Option<String>,

    /// Sleep between polls when the queue is empty, in milliseconds.
    #[arg(long, env = "GRID_POLL_INTERVAL_MS", default_value_t = 100)]
    poll_interval_ms: u64,
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

    let defaults = ExecutorConfig::default();
    let config = ExecutorConfig {
        hostname: cli
            .hostname
            .or_else(|| std::env::var("HOSTNAME").ok())
            .unwrap_or(defaults.hostname),
        worker_count: cli.workers.unwrap_or(defaults.worker_count).max(1),
        poll_interval: Duration::from_millis(cli.poll_interval_ms),
    };

    let registry = TaskHandlerRegistry::new();
    mandelbrot::register_handlers(&registry);

    let client = SchedulerClient::new(&cli.server);

    tracing::info!(
        "Connecting to dispatcher at {} as {} ({} loops)",
        client.base_url(),
        config.hostname,
        config.worker_count
    );

    let service: Arc<dyn GridService> = Arc::new(client);
    let executor = TaskExecutor::new(service, registry, config);
    let handles = executor.start().await?;

    tracing::info!("Press Ctrl+C to shutdown");
    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down worker");
    for handle in handles {
        handle.abort();
    }

    Ok(())
}
