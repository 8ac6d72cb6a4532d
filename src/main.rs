use clap::Parser;
use compute_grid::dispatcher::handlers::router;
use compute_grid::dispatcher::scheduler::{Scheduler, SchedulerConfig, DEFAULT_MAX_STREAM_WAIT};
use std::net::SocketAddr;
use std::time::Duration;

/// Compute grid dispatcher: task queue, worker registry and result broker.
#[derive(Parser, Debug)]
#[command(name = "compute-grid", version, about)]
struct Cli {
    /// Address the HTTP server binds to.
    #[arg(long, env = "GRID_BIND", default_value = "127.0.0.1:50051")]
    bind: SocketAddr,

    /// Reject submissions once this many tasks are waiting. Unbounded if unset.
    #[arg(long, env = "GRID_MAX_QUEUED")]
    max_queued: Option<usize>,

    /// Longest a StreamResult call may wait, in seconds.
    #[arg(long, env = "GRID_MAX_STREAM_WAIT", default_value_t = DEFAULT_MAX_STREAM_WAIT.as_secs())]
    max_stream_wait_secs: u64,

    /// Stats log interval in seconds.
    #[arg(long, env = "GRID_STATS_INTERVAL", default_value_t = 10)]
    stats_interval: u64,
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

    // 1. Scheduler state:
    let scheduler = Scheduler::new(SchedulerConfig {
        max_queued: cli.max_queued,
        max_stream_wait: Duration::from_secs(cli.max_stream_wait_secs),
    });

    // 2. HTTP Router:
    let app = router(scheduler.clone());

    // 3. Spawn stats reporter:
    let stats_scheduler = scheduler.clone();
    let stats_interval = Duration::from_secs(cli.stats_interval.max(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(stats_interval);

        loop {
            interval.tick().await;
            let status = stats_scheduler.status();
            tracing::info!(
                "Grid stats: {} workers ({} cores), {} queued, {} completed, {} pending results",
                status.active_workers,
                stats_scheduler.workers().total_cores(),
                status.queued_tasks,
                status.total_completed,
                stats_scheduler.broker().pending_count()
            );
        }
    });

    // 4. Start HTTP server:
    tracing::info!("Dispatcher listening on {}", cli.bind);
    match scheduler.queue().capacity() {
        Some(limit) => tracing::info!("Queue bounded at {} tasks", limit),
        None => tracing::info!("Queue unbounded"),
    }
    tracing::info!("Press Ctrl+C to shutdown");

    let listener = tokio::net::TcpListener::bind(cli.bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Dispatcher stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
