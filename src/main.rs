//! osfstorage server: runs the file-node engine over PostgreSQL together
//! with its background worker and periodic maintenance.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use osfs_core::config::AppConfig;
use osfs_core::error::AppError;
use osfs_database::{DatabasePool, migration};
use osfs_service::{BackgroundTasks, NoPrimaryFiles, NoopTasks, ServiceDeps, Services};
use osfs_worker::{CronScheduler, JobQueue, WorkerRunner, default_executor};

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Load `config/default.toml`, the overlay named by `OSFS_ENV` and
/// `OSFS__*` variables.
fn load_configuration() -> Result<AppConfig, AppError> {
    let dir = std::env::var("OSFS_CONFIG_DIR").unwrap_or_else(|_| "config".to_string());
    let env = std::env::var("OSFS_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load_from(&dir, &env)
}

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting osfstorage");

    // ── Database connection + migrations ─────────────────────────
    let db = DatabasePool::connect(&config.database).await?;
    migration::run_migrations(db.pool()).await?;

    // ── Engine ───────────────────────────────────────────────────
    let worker_id = format!("worker-{}", &uuid::Uuid::new_v4().simple().to_string()[..8]);
    let queue = Arc::new(JobQueue::new(
        Arc::new(db.job_store()),
        worker_id,
        config.worker.max_attempts,
    ));
    let tasks: Arc<dyn BackgroundTasks> = if config.worker.enabled {
        queue.clone()
    } else {
        Arc::new(NoopTasks)
    };

    let services = Services::new(ServiceDeps {
        store: Arc::new(db.store()),
        audit: Arc::new(db.audit_log()),
        primary: Arc::new(NoPrimaryFiles),
        tasks,
        storage: config.storage.clone(),
        conflict_retries: config.database.conflict_retries,
    });
    tracing::info!(
        provider = %config.storage.default_provider,
        region = %config.storage.default_region,
        "File-node engine ready"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Background worker + scheduler ────────────────────────────
    let (worker_handle, scheduler) = if config.worker.enabled {
        queue
            .recover_stale(Duration::from_secs(config.worker.job_lease_seconds))
            .await?;
        let executor = Arc::new(default_executor(&services, &queue, &config.worker));
        let runner = WorkerRunner::new(Arc::clone(&queue), executor, config.worker.clone());

        let mut scheduler = CronScheduler::new(Arc::clone(&queue)).await?;
        scheduler.register_default_tasks(&config.worker).await?;
        scheduler.start().await?;

        let cancel = shutdown_rx.clone();
        let handle = tokio::spawn(async move {
            runner.run(cancel).await;
        });
        tracing::info!("Background worker started");
        (Some(handle), Some(scheduler))
    } else {
        tracing::info!("Background worker disabled");
        (None, None)
    };

    // ── Wait for shutdown ────────────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown");
    let _ = shutdown_tx.send(true);

    if let Some(mut scheduler) = scheduler {
        if let Err(e) = scheduler.shutdown().await {
            tracing::warn!(error = %e, "Scheduler did not shut down cleanly");
        }
    }
    if let Some(handle) = worker_handle {
        if tokio::time::timeout(Duration::from_secs(30), handle).await.is_err() {
            tracing::warn!("Worker did not stop within 30s");
        }
    }

    match queue.stats().await {
        Ok(stats) => tracing::info!(
            pending = stats.pending,
            running = stats.running,
            failed = stats.failed,
            "Job queue at shutdown"
        ),
        Err(e) => tracing::warn!(error = %e, "Could not read job queue counters"),
    }

    db.close().await;
    tracing::info!("osfstorage shut down gracefully");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
