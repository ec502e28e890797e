//! Cron-driven poll cycles for long-running deployments.

use std::sync::Arc;

use engage_engine::Engine;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Starts the scheduler, runs until ctrl-c or SIGTERM, then shuts it down.
pub(crate) async fn run(engine: Arc<Engine>, cron: &str) -> anyhow::Result<()> {
    let mut scheduler = JobScheduler::new().await?;
    register_poll_job(&scheduler, engine, cron).await?;
    scheduler.start().await?;
    tracing::info!(cron, "scheduler started");

    shutdown_signal().await;
    scheduler.shutdown().await?;
    Ok(())
}

/// Registers the poll cycle. A tick that fires while the previous cycle is
/// still running is skipped.
async fn register_poll_job(
    scheduler: &JobScheduler,
    engine: Arc<Engine>,
    cron: &str,
) -> Result<(), JobSchedulerError> {
    let running = Arc::new(Mutex::new(()));

    let job = Job::new_async(cron, move |_uuid, _lock| {
        let engine = Arc::clone(&engine);
        let running = Arc::clone(&running);

        Box::pin(async move {
            let Ok(_guard) = running.try_lock_owned() else {
                tracing::warn!("scheduler: previous poll cycle still running; skipping tick");
                return;
            };
            match engine.run_cycle(None).await {
                Ok(report) => tracing::info!(
                    run_id = %report.run_id,
                    rewarded = report.totals.rewarded,
                    failed = report.totals.failed,
                    errors = report.totals.errors,
                    "scheduler: poll cycle complete"
                ),
                Err(e) => tracing::error!(error = %e, "scheduler: poll cycle failed"),
            }
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, stopping scheduler");
}
