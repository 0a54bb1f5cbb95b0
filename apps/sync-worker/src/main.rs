//! # Blogsync Worker
//!
//! Pulls every configured blog from its source into storage, once or on a
//! cron schedule.

use tokio_util::sync::CancellationToken;

mod background;
mod config;
mod state;
mod telemetry;

use config::AppConfig;
use state::AppState;
use telemetry::TelemetryConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    telemetry::init_telemetry(&TelemetryConfig::from_env());

    let config = AppConfig::from_env()?;
    tracing::info!(
        blogs = config.blog_keys.len(),
        schedule = ?config.schedule,
        "Starting blogsync worker"
    );

    let state = AppState::new(&config).await?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown signal received");
                cancel.cancel();
            }
        }
    });

    match config.schedule.as_deref() {
        None => run_once(&state, &cancel).await,
        Some(schedule) => run_scheduled(state, schedule, cancel).await,
    }
}

async fn run_once(state: &AppState, cancel: &CancellationToken) -> anyhow::Result<()> {
    let Some(report) = state.run_pass(cancel).await else {
        return Ok(());
    };
    if report.failed() > 0 {
        anyhow::bail!("{} of {} blogs failed to sync", report.failed(), report.outcomes.len());
    }
    Ok(())
}

#[cfg(feature = "scheduler")]
async fn run_scheduled(
    state: AppState,
    schedule: &str,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let scheduler = background::SyncScheduler::new(state, cancel).await?;
    scheduler.add_startup_pass().await?;
    scheduler.add_pass(schedule).await?;
    scheduler.run().await?;
    Ok(())
}

#[cfg(not(feature = "scheduler"))]
async fn run_scheduled(
    _state: AppState,
    schedule: &str,
    _cancel: CancellationToken,
) -> anyhow::Result<()> {
    anyhow::bail!("SYNC_SCHEDULE '{schedule}' set but the worker was built without the scheduler feature")
}
