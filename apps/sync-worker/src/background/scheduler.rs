//! Cron-driven sync passes using tokio-cron-scheduler.

use std::time::Duration;

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::state::AppState;

/// Runs sync passes on a cron schedule until cancelled.
pub struct SyncScheduler {
    inner: JobScheduler,
    state: AppState,
    cancel: CancellationToken,
}

impl SyncScheduler {
    pub async fn new(state: AppState, cancel: CancellationToken) -> Result<Self, JobSchedulerError> {
        let inner = JobScheduler::new().await?;
        Ok(Self {
            inner,
            state,
            cancel,
        })
    }

    /// Register a recurring pass. Schedules use six fields, seconds first.
    ///
    /// # Example
    /// ```ignore
    /// scheduler.add_pass("0 */15 * * * *").await?;
    /// ```
    pub async fn add_pass(&self, schedule: &str) -> Result<Uuid, JobSchedulerError> {
        let state = self.state.clone();
        let cancel = self.cancel.clone();
        let job = Job::new_async(schedule, move |_uuid, _lock| {
            let state = state.clone();
            let cancel = cancel.clone();
            Box::pin(async move {
                state.run_pass(&cancel).await;
            })
        })?;

        let id = self.inner.add(job).await?;
        tracing::info!(schedule = %schedule, job_id = %id, "Sync pass scheduled");
        Ok(id)
    }

    /// Queue one pass that runs as soon as the scheduler starts.
    pub async fn add_startup_pass(&self) -> Result<Uuid, JobSchedulerError> {
        let state = self.state.clone();
        let cancel = self.cancel.clone();
        let job = Job::new_one_shot_async(Duration::ZERO, move |_uuid, _lock| {
            let state = state.clone();
            let cancel = cancel.clone();
            Box::pin(async move {
                state.run_pass(&cancel).await;
            })
        })?;

        let id = self.inner.add(job).await?;
        tracing::debug!(job_id = %id, "Startup pass queued");
        Ok(id)
    }

    /// Start the scheduler and block until the cancellation token fires.
    pub async fn run(mut self) -> Result<(), JobSchedulerError> {
        self.inner.start().await?;
        tracing::info!("Scheduler started");

        self.cancel.cancelled().await;

        self.inner.shutdown().await?;
        tracing::info!("Scheduler stopped");
        Ok(())
    }
}
