use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveTime, Utc};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::dispatch::{DigestJob, DispatchError, RunReport};

/// Fixed wall-clock time (UTC) at which the digest goes out every day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    time: NaiveTime,
}

impl DailySchedule {
    pub fn new(hour: u32, minute: u32) -> Result<DailySchedule, String> {
        NaiveTime::from_hms_opt(hour, minute, 0)
            .map(|time| Self { time })
            .ok_or_else(|| format!("{:02}:{:02} is not a valid time of day", hour, minute))
    }

    /// First trigger strictly after `now`.
    pub fn next_fire_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.date_naive().and_time(self.time).and_utc();

        if today > now {
            today
        } else {
            today + Duration::days(1)
        }
    }
}

/// Work the scheduler triggers.
#[async_trait]
pub trait ScheduledJob: Send + Sync {
    async fn trigger(&self) -> Result<RunReport, DispatchError>;
}

#[async_trait]
impl ScheduledJob for DigestJob {
    async fn trigger(&self) -> Result<RunReport, DispatchError> {
        self.run().await
    }
}

/// Handle on the running scheduler task. Dropping it cancels the timer too,
/// [`SchedulerHandle::stop`] additionally waits for the task to end.
pub struct SchedulerHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Cancels the timer and waits for the task to finish. A run that is in
    /// progress completes first.
    pub async fn stop(self) {
        let _ = self.shutdown.send(());

        if let Err(err) = self.task.await {
            tracing::error!(error = ?err, "Digest scheduler task failed");
        }
    }
}

/// Spawns the task that runs `job` once a day according to `schedule`.
pub fn start<J>(schedule: DailySchedule, job: Arc<J>) -> SchedulerHandle
where
    J: ScheduledJob + 'static,
{
    start_with_clock(schedule, job, Utc::now)
}

/// Same as [`start`], reading the wall-clock time from `clock`.
pub fn start_with_clock<J, C>(schedule: DailySchedule, job: Arc<J>, clock: C) -> SchedulerHandle
where
    J: ScheduledJob + 'static,
    C: Fn() -> DateTime<Utc> + Send + 'static,
{
    let (shutdown, mut shutdown_signal) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        loop {
            let now = clock();
            let next = schedule.next_fire_after(now);
            let wait = (next - now).to_std().unwrap_or_default();

            tracing::info!("Next digest run scheduled at {}", next);

            tokio::select! {
                _ = &mut shutdown_signal => break,
                _ = tokio::time::sleep(wait) => {
                    match job.trigger().await {
                        Ok(report) => tracing::info!(?report, "Scheduled digest run finished"),
                        Err(DispatchError::AlreadyRunning) => {
                            tracing::warn!("Skipping scheduled digest run, another run is in progress")
                        }
                        Err(err) => tracing::error!(error = ?err, "Scheduled digest run failed"),
                    }
                }
            }
        }

        tracing::info!("Digest scheduler stopped");
    });

    tracing::info!("Digest scheduler started");

    SchedulerHandle { shutdown, task }
}
