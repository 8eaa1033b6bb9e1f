/// Periodic scheduler loop
///
/// Runs the scheduler once at startup (unless disabled) and then on a fixed
/// interval. Ticks missed while a run was in progress are skipped rather than
/// replayed back to back. Cancelling the shutdown token stops the loop; a run
/// already in progress finishes first.
///
/// ```text
/// SchedulerRunner
///   ├─> tick (every SCHEDULER_INTERVAL_SECS)
///   ├─> ScheduledJob::run
///   └─> shutdown token cancelled → exit
/// ```

use crate::config::SchedulerConfig;
use crate::scheduler::Scheduler;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Work executed on every tick
#[async_trait]
pub trait ScheduledJob: Send + Sync {
    async fn run(&self, now: DateTime<Utc>);
}

#[async_trait]
impl ScheduledJob for Scheduler {
    async fn run(&self, now: DateTime<Utc>) {
        self.run_scheduler_jobs(now).await;
    }
}

pub struct SchedulerRunner {
    job: Arc<dyn ScheduledJob>,

    config: SchedulerConfig,

    shutdown_token: CancellationToken,
}

impl SchedulerRunner {
    pub fn new(job: Arc<dyn ScheduledJob>, config: SchedulerConfig) -> Self {
        SchedulerRunner {
            job,
            config,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Cancel the returned token to stop the loop
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Runs until the shutdown token is cancelled
    ///
    /// Returns how many runs were executed.
    pub async fn run(&self) -> u64 {
        let period = self.config.interval();
        let start = if self.config.run_on_start {
            Instant::now()
        } else {
            Instant::now() + period
        };

        let mut ticker = interval_at(start, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            interval_secs = self.config.interval_secs,
            run_on_start = self.config.run_on_start,
            "Scheduler loop started"
        );

        let mut runs = 0;
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown_token.cancelled() => break,
                _ = ticker.tick() => {
                    self.job.run(Utc::now()).await;
                    runs += 1;
                }
            }
        }

        tracing::info!(runs, "Scheduler loop stopped");
        runs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct CountingJob {
        runs: AtomicU64,
    }

    #[async_trait]
    impl ScheduledJob for CountingJob {
        async fn run(&self, _now: DateTime<Utc>) {
            self.runs.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn config(run_on_start: bool) -> SchedulerConfig {
        SchedulerConfig {
            interval_secs: 60,
            run_on_start,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_on_start_and_every_interval() {
        let job = Arc::new(CountingJob::default());
        let runner = SchedulerRunner::new(job.clone(), config(true));
        let token = runner.shutdown_token();

        let handle = tokio::spawn(async move { runner.run().await });

        tokio::time::sleep(Duration::from_secs(150)).await;
        token.cancel();

        // t=0, t=60, t=120
        assert_eq!(handle.await.unwrap(), 3);
        assert_eq!(job.runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_one_interval_without_run_on_start() {
        let job = Arc::new(CountingJob::default());
        let runner = SchedulerRunner::new(job.clone(), config(false));
        let token = runner.shutdown_token();

        let handle = tokio::spawn(async move { runner.run().await });

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(job.runs.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(40)).await;
        token.cancel();

        assert_eq!(handle.await.unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_start_never_runs() {
        let job = Arc::new(CountingJob::default());
        let runner = SchedulerRunner::new(job.clone(), config(true));
        runner.shutdown_token().cancel();

        assert_eq!(runner.run().await, 0);
        assert_eq!(job.runs.load(Ordering::SeqCst), 0);
    }
}
