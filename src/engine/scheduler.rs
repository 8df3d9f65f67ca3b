//! Always-running loop firing one recycling pass per local calendar day.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate, Timelike};
use tokio::sync::watch;
use tracing::{info, warn};

use super::clock::Clock;
use super::runner::RecycleCycle;
use crate::repository::Store;

/// Firing window and poll cadence. Defaults poll every 60s and fire inside
/// the first ten minutes after local midnight.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub poll_interval: Duration,
    /// Local hour the window opens at.
    pub window_hour: u32,
    /// Width of the window in minutes from the top of the hour.
    pub window_minutes: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            window_hour: 0,
            window_minutes: 10,
        }
    }
}

/// True when a pass should fire now: inside the window and not yet run
/// today. The poll interval must stay shorter than the window or a day can
/// be skipped entirely.
pub(crate) fn due(
    now_local: DateTime<FixedOffset>,
    last_run: Option<NaiveDate>,
    config: &SchedulerConfig,
) -> bool {
    now_local.hour() == config.window_hour
        && now_local.minute() < config.window_minutes
        && last_run != Some(now_local.date_naive())
}

/// Long-lived daily scheduler, decoupled from request traffic.
pub struct RecycleScheduler<S> {
    runner: Arc<RecycleCycle<S>>,
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
}

impl<S> RecycleScheduler<S>
where
    S: Store + 'static,
{
    pub fn new(runner: Arc<RecycleCycle<S>>, clock: Arc<dyn Clock>, config: SchedulerConfig) -> Self {
        Self {
            runner,
            clock,
            config,
        }
    }

    /// Runs until `stop` flips to true. Exits only between cycles; each pass
    /// is independently transactional, so cancellation is always safe there.
    ///
    /// A failed pass is logged and discarded without advancing the last-run
    /// date, so it is retried on the next tick. The loop itself must survive
    /// any pass error.
    pub async fn run(self, mut stop: watch::Receiver<bool>) {
        let mut last_run: Option<NaiveDate> = None;
        loop {
            if *stop.borrow() {
                break;
            }

            let now_local = self.clock.now_local();
            if due(now_local, last_run, &self.config) {
                match self.runner.run_once() {
                    Ok(outcome) => {
                        last_run = Some(now_local.date_naive());
                        info!(
                            recycled = outcome.recycled_count,
                            before_notified = outcome.before_notified_count,
                            after_notified = outcome.after_notified_count,
                            "daily recycle pass complete"
                        );
                    }
                    Err(err) => {
                        warn!(error = %err, "recycle pass failed, retrying next tick");
                    }
                }
            }

            tokio::select! {
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }
        info!("recycle scheduler stopped");
    }
}
