//! Periodic sweep driver.
//!
//! The engine's `sweep()` is synchronous; this runner is the embedding
//! glue that invokes it on a fixed interval from a tokio task. The host
//! constructs the runner and hands it a closure over its own stores — no
//! global scheduler state, so tests drive the closure with fakes.

use std::ops::ControlFlow;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use pointmint_types::EngineConfig;

use crate::sweeper::SweepReport;

/// Drives a sweep closure on a fixed interval.
pub struct SweepRunner {
    interval: Duration,
}

impl SweepRunner {
    /// Create a runner with the given tick interval.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Runner configured from engine settings.
    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(Duration::from_secs(config.sweep_interval_secs))
    }

    /// Tick until the closure breaks. The first tick fires immediately;
    /// missed ticks are delayed, not bursted.
    pub async fn run<F>(self, mut tick: F)
    where
        F: FnMut() -> ControlFlow<(), SweepReport> + Send,
    {
        let mut timer = tokio::time::interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            timer.tick().await;
            match tick() {
                ControlFlow::Continue(report) => {
                    if !report.is_empty() {
                        tracing::debug!(
                            swept = report.swept.len(),
                            failures = report.failures,
                            "scheduled sweep tick"
                        );
                    }
                }
                ControlFlow::Break(()) => {
                    tracing::info!("sweep runner stopping");
                    return;
                }
            }
        }
    }
}
