//! Periodic execution of lifecycle daemons.
//!
//! A daemon is anything with a `run_once` that performs one bounded cycle and
//! returns a serializable summary. [`run_continuous`] repeats it on a fixed
//! interval, catching and logging cycle failures so a single database outage
//! never ends the loop.

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Summary returned by one daemon cycle.
pub trait CycleSummary: Serialize + Send + Sync {
    /// True when the cycle completed but some isolated unit of work failed.
    fn had_failures(&self) -> bool {
        false
    }
}

#[async_trait]
pub trait Daemon: Send + Sync {
    type Summary: CycleSummary;

    /// Name used in logs and as the evidence directory.
    fn name(&self) -> &'static str;

    /// Runs one cycle.
    ///
    /// # Errors
    /// Returns an error if the cycle could not complete (e.g. the store is unreachable).
    async fn run_once(&self) -> Result<Self::Summary>;
}

/// Runs `daemon` every `period` until `shutdown` turns true.
///
/// The first cycle starts immediately. Returns the number of cycles started.
pub async fn run_continuous<D: Daemon + ?Sized>(
    daemon: &D,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> u64 {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut cycles = 0u64;

    info!(daemon = daemon.name(), period_secs = period.as_secs(), "Starting continuous loop");

    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            biased;

            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }

            _ = interval.tick() => {
                cycles += 1;
                match daemon.run_once().await {
                    Ok(summary) if summary.had_failures() => {
                        warn!(daemon = daemon.name(), cycle = cycles, "Cycle completed with isolated failures");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!(daemon = daemon.name(), cycle = cycles, error = %format!("{e:#}"), "Cycle failed; continuing");
                    }
                }
            }
        }
    }

    info!(daemon = daemon.name(), cycles, "Continuous loop stopped");
    cycles
}
