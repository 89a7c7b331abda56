//! Async polling driver
//!
//! The orchestrator never blocks on a job; something has to tick it. This
//! loop is the owner side of that contract: tick, report, stop once the
//! simulation reaches a terminal status.
//!
//! ```rust,no_run
//! # use ftx_campaign::{simulation::Simulation, run::RunHandle};
//! # async fn example<R: RunHandle>(sim: &mut Simulation<R>) -> ftx_campaign::Result<()> {
//! use std::time::Duration;
//!
//! let status = ftx_campaign::driver::watch(sim, Duration::from_secs(600)).await?;
//! println!("{} {status}", sim.display_name());
//! # Ok(())
//! # }
//! ```

use crate::run::RunHandle;
use crate::simulation::{Simulation, StepOutcome};
use crate::status::SimulationStatus;
use crate::{Error, Result};
use std::time::Duration;
use tracing::info;

/// Tick `sim` every `interval` until it finishes or fails.
///
/// # Errors
///
/// `InvalidState` for a zero `interval`; otherwise the first error returned
/// by [`Simulation::step`] stops the loop.
pub async fn watch<R: RunHandle>(
    sim: &mut Simulation<R>,
    interval: Duration,
) -> Result<SimulationStatus> {
    watch_with_limit(sim, interval, usize::MAX).await
}

/// Like [`watch`], giving up after `max_ticks` ticks.
///
/// # Errors
///
/// `InvalidState` for a zero `interval` or when the limit is reached before a
/// terminal status, or the first error from [`Simulation::step`].
pub async fn watch_with_limit<R: RunHandle>(
    sim: &mut Simulation<R>,
    interval: Duration,
    max_ticks: usize,
) -> Result<SimulationStatus> {
    if interval.is_zero() {
        return Err(Error::InvalidState(
            "polling interval must be non-zero".to_string(),
        ));
    }
    let mut ticker = tokio::time::interval(interval);
    for tick in 0..max_ticks {
        ticker.tick().await;
        match sim.step()? {
            StepOutcome::Started => info!(tick, "initial attempt submitted"),
            StepOutcome::Restarted(n) => info!(tick, restart = n, "restart submitted"),
            StepOutcome::Idle => {}
        }
        let report = sim.status();
        info!(tick, "{report}");
        if report.status.is_terminal() {
            return Ok(report.status);
        }
    }
    Err(Error::InvalidState(format!(
        "{} still {} after {max_ticks} polls",
        sim.display_name(),
        sim.status().status
    )))
}
