//! # ftx-campaign: restart orchestration for coupled plasma-surface simulations
//!
//! Long coupled runs outlive the wall-clock allowance of a single batch job.
//! `ftx-campaign` drives such a simulation as a chain of attempts: when the
//! scheduler kills an attempt for exceeding its time limit, the next attempt
//! is seeded from a copy of the previous one, with its checkpoint truncated
//! to the last complete timestep and its solver continuation parameters
//! recovered from the terminated attempt's log.
//!
//! ## Components
//!
//! - [`run::RunHandle`]: one attempt (external collaborator, batch binding)
//! - [`checkpoint::CheckpointTruncator`]: last-timestep reduction (injected)
//! - [`extract::LogParameterExtractor`]: continuation parameters from log text
//! - [`simulation::Simulation`]: attempt history, start/restart, status, `step()`
//! - [`output::SimulationOutput`]: retention and surface-growth series
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use ftx_campaign::checkpoint::CommandTruncator;
//! use ftx_campaign::simulation::Simulation;
//! # use ftx_campaign::run::RunHandle;
//! # fn poll<R: RunHandle>(template: R) -> ftx_campaign::Result<()> {
//!
//! let truncator = CommandTruncator::new("python3").arg("keepLastTS.py");
//! let mut sim = Simulation::new(template, truncator)?;
//!
//! // Owner-side polling loop
//! loop {
//!     sim.step()?;
//!     if sim.status().status.is_terminal() {
//!         break;
//!     }
//!     std::thread::sleep(std::time::Duration::from_secs(600));
//! }
//! println!("{}", sim.status_line());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod checkpoint;
pub mod config;
#[cfg(feature = "tokio")]
pub mod driver;
pub mod error;
pub mod extract;
pub mod fsutil;
pub mod output;
pub mod params;
pub mod run;
pub mod simulation;
pub mod status;

pub use error::{Error, Result};
pub use simulation::{Simulation, StepOutcome};
pub use status::{SimulationStatus, StatusReport};
