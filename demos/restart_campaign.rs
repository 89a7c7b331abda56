//! Restart Campaign: a simulation that outlives its first batch allocation
//!
//! A toy scheduler task moves attempts through queued → running → done by
//! writing a `.phase` file into each attempt directory. The first attempt is
//! killed at its time limit after leaving a checkpoint and a solver log; the
//! driver restarts it and watches the continuation to completion, then the
//! surface-growth series is exported to Parquet.
//!
//! Run with: cargo run --example restart_campaign
//! Set `RUST_LOG=ftx_campaign=debug` to see every step.

use anyhow::Context;
use ftx_campaign::driver;
use ftx_campaign::output::SimulationOutput;
use ftx_campaign::params::{keys, ParameterStore};
use ftx_campaign::run::RunHandle;
use ftx_campaign::Simulation;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const PHASE: &str = ".phase";
const STAGE: &str = "work/workers__xolotlWorker_3";
const FINAL_STAGE: &str = "work/workers__ftridynWorker_2";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DemoRun {
    work_dir: PathBuf,
    parameters: ParameterStore,
    queue: String,
}

impl DemoRun {
    fn phase(&self) -> String {
        fs::read_to_string(self.work_dir.join(PHASE)).unwrap_or_default()
    }
}

impl RunHandle for DemoRun {
    type Batch = String;

    fn from_parts(work_dir: PathBuf, parameters: ParameterStore, queue: String) -> Self {
        Self {
            work_dir,
            parameters,
            queue,
        }
    }

    fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    fn change_work_dir(&mut self, work_dir: PathBuf) {
        self.work_dir = work_dir;
    }

    fn write_files(&mut self, _overwrite: bool) -> ftx_campaign::Result<()> {
        fs::create_dir_all(&self.work_dir)?;
        fs::write(
            self.work_dir.join("input.json"),
            serde_json::to_string_pretty(&self.parameters)?,
        )?;
        Ok(())
    }

    fn start(&mut self) -> ftx_campaign::Result<()> {
        println!("  submit {} to queue {}", self.work_dir.display(), self.queue);
        fs::write(self.work_dir.join(PHASE), "queued")?;
        Ok(())
    }

    fn clean(&mut self) -> ftx_campaign::Result<()> {
        let phase = self.work_dir.join(PHASE);
        if phase.exists() {
            fs::remove_file(phase)?;
        }
        Ok(())
    }

    fn has_started(&self) -> bool {
        !self.phase().is_empty()
    }

    fn is_queueing(&self) -> bool {
        self.phase() == "queued"
    }

    fn is_running(&self) -> bool {
        self.phase() == "running"
    }

    fn has_exceeded_time_limit(&self) -> bool {
        self.phase() == "timeout"
    }

    fn has_finished(&self) -> bool {
        self.phase() == "finished"
    }

    fn has_failed(&self) -> bool {
        self.phase() == "failed"
    }

    fn log_lines(&self) -> ftx_campaign::Result<Vec<String>> {
        let text = fs::read_to_string(self.work_dir.join("ftx.log"))?;
        Ok(text.lines().map(str::to_string).collect())
    }

    fn parameters(&self) -> &ParameterStore {
        &self.parameters
    }

    fn parameters_mut(&mut self) -> &mut ParameterStore {
        &mut self.parameters
    }

    fn batch(&self) -> &String {
        &self.queue
    }
}

/// Advance one attempt by one phase, as a batch system would.
fn advance(dir: &Path) -> std::io::Result<()> {
    let phase = fs::read_to_string(dir.join(PHASE))?;
    let restarted = dir
        .file_name()
        .is_some_and(|n| n.to_string_lossy().starts_with("restart_"));
    let next = match phase.as_str() {
        "queued" => "running",
        "running" if restarted => {
            fs::write(dir.join(STAGE).join("surface.txt"), "2.0 9.1\n3.0 8.8\n")?;
            "finished"
        }
        "running" => {
            fs::create_dir_all(dir.join(STAGE))?;
            fs::create_dir_all(dir.join(FINAL_STAGE))?;
            fs::write(dir.join(STAGE).join("xolotlStop.h5"), "t0\nt1\nt2\n")?;
            fs::write(dir.join(STAGE).join("surface.txt"), "0.0 10.0\n1.0 9.6\n2.0 9.1\n")?;
            fs::write(dir.join(FINAL_STAGE).join("last_TRIDYN.dat"), "He 0.93\n")?;
            fs::write(
                dir.join("ftx.log"),
                "coupling loop 17: check for updates in time steps\n\
                 no update (0.05) (0.85)\n\
                 change in Xolotls\n\
                 ts_adapt_dt_max 0.2\n\
                 driver time (in loop) 6.4\n",
            )?;
            "timeout"
        }
        _ => return Ok(()),
    };
    fs::write(dir.join(PHASE), next)
}

async fn scheduler(root: PathBuf) {
    let mut ticker = tokio::time::interval(Duration::from_millis(30));
    loop {
        ticker.tick().await;
        let Ok(entries) = fs::read_dir(&root) else {
            continue;
        };
        for entry in entries.flatten() {
            if entry.path().join(PHASE).is_file() {
                let _ = advance(&entry.path());
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("=== ftx-campaign: restart campaign ===\n");

    let workspace = tempfile::tempdir()?;
    let root = workspace.path().join("he_flux");

    let mut parameters = ParameterStore::new();
    parameters.set(keys::START_MODE, "INIT");
    parameters.set(keys::XOLOTL_MAX_TS, 0.5);
    let template = DemoRun::from_parts(root.clone(), parameters, "regular".to_string());

    // Truncator stand-in: keep the last line of the checkpoint
    let keep_last_line = |src: &Path, dest: &Path| -> ftx_campaign::Result<()> {
        let text = fs::read_to_string(src)?;
        fs::write(dest, text.lines().last().unwrap_or_default())?;
        Ok(())
    };
    let mut sim = Simulation::new(template, keep_last_line)?;

    let batch_system = tokio::spawn(scheduler(root.clone()));
    let status = driver::watch_with_limit(&mut sim, Duration::from_millis(20), 500)
        .await
        .context("campaign did not finish")?;
    batch_system.abort();

    println!("\n{} {status}", sim.display_name());
    for record in sim.history() {
        println!(
            "  {:<20} {:?} submitted {}",
            record.name(),
            record.kind(),
            record.submitted_at().format("%H:%M:%S%.3f")
        );
    }

    println!("\nContinuation parameters of the last attempt:");
    for (key, value) in sim.current().parameters().iter() {
        println!("  {key:<16} {value}");
    }

    let saved = sim.save(false)?;
    println!("\nSaved simulation to {}", saved.display());

    let mut output = SimulationOutput::new(&sim);
    output.load_surface()?;
    let surface = output.surface()?;
    println!("\nSurface growth ({} points):", surface.len());
    for (t, v) in surface.time.iter().zip(&surface.values) {
        println!("  t = {t:>4.1} s   growth = {v:>5.2}");
    }

    let parquet = workspace.path().join("surface.parquet");
    surface.write_parquet("growth", &parquet)?;
    println!("\nExported {}", parquet.display());

    Ok(())
}
