//! Post-run series: helium retention and surface growth
//!
//! Every attempt writes its own slice of the time series into the checkpoint
//! stage directory, and a restarted attempt inherits (and may rewrite) its
//! predecessor's rows. Loading stacks the tables of all attempts, sorts rows
//! and drops exact duplicates before deriving the presentation series.
//!
//! ## Derived series
//!
//! - surface growth: `first - height` (baseline subtracted)
//! - retention \[%\]: `100 * (content + bulk) / (fluence * sticking coefficient)`,
//!   first row skipped

use crate::config::SimulationLayout;
use crate::fsutil::write_atomic;
use crate::run::RunHandle;
use crate::simulation::Simulation;
use crate::{Error, Result};
use arrow::array::{ArrayRef, Float64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

// Retention table columns
const COL_TIME: usize = 0;
const COL_FLUENCE: usize = 1;
const COL_BULK: usize = 2;
const COL_CONTENT: usize = 5;

/// A time series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    /// Time \[s\]
    pub time: Vec<f64>,
    /// Value at each time
    pub values: Vec<f64>,
}

impl Series {
    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.time.len()
    }

    /// Check if the series has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Arrow batch with columns `time` and `value_column`.
    ///
    /// # Errors
    ///
    /// Returns error if the batch cannot be assembled.
    pub fn to_record_batch(&self, value_column: &str) -> Result<RecordBatch> {
        let schema = Arc::new(Schema::new(vec![
            Field::new("time", DataType::Float64, false),
            Field::new(value_column, DataType::Float64, false),
        ]));
        let columns: Vec<ArrayRef> = vec![
            Arc::new(Float64Array::from(self.time.clone())),
            Arc::new(Float64Array::from(self.values.clone())),
        ];
        Ok(RecordBatch::try_new(schema, columns)?)
    }

    /// Write the series to a Parquet file.
    ///
    /// # Errors
    ///
    /// IO or Parquet errors.
    pub fn write_parquet<P: AsRef<Path>>(&self, value_column: &str, path: P) -> Result<()> {
        let batch = self.to_record_batch(value_column)?;
        let file = File::create(path.as_ref())?;
        let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
        writer.write(&batch)?;
        writer.close()?;
        debug!(path = %path.as_ref().display(), rows = batch.num_rows(), "series written");
        Ok(())
    }
}

/// Read a whitespace-separated numeric table.
///
/// Returns `None` for an absent or empty file. Blank lines and `#` comments
/// are skipped.
///
/// # Errors
///
/// `Table` on a non-numeric token or rows of unequal width.
pub fn read_table(path: &Path) -> Result<Option<Vec<Vec<f64>>>> {
    if !path.is_file() || fs::metadata(path)?.len() == 0 {
        return Ok(None);
    }
    let text = fs::read_to_string(path)?;
    let mut rows: Vec<Vec<f64>> = Vec::new();
    for (number, line) in text.lines().enumerate() {
        let data = line.split('#').next().unwrap_or_default().trim();
        if data.is_empty() {
            continue;
        }
        let row = data
            .split_whitespace()
            .map(|tok| {
                tok.parse::<f64>().map_err(|e| Error::Table {
                    path: path.to_path_buf(),
                    reason: format!("line {}: {tok:?} is not a number ({e})", number + 1),
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        if let Some(first) = rows.first() {
            if first.len() != row.len() {
                return Err(Error::Table {
                    path: path.to_path_buf(),
                    reason: format!(
                        "line {} has {} columns, expected {}",
                        number + 1,
                        row.len(),
                        first.len()
                    ),
                });
            }
        }
        rows.push(row);
    }
    Ok(Some(rows))
}

fn pairs(path: &Path, rows: Vec<Vec<f64>>) -> Result<Vec<Vec<f64>>> {
    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    if flat.len() % 2 != 0 {
        return Err(Error::Table {
            path: path.to_path_buf(),
            reason: format!("{} values cannot be reshaped into pairs", flat.len()),
        });
    }
    Ok(flat.chunks(2).map(<[f64]>::to_vec).collect())
}

fn compare_rows(a: &[f64], b: &[f64]) -> Ordering {
    a.iter()
        .zip(b)
        .map(|(x, y)| x.total_cmp(y))
        .find(|o| o.is_ne())
        .unwrap_or_else(|| a.len().cmp(&b.len()))
}

/// Stack tables, sort rows lexicographically and drop exact duplicates.
///
/// # Errors
///
/// `Table` if the tables do not share a width or hold no rows at all.
pub fn stack_unique(origin: &Path, tables: Vec<Vec<Vec<f64>>>) -> Result<Vec<Vec<f64>>> {
    let mut rows: Vec<Vec<f64>> = tables.into_iter().flatten().collect();
    let Some(width) = rows.first().map(Vec::len) else {
        return Err(Error::Table {
            path: origin.to_path_buf(),
            reason: "no rows in any attempt".to_string(),
        });
    };
    if rows.iter().any(|r| r.len() != width) {
        return Err(Error::Table {
            path: origin.to_path_buf(),
            reason: format!("tables disagree on column count (expected {width})"),
        });
    }
    rows.sort_by(|a, b| compare_rows(a, b));
    rows.dedup_by(|a, b| compare_rows(a, b).is_eq());
    Ok(rows)
}

/// Retention and surface-growth series of a simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationOutput {
    root: PathBuf,
    attempt_dirs: Vec<PathBuf>,
    layout: SimulationLayout,
    retention: Option<Series>,
    surface: Option<Series>,
}

impl SimulationOutput {
    /// Capture the attempts of `sim` in chronological order.
    #[must_use]
    pub fn new<R: RunHandle>(sim: &Simulation<R>) -> Self {
        Self::from_dirs(
            sim.root(),
            sim.attempts().map(|r| r.work_dir().to_path_buf()).collect(),
            sim.config().layout.clone(),
        )
    }

    /// Build directly from attempt directories.
    #[must_use]
    pub fn from_dirs(root: &Path, attempt_dirs: Vec<PathBuf>, layout: SimulationLayout) -> Self {
        Self {
            root: root.to_path_buf(),
            attempt_dirs,
            layout,
            retention: None,
            surface: None,
        }
    }

    /// Attempt directories the series are read from.
    #[must_use]
    pub fn attempt_dirs(&self) -> &[PathBuf] {
        &self.attempt_dirs
    }

    fn collect(&self, file: &str, reshape_pairs: bool) -> Result<Vec<Vec<Vec<f64>>>> {
        let mut tables = Vec::new();
        for dir in &self.attempt_dirs {
            let path = self.layout.checkpoint_stage_dir(dir).join(file);
            if let Some(rows) = read_table(&path)? {
                tables.push(if reshape_pairs { pairs(&path, rows)? } else { rows });
            }
        }
        Ok(tables)
    }

    /// Load and baseline-subtract surface growth.
    ///
    /// # Errors
    ///
    /// Table errors, or no surface rows in any attempt.
    pub fn load_surface(&mut self) -> Result<()> {
        let mut tables = self.collect(&self.layout.surface_file, true)?;
        tables.extend(self.collect(&self.layout.all_surface_file, false)?);
        let rows = stack_unique(&self.root, tables)?;
        if rows[0].len() < 2 {
            return Err(Error::Table {
                path: self.root.clone(),
                reason: "surface rows need 2 columns".to_string(),
            });
        }
        let baseline = rows[0][1];
        let series = Series {
            time: rows.iter().map(|r| r[0]).collect(),
            values: rows.iter().map(|r| baseline - r[1]).collect(),
        };
        info!(points = series.len(), "surface growth loaded");
        self.surface = Some(series);
        Ok(())
    }

    /// Load retention normalised by the sticking coefficient.
    ///
    /// # Errors
    ///
    /// Table errors, no retention rows, or sticking coefficient errors.
    pub fn load_retention(&mut self) -> Result<()> {
        let mut tables = self.collect(&self.layout.retention_file, false)?;
        tables.extend(self.collect(&self.layout.all_retention_file, false)?);
        let rows = stack_unique(&self.root, tables)?;
        if rows[0].len() <= COL_CONTENT {
            return Err(Error::Table {
                path: self.root.clone(),
                reason: format!("retention rows need {} columns", COL_CONTENT + 1),
            });
        }
        let sticking = self.sticking_coefficient()?;
        let series = Series {
            time: rows[1..].iter().map(|r| r[COL_TIME]).collect(),
            values: rows[1..]
                .iter()
                .map(|r| 100.0 * (r[COL_CONTENT] + r[COL_BULK]) / (r[COL_FLUENCE] * sticking))
                .collect(),
        };
        info!(points = series.len(), sticking, "retention loaded");
        self.retention = Some(series);
        Ok(())
    }

    /// Helium sticking coefficient from the latest attempt's descriptor file:
    /// the last token of the first line starting with `He`.
    ///
    /// # Errors
    ///
    /// `InvalidState` without attempts, `MissingFile` without descriptor,
    /// `Table` if no `He` entry parses.
    pub fn sticking_coefficient(&self) -> Result<f64> {
        let dir = self.attempt_dirs.last().ok_or_else(|| {
            Error::InvalidState("simulation has no attempts to read from".to_string())
        })?;
        let path = self
            .layout
            .checkpoint_stage_dir(dir)
            .join(&self.layout.descriptor_file);
        if !path.is_file() {
            return Err(Error::MissingFile(path));
        }
        let text = fs::read_to_string(&path)?;
        let line = text
            .lines()
            .find(|l| l.starts_with("He"))
            .ok_or_else(|| Error::Table {
                path: path.clone(),
                reason: "no He entry".to_string(),
            })?;
        let token = line.split_whitespace().last().unwrap_or_default();
        token.parse::<f64>().map_err(|e| Error::Table {
            path: path.clone(),
            reason: format!("He entry {token:?} is not a number ({e})"),
        })
    }

    /// Surface growth series.
    ///
    /// # Errors
    ///
    /// `NotLoaded` before [`load_surface`](Self::load_surface).
    pub fn surface(&self) -> Result<&Series> {
        self.surface.as_ref().ok_or(Error::NotLoaded("surface"))
    }

    /// Retention series.
    ///
    /// # Errors
    ///
    /// `NotLoaded` before [`load_retention`](Self::load_retention).
    pub fn retention(&self) -> Result<&Series> {
        self.retention.as_ref().ok_or(Error::NotLoaded("retention"))
    }

    /// Surface series held flat until `t_end`, for step plots.
    ///
    /// # Errors
    ///
    /// `NotLoaded` before [`load_surface`](Self::load_surface).
    pub fn surface_until(&self, t_end: f64) -> Result<Series> {
        let mut series = self.surface()?.clone();
        if let Some(&last) = series.values.last() {
            series.time.push(t_end);
            series.values.push(last);
        }
        Ok(series)
    }

    /// Location of the persisted output.
    #[must_use]
    pub fn blob_path(&self) -> PathBuf {
        self.root.join(&self.layout.output_blob)
    }

    /// Persist to [`blob_path`](Self::blob_path).
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if present and `overwrite` is false (left untouched).
    pub fn save(&self, overwrite: bool) -> Result<PathBuf> {
        let path = self.blob_path();
        if path.is_file() && !overwrite {
            return Err(Error::AlreadyExists(path));
        }
        let json = serde_json::to_string_pretty(self)?;
        write_atomic(&path, json.as_bytes())?;
        Ok(path)
    }

    /// Load a persisted output.
    ///
    /// # Errors
    ///
    /// `MissingFile` if `path` is absent.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::MissingFile(path.to_path_buf()));
        }
        Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
    }
}
