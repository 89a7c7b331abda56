//! Continuation parameters recovered from a terminated attempt's log
//!
//! The coupled driver reports its progress as free text. Each quantity the
//! next attempt needs is found by locating the **last** line carrying a
//! known marker (the log is append-only, later reports supersede earlier
//! ones) and reading a token at a fixed offset from it.
//!
//! ## Rules
//!
//! | Marker | Line | Token(s) |
//! |---|---|---|
//! | `check for updates in time steps` | marker | 3rd, last char dropped → loop count |
//! | ↳ next line contains `no update` | marker + 1 | 1st/2nd `(...)` group → loop step / stop time |
//! | ↳ otherwise | marker + 3 | 7th → loop step, 10th minus first char → stop time |
//! | `change in Xolotls` | marker + 1 | last → adaptive step cap |
//! | `driver time (in loop)` | marker | last → elapsed time |
//! | `updated the values of voidPortion` (optional) | marker | last → void portion **and** grid size |
//!
//! A missing required marker, an offset past the end of the log, or a
//! malformed token aborts extraction. Nothing falls back to a default.

use crate::config::RestartPolicy;
use crate::params::{keys, ParameterStore, ParameterValue};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Loop-count report.
pub const LOOP_MARKER: &str = "check for updates in time steps";
/// Qualifier on the line after [`LOOP_MARKER`] when the step was unchanged.
pub const NO_UPDATE: &str = "no update";
/// Adaptive-step report, value on the following line.
pub const XOLOTL_CHANGE_MARKER: &str = "change in Xolotls";
/// Elapsed driver time report.
pub const DRIVER_TIME_MARKER: &str = "driver time (in loop)";
/// Geometry update report.
pub const VOID_PORTION_MARKER: &str = "updated the values of voidPortion";

/// Index of the last line containing `marker`, `None` if it never appears.
///
/// ```rust
/// use ftx_campaign::extract::last_occurrence;
///
/// let log = ["a marker", "b", "c marker"];
/// assert_eq!(last_occurrence(&log, "marker"), Some(2));
/// assert_eq!(last_occurrence(&log, "absent"), None);
/// ```
#[must_use]
pub fn last_occurrence<S: AsRef<str>>(lines: &[S], marker: &str) -> Option<usize> {
    lines.iter().rposition(|line| line.as_ref().contains(marker))
}

/// Numeric solver settings seeding a restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinuationParameters {
    /// Coupling loop counter
    pub loop_count: i64,
    /// Coupling loop time step
    pub loop_time_step: f64,
    /// Stop time of the interrupted segment
    pub stop_time: f64,
    /// Adaptive step cap
    pub adaptive_dt_max: f64,
    /// Elapsed driver time at the last report
    pub elapsed_time: f64,
    /// Maximum solver time step for the next attempt
    pub max_time_step: ParameterValue,
    /// Void portion of the grid, if reported
    pub void_portion: Option<f64>,
    /// Grid size, if reported. Read from the same token as `void_portion`.
    pub grid_size: Option<f64>,
}

impl ContinuationParameters {
    /// Parameter-store entries, keyed by solver input names.
    #[must_use]
    pub fn entries(&self) -> Vec<(&'static str, ParameterValue)> {
        let mut entries = vec![
            (keys::LOOP_N, ParameterValue::Int(self.loop_count)),
            (keys::LOOP_TIME_STEP, ParameterValue::Float(self.loop_time_step)),
            (keys::START_STOP, ParameterValue::Float(self.stop_time)),
            (keys::TS_ADAPT_DT_MAX, ParameterValue::Float(self.adaptive_dt_max)),
            (keys::INIT_TIME, ParameterValue::Float(self.elapsed_time)),
            (keys::XOLOTL_MAX_TS, self.max_time_step.clone()),
        ];
        if let Some(v) = self.void_portion {
            entries.push((keys::VOID_PORTION, ParameterValue::Float(v)));
        }
        if let Some(v) = self.grid_size {
            entries.push((keys::GRID_SIZE, ParameterValue::Float(v)));
        }
        entries
    }
}

/// Fields filled in by the marker rules.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ExtractedFields {
    /// Coupling loop counter
    pub loop_count: Option<i64>,
    /// Coupling loop time step
    pub loop_time_step: Option<f64>,
    /// Stop time
    pub stop_time: Option<f64>,
    /// Adaptive step cap
    pub adaptive_dt_max: Option<f64>,
    /// Elapsed driver time
    pub elapsed_time: Option<f64>,
    /// Void portion
    pub void_portion: Option<f64>,
    /// Grid size
    pub grid_size: Option<f64>,
}

type RuleFn = fn(&[&str], usize, &mut ExtractedFields) -> Result<()>;

/// One marker and the token reads anchored on its last occurrence.
#[derive(Clone, Copy)]
pub struct MarkerRule {
    /// Literal substring searched for
    pub marker: &'static str,
    /// Whether absence of the marker is an error
    pub required: bool,
    apply: RuleFn,
}

impl MarkerRule {
    /// Run this rule against a log, anchoring on the marker's last occurrence.
    ///
    /// # Errors
    ///
    /// `MarkerNotFound` for a missing required marker, or any read error.
    pub fn run(&self, lines: &[&str], fields: &mut ExtractedFields) -> Result<()> {
        match last_occurrence(lines, self.marker) {
            Some(anchor) => (self.apply)(lines, anchor, fields),
            None if self.required => Err(Error::MarkerNotFound {
                marker: self.marker,
            }),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for MarkerRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkerRule")
            .field("marker", &self.marker)
            .field("required", &self.required)
            .finish_non_exhaustive()
    }
}

/// Marker rules, applied in order.
pub const RULES: [MarkerRule; 4] = [
    MarkerRule {
        marker: LOOP_MARKER,
        required: true,
        apply: read_loop,
    },
    MarkerRule {
        marker: XOLOTL_CHANGE_MARKER,
        required: true,
        apply: read_adaptive_cap,
    },
    MarkerRule {
        marker: DRIVER_TIME_MARKER,
        required: true,
        apply: read_elapsed_time,
    },
    MarkerRule {
        marker: VOID_PORTION_MARKER,
        required: false,
        apply: read_geometry,
    },
];

fn read_loop(lines: &[&str], anchor: usize, fields: &mut ExtractedFields) -> Result<()> {
    let marker = LOOP_MARKER;
    let count = token(line_at(lines, marker, anchor)?, marker, 2)?;
    fields.loop_count = Some(parse_i64(marker, drop_last_char(count))?);

    let next = line_at(lines, marker, anchor + 1)?;
    if next.contains(NO_UPDATE) {
        fields.loop_time_step = Some(parse_f64(marker, paren_group(next, marker, 1)?)?);
        fields.stop_time = Some(parse_f64(marker, paren_group(next, marker, 2)?)?);
    } else {
        let report = line_at(lines, marker, anchor + 3)?;
        fields.loop_time_step = Some(parse_f64(marker, token(report, marker, 6)?)?);
        fields.stop_time = Some(parse_f64(
            marker,
            drop_first_char(token(report, marker, 9)?),
        )?);
    }
    Ok(())
}

fn read_adaptive_cap(lines: &[&str], anchor: usize, fields: &mut ExtractedFields) -> Result<()> {
    let marker = XOLOTL_CHANGE_MARKER;
    let value = last_token(line_at(lines, marker, anchor + 1)?, marker)?;
    fields.adaptive_dt_max = Some(parse_f64(marker, value)?);
    Ok(())
}

fn read_elapsed_time(lines: &[&str], anchor: usize, fields: &mut ExtractedFields) -> Result<()> {
    let marker = DRIVER_TIME_MARKER;
    let value = last_token(line_at(lines, marker, anchor)?, marker)?;
    fields.elapsed_time = Some(parse_f64(marker, value)?);
    Ok(())
}

// Both fields read the same token; see the voidPortion log format.
fn read_geometry(lines: &[&str], anchor: usize, fields: &mut ExtractedFields) -> Result<()> {
    let marker = VOID_PORTION_MARKER;
    let line = line_at(lines, marker, anchor)?;
    fields.void_portion = Some(parse_f64(marker, last_token(line, marker)?)?);
    fields.grid_size = Some(parse_f64(marker, last_token(line, marker)?)?);
    Ok(())
}

fn line_at<'a>(lines: &[&'a str], marker: &'static str, index: usize) -> Result<&'a str> {
    lines
        .get(index)
        .copied()
        .ok_or(Error::LineOutOfRange {
            marker,
            line: index,
        })
}

fn token<'a>(line: &'a str, marker: &'static str, index: usize) -> Result<&'a str> {
    line.split_whitespace()
        .nth(index)
        .ok_or_else(|| Error::MalformedToken {
            marker,
            token: String::new(),
            reason: format!("missing: line has fewer than {} tokens", index + 1),
        })
}

fn last_token<'a>(line: &'a str, marker: &'static str) -> Result<&'a str> {
    line.split_whitespace()
        .last()
        .ok_or_else(|| Error::MalformedToken {
            marker,
            token: String::new(),
            reason: "missing: line is blank".to_string(),
        })
}

fn paren_group<'a>(line: &'a str, marker: &'static str, index: usize) -> Result<&'a str> {
    line.split('(')
        .nth(index)
        .and_then(|rest| rest.split(')').next())
        .ok_or_else(|| Error::MalformedToken {
            marker,
            token: line.to_string(),
            reason: format!("has no parenthesised group #{index}"),
        })
}

fn drop_last_char(token: &str) -> &str {
    token
        .char_indices()
        .last()
        .map_or(token, |(i, _)| &token[..i])
}

fn drop_first_char(token: &str) -> &str {
    let mut chars = token.chars();
    chars.next();
    chars.as_str()
}

fn parse_f64(marker: &'static str, token: &str) -> Result<f64> {
    token
        .trim()
        .parse()
        .map_err(|e: std::num::ParseFloatError| Error::MalformedToken {
            marker,
            token: token.to_string(),
            reason: format!("is not a float ({e})"),
        })
}

fn parse_i64(marker: &'static str, token: &str) -> Result<i64> {
    token
        .trim()
        .parse()
        .map_err(|e: std::num::ParseIntError| Error::MalformedToken {
            marker,
            token: token.to_string(),
            reason: format!("is not an integer ({e})"),
        })
}

/// Rebuilds continuation parameters from a terminated attempt's log.
#[derive(Debug, Clone)]
pub struct LogParameterExtractor {
    elapsed_time_threshold: f64,
    reduced_max_time_step: f64,
}

impl Default for LogParameterExtractor {
    fn default() -> Self {
        Self::new(&RestartPolicy::default())
    }
}

impl LogParameterExtractor {
    /// Create an extractor using the step-cap thresholds of `policy`.
    #[must_use]
    pub const fn new(policy: &RestartPolicy) -> Self {
        Self {
            elapsed_time_threshold: policy.elapsed_time_threshold,
            reduced_max_time_step: policy.reduced_max_time_step,
        }
    }

    /// Apply every marker rule to `lines`.
    ///
    /// # Errors
    ///
    /// Any rule failure; see the module docs.
    pub fn scan<S: AsRef<str>>(&self, lines: &[S]) -> Result<ExtractedFields> {
        let lines: Vec<&str> = lines.iter().map(AsRef::as_ref).collect();
        let mut fields = ExtractedFields::default();
        for rule in &RULES {
            rule.run(&lines, &mut fields)?;
        }
        Ok(fields)
    }

    /// Extract continuation parameters.
    ///
    /// `current` is the parameter store of the attempt being continued; its
    /// `XOLOTL_MAX_TS` is kept when the run ended early (elapsed time below
    /// the threshold) and replaced by the reduced cap otherwise.
    ///
    /// # Errors
    ///
    /// Parse errors from [`scan`](Self::scan), or `MissingParameter` if the
    /// step cap must be kept but `current` has none.
    pub fn extract<S: AsRef<str>>(
        &self,
        lines: &[S],
        current: &ParameterStore,
    ) -> Result<ContinuationParameters> {
        let fields = self.scan(lines)?;
        let (Some(loop_count), Some(loop_time_step), Some(stop_time)) =
            (fields.loop_count, fields.loop_time_step, fields.stop_time)
        else {
            return Err(Error::MarkerNotFound {
                marker: LOOP_MARKER,
            });
        };
        let adaptive_dt_max = fields.adaptive_dt_max.ok_or(Error::MarkerNotFound {
            marker: XOLOTL_CHANGE_MARKER,
        })?;
        let elapsed_time = fields.elapsed_time.ok_or(Error::MarkerNotFound {
            marker: DRIVER_TIME_MARKER,
        })?;

        let max_time_step = if elapsed_time < self.elapsed_time_threshold {
            current
                .get(keys::XOLOTL_MAX_TS)
                .cloned()
                .ok_or_else(|| Error::MissingParameter(keys::XOLOTL_MAX_TS.to_string()))?
        } else {
            ParameterValue::Float(self.reduced_max_time_step)
        };

        Ok(ContinuationParameters {
            loop_count,
            loop_time_step,
            stop_time,
            adaptive_dt_max,
            elapsed_time,
            max_time_step,
            void_portion: fields.void_portion,
            grid_size: fields.grid_size,
        })
    }
}
