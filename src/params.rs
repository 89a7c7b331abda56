//! Named solver parameter store
//!
//! Every attempt owns one store. Restarts clone it, never share it, so a
//! retired attempt's inputs cannot change behind its back.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Solver input keys touched by restart seeding.
pub mod keys {
    /// Solver start mode (`INIT` / `RESTART`)
    pub const START_MODE: &str = "START_MODE";
    /// Absolute time-stepper tolerance
    pub const TS_ATOL: &str = "ts_atol";
    /// Relative time-stepper tolerance
    pub const TS_RTOL: &str = "ts_rtol";
    /// Coupling loop counter
    pub const LOOP_N: &str = "LOOP_N";
    /// Coupling loop time step
    pub const LOOP_TIME_STEP: &str = "LOOP_TIME_STEP";
    /// Stop time of the current solver segment
    pub const START_STOP: &str = "start_stop";
    /// Adaptive step cap
    pub const TS_ADAPT_DT_MAX: &str = "ts_adapt_dt_max";
    /// Elapsed driver time at the last report
    pub const INIT_TIME: &str = "INIT_TIME";
    /// Maximum solver time step
    pub const XOLOTL_MAX_TS: &str = "XOLOTL_MAX_TS";
    /// Void portion of the grid
    pub const VOID_PORTION: &str = "voidPortion";
    /// Grid size
    pub const GRID_SIZE: &str = "grid_size";
}

/// A single parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// Free text value
    Text(String),
}

impl ParameterValue {
    /// Numeric view of the value. Text values yield `None`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Text(_) => None,
        }
    }

    /// Integer view of the value. Only `Int` yields a value.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Text view of the value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

impl From<i64> for ParameterValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for ParameterValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ParameterValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// Ordered name → value map of solver inputs.
///
/// # Example
///
/// ```rust
/// use ftx_campaign::params::{ParameterStore, ParameterValue};
///
/// let mut store = ParameterStore::new();
/// store.set("ts_atol", 1e-3);
/// assert_eq!(store.get("ts_atol"), Some(&ParameterValue::Float(1e-3)));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterStore {
    values: BTreeMap<String, ParameterValue>,
}

impl ParameterStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a value by name.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ParameterValue> {
        self.values.get(key)
    }

    /// Set a value, overwriting any previous one.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ParameterValue>) {
        self.values.insert(key.into(), value.into());
    }

    /// Check if a key is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Overlay another set of values; later values win.
    pub fn merge<I, K>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (K, ParameterValue)>,
        K: Into<String>,
    {
        for (key, value) in entries {
            self.values.insert(key.into(), value);
        }
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over parameters in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParameterValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<ParameterValue>> FromIterator<(K, V)> for ParameterStore {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
