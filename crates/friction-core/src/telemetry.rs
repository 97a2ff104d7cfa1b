//! Telemetry value types shared by the store and the ingestion path

use serde::{Deserialize, Serialize};
use std::fmt;

/// The two monitored channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Scalar that drives band classification (the friction estimate)
    PrimaryScalar,
    /// Scalar compared against the saturation threshold
    SaturationFlagSource,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::PrimaryScalar => write!(f, "primary"),
            Metric::SaturationFlagSource => write!(f, "saturation"),
        }
    }
}

/// Snapshot of one slot as seen by a reader
///
/// `observed_at` is a logical sequence stamp read before `raw_value`: the
/// value comes from that write or a later one (single writer per slot). 0 means
/// no write had been stamped when the slot was read.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetryValue {
    pub metric: Metric,
    pub raw_value: f64,
    pub observed_at: u64,
}

impl TelemetryValue {
    pub fn is_default(&self) -> bool {
        self.observed_at == 0
    }
}
