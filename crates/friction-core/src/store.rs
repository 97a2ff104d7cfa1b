//! Shared state store - the bridge between the ingestion callback and the render loop
//!
//! Each slot is a single atomic word, so a write is one store and a read is one
//! load: readers can never observe a torn value and never block a writer.
//! Writes to the primary slot and the flag slot touch disjoint atomics and do
//! not contend with each other.
//!
//! Every write is also stamped with a logical sequence number taken from a
//! store-wide clock. The stamp is published after the value with release
//! ordering, so with a single writer per slot a reader that sees stamp `n`
//! sees the value of write `n` or a newer one. Concurrent writers on the same
//! slot may publish stamp and value out of order; the value is still never
//! torn.

use crate::telemetry::{Metric, TelemetryValue};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Consistent-per-slot view of both readings
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StateSnapshot {
    pub primary: f64,
    pub saturated: bool,
    pub primary_seq: u64,
    pub flag_seq: u64,
}

/// Latest primary value and saturation flag
#[derive(Debug)]
pub struct SharedStateStore {
    ceiling: f64,
    clock: AtomicU64,
    primary_bits: AtomicU64,
    primary_seq: AtomicU64,
    flag: AtomicBool,
    saturation_bits: AtomicU64,
    flag_seq: AtomicU64,
}

impl SharedStateStore {
    /// Create a store with both slots at their defaults (0.0 and false)
    pub fn new(ceiling: f64) -> Self {
        Self {
            ceiling,
            clock: AtomicU64::new(0),
            primary_bits: AtomicU64::new(0f64.to_bits()),
            primary_seq: AtomicU64::new(0),
            flag: AtomicBool::new(false),
            saturation_bits: AtomicU64::new(0f64.to_bits()),
            flag_seq: AtomicU64::new(0),
        }
    }

    pub fn ceiling(&self) -> f64 {
        self.ceiling
    }

    /// Store `value`, saturated to the ceiling. There is no floor.
    pub fn write_primary(&self, value: f64) {
        let clamped = clamp_to_ceiling(value, self.ceiling);
        self.primary_bits.store(clamped.to_bits(), Ordering::Release);
        let seq = self.next_seq();
        self.primary_seq.store(seq, Ordering::Release);
    }

    /// Store `value >= threshold` as the saturation flag
    pub fn write_flag(&self, value: f64, threshold: f64) {
        self.saturation_bits.store(value.to_bits(), Ordering::Relaxed);
        self.flag.store(value >= threshold, Ordering::Release);
        let seq = self.next_seq();
        self.flag_seq.store(seq, Ordering::Release);
    }

    pub fn read_primary(&self) -> f64 {
        f64::from_bits(self.primary_bits.load(Ordering::Acquire))
    }

    pub fn read_flag(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Primary reading with its sequence stamp
    pub fn read_primary_value(&self) -> TelemetryValue {
        let observed_at = self.primary_seq.load(Ordering::Acquire);
        TelemetryValue {
            metric: Metric::PrimaryScalar,
            raw_value: self.read_primary(),
            observed_at,
        }
    }

    /// Last raw saturation-source value (before thresholding) with its stamp
    pub fn read_saturation_value(&self) -> TelemetryValue {
        let observed_at = self.flag_seq.load(Ordering::Acquire);
        TelemetryValue {
            metric: Metric::SaturationFlagSource,
            raw_value: f64::from_bits(self.saturation_bits.load(Ordering::Acquire)),
            observed_at,
        }
    }

    pub fn snapshot(&self) -> StateSnapshot {
        let primary_seq = self.primary_seq.load(Ordering::Acquire);
        let flag_seq = self.flag_seq.load(Ordering::Acquire);
        StateSnapshot {
            primary: self.read_primary(),
            saturated: self.read_flag(),
            primary_seq,
            flag_seq,
        }
    }

    fn next_seq(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Saturate at `ceiling`; NaN passes through untouched
fn clamp_to_ceiling(value: f64, ceiling: f64) -> f64 {
    if value >= ceiling {
        ceiling
    } else {
        value
    }
}
