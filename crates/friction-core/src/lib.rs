//! Friction core - shared state, band classification and telemetry ingestion
//!
//! This crate holds everything between the telemetry bus and the display that
//! does not need an async runtime: the lock-free store bridging the ingestion
//! callback with the render loop, the ordered band lookup, and the adapter that
//! routes decoded bus messages into the store.

pub mod bands;
pub mod ingest;
pub mod store;
pub mod telemetry;

pub use bands::{classify, Band, BandTable, BandTableError};
pub use ingest::{ChannelMap, DecodeError, IngestionAdapter, TelemetryMessage};
pub use store::{SharedStateStore, StateSnapshot};
pub use telemetry::{Metric, TelemetryValue};
