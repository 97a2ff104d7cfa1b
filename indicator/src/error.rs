use friction_core::BandTableError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndicatorError {
    #[error("Could not connect to telemetry bus after {attempts} attempts ({waited:?})")]
    ConnectTimeout { attempts: u32, waited: Duration },

    #[error("Failed to open telemetry bus connection: {message}")]
    Connect { message: String },

    #[error("Failed to subscribe to {subject}: {message}")]
    Subscribe { subject: String, message: String },

    #[error("Telemetry source already started")]
    AlreadyStarted,

    #[error("Presentation failed: {0}")]
    Presentation(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Bands file not found: {path}")]
    BandsFileNotFound { path: PathBuf },

    #[error("Failed to read bands file {path}: {message}")]
    BandsFileUnreadable { path: PathBuf, message: String },

    #[error("Failed to parse bands file {path}: {message}")]
    BandsFileInvalid { path: PathBuf, message: String },

    #[error("Invalid band table: {0}")]
    BandTable(#[from] BandTableError),

    #[error("Last band bound {last_bound} does not match ceiling {ceiling}")]
    CeilingMismatch { ceiling: f64, last_bound: f64 },

    #[error("Saturation threshold must be finite, got {0}")]
    InvalidThreshold(f64),

    #[error("Primary and saturation subjects must differ (both are {0})")]
    DuplicateSubject(String),

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
}
