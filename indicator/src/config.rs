//! Configuration for the friction indicator

use crate::error::ConfigError;
use crate::render::RenderSettings;
use clap::{Parser, ValueEnum};
use friction_core::bands::REFERENCE_CEILING;
use friction_core::{BandTable, ChannelMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Which presentation collaborator receives render ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PresenterKind {
    /// Redraw a colored band column on stdout
    Terminal,
    /// Emit one structured log event per tick
    Log,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "friction-indicator", version)]
#[command(about = "Shows the current road-friction band from NATS telemetry")]
pub struct Config {
    /// NATS server URL
    #[arg(long, env, default_value = "nats://127.0.0.1:4222")]
    pub nats_url: String,

    /// Path to NATS credentials file
    #[arg(long, env)]
    pub nats_creds_path: Option<String>,

    /// Client name announced to the NATS server
    #[arg(long, env, default_value = "friction-indicator")]
    pub client_name: String,

    /// Subject carrying the friction estimate
    #[arg(long, env, default_value = "zEstFriction")]
    pub primary_subject: String,

    /// Subject carrying the value compared against the saturation threshold
    #[arg(long, env, default_value = "zAlphaR")]
    pub saturation_subject: String,

    /// Saturation is flagged when the source value is at or above this
    #[arg(long, env, default_value_t = 0.4)]
    pub saturation_threshold: f64,

    /// Friction values above this are displayed as this
    #[arg(long, env = "FRICTION_CEILING", default_value_t = REFERENCE_CEILING)]
    pub ceiling: f64,

    /// YAML list of `{upper_bound, label}` entries replacing the built-in bands
    #[arg(long, env)]
    pub bands_file: Option<PathBuf>,

    /// Time between display refreshes (e.g. 200ms, 1s)
    #[arg(long, env, default_value = "200ms", value_parser = humantime::parse_duration)]
    pub render_interval: Duration,

    /// How many times to check for a bus connection before giving up
    #[arg(long, env, default_value_t = 30)]
    pub connect_attempts: u32,

    /// Delay between connection checks
    #[arg(long, env, default_value = "100ms", value_parser = humantime::parse_duration)]
    pub connect_retry_interval: Duration,

    #[arg(long, env, value_enum, default_value_t = PresenterKind::Terminal)]
    pub presenter: PresenterKind,

    /// Disable ANSI colors in the terminal presenter
    #[arg(long, env)]
    pub no_color: bool,

    /// Output logs in JSON format
    #[arg(long, env)]
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        let channels = ChannelMap::default();
        Self {
            nats_url: "nats://127.0.0.1:4222".to_string(),
            nats_creds_path: None,
            client_name: "friction-indicator".to_string(),
            primary_subject: channels.primary,
            saturation_subject: channels.saturation_source,
            saturation_threshold: channels.saturation_threshold,
            ceiling: REFERENCE_CEILING,
            bands_file: None,
            render_interval: Duration::from_millis(200),
            connect_attempts: 30,
            connect_retry_interval: Duration::from_millis(100),
            presenter: PresenterKind::Terminal,
            no_color: false,
            log_json: false,
        }
    }
}

impl Config {
    /// Parse configuration from command-line args and environment variables
    pub fn parse_config() -> Self {
        Config::parse()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.saturation_threshold.is_finite() {
            return Err(ConfigError::InvalidThreshold(self.saturation_threshold));
        }
        if self.primary_subject == self.saturation_subject {
            return Err(ConfigError::DuplicateSubject(self.primary_subject.clone()));
        }
        if self.render_interval.is_zero() {
            return Err(ConfigError::Zero {
                field: "render_interval",
            });
        }
        if self.connect_retry_interval.is_zero() {
            return Err(ConfigError::Zero {
                field: "connect_retry_interval",
            });
        }
        if self.connect_attempts == 0 {
            return Err(ConfigError::Zero {
                field: "connect_attempts",
            });
        }
        Ok(())
    }

    /// Load the band table and check that it tops out at the ceiling
    pub fn band_table(&self) -> Result<BandTable, ConfigError> {
        let table = match &self.bands_file {
            Some(path) => load_bands_file(path)?,
            None => BandTable::reference(),
        };

        if table.ceiling() != self.ceiling {
            return Err(ConfigError::CeilingMismatch {
                ceiling: self.ceiling,
                last_bound: table.ceiling(),
            });
        }
        Ok(table)
    }

    pub fn channel_map(&self) -> ChannelMap {
        ChannelMap {
            primary: self.primary_subject.clone(),
            saturation_source: self.saturation_subject.clone(),
            saturation_threshold: self.saturation_threshold,
        }
    }

    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            interval: self.render_interval,
            connect_attempts: self.connect_attempts,
            connect_retry_interval: self.connect_retry_interval,
        }
    }

    /// Both subjects the source must subscribe to
    pub fn subjects(&self) -> Vec<String> {
        vec![self.primary_subject.clone(), self.saturation_subject.clone()]
    }
}

fn load_bands_file(path: &Path) -> Result<BandTable, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::BandsFileNotFound { path: path.to_path_buf() });
    }

    let raw = fs::read_to_string(path).map_err(|e| ConfigError::BandsFileUnreadable {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    debug!(path = %path.display(), bytes = raw.len(), "Read bands file");

    let table: BandTable =
        serde_yaml::from_str(&raw).map_err(|e| ConfigError::BandsFileInvalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    info!(path = %path.display(), bands = table.len(), "Loaded band table");
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_reference_setup() {
        let config = Config::default();
        assert!(config.validate().is_ok());

        let table = config.band_table().unwrap();
        assert_eq!(table, BandTable::reference());
        assert_eq!(config.channel_map(), ChannelMap::default());
        assert_eq!(config.subjects(), vec!["zEstFriction", "zAlphaR"]);

        let settings = config.render_settings();
        assert_eq!(settings.interval, Duration::from_millis(200));
        assert_eq!(settings.connect_attempts, 30);
        assert_eq!(settings.connect_retry_interval, Duration::from_millis(100));
    }

    #[test]
    fn test_ceiling_must_match_last_band() {
        let config = Config {
            ceiling: 1.0,
            ..Default::default()
        };
        assert!(matches!(
            config.band_table(),
            Err(ConfigError::CeilingMismatch { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = Config {
            saturation_threshold: f64::NAN,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidThreshold(_))
        ));

        let config = Config {
            saturation_subject: "zEstFriction".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateSubject(_))
        ));

        let config = Config {
            connect_attempts: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Zero {
                field: "connect_attempts"
            })
        ));

        let config = Config {
            render_interval: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_bands_file() {
        let config = Config {
            bands_file: Some(PathBuf::from("/nonexistent/bands.yaml")),
            ..Default::default()
        };
        assert!(matches!(
            config.band_table(),
            Err(ConfigError::BandsFileNotFound { .. })
        ));
    }
}
