//! Ingestion adapter - routes decoded bus messages into the shared store
//!
//! The adapter runs on whatever task or thread the telemetry source delivers
//! on. It only writes into [`SharedStateStore`]; it never touches rendering.

use crate::store::SharedStateStore;
use crate::telemetry::Metric;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("Payload on {channel} is not valid UTF-8")]
    NotUtf8 { channel: String },

    #[error("Payload on {channel} is empty")]
    Empty { channel: String },

    #[error("Payload on {channel} is not a scalar: {payload}")]
    NotScalar { channel: String, payload: String },

    #[error("Payload on {channel} is not finite: {value}")]
    NonFinite { channel: String, value: f64 },
}

/// One `(channel, scalar)` pair from the telemetry source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryMessage {
    pub channel: String,
    pub value: f64,
}

impl TelemetryMessage {
    pub fn new(channel: impl Into<String>, value: f64) -> Self {
        Self {
            channel: channel.into(),
            value,
        }
    }

    /// Decode a raw payload.
    ///
    /// Accepts bare numeric text (`0.55`), a JSON number, or a JSON object
    /// carrying a numeric `value` field.
    pub fn decode(channel: impl Into<String>, payload: &[u8]) -> Result<Self, DecodeError> {
        let channel = channel.into();
        let text = match std::str::from_utf8(payload) {
            Ok(t) => t.trim(),
            Err(_) => return Err(DecodeError::NotUtf8 { channel }),
        };
        if text.is_empty() {
            return Err(DecodeError::Empty { channel });
        }

        let value = match text.parse::<f64>() {
            Ok(v) => v,
            Err(_) => match scalar_from_json(text) {
                Some(v) => v,
                None => {
                    return Err(DecodeError::NotScalar {
                        channel,
                        payload: text.chars().take(64).collect(),
                    })
                }
            },
        };

        if !value.is_finite() {
            return Err(DecodeError::NonFinite { channel, value });
        }
        Ok(Self { channel, value })
    }
}

fn scalar_from_json(text: &str) -> Option<f64> {
    match serde_json::from_str::<Value>(text).ok()? {
        Value::Number(n) => n.as_f64(),
        Value::Object(map) => map.get("value").and_then(Value::as_f64),
        _ => None,
    }
}

/// Channel names the adapter listens for, plus the saturation threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelMap {
    pub primary: String,
    pub saturation_source: String,
    pub saturation_threshold: f64,
}

impl Default for ChannelMap {
    fn default() -> Self {
        Self {
            primary: "zEstFriction".to_string(),
            saturation_source: "zAlphaR".to_string(),
            saturation_threshold: 0.4,
        }
    }
}

impl ChannelMap {
    pub fn route(&self, channel: &str) -> Option<Metric> {
        if channel == self.primary {
            Some(Metric::PrimaryScalar)
        } else if channel == self.saturation_source {
            Some(Metric::SaturationFlagSource)
        } else {
            None
        }
    }
}

pub struct IngestionAdapter {
    store: Arc<SharedStateStore>,
    channels: ChannelMap,
}

impl IngestionAdapter {
    pub fn new(store: Arc<SharedStateStore>, channels: ChannelMap) -> Self {
        Self { store, channels }
    }

    pub fn channels(&self) -> &ChannelMap {
        &self.channels
    }

    pub fn store(&self) -> &Arc<SharedStateStore> {
        &self.store
    }

    /// Apply one message; returns the metric it was routed to, if any
    pub fn on_message(&self, message: &TelemetryMessage) -> Option<Metric> {
        let metric = match self.channels.route(&message.channel) {
            Some(m) => m,
            None => {
                trace!(channel = %message.channel, "Ignoring unmonitored channel");
                return None;
            }
        };

        match metric {
            Metric::PrimaryScalar => self.store.write_primary(message.value),
            Metric::SaturationFlagSource => self
                .store
                .write_flag(message.value, self.channels.saturation_threshold),
        }

        debug!(
            channel = %message.channel,
            value = message.value,
            primary = self.store.read_primary(),
            saturated = self.store.read_flag(),
            "Applied telemetry update"
        );
        Some(metric)
    }

    /// Apply a delivery batch in order; returns how many messages were routed
    pub fn on_batch<'a, I>(&self, batch: I) -> usize
    where
        I: IntoIterator<Item = &'a TelemetryMessage>,
    {
        batch
            .into_iter()
            .filter(|m| self.on_message(m).is_some())
            .count()
    }
}
