//! Friction indicator - live road-friction band display fed from NATS
//!
//! The telemetry source subscribes to the friction estimate and the slip
//! subject, the ingestion adapter writes both into the shared store, and the
//! render loop samples the store on a fixed cadence and hands the classified
//! band to a presenter.

pub mod config;
pub mod error;
pub mod presenter;
pub mod render;
pub mod source;

pub use config::{Config, PresenterKind};
pub use error::{ConfigError, IndicatorError};
pub use presenter::{Indication, LogPresenter, Presenter, TerminalPresenter};
pub use render::{LoopState, RenderLoop, RenderSettings, Termination};
pub use source::{LinkState, NatsTelemetrySource, TelemetrySource};
