//! Render loop - samples the shared store on a fixed cadence
//!
//! State machine: `Connecting -> Running -> Terminated`. The loop waits a
//! bounded number of attempts for the telemetry source to report a
//! connection, then ticks until the source reports a disconnection or the
//! shutdown future resolves. A disconnection is terminal; the loop never
//! reconnects.

use crate::error::IndicatorError;
use crate::presenter::{Indication, Presenter};
use crate::source::LinkState;
use friction_core::{BandTable, SharedStateStore};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSettings {
    pub interval: Duration,
    pub connect_attempts: u32,
    pub connect_retry_interval: Duration,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(200),
            connect_attempts: 30,
            connect_retry_interval: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Connecting,
    Running,
    Terminated,
}

/// Why a render loop stopped without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The telemetry source lost its connection
    Disconnected,
    /// The shutdown future resolved (operator interrupt)
    Interrupted,
}

pub struct RenderLoop<P: Presenter> {
    store: Arc<SharedStateStore>,
    table: Arc<BandTable>,
    presenter: P,
    settings: RenderSettings,
    state: LoopState,
    ticks: u64,
}

impl<P: Presenter> RenderLoop<P> {
    pub fn new(
        store: Arc<SharedStateStore>,
        table: Arc<BandTable>,
        presenter: P,
        settings: RenderSettings,
    ) -> Self {
        Self {
            store,
            table,
            presenter,
            settings,
            state: LoopState::Connecting,
            ticks: 0,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Number of indications handed to the presenter so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn into_presenter(self) -> P {
        self.presenter
    }

    /// Read both slots, classify and present once
    pub fn tick(&mut self) -> Result<Indication, IndicatorError> {
        let primary = self.store.read_primary();
        let saturated = self.store.read_flag();
        let indication = Indication {
            band_index: self.table.classify(primary),
            saturated,
            primary,
        };

        self.presenter.present(indication, self.table.labels())?;
        self.ticks += 1;
        Ok(indication)
    }

    /// Drive the state machine to completion
    pub async fn run<F>(
        &mut self,
        mut link: watch::Receiver<LinkState>,
        shutdown: F,
    ) -> Result<Termination, IndicatorError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        self.state = LoopState::Connecting;

        let attempts = self.settings.connect_attempts;
        let retry = self.settings.connect_retry_interval;
        let connected = tokio::select! {
            biased;
            _ = &mut shutdown => None,
            result = wait_for_link(&mut link, attempts, retry) => Some(result),
        };

        match connected {
            None => return Ok(self.terminate(Termination::Interrupted)),
            Some(Err(e)) => {
                error!(error = %e, "Giving up on telemetry bus connection");
                self.state = LoopState::Terminated;
                return Err(e);
            }
            Some(Ok(LinkWait::Lost)) => {
                warn!("Telemetry bus disconnected before rendering started");
                return Ok(self.terminate(Termination::Disconnected));
            }
            Some(Ok(LinkWait::Up(attempt))) => {
                info!(attempt, interval = ?self.settings.interval, "Rendering started");
            }
        }

        self.state = LoopState::Running;
        let mut ticker = interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *link.borrow_and_update() == LinkState::Disconnected {
                return Ok(self.terminate(Termination::Disconnected));
            }

            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    return Ok(self.terminate(Termination::Interrupted));
                }
                changed = link.changed() => {
                    if changed.is_err() {
                        warn!("Telemetry source went away");
                        return Ok(self.terminate(Termination::Disconnected));
                    }
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.tick() {
                        error!(error = %e, ticks = self.ticks, "Render tick failed");
                        self.state = LoopState::Terminated;
                        return Err(e);
                    }
                }
            }
        }
    }

    fn terminate(&mut self, reason: Termination) -> Termination {
        self.state = LoopState::Terminated;
        if let Err(e) = self.presenter.finish() {
            warn!(error = %e, "Presenter failed to finish");
        }
        info!(reason = ?reason, ticks = self.ticks, "Render loop stopped");
        reason
    }
}

/// Outcome of waiting for the telemetry link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkWait {
    /// Connected on the given attempt
    Up(u32),
    /// The disconnect latch was already set
    Lost,
}

/// Poll the link up to `attempts` times
async fn wait_for_link(
    link: &mut watch::Receiver<LinkState>,
    attempts: u32,
    retry: Duration,
) -> Result<LinkWait, IndicatorError> {
    for attempt in 1..=attempts {
        match *link.borrow_and_update() {
            LinkState::Connected => return Ok(LinkWait::Up(attempt)),
            LinkState::Disconnected => return Ok(LinkWait::Lost),
            LinkState::Connecting => {}
        }
        debug!(attempt, attempts, "Waiting for telemetry bus connection");
        sleep(retry).await;
    }

    Err(IndicatorError::ConnectTimeout {
        attempts,
        waited: retry * attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presenter::LogPresenter;

    fn render_loop() -> RenderLoop<LogPresenter> {
        let table = BandTable::reference();
        let store = Arc::new(SharedStateStore::new(table.ceiling()));
        RenderLoop::new(
            store,
            Arc::new(table),
            LogPresenter::new(),
            RenderSettings::default(),
        )
    }

    #[test]
    fn test_tick_reads_defaults() {
        let mut render = render_loop();
        let indication = render.tick().unwrap();
        assert_eq!(
            indication,
            Indication {
                band_index: 0,
                saturated: false,
                primary: 0.0
            }
        );
        assert_eq!(render.ticks(), 1);
        assert_eq!(render.state(), LoopState::Connecting);
    }

    #[test]
    fn test_tick_classifies_latest_values() {
        let mut render = render_loop();
        render.store.write_primary(0.55);
        render.store.write_flag(0.5, 0.4);
        let indication = render.tick().unwrap();
        assert_eq!(indication.band_index, 2);
        assert!(indication.saturated);

        render.store.write_primary(3.0);
        render.store.write_flag(0.1, 0.4);
        let indication = render.tick().unwrap();
        assert_eq!(indication.band_index, 4);
        assert_eq!(indication.primary, 0.99);
        assert!(!indication.saturated);
    }

    #[tokio::test]
    async fn test_wait_for_link_counts_attempts() {
        let (tx, mut rx) = watch::channel(LinkState::Connecting);

        let err = wait_for_link(&mut rx, 3, Duration::from_millis(1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            IndicatorError::ConnectTimeout { attempts: 3, .. }
        ));

        tx.send_replace(LinkState::Connected);
        let attempt = wait_for_link(&mut rx, 3, Duration::from_millis(1))
            .await
            .unwrap();
        assert_eq!(attempt, LinkWait::Up(1));
    }

    #[tokio::test]
    async fn test_wait_for_link_stops_on_disconnect() {
        let (tx, mut rx) = watch::channel(LinkState::Connecting);
        tx.send_replace(LinkState::Disconnected);

        let outcome = wait_for_link(&mut rx, 30, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(outcome, LinkWait::Lost);
    }
}
