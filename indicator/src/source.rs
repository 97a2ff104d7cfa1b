//! Telemetry source - delivers bus messages to the ingestion adapter
//!
//! The source owns the bus connection. Connection events are published on a
//! [`LinkState`] watch channel that the render loop observes; decoded messages
//! are applied to the [`IngestionAdapter`] from the source's own task, so the
//! ingestion path never runs on the render loop.

use crate::config::Config;
use crate::error::IndicatorError;
use async_nats::{Client, ConnectOptions, Event};
use async_trait::async_trait;
use friction_core::{IngestionAdapter, TelemetryMessage};
use futures_util::{Stream, StreamExt};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Upper bound on messages drained from the subscriptions per batch
const INGEST_BATCH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Connecting,
    Connected,
    Disconnected,
}

/// Publish a link transition. Disconnected is final: once set, nothing else
/// is published. Returns whether the state changed.
pub fn publish_link(tx: &watch::Sender<LinkState>, next: LinkState) -> bool {
    tx.send_if_modified(|state| {
        if *state == LinkState::Disconnected || *state == next {
            return false;
        }
        *state = next;
        true
    })
}

#[async_trait]
pub trait TelemetrySource: Send {
    /// Open the connection, register both channels and start delivering
    /// message batches to `adapter`.
    async fn start(&mut self, adapter: Arc<IngestionAdapter>) -> Result<(), IndicatorError>;

    /// Connection state as seen by this source
    fn link(&self) -> watch::Receiver<LinkState>;

    /// Stop delivering and release the connection
    async fn shutdown(&mut self);
}

/// Decode and apply batches until the stream ends
pub async fn ingest_stream<S, P>(messages: S, adapter: Arc<IngestionAdapter>)
where
    S: Stream<Item = (String, P)> + Unpin,
    P: AsRef<[u8]>,
{
    let mut batches = messages.ready_chunks(INGEST_BATCH);

    while let Some(batch) = batches.next().await {
        let decoded: Vec<TelemetryMessage> = batch
            .iter()
            .filter_map(|(subject, payload)| decode_or_drop(subject, payload.as_ref()))
            .collect();

        let applied = adapter.on_batch(&decoded);
        trace!(received = batch.len(), applied, "Ingested telemetry batch");
    }

    debug!("Telemetry stream ended");
}

fn decode_or_drop(subject: &str, payload: &[u8]) -> Option<TelemetryMessage> {
    match TelemetryMessage::decode(subject, payload) {
        Ok(message) => Some(message),
        Err(e) => {
            debug!(error = %e, "Dropping malformed telemetry");
            None
        }
    }
}

fn on_bus_event(tx: &watch::Sender<LinkState>, event: Event) {
    match event {
        Event::Connected => {
            if publish_link(tx, LinkState::Connected) {
                info!("Telemetry bus connected");
            }
        }
        Event::Disconnected => {
            if publish_link(tx, LinkState::Disconnected) {
                warn!("Telemetry bus disconnected");
            }
        }
        other => debug!(event = ?other, "Telemetry bus event"),
    }
}

/// NATS-backed telemetry source
pub struct NatsTelemetrySource {
    url: String,
    creds_path: Option<String>,
    client_name: String,
    subjects: Vec<String>,
    link_tx: Arc<watch::Sender<LinkState>>,
    client: Option<Client>,
    ingest_task: Option<JoinHandle<()>>,
}

impl NatsTelemetrySource {
    pub fn new(
        url: String,
        creds_path: Option<String>,
        client_name: String,
        subjects: Vec<String>,
    ) -> Self {
        let (link_tx, _) = watch::channel(LinkState::Connecting);
        Self {
            url,
            creds_path,
            client_name,
            subjects,
            link_tx: Arc::new(link_tx),
            client: None,
            ingest_task: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.nats_url.clone(),
            config.nats_creds_path.clone(),
            config.client_name.clone(),
            config.subjects(),
        )
    }

    pub fn subjects(&self) -> &[String] {
        &self.subjects
    }

    /// Build the client. The initial connection is retried in the background;
    /// the render loop bounds how long it waits for it.
    async fn connect(&self) -> Result<Client, IndicatorError> {
        let tx = self.link_tx.clone();
        let mut options = ConnectOptions::new()
            .name(&self.client_name)
            .retry_on_initial_connect()
            .event_callback(move |event| {
                let tx = tx.clone();
                async move { on_bus_event(&tx, event) }
            });

        if let Some(creds_path) = &self.creds_path {
            info!("Using credentials file: {}", creds_path);
            options = options
                .credentials_file(creds_path)
                .await
                .map_err(|e| IndicatorError::Connect {
                    message: format!("failed to load credentials {}: {}", creds_path, e),
                })?;
        }

        options
            .connect(&self.url)
            .await
            .map_err(|e| IndicatorError::Connect {
                message: e.to_string(),
            })
    }
}

#[async_trait]
impl TelemetrySource for NatsTelemetrySource {
    async fn start(&mut self, adapter: Arc<IngestionAdapter>) -> Result<(), IndicatorError> {
        if self.client.is_some() {
            return Err(IndicatorError::AlreadyStarted);
        }

        info!(url = %self.url, name = %self.client_name, "Connecting to telemetry bus");
        let client = self.connect().await?;

        let mut subscriptions = Vec::with_capacity(self.subjects.len());
        for subject in &self.subjects {
            let subscriber =
                client
                    .subscribe(subject.clone())
                    .await
                    .map_err(|e| IndicatorError::Subscribe {
                        subject: subject.clone(),
                        message: e.to_string(),
                    })?;
            debug!(subject = %subject, "Registered telemetry channel");
            subscriptions.push(subscriber);
        }

        let messages = futures_util::stream::select_all(subscriptions)
            .map(|msg| (msg.subject.to_string(), msg.payload));
        self.ingest_task = Some(tokio::spawn(ingest_stream(messages, adapter)));
        self.client = Some(client);
        Ok(())
    }

    fn link(&self) -> watch::Receiver<LinkState> {
        self.link_tx.subscribe()
    }

    async fn shutdown(&mut self) {
        if let Some(task) = self.ingest_task.take() {
            task.abort();
            let _ = task.await;
        }
        if self.client.take().is_some() {
            info!("Closed telemetry bus connection");
        }
    }
}

impl Drop for NatsTelemetrySource {
    fn drop(&mut self) {
        if let Some(task) = self.ingest_task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use friction_core::{ChannelMap, SharedStateStore};

    #[test]
    fn test_disconnect_is_final() {
        let (tx, rx) = watch::channel(LinkState::Connecting);

        assert!(publish_link(&tx, LinkState::Connected));
        assert!(!publish_link(&tx, LinkState::Connected));
        assert!(publish_link(&tx, LinkState::Disconnected));
        assert!(!publish_link(&tx, LinkState::Connected));

        assert_eq!(*rx.borrow(), LinkState::Disconnected);
    }

    #[test]
    fn test_bus_events_map_to_link_state() {
        let (tx, rx) = watch::channel(LinkState::Connecting);

        on_bus_event(&tx, Event::Connected);
        assert_eq!(*rx.borrow(), LinkState::Connected);

        on_bus_event(&tx, Event::LameDuckMode);
        assert_eq!(*rx.borrow(), LinkState::Connected);

        on_bus_event(&tx, Event::Disconnected);
        on_bus_event(&tx, Event::Connected);
        assert_eq!(*rx.borrow(), LinkState::Disconnected);
    }

    #[test]
    fn test_source_subjects_from_config() {
        let source = NatsTelemetrySource::from_config(&Config::default());
        assert_eq!(source.subjects(), ["zEstFriction", "zAlphaR"]);
        assert_eq!(*source.link().borrow(), LinkState::Connecting);
    }

    #[tokio::test]
    async fn test_ingest_stream_skips_malformed_payloads() {
        let store = Arc::new(SharedStateStore::new(0.99));
        let adapter = Arc::new(IngestionAdapter::new(store.clone(), ChannelMap::default()));

        let messages = futures_util::stream::iter(vec![
            ("zEstFriction".to_string(), b"0.65".to_vec()),
            ("zAlphaR".to_string(), b"not a number".to_vec()),
            ("zAlphaR".to_string(), br#"{"value": 0.41}"#.to_vec()),
            ("zEstFriction".to_string(), b"NaN".to_vec()),
        ]);

        ingest_stream(messages, adapter).await;

        assert_eq!(store.read_primary(), 0.65);
        assert!(store.read_flag());
    }
}
