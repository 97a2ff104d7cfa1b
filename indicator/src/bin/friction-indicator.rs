//! Friction indicator binary - shows the live friction band from NATS telemetry

use anyhow::Context;
use friction_core::{IngestionAdapter, SharedStateStore};
use friction_indicator::{
    Config, LogPresenter, NatsTelemetrySource, Presenter, PresenterKind, RenderLoop,
    TelemetrySource, TerminalPresenter, Termination,
};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Exit status when the bus drops the connection while rendering
const DISCONNECTED_EXIT_CODE: i32 = 2;

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("friction_indicator=info,friction_core=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C; interrupt disabled");
        std::future::pending::<()>().await;
    }
    info!("Interrupt received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse_config();
    init_tracing(config.log_json);

    config.validate().context("Invalid configuration")?;
    let table = Arc::new(config.band_table().context("Invalid band table")?);

    info!("Starting friction indicator");
    info!("Configuration:");
    info!("  NATS URL: {}", config.nats_url);
    info!("  Primary subject: {}", config.primary_subject);
    info!(
        "  Saturation subject: {} (threshold {})",
        config.saturation_subject, config.saturation_threshold
    );
    info!("  Bands: {} (ceiling {})", table.len(), table.ceiling());
    info!("  Render interval: {:?}", config.render_interval);
    info!(
        "  Connect window: {} x {:?}",
        config.connect_attempts, config.connect_retry_interval
    );

    let store = Arc::new(SharedStateStore::new(table.ceiling()));
    let adapter = Arc::new(IngestionAdapter::new(store.clone(), config.channel_map()));

    let mut source = NatsTelemetrySource::from_config(&config);
    source.start(adapter).await?;

    let presenter: Box<dyn Presenter> = match config.presenter {
        PresenterKind::Terminal => Box::new(TerminalPresenter::stdout(!config.no_color)),
        PresenterKind::Log => Box::new(LogPresenter::new()),
    };
    let mut render = RenderLoop::new(store, table, presenter, config.render_settings());

    let outcome = render.run(source.link(), shutdown_signal()).await;
    source.shutdown().await;

    match outcome {
        Ok(Termination::Interrupted) => {
            info!("Friction indicator shutting down");
            Ok(())
        }
        Ok(Termination::Disconnected) => {
            error!("Telemetry bus disconnected; exiting without reconnecting");
            std::process::exit(DISCONNECTED_EXIT_CODE);
        }
        Err(e) => {
            error!("Friction indicator failed: {}", e);
            Err(e.into())
        }
    }
}
