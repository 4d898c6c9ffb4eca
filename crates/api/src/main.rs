//! Airport Watch - Main Entry Point

use anyhow::Context;
use api::{init_logging, AlertService, Settings};
use metrics_exporter_prometheus::PrometheusBuilder;
use monitor::SchedulerConfigPatch;
use std::sync::Arc;
use telemetry::{ReplaySource, TelemetrySource};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

async fn build_source(settings: &Settings) -> anyhow::Result<Arc<dyn TelemetrySource>> {
    let source = match &settings.telemetry.replay_file {
        Some(path) => ReplaySource::from_file(path)
            .await
            .with_context(|| format!("loading replay file {}", path.display()))?,
        None => {
            warn!("No telemetry replay file configured; monitoring will see no traffic");
            ReplaySource::from_polls(Vec::new())
        }
    };
    Ok(Arc::new(source.with_loop(settings.telemetry.loop_replay)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading settings")?;
    init_logging(&settings.logging).context("installing tracing subscriber")?;

    info!("=== Airport Watch v{} ===", env!("CARGO_PKG_VERSION"));
    info!(
        "Watching {} ({:.4}, {:.4})",
        settings.airport.icao, settings.airport.latitude, settings.airport.longitude
    );

    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .context("installing metrics recorder")?;

    let source = build_source(&settings).await?;
    let service = AlertService::new(&settings, source);

    let loaded = service
        .try_initialize()
        .await
        .context("initializing alert storage")?;
    info!("Loaded {} persisted alerts", loaded);

    let mut events = service.subscribe();
    let listener = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(alert) => info!(
                    "ALERT {} [{}] {} {}",
                    alert.alert_type.as_str(),
                    alert.severity.as_str(),
                    alert.icao24().unwrap_or("global"),
                    alert.details
                ),
                Err(RecvError::Lagged(skipped)) => warn!("Alert listener skipped {} alerts", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    });

    if settings.monitoring.auto_start {
        let response = service.start_monitoring(SchedulerConfigPatch::default()).await;
        if !response.success {
            error!("Monitoring did not start: {:?}", response.error);
        }
    }

    if settings.recorder.auto_start {
        let response = service.start_collection().await;
        if !response.success {
            error!("Flight recording did not start: {:?}", response.error);
        }
    }

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    info!("Shutdown requested");

    let response = service.shutdown().await;
    match response.data {
        Some(report) => info!("Final save wrote {} alerts", report.saved),
        None => error!("Shutdown save failed: {:?}", response.error),
    }
    listener.abort();

    debug!("Metrics at shutdown:\n{}", metrics.render());
    Ok(())
}
