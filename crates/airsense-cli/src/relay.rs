use chrono::{DateTime, Utc};

use airsense_core::{
    CacheStore, FallbackManager, FeedMonitor, TelemetryFeed, TelemetryPayload, TransportLink,
};
use anyhow::Result;
use tokio::time::sleep;
use tracing::info;

/// Forwards fresh readings and alerts to a gateway through the transport
/// fallback chain. While every tier is down, payloads pile up in the
/// durable offline cache and replay on the first successful send.
pub async fn run_relay<F, T, S>(
    monitor: &mut FeedMonitor<F>,
    manager: &mut FallbackManager<T, S>,
) -> Result<()>
where
    F: TelemetryFeed,
    T: TransportLink,
    S: CacheStore,
{
    manager.load_cached();

    let mut last_relayed: Option<DateTime<Utc>> = None;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = sleep(monitor.effective_interval()) => {
                let observation = monitor.tick().await;

                if let Some(sample) = &observation.sample {
                    if last_relayed.map_or(true, |t| sample.timestamp > t) {
                        let delivered = manager
                            .send(TelemetryPayload::Reading(sample.clone()))
                            .await;
                        last_relayed = Some(sample.timestamp);
                        info!(
                            delivered,
                            cached = manager.cache_len(),
                            transport = %manager.status().transport,
                            "relayed reading"
                        );
                    }
                }

                for alert in &observation.alerts {
                    let delivered = manager
                        .send(TelemetryPayload::Alert(alert.clone()))
                        .await;
                    info!(delivered, severity = %alert.severity, "relayed alert");
                }
            }
        }
    }

    Ok(())
}
