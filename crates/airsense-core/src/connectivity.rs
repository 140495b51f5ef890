use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::cache::{CacheEntry, CacheStore, OfflineCache};
use crate::transport::{TelemetryPayload, TransportKind, TransportLink};

#[derive(Debug, Clone)]
pub struct FallbackConfig {
    pub max_cache_entries: usize,
    pub probe_timeout: Duration,
    pub transmit_timeout: Duration,
    pub flush_timeout: Duration,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            max_cache_entries: 1000,
            probe_timeout: Duration::from_secs(5),
            transmit_timeout: Duration::from_secs(10),
            flush_timeout: Duration::from_secs(30),
        }
    }
}

/// The single current connection state, owned by the manager instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub transport: TransportKind,
    /// Signal strength percentage, 0-100.
    pub strength: u8,
    pub last_connected: DateTime<Utc>,
    pub is_online: bool,
}

/// Walks the transport priority list once per `send`, replays the offline
/// cache when a real tier comes back, and caches the payload when every
/// tier is exhausted.
///
/// Holds mutable state (`status`, cache); callers with multiple producers
/// must serialize access themselves. No internal retries: the caller
/// re-invokes on its own schedule.
pub struct FallbackManager<T: TransportLink, S: CacheStore> {
    link: T,
    store: S,
    config: FallbackConfig,
    cache: OfflineCache,
    status: ConnectionStatus,
}

impl<T: TransportLink, S: CacheStore> FallbackManager<T, S> {
    pub fn new(link: T, store: S, config: FallbackConfig) -> Self {
        let cache = OfflineCache::new(config.max_cache_entries);
        let initial = TransportKind::Primary;
        Self {
            link,
            store,
            config,
            cache,
            status: ConnectionStatus {
                transport: initial,
                strength: initial.nominal_strength(),
                last_connected: Utc::now(),
                is_online: true,
            },
        }
    }

    /// Restores the durable cache mirror, typically once at startup.
    pub fn load_cached(&mut self) {
        match self.store.load() {
            Ok(entries) => {
                if !entries.is_empty() {
                    debug!(count = entries.len(), "restored offline cache from durable store");
                }
                self.cache.replace_all(entries);
            }
            Err(err) => {
                warn!(error = %err, "failed to load durable offline cache");
            }
        }
    }

    /// Attempts delivery over the first available transport, falling
    /// through the priority list on failure. Returns `true` when the
    /// payload went over the wire and `false` when it was cached locally;
    /// caching always succeeds, so this never errors.
    ///
    /// The offline tier has no real transmission: once the walk reaches
    /// it, the payload is cached, which is why probe exhaustion and
    /// deliberate offline operation look identical in the status.
    pub async fn send(&mut self, payload: TelemetryPayload) -> bool {
        for kind in TransportKind::PRIORITY {
            if kind == TransportKind::Offline {
                break;
            }

            let available = matches!(
                timeout(self.config.probe_timeout, self.link.probe(kind)).await,
                Ok(true)
            );
            if !available {
                debug!(transport = %kind, "transport probe failed");
                continue;
            }

            // Replay anything cached while we were offline before the new
            // payload, so ordering at the receiver stays close to source
            // order.
            if !self.cache.is_empty() {
                self.flush_cache().await;
            }

            match timeout(
                self.config.transmit_timeout,
                self.link.transmit(kind, &payload),
            )
            .await
            {
                Ok(Ok(())) => {
                    self.status = ConnectionStatus {
                        transport: kind,
                        strength: kind.nominal_strength(),
                        last_connected: Utc::now(),
                        is_online: true,
                    };
                    return true;
                }
                Ok(Err(err)) => {
                    warn!(transport = %kind, error = %err, "transmission failed, trying next transport");
                }
                Err(_) => {
                    warn!(transport = %kind, "transmission timed out, trying next transport");
                }
            }
        }

        self.cache_payload(payload);
        self.status = ConnectionStatus {
            transport: TransportKind::Offline,
            strength: TransportKind::Offline.nominal_strength(),
            last_connected: self.status.last_connected,
            is_online: false,
        };

        false
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status.clone()
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn cache_evictions(&self) -> u64 {
        self.cache.evictions()
    }

    async fn flush_cache(&mut self) {
        let batch = self.cache.drain_all();
        let count = batch.len();

        match timeout(self.config.flush_timeout, self.link.batch_flush(&batch)).await {
            Ok(Ok(())) => {
                debug!(count, "flushed offline cache");
                self.cache.mirror_to(&mut self.store);
            }
            Ok(Err(err)) => {
                warn!(count, error = %err, "batch flush failed, restoring cache");
                self.cache.restore_front(batch);
            }
            Err(_) => {
                warn!(count, "batch flush timed out, restoring cache");
                self.cache.restore_front(batch);
            }
        }
    }

    fn cache_payload(&mut self, payload: TelemetryPayload) {
        let before = self.cache.evictions();
        self.cache.push(CacheEntry {
            payload,
            cached_at: Utc::now(),
        });
        if self.cache.evictions() > before {
            warn!(
                capacity = self.config.max_cache_entries,
                "offline cache over capacity, evicted oldest entry"
            );
        }
        self.cache.mirror_to(&mut self.store);
    }
}
