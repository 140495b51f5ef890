use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use crate::cache::{CacheEntry, CacheStore, CacheStoreError};
use crate::connectivity::{FallbackConfig, FallbackManager};
use crate::sample::Sample;
use crate::transport::{TelemetryPayload, TransportError, TransportKind, TransportLink};

/// Shared script for the transport double: which tiers probe as
/// available, which reject transmissions, whether batch flushes go
/// through, and everything the link saw. The test keeps a clone of the
/// handle so it can reconfigure the link mid-scenario.
#[derive(Default)]
struct Script {
    available: HashSet<TransportKind>,
    reject_transmit: HashSet<TransportKind>,
    fail_flush: bool,
    transmitted: Vec<(TransportKind, TelemetryPayload)>,
    flushed: Vec<Vec<CacheEntry>>,
}

#[derive(Clone, Default)]
struct ScriptedLink {
    script: Arc<Mutex<Script>>,
}

impl ScriptedLink {
    fn with<R>(&self, f: impl FnOnce(&mut Script) -> R) -> R {
        f(&mut self.script.lock().expect("script lock"))
    }
}

#[async_trait]
impl TransportLink for ScriptedLink {
    async fn probe(&mut self, kind: TransportKind) -> bool {
        kind == TransportKind::Offline || self.with(|s| s.available.contains(&kind))
    }

    async fn transmit(
        &mut self,
        kind: TransportKind,
        payload: &TelemetryPayload,
    ) -> Result<(), TransportError> {
        self.with(|s| {
            if s.reject_transmit.contains(&kind) {
                return Err(TransportError::Rejected { status: 503 });
            }
            s.transmitted.push((kind, payload.clone()));
            Ok(())
        })
    }

    async fn batch_flush(&mut self, entries: &[CacheEntry]) -> Result<(), TransportError> {
        self.with(|s| {
            if s.fail_flush {
                return Err(TransportError::Unavailable);
            }
            s.flushed.push(entries.to_vec());
            Ok(())
        })
    }
}

/// In-memory durable store sharing its contents with the test through an
/// Arc, standing in for the persisted key.
#[derive(Clone, Default)]
struct MemoryStore {
    entries: Arc<Mutex<Vec<CacheEntry>>>,
}

impl MemoryStore {
    fn snapshot(&self) -> Vec<CacheEntry> {
        self.entries.lock().expect("store lock").clone()
    }
}

impl CacheStore for MemoryStore {
    fn load(&mut self) -> Result<Vec<CacheEntry>, CacheStoreError> {
        Ok(self.snapshot())
    }

    fn save(&mut self, entries: &[CacheEntry]) -> Result<(), CacheStoreError> {
        *self.entries.lock().expect("store lock") = entries.to_vec();
        Ok(())
    }
}

fn reading(hour: u32) -> TelemetryPayload {
    let ts = Utc
        .with_ymd_and_hms(2026, 3, 1, hour, 0, 0)
        .single()
        .expect("valid date");
    let mut sample = Sample::empty(ts, "chan-1", "Zone A");
    sample.co = Some(hour as f64);
    TelemetryPayload::Reading(sample)
}

fn payload_hour(payload: &TelemetryPayload) -> u32 {
    match payload {
        TelemetryPayload::Reading(sample) => sample.co.unwrap_or_default() as u32,
        TelemetryPayload::Alert(_) => u32::MAX,
    }
}

fn config_with_cap(max_cache_entries: usize) -> FallbackConfig {
    FallbackConfig {
        max_cache_entries,
        ..FallbackConfig::default()
    }
}

#[tokio::test]
async fn total_probe_failure_caches_the_payload() {
    // Arrange: no tier is reachable.
    let link = ScriptedLink::default();
    let mut manager = FallbackManager::new(link, MemoryStore::default(), config_with_cap(10));

    // Act
    let delivered = manager.send(reading(1)).await;

    // Assert
    assert!(!delivered, "false means delivered to the local cache only");
    assert_eq!(manager.cache_len(), 1);
    let status = manager.status();
    assert_eq!(status.transport, TransportKind::Offline);
    assert!(!status.is_online);
    assert_eq!(status.strength, 0);
}

#[tokio::test]
async fn cache_caps_out_with_fifo_eviction() {
    // Arrange: everything offline, capacity three.
    let store = MemoryStore::default();
    let mut manager =
        FallbackManager::new(ScriptedLink::default(), store.clone(), config_with_cap(3));

    // Act: five sends against a cap of three.
    for hour in 1..=5 {
        let _ = manager.send(reading(hour)).await;
    }

    // Assert
    assert_eq!(manager.cache_len(), 3, "cap must hold");
    assert_eq!(manager.cache_evictions(), 2, "two oldest entries evicted");

    // The durable mirror sees the same survivors, oldest first.
    let mirrored_hours: Vec<u32> = store
        .snapshot()
        .iter()
        .map(|e| payload_hour(&e.payload))
        .collect();
    assert_eq!(mirrored_hours, vec![3, 4, 5], "FIFO order preserved after eviction");
}

#[tokio::test]
async fn recovery_flushes_cache_before_the_new_payload() {
    // Arrange: start offline, cache two payloads.
    let link = ScriptedLink::default();
    let mut manager =
        FallbackManager::new(link.clone(), MemoryStore::default(), config_with_cap(10));
    let _ = manager.send(reading(1)).await;
    let _ = manager.send(reading(2)).await;
    assert_eq!(manager.cache_len(), 2);

    // Act: primary comes back, a third payload arrives.
    link.with(|s| {
        s.available.insert(TransportKind::Primary);
    });
    let delivered = manager.send(reading(3)).await;

    // Assert
    assert!(delivered);
    assert_eq!(manager.cache_len(), 0, "cached backlog was replayed");

    link.with(|s| {
        assert_eq!(s.flushed.len(), 1, "one batch flush");
        let batch_hours: Vec<u32> = s.flushed[0]
            .iter()
            .map(|e| payload_hour(&e.payload))
            .collect();
        assert_eq!(batch_hours, vec![1, 2], "batch preserves FIFO order");

        let sent_hours: Vec<u32> = s
            .transmitted
            .iter()
            .map(|(_, p)| payload_hour(p))
            .collect();
        assert_eq!(sent_hours, vec![3], "new payload goes out after the flush");
    });

    let status = manager.status();
    assert!(status.is_online);
    assert_eq!(status.transport, TransportKind::Primary);
    assert_eq!(status.strength, TransportKind::Primary.nominal_strength());
}

#[tokio::test]
async fn failed_flush_restores_entries_and_still_sends() {
    let link = ScriptedLink::default();
    let mut manager =
        FallbackManager::new(link.clone(), MemoryStore::default(), config_with_cap(10));
    let _ = manager.send(reading(1)).await;
    let _ = manager.send(reading(2)).await;

    link.with(|s| {
        s.available.insert(TransportKind::Primary);
        s.fail_flush = true;
    });

    let delivered = manager.send(reading(3)).await;

    assert!(delivered, "the new payload is attempted regardless of flush failure");
    assert_eq!(
        manager.cache_len(),
        2,
        "failed batch goes back into the cache, nothing lost"
    );
    link.with(|s| {
        let sent_hours: Vec<u32> = s
            .transmitted
            .iter()
            .map(|(_, p)| payload_hour(p))
            .collect();
        assert_eq!(sent_hours, vec![3]);
    });
}

#[tokio::test]
async fn transmit_failure_falls_through_to_the_next_tier() {
    let link = ScriptedLink::default();
    link.with(|s| {
        s.available.insert(TransportKind::Primary);
        s.available.insert(TransportKind::Secondary);
        s.reject_transmit.insert(TransportKind::Primary);
    });
    let mut manager =
        FallbackManager::new(link, MemoryStore::default(), config_with_cap(10));

    let delivered = manager.send(reading(1)).await;

    assert!(delivered);
    let status = manager.status();
    assert_eq!(
        status.transport,
        TransportKind::Secondary,
        "primary rejected, secondary carried the payload"
    );
    assert_eq!(manager.cache_len(), 0);
}

#[tokio::test]
async fn durable_mirror_survives_a_restart() {
    let store = MemoryStore::default();

    {
        let mut manager =
            FallbackManager::new(ScriptedLink::default(), store.clone(), config_with_cap(10));
        let _ = manager.send(reading(1)).await;
        let _ = manager.send(reading(2)).await;
    }

    // A fresh manager over the same store picks the backlog up.
    let mut reborn =
        FallbackManager::new(ScriptedLink::default(), store, config_with_cap(10));
    assert_eq!(reborn.cache_len(), 0, "empty before loading the mirror");
    reborn.load_cached();
    assert_eq!(reborn.cache_len(), 2, "mirror restored across restart");
}
