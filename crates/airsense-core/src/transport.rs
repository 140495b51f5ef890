use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::alerts::AlertRecord;
use crate::cache::CacheEntry;
use crate::sample::Sample;

/// Delivery tiers in fallback priority order. `Offline` is a terminal
/// pseudo-transport: its probe always succeeds and "transmitting" over it
/// means appending to the local cache, so reaching it is indistinguishable
/// from network exhaustion by design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Primary,
    Secondary,
    Tertiary,
    Offline,
}

impl TransportKind {
    pub const PRIORITY: [TransportKind; 4] = [
        TransportKind::Primary,
        TransportKind::Secondary,
        TransportKind::Tertiary,
        TransportKind::Offline,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Primary => "primary",
            TransportKind::Secondary => "secondary",
            TransportKind::Tertiary => "tertiary",
            TransportKind::Offline => "offline",
        }
    }

    /// Nominal signal strength reported after a successful send. Real
    /// radio readings belong to the excluded hardware layer.
    pub fn nominal_strength(&self) -> u8 {
        match self {
            TransportKind::Primary => 85,
            TransportKind::Secondary => 80,
            TransportKind::Tertiary => 70,
            TransportKind::Offline => 0,
        }
    }
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The unit of outbound delivery. Discriminated so cached payloads keep
/// their shape across a restart instead of degrading to untyped JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TelemetryPayload {
    Reading(Sample),
    Alert(AlertRecord),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport unavailable")]
    Unavailable,
    #[error("endpoint rejected payload with status {status}")]
    Rejected { status: u16 },
    #[error("io error: {0}")]
    Io(String),
}

/// Network operations the fallback manager depends on. One implementation
/// per deployment; tests substitute scripted links.
#[async_trait]
pub trait TransportLink: Send {
    /// Availability check for a single tier.
    async fn probe(&mut self, kind: TransportKind) -> bool;

    /// Single-payload transmission over the given tier.
    async fn transmit(
        &mut self,
        kind: TransportKind,
        payload: &TelemetryPayload,
    ) -> Result<(), TransportError>;

    /// Bulk replay of cached entries. The receiving endpoint dedups by
    /// channel and timestamp, so re-flushing after a partial failure is
    /// safe.
    async fn batch_flush(&mut self, entries: &[CacheEntry]) -> Result<(), TransportError>;
}

/// HTTP gateway client: one check endpoint and one transmit endpoint per
/// tier, plus a shared batch-upload endpoint for cache replay.
pub struct HttpTransportLink {
    http: reqwest::Client,
    base_url: String,
}

impl HttpTransportLink {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl TransportLink for HttpTransportLink {
    async fn probe(&mut self, kind: TransportKind) -> bool {
        if kind == TransportKind::Offline {
            return true;
        }

        let url = format!("{}/connectivity/check-{}", self.base_url, kind);
        match self.http.get(url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    async fn transmit(
        &mut self,
        kind: TransportKind,
        payload: &TelemetryPayload,
    ) -> Result<(), TransportError> {
        let url = format!("{}/transmit/{}", self.base_url, kind);
        let response = self
            .http
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|err| TransportError::Io(err.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(TransportError::Rejected {
                status: response.status().as_u16(),
            })
        }
    }

    async fn batch_flush(&mut self, entries: &[CacheEntry]) -> Result<(), TransportError> {
        let url = format!("{}/batch-upload", self.base_url);
        let response = self
            .http
            .post(url)
            .json(entries)
            .send()
            .await
            .map_err(|err| TransportError::Io(err.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(TransportError::Rejected {
                status: response.status().as_u16(),
            })
        }
    }
}
