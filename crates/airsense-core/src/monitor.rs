use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::timeout;

use crate::alerts::{self, AlertRecord, ThresholdConfig};
use crate::config::MonitorConfig;
use crate::feed::TelemetryFeed;
use crate::sample::Sample;

#[derive(Debug, Clone, PartialEq, Eq)]
enum FeedState {
    Disconnected,
    Streaming,
    Degraded,
}

/// One monitor tick: the newest reading, any alerts it raised, and the
/// health of the feed that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    pub ts: DateTime<Utc>,
    pub feed: FeedHealth,
    pub status: FeedStatus,
    pub sample: Option<Sample>,
    pub alerts: Vec<AlertRecord>,
    pub quality: PollQuality,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedHealth {
    pub rtt_ms: u128,
    pub age_ms: u128,
    pub stale: bool,
    pub last_ok_ts: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedStatus {
    pub code: String,
    pub failures: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollQuality {
    pub poll_ms: u128,
    pub reads_ok: u64,
    pub reads_err: u64,
    pub alerts_emitted: u64,
    pub effective_interval_ms: u128,
}

/// Polling state machine over a telemetry feed. Each tick fetches the
/// recent entries, picks out samples newer than anything already seen,
/// and runs each fresh sample through the threshold evaluator. Fetch
/// failures degrade the state; `error_threshold` consecutive failures
/// mark the feed disconnected.
pub struct FeedMonitor<F: TelemetryFeed> {
    feed: F,
    config: MonitorConfig,
    thresholds: ThresholdConfig,
    state: FeedState,
    last_seen_ts: Option<DateTime<Utc>>,
    latest_sample: Option<Sample>,
    errors_in_row: u32,
    reads_ok: u64,
    reads_err: u64,
    alerts_emitted: u64,
    effective_interval: Duration,
    last_ok_instant: Option<Instant>,
    last_ok_ts: Option<DateTime<Utc>>,
}

impl<F: TelemetryFeed> FeedMonitor<F> {
    pub fn new(feed: F, config: MonitorConfig, thresholds: ThresholdConfig) -> Self {
        Self {
            feed,
            config: config.clone(),
            thresholds,
            state: FeedState::Disconnected,
            last_seen_ts: None,
            latest_sample: None,
            errors_in_row: 0,
            reads_ok: 0,
            reads_err: 0,
            alerts_emitted: 0,
            effective_interval: config.poll_interval,
            last_ok_instant: None,
            last_ok_ts: None,
        }
    }

    pub fn effective_interval(&self) -> Duration {
        self.effective_interval
    }

    pub async fn tick(&mut self) -> Observation {
        let started = Instant::now();
        let timed = timeout(
            self.config.poll_timeout,
            self.feed.fetch_recent(self.config.fetch_results),
        )
        .await;

        match timed {
            Ok(Ok(samples)) => {
                let rtt = started.elapsed();
                self.reads_ok += 1;
                self.errors_in_row = 0;
                self.state = FeedState::Streaming;
                self.last_ok_instant = Some(Instant::now());
                self.last_ok_ts = Some(Utc::now());

                if self.config.auto_tune {
                    self.tune_interval(rtt, true);
                }

                let fresh: Vec<Sample> = samples
                    .into_iter()
                    .filter(|s| self.last_seen_ts.map_or(true, |seen| s.timestamp > seen))
                    .collect();

                let mut alerts = Vec::new();
                for sample in &fresh {
                    alerts.extend(alerts::evaluate(sample, &self.thresholds));
                }
                self.alerts_emitted += alerts.len() as u64;

                if let Some(newest) = fresh.last() {
                    self.last_seen_ts = Some(newest.timestamp);
                    self.latest_sample = Some(newest.clone());
                }

                self.healthy_observation(alerts, rtt)
            }
            Ok(Err(err)) => self.failed_tick(err.to_string(), started.elapsed()),
            Err(_) => self.failed_tick("timeout".to_string(), self.config.poll_timeout),
        }
    }

    fn failed_tick(&mut self, reason: String, elapsed: Duration) -> Observation {
        self.reads_err += 1;
        self.errors_in_row += 1;

        if self.config.auto_tune {
            self.tune_interval(self.config.poll_timeout, false);
        }

        self.state = if self.errors_in_row >= self.config.error_threshold {
            FeedState::Disconnected
        } else {
            FeedState::Degraded
        };

        self.unhealthy_observation(reason, elapsed)
    }

    fn tune_interval(&mut self, rtt: Duration, ok: bool) {
        if !ok {
            self.effective_interval = (self.effective_interval + Duration::from_secs(5))
                .min(self.config.poll_interval_max);
            return;
        }

        let threshold = self.effective_interval.mul_f64(0.6);
        if rtt > threshold {
            self.effective_interval = (self.effective_interval + Duration::from_secs(2))
                .min(self.config.poll_interval_max);
            return;
        }

        if self.reads_ok % 30 == 0 {
            self.effective_interval = self
                .effective_interval
                .saturating_sub(Duration::from_secs(1))
                .max(self.config.poll_interval_min);
        }
    }

    fn healthy_observation(&self, alerts: Vec<AlertRecord>, rtt: Duration) -> Observation {
        Observation {
            ts: Utc::now(),
            feed: FeedHealth {
                rtt_ms: rtt.as_millis(),
                age_ms: 0,
                stale: false,
                last_ok_ts: self.last_ok_ts,
            },
            status: FeedStatus {
                code: "STREAMING".to_string(),
                failures: Vec::new(),
            },
            sample: self.latest_sample.clone(),
            alerts,
            quality: self.quality(rtt.as_millis()),
        }
    }

    fn unhealthy_observation(&self, reason: String, elapsed: Duration) -> Observation {
        let age_ms = self
            .last_ok_instant
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(self.config.disconnected_after.as_millis());
        let stale = age_ms > self.config.stale_after.as_millis();

        let code = match self.state {
            FeedState::Disconnected => "DISCONNECTED",
            FeedState::Degraded => "DEGRADED",
            FeedState::Streaming => "STREAMING",
        };

        Observation {
            ts: Utc::now(),
            feed: FeedHealth {
                rtt_ms: elapsed.as_millis(),
                age_ms,
                stale,
                last_ok_ts: self.last_ok_ts,
            },
            status: FeedStatus {
                code: code.to_string(),
                failures: vec![reason],
            },
            sample: self.latest_sample.clone(),
            alerts: Vec::new(),
            quality: self.quality(elapsed.as_millis()),
        }
    }

    fn quality(&self, poll_ms: u128) -> PollQuality {
        PollQuality {
            poll_ms,
            reads_ok: self.reads_ok,
            reads_err: self.reads_err,
            alerts_emitted: self.alerts_emitted,
            effective_interval_ms: self.effective_interval.as_millis(),
        }
    }
}
