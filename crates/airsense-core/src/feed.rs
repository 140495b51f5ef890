use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::sample::{Channel, Sample};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("feed returned status {status}")]
    Status { status: u16 },
    #[error("feed response missing channel metadata")]
    MalformedResponse,
}

/// Source of historical and recent samples. The wire format belongs to
/// the external telemetry service; the core only sees `Sample`s.
#[async_trait]
pub trait TelemetryFeed: Send {
    /// Most recent `results` samples, ascending by timestamp.
    async fn fetch_recent(&mut self, results: usize) -> Result<Vec<Sample>, FeedError>;
}

#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub base_url: String,
    pub channel_id: String,
    pub api_key: Option<String>,
    pub default_location: String,
}

/// ThingSpeak-style channel feed client. The channel metadata labels its
/// eight fields; labels are matched by substring to our channel set, so a
/// feed can order its fields however it likes.
pub struct HttpFeed {
    http: reqwest::Client,
    config: FeedConfig,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FeedResponse {
    channel: Option<ChannelMeta>,
    feeds: Option<Vec<FeedEntry>>,
}

#[derive(Debug, Deserialize)]
struct ChannelMeta {
    name: Option<String>,
    field1: Option<String>,
    field2: Option<String>,
    field3: Option<String>,
    field4: Option<String>,
    field5: Option<String>,
    field6: Option<String>,
    field7: Option<String>,
    field8: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FeedEntry {
    created_at: DateTime<Utc>,
    field1: Option<String>,
    field2: Option<String>,
    field3: Option<String>,
    field4: Option<String>,
    field5: Option<String>,
    field6: Option<String>,
    field7: Option<String>,
    field8: Option<String>,
}

impl ChannelMeta {
    fn label(&self, index: usize) -> Option<&str> {
        match index {
            1 => self.field1.as_deref(),
            2 => self.field2.as_deref(),
            3 => self.field3.as_deref(),
            4 => self.field4.as_deref(),
            5 => self.field5.as_deref(),
            6 => self.field6.as_deref(),
            7 => self.field7.as_deref(),
            8 => self.field8.as_deref(),
            _ => None,
        }
    }
}

impl FeedEntry {
    fn field(&self, index: usize) -> Option<&str> {
        match index {
            1 => self.field1.as_deref(),
            2 => self.field2.as_deref(),
            3 => self.field3.as_deref(),
            4 => self.field4.as_deref(),
            5 => self.field5.as_deref(),
            6 => self.field6.as_deref(),
            7 => self.field7.as_deref(),
            8 => self.field8.as_deref(),
            _ => None,
        }
    }
}

/// What a labeled feed field maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FieldRole {
    Measurement(Channel),
    Location,
    Ignored,
}

/// Substring rules for the labels feeds use in the wild ("CO (ppm)",
/// "PM2.5", "Temp C", ...). "co" must not swallow "voc" labels.
pub(crate) fn classify_label(label: &str) -> FieldRole {
    let label = label.to_ascii_lowercase();

    if label.contains("location") {
        FieldRole::Location
    } else if label.contains("voc") {
        FieldRole::Measurement(Channel::Voc)
    } else if label.contains("co") {
        FieldRole::Measurement(Channel::Co)
    } else if label.contains("methane") || label.contains("ch4") {
        FieldRole::Measurement(Channel::Methane)
    } else if label.contains("pm2.5") || label.contains("pm25") {
        FieldRole::Measurement(Channel::Pm2_5)
    } else if label.contains("pm10") {
        FieldRole::Measurement(Channel::Pm10)
    } else if label.contains("temp") {
        FieldRole::Measurement(Channel::Temperature)
    } else if label.contains("hum") {
        FieldRole::Measurement(Channel::Humidity)
    } else {
        FieldRole::Ignored
    }
}

impl HttpFeed {
    pub fn new(config: FeedConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn feeds_url(&self, results: usize) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        let mut url = format!(
            "{}/channels/{}/feeds.json?results={}",
            base, self.config.channel_id, results
        );
        if let Some(key) = &self.config.api_key {
            url.push_str("&api_key=");
            url.push_str(key);
        }
        url
    }

    pub(crate) fn decode(&self, response: FeedResponse) -> Result<Vec<Sample>, FeedError> {
        let channel = response.channel.ok_or(FeedError::MalformedResponse)?;
        let feeds = response.feeds.ok_or(FeedError::MalformedResponse)?;

        let roles: Vec<(usize, FieldRole)> = (1..=8)
            .filter_map(|idx| {
                let role = classify_label(channel.label(idx)?);
                (role != FieldRole::Ignored).then_some((idx, role))
            })
            .collect();

        let fallback_location = channel
            .name
            .clone()
            .unwrap_or_else(|| self.config.default_location.clone());

        let mut samples = Vec::with_capacity(feeds.len());
        for entry in feeds {
            let mut sample = Sample::empty(
                entry.created_at,
                self.config.channel_id.clone(),
                fallback_location.clone(),
            );

            for (idx, role) in &roles {
                let Some(raw) = entry.field(*idx) else {
                    continue;
                };
                match role {
                    FieldRole::Measurement(channel) => {
                        // Unparsable readings degrade to missing, not zero.
                        sample.set_value(*channel, raw.trim().parse::<f64>().ok());
                    }
                    FieldRole::Location => {
                        if !raw.trim().is_empty() {
                            sample.location = raw.trim().to_string();
                        }
                    }
                    FieldRole::Ignored => {}
                }
            }

            if sample.has_pollutant_reading() {
                samples.push(sample);
            }
        }

        samples.sort_by_key(|s| s.timestamp);
        Ok(samples)
    }
}

#[async_trait]
impl TelemetryFeed for HttpFeed {
    async fn fetch_recent(&mut self, results: usize) -> Result<Vec<Sample>, FeedError> {
        let response = self.http.get(self.feeds_url(results)).send().await?;

        if !response.status().is_success() {
            return Err(FeedError::Status {
                status: response.status().as_u16(),
            });
        }

        let decoded: FeedResponse = response.json().await?;
        self.decode(decoded)
    }
}
