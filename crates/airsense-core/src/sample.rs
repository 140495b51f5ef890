use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimum number of samples required before forecasting is meaningful.
/// Also the width of the rolling window used for moving averages.
pub const MIN_FORECAST_SAMPLES: usize = 24;

/// A measured quantity reported by the sensor feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Channel {
    #[serde(rename = "co")]
    Co,
    #[serde(rename = "pm2_5")]
    Pm2_5,
    #[serde(rename = "pm10")]
    Pm10,
    #[serde(rename = "voc")]
    Voc,
    #[serde(rename = "methane")]
    Methane,
    #[serde(rename = "temperature")]
    Temperature,
    #[serde(rename = "humidity")]
    Humidity,
}

impl Channel {
    pub const ALL: [Channel; 7] = [
        Channel::Co,
        Channel::Pm2_5,
        Channel::Pm10,
        Channel::Voc,
        Channel::Methane,
        Channel::Temperature,
        Channel::Humidity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Co => "co",
            Channel::Pm2_5 => "pm2_5",
            Channel::Pm10 => "pm10",
            Channel::Voc => "voc",
            Channel::Methane => "methane",
            Channel::Temperature => "temperature",
            Channel::Humidity => "humidity",
        }
    }

    /// Ambient conditions are forecast flat at their moving average;
    /// gas and particulate channels get the per-step trend nudge.
    pub fn trend_adjusted(&self) -> bool {
        !matches!(self, Channel::Temperature | Channel::Humidity)
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One timestamped multivariate reading. A sensor that is not installed
/// reports `None` for its channel; missing values are excluded from
/// statistics, never coerced to zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub channel_id: String,
    pub location: String,
    pub co: Option<f64>,
    pub pm2_5: Option<f64>,
    pub pm10: Option<f64>,
    pub voc: Option<f64>,
    pub methane: Option<f64>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
}

impl Sample {
    pub fn empty(timestamp: DateTime<Utc>, channel_id: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            timestamp,
            channel_id: channel_id.into(),
            location: location.into(),
            co: None,
            pm2_5: None,
            pm10: None,
            voc: None,
            methane: None,
            temperature: None,
            humidity: None,
        }
    }

    pub fn value(&self, channel: Channel) -> Option<f64> {
        match channel {
            Channel::Co => self.co,
            Channel::Pm2_5 => self.pm2_5,
            Channel::Pm10 => self.pm10,
            Channel::Voc => self.voc,
            Channel::Methane => self.methane,
            Channel::Temperature => self.temperature,
            Channel::Humidity => self.humidity,
        }
    }

    pub fn set_value(&mut self, channel: Channel, value: Option<f64>) {
        match channel {
            Channel::Co => self.co = value,
            Channel::Pm2_5 => self.pm2_5 = value,
            Channel::Pm10 => self.pm10 = value,
            Channel::Voc => self.voc = value,
            Channel::Methane => self.methane = value,
            Channel::Temperature => self.temperature = value,
            Channel::Humidity => self.humidity = value,
        }
    }

    /// True when at least one gas or particulate channel carries a value.
    /// Feed entries without any pollutant reading are not worth keeping.
    pub fn has_pollutant_reading(&self) -> bool {
        self.co.is_some()
            || self.voc.is_some()
            || self.methane.is_some()
            || self.pm2_5.is_some()
            || self.pm10.is_some()
    }
}

/// A time-ordered run of samples used as statistical input.
/// Construction sorts, so the non-decreasing timestamp invariant holds
/// for the lifetime of the window.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SampleWindow {
    samples: Vec<Sample>,
}

impl SampleWindow {
    pub fn from_unordered(mut samples: Vec<Sample>) -> Self {
        samples.sort_by_key(|s| s.timestamp);
        Self { samples }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }

    /// The most recent `n` samples (fewer when the window is shorter).
    pub fn tail(&self, n: usize) -> &[Sample] {
        let start = self.samples.len().saturating_sub(n);
        &self.samples[start..]
    }
}
