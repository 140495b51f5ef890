use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sample::{Channel, Sample};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => f.write_str("low"),
            Severity::Medium => f.write_str("medium"),
            Severity::High => f.write_str("high"),
            Severity::Critical => f.write_str("critical"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdLimit {
    pub limit: f64,
    pub unit: String,
}

impl ThresholdLimit {
    fn new(limit: f64, unit: &str) -> Self {
        Self {
            limit,
            unit: unit.to_string(),
        }
    }
}

/// Alert limits for the monitored metrics. Read-only to the evaluator;
/// the defaults apply when no external configuration is supplied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub temperature: ThresholdLimit,
    pub humidity: ThresholdLimit,
    pub co: ThresholdLimit,
    /// PM2.5 standing in for an air-quality-index check.
    pub aqi: ThresholdLimit,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            temperature: ThresholdLimit::new(35.0, "C"),
            humidity: ThresholdLimit::new(80.0, "%"),
            co: ThresholdLimit::new(100.0, "ppm"),
            aqi: ThresholdLimit::new(150.0, "AQI"),
        }
    }
}

/// A synthesized threshold-breach alert. Ownership transfers to the
/// persistence collaborator as soon as the evaluator returns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRecord {
    pub alert_type: String,
    pub severity: Severity,
    pub message: String,
    pub location: String,
    pub value: f64,
    pub threshold: f64,
    pub timestamp: DateTime<Utc>,
    pub acknowledged: bool,
    pub resolved: bool,
}

struct MetricCheck {
    channel: Channel,
    key: &'static str,
    display_name: &'static str,
    /// Decimal places used when the value is embedded in the message.
    precision: usize,
    severity: fn(f64) -> Severity,
}

const MONITORED_METRICS: [MetricCheck; 4] = [
    MetricCheck {
        channel: Channel::Temperature,
        key: "TEMPERATURE",
        display_name: "Temperature",
        precision: 1,
        severity: temperature_severity,
    },
    MetricCheck {
        channel: Channel::Humidity,
        key: "HUMIDITY",
        display_name: "Humidity",
        precision: 1,
        severity: humidity_severity,
    },
    MetricCheck {
        channel: Channel::Co,
        key: "CO",
        display_name: "Carbon Monoxide",
        precision: 1,
        severity: co_severity,
    },
    MetricCheck {
        channel: Channel::Pm2_5,
        key: "AQI",
        display_name: "Air Quality Index",
        precision: 0,
        severity: aqi_severity,
    },
];

fn temperature_severity(value: f64) -> Severity {
    if value > 40.0 {
        Severity::Critical
    } else if value > 37.0 {
        Severity::High
    } else {
        Severity::Medium
    }
}

fn humidity_severity(value: f64) -> Severity {
    if value > 90.0 {
        Severity::High
    } else {
        Severity::Medium
    }
}

fn co_severity(value: f64) -> Severity {
    if value > 200.0 {
        Severity::Critical
    } else if value > 150.0 {
        Severity::High
    } else {
        Severity::Medium
    }
}

fn aqi_severity(value: f64) -> Severity {
    if value > 200.0 {
        Severity::Critical
    } else if value > 175.0 {
        Severity::High
    } else {
        Severity::Medium
    }
}

/// Checks one observed sample against the configured limits and returns
/// one alert per breached metric, in the fixed metric order. An empty
/// result is the normal, healthy case; nothing here ever errors.
pub fn evaluate(sample: &Sample, thresholds: &ThresholdConfig) -> Vec<AlertRecord> {
    let mut alerts = Vec::new();

    for metric in &MONITORED_METRICS {
        let Some(value) = sample.value(metric.channel) else {
            continue;
        };

        let limit = threshold_for(thresholds, metric.channel);
        if value <= limit.limit {
            continue;
        }

        let severity = (metric.severity)(value);
        let message = format!(
            "{name} level ({value:.prec$}) has exceeded the configured threshold ({limit} {unit}) in {location}.",
            name = metric.display_name,
            value = value,
            prec = metric.precision,
            limit = limit.limit,
            unit = limit.unit,
            location = sample.location,
        );

        alerts.push(AlertRecord {
            alert_type: format!("ThresholdBreach_{}", metric.key),
            severity,
            message,
            location: sample.location.clone(),
            value,
            threshold: limit.limit,
            timestamp: sample.timestamp,
            acknowledged: false,
            resolved: false,
        });
    }

    alerts
}

fn threshold_for(thresholds: &ThresholdConfig, channel: Channel) -> &ThresholdLimit {
    match channel {
        Channel::Temperature => &thresholds.temperature,
        Channel::Humidity => &thresholds.humidity,
        Channel::Co => &thresholds.co,
        _ => &thresholds.aqi,
    }
}
