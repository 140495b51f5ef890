use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::issues;
use crate::sample::{Channel, Sample, SampleWindow, MIN_FORECAST_SAMPLES};
use crate::stats;

/// Trend nudge applied per forecast step, as a fraction of the base value.
const TREND_STEP_RATE: f64 = 0.05;

/// Confidence lost per step into the future.
const CONFIDENCE_DECAY: f64 = 0.1;

/// Confidence never decays below this floor.
const CONFIDENCE_FLOOR: f64 = 0.3;

#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("insufficient data for forecasting: need at least {needed} samples, got {got}")]
    InsufficientData { needed: usize, got: usize },
}

/// Point predictions for every channel at one future timestamp. Channels
/// with no historical data predict 0.0, inheriting the moving-average
/// zero default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictedFields {
    pub co: f64,
    pub pm2_5: f64,
    pub pm10: f64,
    pub voc: f64,
    pub methane: f64,
    pub temperature: f64,
    pub humidity: f64,
}

impl PredictedFields {
    pub fn get(&self, channel: Channel) -> f64 {
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

    pub fn set(&mut self, channel: Channel, value: f64) {
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
}

/// One step of a forecast horizon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub timestamp: DateTime<Utc>,
    pub predicted: PredictedFields,
    /// In [0.3, 1.0], non-increasing across the horizon.
    pub confidence: f64,
    pub issues: Vec<String>,
}

/// Moving-average forecaster with trend-adjusted extrapolation.
///
/// Each step's prediction is appended to a local working copy of the
/// window, so later steps condition on earlier predictions. The
/// compounding error this introduces is intentional and bounded by the
/// decaying confidence score.
#[derive(Debug, Clone)]
pub struct ForecastEngine {
    window_size: usize,
}

impl Default for ForecastEngine {
    fn default() -> Self {
        Self {
            window_size: MIN_FORECAST_SAMPLES,
        }
    }
}

impl ForecastEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Produces `horizon_steps` hourly point forecasts past the end of
    /// `window`. The caller's window is never mutated.
    pub fn forecast(
        &self,
        window: &SampleWindow,
        horizon_steps: usize,
    ) -> Result<Vec<ForecastPoint>, ForecastError> {
        let got = window.len();
        if got < self.window_size {
            return Err(ForecastError::InsufficientData {
                needed: self.window_size,
                got,
            });
        }

        let mut working: Vec<Sample> = window.samples().to_vec();
        let template = working[working.len() - 1].clone();
        let last_observed_ts = template.timestamp;

        let mut points = Vec::with_capacity(horizon_steps);
        for step in 1..=horizon_steps {
            let timestamp = last_observed_ts + Duration::hours(step as i64);
            let recent = &working[working.len() - self.window_size..];

            let mut predicted = PredictedFields::default();
            for channel in Channel::ALL {
                let base = stats::moving_average(recent, channel);
                let value = if channel.trend_adjusted() {
                    let trend = stats::trend_sign(recent, channel) as f64;
                    base + trend * step as f64 * TREND_STEP_RATE * base
                } else {
                    base
                };
                predicted.set(channel, value);
            }

            let confidence = (1.0 - step as f64 * CONFIDENCE_DECAY).max(CONFIDENCE_FLOOR);
            let issues = issues::evaluate(&predicted);

            // Feed the prediction back so the next step conditions on it.
            let mut synthetic = template.clone();
            synthetic.timestamp = timestamp;
            for channel in Channel::ALL {
                synthetic.set_value(channel, Some(predicted.get(channel)));
            }
            working.push(synthetic);

            points.push(ForecastPoint {
                timestamp,
                predicted,
                confidence,
                issues,
            });
        }

        Ok(points)
    }
}
