use chrono::{Duration, TimeZone, Utc};

use crate::forecast::{ForecastEngine, ForecastError};
use crate::issues;
use crate::sample::{Channel, Sample, SampleWindow, MIN_FORECAST_SAMPLES};

fn sample_at(hour: i64) -> Sample {
    let ts = Utc
        .with_ymd_and_hms(2026, 3, 1, 0, 0, 0)
        .single()
        .expect("valid date")
        + Duration::hours(hour);
    Sample::empty(ts, "chan-1", "Zone A")
}

fn window_of(count: usize, fill: impl Fn(usize, &mut Sample)) -> SampleWindow {
    let samples = (0..count)
        .map(|idx| {
            let mut sample = sample_at(idx as i64);
            fill(idx, &mut sample);
            sample
        })
        .collect();
    SampleWindow::from_unordered(samples)
}

#[test]
fn forecast_rejects_short_windows() {
    // Arrange
    let window = window_of(MIN_FORECAST_SAMPLES - 1, |_, s| s.co = Some(5.0));
    let engine = ForecastEngine::new();

    // Act
    let result = engine.forecast(&window, 3);

    // Assert
    let err = result.expect_err("23 samples must not be enough");
    match err {
        ForecastError::InsufficientData { needed, got } => {
            assert_eq!(needed, MIN_FORECAST_SAMPLES);
            assert_eq!(got, MIN_FORECAST_SAMPLES - 1);
        }
    }
}

#[test]
fn forecast_produces_one_point_per_step_with_decaying_confidence() {
    let window = window_of(MIN_FORECAST_SAMPLES, |_, s| {
        s.co = Some(5.0);
        s.temperature = Some(21.0);
    });
    let engine = ForecastEngine::new();

    let points = engine
        .forecast(&window, 10)
        .expect("24 stable samples forecast cleanly");

    assert_eq!(points.len(), 10);
    for pair in points.windows(2) {
        assert!(
            pair[1].timestamp > pair[0].timestamp,
            "timestamps must be strictly increasing"
        );
        assert!(
            pair[1].confidence <= pair[0].confidence,
            "confidence must never recover with distance"
        );
    }
    for point in &points {
        assert!((0.3..=1.0).contains(&point.confidence));
    }

    // The decay is linear with a floor: 0.9 at step 1, pinned to 0.3 from
    // step 7 onward.
    assert!((points[0].confidence - 0.9).abs() < 1e-12);
    assert!((points[6].confidence - 0.3).abs() < 1e-12);
    assert!((points[9].confidence - 0.3).abs() < 1e-12);
}

#[test]
fn forecast_timestamps_step_hourly_from_last_observation() {
    let window = window_of(MIN_FORECAST_SAMPLES, |_, s| s.co = Some(5.0));
    let last_observed = window.last().expect("non-empty window").timestamp;
    let engine = ForecastEngine::new();

    let points = engine.forecast(&window, 3).expect("forecast");

    for (idx, point) in points.iter().enumerate() {
        let expected = last_observed + Duration::hours(idx as i64 + 1);
        assert_eq!(point.timestamp, expected);
    }
}

#[test]
fn forecast_applies_trend_nudge_to_gas_channels_only() {
    // Earlier half of the window reads 10, later half 20: a rising trend.
    // Temperature rises the same way but must be forecast flat.
    let window = window_of(MIN_FORECAST_SAMPLES, |idx, s| {
        let level = if idx < MIN_FORECAST_SAMPLES / 2 { 10.0 } else { 20.0 };
        s.co = Some(level);
        s.temperature = Some(level);
    });
    let engine = ForecastEngine::new();

    let points = engine.forecast(&window, 1).expect("forecast");

    // base 15.0, trend +1, one step at 5%: 15 * 1.05.
    let co = points[0].predicted.co;
    assert!(
        (co - 15.75).abs() < 1e-9,
        "expected trend-nudged CO of 15.75, got {co}"
    );

    let temperature = points[0].predicted.temperature;
    assert!(
        (temperature - 15.0).abs() < 1e-9,
        "temperature must stay at its moving average, got {temperature}"
    );
}

#[test]
fn forecast_conditions_later_steps_on_earlier_predictions() {
    // A rising CO series: self-conditioning must keep pushing the
    // prediction upward step over step.
    let window = window_of(MIN_FORECAST_SAMPLES, |idx, s| {
        let level = if idx < MIN_FORECAST_SAMPLES / 2 { 10.0 } else { 20.0 };
        s.co = Some(level);
    });
    let engine = ForecastEngine::new();

    let points = engine.forecast(&window, 4).expect("forecast");

    for pair in points.windows(2) {
        assert!(
            pair[1].predicted.co > pair[0].predicted.co,
            "rising trend should compound across steps"
        );
    }
}

#[test]
fn forecast_does_not_mutate_the_caller_window() {
    let window = window_of(MIN_FORECAST_SAMPLES, |_, s| s.co = Some(5.0));
    let engine = ForecastEngine::new();

    let _ = engine.forecast(&window, 6).expect("forecast");

    assert_eq!(window.len(), MIN_FORECAST_SAMPLES, "forecasting works on a scratch copy");
}

#[test]
fn forecast_flags_predicted_issues() {
    let window = window_of(MIN_FORECAST_SAMPLES, |_, s| {
        s.co = Some(12.0);
        s.humidity = Some(50.0);
    });
    let engine = ForecastEngine::new();

    let points = engine.forecast(&window, 1).expect("forecast");

    assert!(
        points[0].issues.iter().any(|i| i == issues::HIGH_CO),
        "CO held at 12 must carry the high-CO issue, got {:?}",
        points[0].issues
    );
}
