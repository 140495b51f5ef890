use chrono::{Duration, TimeZone, Utc};

use crate::sample::{Channel, Sample};
use crate::stats::{moving_average, moving_average_counted, pearson_correlation, trend_sign};

fn sample_at(hour: i64) -> Sample {
    let ts = Utc
        .with_ymd_and_hms(2026, 3, 1, 0, 0, 0)
        .single()
        .expect("valid date")
        + Duration::hours(hour);
    Sample::empty(ts, "chan-1", "Zone A")
}

fn series(values: &[Option<f64>], channel: Channel) -> Vec<Sample> {
    values
        .iter()
        .enumerate()
        .map(|(idx, value)| {
            let mut sample = sample_at(idx as i64);
            sample.set_value(channel, *value);
            sample
        })
        .collect()
}

#[test]
fn moving_average_skips_missing_values() {
    // Arrange
    let samples = series(&[Some(10.0), None, Some(20.0), None], Channel::Co);

    // Act
    let avg = moving_average(&samples, Channel::Co);

    // Assert
    assert_eq!(avg, 15.0, "missing values must not drag the mean toward zero");
}

#[test]
fn moving_average_defaults_to_zero_without_data() {
    let samples = series(&[None, None, None], Channel::Voc);

    assert_eq!(moving_average(&samples, Channel::Voc), 0.0);

    let (avg, count) = moving_average_counted(&samples, Channel::Voc);
    assert_eq!(avg, 0.0);
    assert_eq!(count, 0, "counted variant must expose that no values contributed");
}

#[test]
fn trend_sign_is_stable_inside_five_percent_band() {
    // Earlier half averages 100, later half 103: a 3% change.
    let samples = series(
        &[Some(100.0), Some(100.0), Some(103.0), Some(103.0)],
        Channel::Pm10,
    );

    assert_eq!(trend_sign(&samples, Channel::Pm10), 0);
}

#[test]
fn trend_sign_detects_direction_outside_band() {
    let rising = series(
        &[Some(100.0), Some(100.0), Some(120.0), Some(120.0)],
        Channel::Co,
    );
    let falling = series(
        &[Some(120.0), Some(120.0), Some(100.0), Some(100.0)],
        Channel::Co,
    );

    assert_eq!(trend_sign(&rising, Channel::Co), 1);
    assert_eq!(trend_sign(&falling, Channel::Co), -1);
}

#[test]
fn trend_sign_special_cases_return_stable() {
    // Fewer than two samples.
    let single = series(&[Some(50.0)], Channel::Methane);
    assert_eq!(trend_sign(&single, Channel::Methane), 0);

    // Earlier-half average of zero would divide by zero.
    let zero_start = series(
        &[Some(0.0), Some(0.0), Some(10.0), Some(10.0)],
        Channel::Methane,
    );
    assert_eq!(trend_sign(&zero_start, Channel::Methane), 0);
}

#[test]
fn pearson_correlation_is_symmetric() {
    let mut samples = Vec::new();
    for (idx, (co, voc)) in [(1.0, 2.0), (2.0, 4.5), (3.0, 5.5), (4.0, 9.0)]
        .iter()
        .enumerate()
    {
        let mut sample = sample_at(idx as i64);
        sample.co = Some(*co);
        sample.voc = Some(*voc);
        samples.push(sample);
    }

    let ab = pearson_correlation(&samples, Channel::Co, Channel::Voc);
    let ba = pearson_correlation(&samples, Channel::Voc, Channel::Co);

    assert_eq!(ab, ba, "correlation must not depend on argument order");
    assert!(ab > 0.9, "strongly increasing pair should correlate near 1, got {ab}");
}

#[test]
fn pearson_correlation_with_itself_is_one() {
    let samples = series(&[Some(1.0), Some(5.0), Some(9.0)], Channel::Temperature);

    let r = pearson_correlation(&samples, Channel::Temperature, Channel::Temperature);

    assert!((r - 1.0).abs() < 1e-12, "self correlation should be exactly 1, got {r}");
}

#[test]
fn pearson_correlation_needs_three_complete_pairs() {
    // Four samples, but only two have both channels present.
    let mut samples = series(
        &[Some(1.0), Some(2.0), Some(3.0), Some(4.0)],
        Channel::Co,
    );
    samples[0].methane = Some(1.0);
    samples[1].methane = Some(2.0);

    assert_eq!(
        pearson_correlation(&samples, Channel::Co, Channel::Methane),
        0.0,
        "fewer than three complete pairs must yield 0"
    );
}

#[test]
fn pearson_correlation_zero_variance_returns_zero() {
    let mut samples = series(&[Some(5.0), Some(5.0), Some(5.0)], Channel::Humidity);
    for (idx, sample) in samples.iter_mut().enumerate() {
        sample.temperature = Some(idx as f64);
    }

    assert_eq!(
        pearson_correlation(&samples, Channel::Humidity, Channel::Temperature),
        0.0,
        "a flat series has no defined correlation"
    );
}
