use crate::sample::{Channel, Sample};

/// Relative change below which two half-window averages count as stable.
const STABLE_BAND: f64 = 0.05;

/// Pearson needs at least this many complete pairs to say anything.
const MIN_CORRELATION_PAIRS: usize = 3;

/// Mean of the non-missing values for `channel`, 0.0 when none are present.
/// The zero default is ambiguous with a genuine zero reading; callers that
/// need to tell them apart should use [`moving_average_counted`].
pub fn moving_average(samples: &[Sample], channel: Channel) -> f64 {
    moving_average_counted(samples, channel).0
}

/// [`moving_average`] plus the number of values that contributed to it.
pub fn moving_average_counted(samples: &[Sample], channel: Channel) -> (f64, usize) {
    let mut sum = 0.0;
    let mut count = 0usize;
    for sample in samples {
        if let Some(value) = sample.value(channel) {
            sum += value;
            count += 1;
        }
    }
    if count == 0 {
        (0.0, 0)
    } else {
        (sum / count as f64, count)
    }
}

/// Discretized direction of change between the earlier and later half of
/// the window: -1 decreasing, 0 stable, +1 increasing.
///
/// Stable means fewer than two samples, an earlier-half average of zero
/// (the relative change is undefined there), or a relative change inside
/// the 5% band.
pub fn trend_sign(samples: &[Sample], channel: Channel) -> i8 {
    if samples.len() < 2 {
        return 0;
    }

    let midpoint = samples.len() / 2;
    let earlier = moving_average(&samples[..midpoint], channel);
    let later = moving_average(&samples[midpoint..], channel);

    if earlier == 0.0 {
        return 0;
    }

    let relative_change = (later - earlier) / earlier;
    if relative_change.abs() < STABLE_BAND {
        0
    } else if relative_change > 0.0 {
        1
    } else {
        -1
    }
}

/// Pearson correlation coefficient over samples where both channels are
/// present (pairwise-complete). Returns 0.0 when fewer than three complete
/// pairs exist or when either series has zero variance.
pub fn pearson_correlation(samples: &[Sample], a: Channel, b: Channel) -> f64 {
    let pairs: Vec<(f64, f64)> = samples
        .iter()
        .filter_map(|s| Some((s.value(a)?, s.value(b)?)))
        .collect();

    if pairs.len() < MIN_CORRELATION_PAIRS {
        return 0.0;
    }

    let n = pairs.len() as f64;
    let mean_a = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_b = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut numerator = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in &pairs {
        let dx = x - mean_a;
        let dy = y - mean_b;
        numerator += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    if var_a == 0.0 || var_b == 0.0 {
        return 0.0;
    }

    numerator / (var_a * var_b).sqrt()
}
