use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::sample::{Channel, SampleWindow};
use crate::stats;

/// Symmetric channel-by-channel Pearson matrix with a unit diagonal.
/// Serializes to the nested object shape the dashboard consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationMatrix(BTreeMap<Channel, BTreeMap<Channel, f64>>);

impl CorrelationMatrix {
    pub fn get(&self, a: Channel, b: Channel) -> f64 {
        self.0
            .get(&a)
            .and_then(|row| row.get(&b))
            .copied()
            .unwrap_or(0.0)
    }
}

/// Computes every unordered channel pair once and mirrors it into both
/// cells. Deterministic, no I/O; recomputed fresh per request.
pub fn correlation_matrix(window: &SampleWindow) -> CorrelationMatrix {
    let mut cells: BTreeMap<Channel, BTreeMap<Channel, f64>> = BTreeMap::new();

    for channel in Channel::ALL {
        let row = cells.entry(channel).or_default();
        row.insert(channel, 1.0);
    }

    for (i, a) in Channel::ALL.iter().enumerate() {
        for b in Channel::ALL.iter().skip(i + 1) {
            let r = stats::pearson_correlation(window.samples(), *a, *b);
            if let Some(row) = cells.get_mut(a) {
                row.insert(*b, r);
            }
            if let Some(row) = cells.get_mut(b) {
                row.insert(*a, r);
            }
        }
    }

    CorrelationMatrix(cells)
}
