use crate::defaults::PERCENTILES;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Latency at a given percentile rank
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PercentileEntry {
    pub percentage: u32,
    #[serde(with = "crate::report::nanos")]
    pub latency: Duration,
}

/// Extract the fixed percentile table from ascending-sorted latencies.
///
/// Ranks whose resolved latency is zero are left out: a zero reads as "no
/// data", not as an infinitely fast call.
pub fn extract(sorted: &[Duration]) -> Vec<PercentileEntry> {
    if sorted.is_empty() {
        return Vec::new();
    }

    PERCENTILES
        .iter()
        .filter_map(|&percentage| {
            let latency = sorted[rank_index(percentage, sorted.len())];
            (!latency.is_zero()).then_some(PercentileEntry {
                percentage,
                latency,
            })
        })
        .collect()
}

/// Zero-based index of the sample at `percentage` within `len` samples.
///
/// When the rank lands exactly on a whole number the index steps back by
/// one, so the 50th percentile of 90 samples is the 45th sample (index 44).
fn rank_index(percentage: u32, len: usize) -> usize {
    let position = percentage as f64 / 100.0 * len as f64;
    let index = position as usize;

    let index = if position == index as f64 {
        index.saturating_sub(1)
    } else {
        index
    };
    index.min(len - 1)
}
