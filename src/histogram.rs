use crate::defaults::HISTOGRAM_BUCKETS;
use serde::{Deserialize, Serialize};

/// One histogram bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    /// Upper latency mark of the bucket, in seconds
    pub mark: f64,
    pub count: usize,
    /// Count as a fraction of all samples considered
    pub frequency: f64,
}

/// Build the latency histogram from ascending-sorted samples (seconds).
///
/// Produces `HISTOGRAM_BUCKETS + 1` buckets: equal-width marks starting at
/// `fastest`, with `slowest` as the final mark. Every sample lands in the
/// first bucket whose mark it does not exceed; anything past the final mark
/// goes to the final bucket. When `fastest == slowest` all marks coincide and
/// the whole mass lands in the first bucket.
pub fn build(latencies: &[f64], fastest: f64, slowest: f64) -> Vec<Bucket> {
    let width = (slowest - fastest) / HISTOGRAM_BUCKETS as f64;

    let mut marks = Vec::with_capacity(HISTOGRAM_BUCKETS + 1);
    for i in 0..HISTOGRAM_BUCKETS {
        marks.push(fastest + width * i as f64);
    }
    marks.push(slowest);

    let last = marks.len() - 1;
    let mut counts = vec![0usize; marks.len()];

    // Single pass over sorted input: the boundary cursor only moves forward,
    // and a sample that overshoots a mark is re-tested against the next one.
    let mut bucket = 0;
    let mut i = 0;
    while i < latencies.len() {
        if latencies[i] <= marks[bucket] {
            counts[bucket] += 1;
            i += 1;
        } else if bucket < last {
            bucket += 1;
        } else {
            counts[last] += 1;
            i += 1;
        }
    }

    let total = latencies.len();
    marks
        .into_iter()
        .zip(counts)
        .map(|(mark, count)| Bucket {
            mark,
            count,
            frequency: if total > 0 {
                count as f64 / total as f64
            } else {
                0.0
            },
        })
        .collect()
}
