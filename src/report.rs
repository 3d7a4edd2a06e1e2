use crate::{
    histogram::Bucket,
    percentile::PercentileEntry,
    record::{ResultDetail, StopReason},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Final statistics of a run
///
/// Built exactly once when the run stops and never mutated afterwards.
/// Latency-derived fields are `None` when the run aggregated no records;
/// fastest, slowest, histogram and percentiles are also `None` when no
/// sample was eligible under the run's error-latency policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    pub end_reason: StopReason,
    pub date: DateTime<Utc>,

    pub count: u64,
    /// Wall-clock duration of the run
    #[serde(with = "nanos")]
    pub total: Duration,
    #[serde(default, with = "nanos_opt", skip_serializing_if = "Option::is_none")]
    pub average: Option<Duration>,
    #[serde(default, with = "nanos_opt", skip_serializing_if = "Option::is_none")]
    pub fastest: Option<Duration>,
    #[serde(default, with = "nanos_opt", skip_serializing_if = "Option::is_none")]
    pub slowest: Option<Duration>,
    /// Aggregated calls per second of wall-clock run time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rps: Option<f64>,

    pub error_distribution: BTreeMap<String, u64>,
    pub status_code_distribution: BTreeMap<String, u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_distribution: Option<Vec<PercentileEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub histogram: Option<Vec<Bucket>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<ResultDetail>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

impl Report {
    /// Latency reported for a percentile rank, if that rank has data
    pub fn latency_at(&self, percentage: u32) -> Option<Duration> {
        self.latency_distribution
            .as_ref()?
            .iter()
            .find(|entry| entry.percentage == percentage)
            .map(|entry| entry.latency)
    }

    /// Number of aggregated calls that carried an error
    pub fn error_count(&self) -> u64 {
        self.error_distribution.values().sum()
    }
}

/// Durations encoded as integer nanoseconds
pub(crate) mod nanos {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let nanos = u64::try_from(value.as_nanos()).unwrap_or(u64::MAX);
        serializer.serialize_u64(nanos)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_nanos)
    }
}

pub(crate) mod nanos_opt {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => super::nanos::serialize(duration, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_nanos))
    }
}
