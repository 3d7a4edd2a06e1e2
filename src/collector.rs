//! # Collector
//!
//! Running aggregates of a single run. The collector is fed one record at a
//! time, in arrival order, by the run's consumer task and is the only writer
//! to its state. Once ingestion has drained, [`Collector::finalize`] turns the
//! frozen aggregates into a [`Report`].
//!
//! ## Aggregation Rules
//!
//! - The first `skip_first` records are dropped before touching anything
//! - Every other record updates count, latency sum and distributions
//! - Per-call details are retained only up to a hard cap
//! - Percentiles and histogram draw from retained details, filtered by the
//!   run's error-latency policy

use crate::{
    config::RunConfig,
    defaults, histogram, percentile,
    record::{MeasurementRecord, ResultDetail, StopReason},
    report::Report,
};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, trace};

/// Single-writer aggregate state for one run
#[derive(Debug, Clone)]
pub struct Collector {
    config: RunConfig,
    max_details: usize,
    skipped: usize,
    total_count: u64,
    total_latency: Duration,
    status_code_dist: BTreeMap<String, u64>,
    error_dist: BTreeMap<String, u64>,
    details: Vec<ResultDetail>,
}

impl Collector {
    pub fn new(config: RunConfig) -> Self {
        Self::with_detail_limit(config, defaults::MAX_RESULT_DETAILS)
    }

    fn with_detail_limit(config: RunConfig, max_details: usize) -> Self {
        Self {
            config,
            max_details,
            skipped: 0,
            total_count: 0,
            total_latency: Duration::ZERO,
            status_code_dist: BTreeMap::new(),
            error_dist: BTreeMap::new(),
            details: Vec::new(),
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Whether the next record will still be discarded as warm-up
    pub fn is_warming_up(&self) -> bool {
        self.skipped < self.config.skip_first
    }

    /// Number of aggregated records so far
    pub fn count(&self) -> u64 {
        self.total_count
    }

    /// Number of warm-up records discarded so far
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn details(&self) -> &[ResultDetail] {
        &self.details
    }

    /// Fold one record into the aggregates
    pub fn ingest(&mut self, record: MeasurementRecord) {
        if self.is_warming_up() {
            self.skipped += 1;
            trace!("Skipping warm-up record {}/{}", self.skipped, self.config.skip_first);
            return;
        }

        let error = record.error_message();

        self.total_count += 1;
        self.total_latency = self.total_latency.saturating_add(record.duration);
        *self
            .status_code_dist
            .entry(record.status.clone())
            .or_insert(0) += 1;

        if record.error.is_some() {
            *self.error_dist.entry(error.clone()).or_insert(0) += 1;
        }

        if self.details.len() < self.max_details {
            self.details.push(ResultDetail {
                timestamp: record.timestamp,
                latency: record.duration,
                error,
                status: record.status,
            });

            if self.details.len() == self.max_details {
                debug!(
                    "Retained {} result details; further records only update aggregates",
                    self.max_details
                );
            }
        }
    }

    /// Build the report from the current, drained state.
    ///
    /// Does not mutate the collector: calling it twice with the same inputs
    /// returns equal reports.
    pub fn finalize(&self, reason: StopReason, total: Duration, date: DateTime<Utc>) -> Report {
        let mut report = Report {
            name: self.config.name.clone(),
            end_reason: reason,
            date,
            count: self.total_count,
            total,
            average: None,
            fastest: None,
            slowest: None,
            rps: None,
            error_distribution: self.error_dist.clone(),
            status_code_distribution: self.status_code_dist.clone(),
            latency_distribution: None,
            histogram: None,
            details: Vec::new(),
            tags: self.config.tags.clone(),
        };

        if self.total_count == 0 {
            return report;
        }

        report.average = Some(self.average_latency());
        let elapsed_secs = total.as_secs_f64();
        if elapsed_secs > 0.0 {
            report.rps = Some(self.total_count as f64 / elapsed_secs);
        }

        let mut eligible: Vec<Duration> = self
            .details
            .iter()
            .filter(|d| self.config.count_error_latency || !d.is_error())
            .map(|d| d.latency)
            .collect();
        eligible.sort_unstable();

        if let (Some(&fastest), Some(&slowest)) = (eligible.first(), eligible.last()) {
            let seconds: Vec<f64> = eligible.iter().map(Duration::as_secs_f64).collect();

            report.fastest = Some(fastest);
            report.slowest = Some(slowest);
            report.histogram = Some(histogram::build(
                &seconds,
                fastest.as_secs_f64(),
                slowest.as_secs_f64(),
            ));
            report.latency_distribution = Some(percentile::extract(&eligible));
        }

        report.details = self.details.clone();
        report
    }

    fn average_latency(&self) -> Duration {
        let nanos = self.total_latency.as_nanos() / u128::from(self.total_count.max(1));
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn ok(ms: u64) -> MeasurementRecord {
        MeasurementRecord::ok(Duration::from_millis(ms), "OK")
    }

    fn failed(ms: u64, message: &str) -> MeasurementRecord {
        MeasurementRecord::failed(
            Duration::from_millis(ms),
            "Unavailable",
            io::Error::new(io::ErrorKind::Other, message.to_string()),
        )
    }

    fn finalize(collector: &Collector) -> Report {
        collector.finalize(StopReason::NormalEnd, Duration::from_secs(2), Utc::now())
    }

    #[test]
    fn test_skip_first_excluded_from_everything() {
        let mut collector = Collector::new(RunConfig::new("warmup").with_skip_first(3));

        collector.ingest(failed(1000, "early failure"));
        collector.ingest(ok(1000));
        collector.ingest(ok(1000));
        assert!(!collector.is_warming_up());
        collector.ingest(ok(10));
        collector.ingest(ok(20));

        assert_eq!(collector.skipped(), 3);
        assert_eq!(collector.count(), 2);
        assert_eq!(collector.details().len(), 2);

        let report = finalize(&collector);
        assert_eq!(report.count, 2);
        assert!(report.error_distribution.is_empty());
        assert_eq!(report.status_code_distribution["OK"], 2);
        assert_eq!(report.average, Some(Duration::from_millis(15)));
        assert_eq!(report.slowest, Some(Duration::from_millis(20)));
    }

    #[test]
    fn test_fewer_records_than_skip_first() {
        let mut collector = Collector::new(RunConfig::new("short").with_skip_first(10));
        for ms in 1..=4 {
            collector.ingest(ok(ms));
        }

        assert!(collector.is_warming_up());
        let report = finalize(&collector);
        assert_eq!(report.count, 0);
        assert!(report.average.is_none());
        assert!(report.histogram.is_none());
    }

    #[test]
    fn test_empty_run_populates_only_counts() {
        let collector = Collector::new(RunConfig::new("empty"));
        let report = finalize(&collector);

        assert_eq!(report.count, 0);
        assert_eq!(report.name, "empty");
        assert!(report.average.is_none());
        assert!(report.fastest.is_none());
        assert!(report.slowest.is_none());
        assert!(report.rps.is_none());
        assert!(report.latency_distribution.is_none());
        assert!(report.histogram.is_none());
        assert!(report.details.is_empty());
    }

    #[test]
    fn test_error_latency_excluded_by_default() {
        let mut collector = Collector::new(RunConfig::new("errors"));
        for _ in 0..4 {
            collector.ingest(ok(50));
        }
        collector.ingest(failed(50, "connection reset"));

        let report = finalize(&collector);
        assert_eq!(report.count, 5);
        assert_eq!(report.error_distribution.len(), 1);
        assert_eq!(report.error_distribution["connection reset"], 1);
        assert_eq!(report.status_code_distribution["OK"], 4);
        assert_eq!(report.status_code_distribution["Unavailable"], 1);

        let histogram = report.histogram.unwrap();
        assert_eq!(histogram.iter().map(|b| b.count).sum::<usize>(), 4);
        assert_eq!(report.details.len(), 5);
        assert_eq!(report.details[4].error, "connection reset");
    }

    #[test]
    fn test_error_latency_counted_when_enabled() {
        let config = RunConfig::new("errors").with_count_error_latency(true);
        let mut collector = Collector::new(config);
        collector.ingest(ok(10));
        collector.ingest(failed(900, "deadline exceeded"));

        let report = finalize(&collector);
        assert_eq!(report.slowest, Some(Duration::from_millis(900)));
        let histogram = report.histogram.unwrap();
        assert_eq!(histogram.iter().map(|b| b.count).sum::<usize>(), 2);
    }

    #[test]
    fn test_only_errors_without_error_latency() {
        let mut collector = Collector::new(RunConfig::new("all-failed"));
        collector.ingest(failed(30, "refused"));
        collector.ingest(failed(40, "refused"));

        let report = finalize(&collector);
        assert_eq!(report.count, 2);
        assert_eq!(report.average, Some(Duration::from_millis(35)));
        assert_eq!(report.rps, Some(1.0));
        assert!(report.fastest.is_none());
        assert!(report.histogram.is_none());
        assert!(report.latency_distribution.is_none());
        assert_eq!(report.error_distribution["refused"], 2);
    }

    #[test]
    fn test_detail_cap_bounds_retention_not_aggregates() {
        let mut collector = Collector::with_detail_limit(RunConfig::new("capped"), 5);
        for ms in 1..=12 {
            collector.ingest(ok(ms));
        }
        collector.ingest(failed(13, "late failure"));

        assert_eq!(collector.details().len(), 5);
        let report = finalize(&collector);
        assert_eq!(report.count, 13);
        assert_eq!(report.status_code_distribution["OK"], 12);
        assert_eq!(report.error_distribution["late failure"], 1);
        assert_eq!(report.details.len(), 5);
        // Latency statistics come from retained samples only
        assert_eq!(report.slowest, Some(Duration::from_millis(5)));
        assert_eq!(report.average, Some(Duration::from_millis(7)));
    }

    #[test]
    fn test_finalize_is_repeatable() {
        let mut collector = Collector::new(RunConfig::new("twice").with_count_error_latency(true));
        for ms in [5, 3, 9, 1, 7] {
            collector.ingest(ok(ms));
        }
        collector.ingest(failed(4, "boom"));

        let date = Utc::now();
        let first = collector.finalize(StopReason::Timeout, Duration::from_secs(3), date);
        let second = collector.finalize(StopReason::Timeout, Duration::from_secs(3), date);
        assert_eq!(first, second);
        assert_eq!(first.end_reason, StopReason::Timeout);
        assert_eq!(first.rps, Some(2.0));
    }
}
