use anyhow::Result;
use bench_report::{defaults, Collector, MeasurementRecord, Reporter, RunConfig, StopReason};
use chrono::Utc;
use std::io;
use std::time::Duration;

fn ok(ms: u64) -> MeasurementRecord {
    MeasurementRecord::ok(Duration::from_millis(ms), "OK")
}

/// 100 calls of 10..110 ms with a 10-call warm-up: the report covers the
/// remaining 90 and its histogram and median come from those 90 alone.
#[tokio::test]
async fn warm_up_is_excluded_from_histogram_and_percentiles() -> Result<()> {
    let reporter = Reporter::start(RunConfig::new("warm-up").with_skip_first(10))?;
    let sender = reporter.sender();

    for i in 0..100 {
        sender.send(ok(10 + i)).await?;
    }

    let report = reporter.stop(StopReason::NormalEnd).await;
    assert_eq!(report.count, 90);
    assert_eq!(report.status_code_distribution["OK"], 90);

    let eligible: Vec<Duration> = (20..110).map(Duration::from_millis).collect();
    assert_eq!(report.fastest, Some(eligible[0]));
    assert_eq!(report.slowest, Some(eligible[89]));

    let histogram = report.histogram.as_ref().expect("histogram populated");
    assert_eq!(histogram.len(), defaults::HISTOGRAM_BUCKETS + 1);
    assert_eq!(histogram[0].mark, eligible[0].as_secs_f64());
    assert_eq!(histogram[histogram.len() - 1].mark, eligible[89].as_secs_f64());
    assert_eq!(histogram.iter().map(|b| b.count).sum::<usize>(), 90);

    // 50% of 90 lands exactly on 45, so the 45th sample (index 44) is used
    assert_eq!(report.latency_at(50), Some(eligible[44]));

    let percentiles = report.latency_distribution.as_ref().unwrap();
    assert!(percentiles.windows(2).all(|w| w[0].latency <= w[1].latency));
    Ok(())
}

#[tokio::test]
async fn empty_run_reports_counts_only() -> Result<()> {
    let reporter = Reporter::start(RunConfig::new("nothing"))?;
    let report = reporter.stop(StopReason::NormalEnd).await;

    assert_eq!(report.count, 0);
    assert!(report.average.is_none());
    assert!(report.fastest.is_none());
    assert!(report.slowest.is_none());
    assert!(report.rps.is_none());
    assert!(report.latency_distribution.is_none());
    assert!(report.histogram.is_none());
    assert!(report.details.is_empty());
    assert!(report.status_code_distribution.is_empty());
    Ok(())
}

/// Five identical calls, one failed: the failure is tallied, and without
/// error latency it drops out of the histogram and percentile input.
#[tokio::test]
async fn one_error_among_identical_latencies() -> Result<()> {
    for count_error_latency in [false, true] {
        let config = RunConfig::new("one-error").with_count_error_latency(count_error_latency);
        let reporter = Reporter::start(config)?;
        let sender = reporter.sender();

        for _ in 0..4 {
            sender.send(ok(25)).await?;
        }
        sender
            .send(MeasurementRecord::failed(
                Duration::from_millis(25),
                "Unavailable",
                io::Error::new(io::ErrorKind::ConnectionReset, "connection reset by peer"),
            ))
            .await?;

        let report = reporter.stop(StopReason::NormalEnd).await;
        assert_eq!(report.count, 5);
        assert_eq!(report.error_distribution.len(), 1);
        assert_eq!(report.error_distribution["connection reset by peer"], 1);

        let eligible = if count_error_latency { 5 } else { 4 };
        let histogram = report.histogram.unwrap();
        assert_eq!(histogram.iter().map(|b| b.count).sum::<usize>(), eligible);
        // min == max: every mark coincides and the first bucket takes it all
        assert_eq!(histogram[0].count, eligible);
        assert_eq!(histogram[0].frequency, 1.0);
    }
    Ok(())
}

#[tokio::test]
async fn count_is_ingested_minus_skip_first() -> Result<()> {
    for (ingested, skip_first) in [(0u64, 0usize), (3, 5), (5, 5), (6, 5), (40, 0), (40, 39)] {
        let reporter = Reporter::start(RunConfig::new("counting").with_skip_first(skip_first))?;
        let sender = reporter.sender();
        for ms in 0..ingested {
            sender.send(ok(ms + 1)).await?;
        }

        let report = reporter.stop(StopReason::NormalEnd).await;
        let expected = ingested.saturating_sub(skip_first as u64);
        assert_eq!(report.count, expected, "{} ingested, skip {}", ingested, skip_first);
        assert_eq!(report.details.len() as u64, expected);
    }
    Ok(())
}

#[tokio::test]
async fn tags_and_stop_reason_are_echoed() -> Result<()> {
    let config = RunConfig::new("tagged").with_tags_json(br#"{"env":"ci","build":"42"}"#)?;
    let reporter = Reporter::start(config)?;
    reporter.sender().send(ok(3)).await?;

    let report = reporter.stop(StopReason::Timeout).await;
    assert_eq!(report.name, "tagged");
    assert_eq!(report.end_reason, StopReason::Timeout);
    assert_eq!(report.tags["env"], "ci");
    assert_eq!(report.tags["build"], "42");
    assert!(report.total > Duration::ZERO);
    assert!(report.date <= Utc::now());
    Ok(())
}

#[test]
fn finalize_twice_on_frozen_state_is_identical() {
    let mut collector = Collector::new(RunConfig::new("frozen").with_skip_first(1));
    for ms in [40, 12, 7, 33, 19, 12, 50] {
        collector.ingest(ok(ms));
    }

    let date = Utc::now();
    let total = Duration::from_secs(2);
    let first = collector.finalize(StopReason::NormalEnd, total, date);
    let second = collector.finalize(StopReason::NormalEnd, total, date);

    assert_eq!(first, second);
    assert_eq!(first.count, 6);
    assert_eq!(first.rps, Some(3.0));
}
