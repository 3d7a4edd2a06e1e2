//! # Bench Report - Synthetic Load Driver
//!
//! Drives a run end to end without a real target: a pool of workers simulate
//! calls with random latency and failure, push one record per call into the
//! run, and the finished report is written to stdout as JSON.
//!
//! ## Stop Conditions
//!
//! - All `--calls` have been issued: `normal`
//! - `--duration` elapsed first: `timeout`
//! - Ctrl-C: `cancel`
//!
//! Logs go to stderr so the report can be piped.

use anyhow::Result;
use bench_report::{
    cli::Args, logging, MeasurementRecord, PrometheusExporter, RecordSender, Reporter,
    ReporterError, RunConfig, StopReason,
};
use clap::Parser;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);
    args.validate().map_err(anyhow::Error::msg)?;

    let config = RunConfig::from_args(&args)?;
    debug!("Configuration: {:?}", config);

    let exporter = if args.prometheus {
        Some(Arc::new(PrometheusExporter::new(&config.name)?))
    } else {
        None
    };

    let reporter = match exporter.clone() {
        Some(exporter) => Reporter::start_with_exporter(config, exporter)?,
        None => Reporter::start(config)?,
    };

    let budget = Arc::new(AtomicUsize::new(args.calls));
    let workers: Vec<JoinHandle<()>> = (0..args.concurrency)
        .map(|id| {
            tokio::spawn(run_worker(
                id,
                reporter.sender(),
                budget.clone(),
                args.clone(),
            ))
        })
        .collect();

    let reason = tokio::select! {
        reason = wait_for_workers(workers, args.duration) => reason,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, stopping run");
            StopReason::Cancel
        }
    };

    let report = reporter.stop(reason).await;
    info!(
        "Run '{}' finished ({}): {} calls, {:.2} req/s, average {:?}, {} errors",
        report.name,
        report.end_reason,
        report.count,
        report.rps.unwrap_or_default(),
        report.average.unwrap_or_default(),
        report.error_count()
    );

    if let Some(exporter) = exporter {
        info!("Exported metrics:\n{}", exporter.gather_text()?);
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Wait until every worker finishes, or until `limit` elapses
async fn wait_for_workers(workers: Vec<JoinHandle<()>>, limit: Option<Duration>) -> StopReason {
    let all_done = async {
        for worker in workers {
            if let Err(e) = worker.await {
                warn!("Worker task failed: {}", e);
            }
        }
    };

    match limit {
        Some(limit) => match tokio::time::timeout(limit, all_done).await {
            Ok(()) => StopReason::NormalEnd,
            Err(_) => StopReason::Timeout,
        },
        None => {
            all_done.await;
            StopReason::NormalEnd
        }
    }
}

/// Issue simulated calls until the shared call budget runs out or the run
/// stops accepting records
async fn run_worker(id: usize, sender: RecordSender, budget: Arc<AtomicUsize>, args: Args) {
    let mut rng = StdRng::from_entropy();
    let mut issued = 0usize;

    while claim(&budget) {
        let latency = if args.max_latency > args.min_latency {
            rng.gen_range(args.min_latency..=args.max_latency)
        } else {
            args.min_latency
        };
        tokio::time::sleep(latency).await;

        let record = if rng.gen_bool(args.error_rate) {
            MeasurementRecord::failed(
                latency,
                "Unavailable",
                anyhow::anyhow!("simulated failure"),
            )
        } else {
            MeasurementRecord::ok(latency, "OK")
        };

        match sender.send(record).await {
            Ok(()) => issued += 1,
            Err(ReporterError::Closed) => break,
            Err(e) => {
                warn!("Worker {} dropped a record: {}", id, e);
            }
        }
    }

    debug!("Worker {} issued {} calls", id, issued);
}

fn claim(budget: &AtomicUsize) -> bool {
    budget
        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |left| left.checked_sub(1))
        .is_ok()
}
