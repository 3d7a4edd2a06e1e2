//! # Bench Report Library
//!
//! Streaming statistics aggregation for load-testing runs. Concurrent workers
//! push one measurement record per call into a run-scoped bounded queue; a
//! single consumer folds them into running aggregates, and once the run is
//! stopped the aggregates are turned into one immutable [`Report`].
//!
//! ## Architecture Overview
//!
//! The library is organized into the following modules:
//!
//! - `record`: Measurement input, retained per-call details and stop reasons
//! - `config`: Run configuration, validation and CLI conversion
//! - `collector`: The single-writer aggregate state and its finalization
//! - `histogram`: Fixed-bucket latency histogram construction
//! - `percentile`: Percentile table extraction from sorted samples
//! - `reporter`: Queue ownership, the consumer task and the Stop handshake
//! - `report`: The serializable report produced at the end of a run
//! - `export`: Side-channel metrics export (Prometheus)
//! - `cli` / `logging`: Argument parsing and log output for the driver binary
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use bench_report::{MeasurementRecord, Reporter, RunConfig, StopReason};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = RunConfig::new("checkout").with_skip_first(10);
//!     let reporter = Reporter::start(config)?;
//!
//!     let sender = reporter.sender();
//!     sender
//!         .send(MeasurementRecord::ok(Duration::from_millis(12), "OK"))
//!         .await?;
//!
//!     let report = reporter.stop(StopReason::NormalEnd).await;
//!     println!("{} calls, {:?} average", report.count, report.average);
//!     Ok(())
//! }
//! ```

/// Running aggregates and report finalization
///
/// The `Collector` is owned by exactly one consumer for the lifetime of a
/// run, so none of its state is behind a lock.
pub mod collector;

/// Command-line interface for the synthetic-load driver
pub mod cli;

/// Run configuration
pub mod config;

pub mod error;

/// Metrics export collaborators
///
/// Fire-and-forget counters and histograms that may be fed from the
/// ingestion path without affecting the report.
pub mod export;

/// Latency histogram construction over pre-sorted samples
pub mod histogram;

pub mod logging;

/// Percentile extraction over pre-sorted samples
pub mod percentile;

/// Measurement records and retained result details
pub mod record;

/// The final, serializable run report
pub mod report;

/// Run lifecycle: bounded queue, consumer task and two-phase stop
///
/// A `Reporter` is created at run start and consumed by `stop`, which
/// guarantees every queued record is processed before the report is built.
pub mod reporter;

pub use collector::Collector;
pub use config::RunConfig;
pub use error::{ReporterError, Result};
pub use export::{MetricsExporter, NoopExporter, PrometheusExporter};
pub use histogram::Bucket;
pub use percentile::PercentileEntry;
pub use record::{MeasurementRecord, ResultDetail, StopReason};
pub use report::Report;
pub use reporter::{RecordSender, Reporter};

/// The current version of the crate, as recorded in Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration values
///
/// These values mirror the behaviour load-testing harnesses have settled on
/// for their result pipelines and are used whenever a run does not override
/// them.
pub mod defaults {
    /// Hard cap on the number of retained per-call details
    ///
    /// Records beyond this cap still update every aggregate; only their
    /// verbatim detail is dropped. This bounds memory independent of run
    /// length.
    pub const MAX_RESULT_DETAILS: usize = 1_000_000;

    /// Default capacity of the run queue between producers and the consumer
    ///
    /// A full queue makes producers wait, which is the admission control
    /// that keeps in-flight records bounded under load.
    pub const QUEUE_CAPACITY: usize = 1000;

    /// Number of equal-width histogram intervals between fastest and slowest
    pub const HISTOGRAM_BUCKETS: usize = 10;

    /// Percentile ranks reported in the latency distribution
    pub const PERCENTILES: [u32; 7] = [10, 25, 50, 75, 90, 95, 99];

    /// Default run name used by the synthetic-load driver
    pub const RUN_NAME: &str = "bench";
}
