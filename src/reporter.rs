//! # Reporter
//!
//! Owns the lifecycle of one run. Starting a reporter creates a bounded queue
//! scoped to the run and spawns the consumer task that feeds the
//! [`Collector`]. Producers push records through cloned [`RecordSender`]
//! handles; a full queue makes them wait.
//!
//! ## Stop Handshake
//!
//! 1. **Close**: the consumer is told to stop; it closes the queue so new
//!    sends fail, then drains every record already buffered.
//! 2. **Complete**: the consumer hands the frozen collector back over a
//!    one-shot channel, and only then is the report finalized.

use crate::{
    collector::Collector,
    config::RunConfig,
    error::{ReporterError, Result},
    export::{MetricsExporter, NoopExporter},
    record::{MeasurementRecord, StopReason},
    report::Report,
};
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{
    mpsc::{self, error::TrySendError},
    oneshot,
};
use tracing::{debug, error, info};

/// Handle producers use to push records into a run
#[derive(Debug, Clone)]
pub struct RecordSender {
    inner: mpsc::Sender<MeasurementRecord>,
}

impl RecordSender {
    /// Queue a record, waiting while the queue is full
    pub async fn send(&self, record: MeasurementRecord) -> Result<()> {
        self.inner
            .send(record)
            .await
            .map_err(|_| ReporterError::Closed)
    }

    /// Queue a record without waiting
    pub fn try_send(&self, record: MeasurementRecord) -> Result<()> {
        match self.inner.try_send(record) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(ReporterError::Full),
            Err(TrySendError::Closed(_)) => Err(ReporterError::Closed),
        }
    }

    /// Queue a record from a thread outside the async runtime
    ///
    /// Panics if called from within an async execution context, like
    /// `tokio::sync::mpsc::Sender::blocking_send`.
    pub fn blocking_send(&self, record: MeasurementRecord) -> Result<()> {
        self.inner
            .blocking_send(record)
            .map_err(|_| ReporterError::Closed)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

/// A running aggregation
///
/// Must be started from within a Tokio runtime.
pub struct Reporter {
    config: RunConfig,
    start: Instant,
    sender: RecordSender,
    stop_tx: oneshot::Sender<()>,
    done_rx: oneshot::Receiver<Collector>,
}

impl Reporter {
    /// Start a run that only aggregates
    pub fn start(config: RunConfig) -> Result<Self> {
        Self::start_with_exporter(config, Arc::new(NoopExporter))
    }

    /// Start a run that also feeds every aggregated record to `exporter`
    pub fn start_with_exporter(
        config: RunConfig,
        exporter: Arc<dyn MetricsExporter>,
    ) -> Result<Self> {
        config.validate()?;

        let (record_tx, record_rx) = mpsc::channel(config.queue_capacity);
        let (stop_tx, stop_rx) = oneshot::channel();
        let (done_tx, done_rx) = oneshot::channel();

        info!(
            "Starting run '{}' (skip first: {}, count error latency: {}, queue capacity: {})",
            config.name, config.skip_first, config.count_error_latency, config.queue_capacity
        );

        let collector = Collector::new(config.clone());
        tokio::spawn(track(collector, record_rx, stop_rx, done_tx, exporter));

        Ok(Self {
            config,
            start: Instant::now(),
            sender: RecordSender { inner: record_tx },
            stop_tx,
            done_rx,
        })
    }

    /// A new producer handle for this run
    pub fn sender(&self) -> RecordSender {
        self.sender.clone()
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Wall-clock time since the run started
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the run and build its report
    ///
    /// Records still queued are processed before the report is computed;
    /// sends that race with or follow the stop fail with
    /// `ReporterError::Closed`. Always returns a report.
    pub async fn stop(self, reason: StopReason) -> Report {
        info!("Stopping run '{}' with reason: {}", self.config.name, reason);

        // The consumer may already be gone if it panicked; the receiver
        // below reports that.
        let _ = self.stop_tx.send(());
        let total = self.start.elapsed();
        drop(self.sender);

        debug!("Waiting for run '{}' to drain", self.config.name);
        let collector = match self.done_rx.await {
            Ok(collector) => collector,
            Err(_) => {
                error!(
                    "Consumer for run '{}' exited without handing back its aggregates",
                    self.config.name
                );
                Collector::new(self.config)
            }
        };

        debug!("Finalizing report for run '{}'", collector.config().name);
        collector.finalize(reason, total, Utc::now())
    }
}

/// Consumer loop: the only writer to the collector for the run's lifetime
async fn track(
    mut collector: Collector,
    mut records: mpsc::Receiver<MeasurementRecord>,
    mut stop: oneshot::Receiver<()>,
    done: oneshot::Sender<Collector>,
    exporter: Arc<dyn MetricsExporter>,
) {
    loop {
        tokio::select! {
            record = records.recv() => match record {
                Some(record) => ingest(&mut collector, record, exporter.as_ref()),
                None => break,
            },
            // A dropped reporter resolves this too and is treated as a stop.
            _ = &mut stop => {
                records.close();
                while let Some(record) = records.recv().await {
                    ingest(&mut collector, record, exporter.as_ref());
                }
                break;
            }
        }
    }

    debug!(
        "Run '{}' drained: {} aggregated, {} skipped",
        collector.config().name,
        collector.count(),
        collector.skipped()
    );
    let _ = done.send(collector);
}

fn ingest(collector: &mut Collector, record: MeasurementRecord, exporter: &dyn MetricsExporter) {
    if !collector.is_warming_up() {
        let location = collector.config().name.as_str();
        exporter.increase_total_requests(location, &record.status);
        exporter.observe_request_time(location, record.duration.as_secs_f64() * 1000.0);
    }
    collector.ingest(record);
}
