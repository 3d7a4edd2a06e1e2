//! # Metrics Export
//!
//! Side-channel counters and histograms for an external monitoring pipeline.
//! The report never depends on these; they are fire-and-forget calls that are
//! safe to make from the ingestion path.

use crate::error::Result;
use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};

/// Request-time histogram buckets, in milliseconds
pub const REQUEST_TIME_BUCKETS_MS: [f64; 6] = [0.0, 10.0, 30.0, 50.0, 100.0, 200.0];

/// Receiver of per-request metrics
pub trait MetricsExporter: Send + Sync {
    /// Count one request at `location` that finished with status `code`
    fn increase_total_requests(&self, location: &str, code: &str);

    /// Count one sub-request issued on behalf of a request
    fn increase_sub_requests(&self);

    /// Record the time a request at `location` took, in milliseconds
    fn observe_request_time(&self, location: &str, millis: f64);
}

/// Exporter that drops everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopExporter;

impl MetricsExporter for NoopExporter {
    fn increase_total_requests(&self, _location: &str, _code: &str) {}

    fn increase_sub_requests(&self) {}

    fn observe_request_time(&self, _location: &str, _millis: f64) {}
}

/// Prometheus-backed exporter with its own registry
///
/// Each exporter registers its collectors on a private `Registry`, so several
/// runs in one process never collide on metric registration.
#[derive(Clone)]
pub struct PrometheusExporter {
    registry: Registry,
    run: String,
    total_requests: CounterVec,
    sub_requests: CounterVec,
    request_time: HistogramVec,
}

impl PrometheusExporter {
    /// Create an exporter whose sub-request counter is labelled with `run`
    pub fn new(run: impl Into<String>) -> Result<Self> {
        let registry = Registry::new();

        let total_requests = CounterVec::new(
            Opts::new("total_requests", "total income requests"),
            &["location", "code"],
        )?;
        let sub_requests = CounterVec::new(Opts::new("sub_requests", "sub requests"), &["run"])?;
        let request_time = HistogramVec::new(
            HistogramOpts::new("total_requests_time", "incoming requests time")
                .buckets(REQUEST_TIME_BUCKETS_MS.to_vec()),
            &["location"],
        )?;

        registry.register(Box::new(total_requests.clone()))?;
        registry.register(Box::new(sub_requests.clone()))?;
        registry.register(Box::new(request_time.clone()))?;

        Ok(Self {
            registry,
            run: run.into(),
            total_requests,
            sub_requests,
            request_time,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render every registered metric in the text exposition format
    pub fn gather_text(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

impl MetricsExporter for PrometheusExporter {
    fn increase_total_requests(&self, location: &str, code: &str) {
        self.total_requests
            .with_label_values(&[location, code])
            .inc();
    }

    fn increase_sub_requests(&self) {
        self.sub_requests.with_label_values(&[self.run.as_str()]).inc();
    }

    fn observe_request_time(&self, location: &str, millis: f64) {
        self.request_time
            .with_label_values(&[location])
            .observe(millis);
    }
}
