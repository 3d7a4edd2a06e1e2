use thiserror::Error;

/// Errors surfaced by the run configuration and the producer handle.
///
/// Aggregation itself never fails: per-call errors are data, and Stop always
/// yields a report.
#[derive(Debug, Error)]
pub enum ReporterError {
    #[error("invalid run configuration: {0}")]
    InvalidConfig(String),

    #[error("run tags must be a JSON object of strings: {0}")]
    InvalidTags(#[from] serde_json::Error),

    /// The run was stopped and no longer accepts records.
    #[error("run is closed to new records")]
    Closed,

    /// The queue is at capacity; only returned by non-waiting sends.
    #[error("run queue is full")]
    Full,

    #[error("metrics export failed: {0}")]
    Metrics(#[from] prometheus::Error),
}

pub type Result<T> = std::result::Result<T, ReporterError>;
