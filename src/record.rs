use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Outcome of a single call, as emitted by a worker.
///
/// Ownership moves into the run queue on send; the collector keeps at most a
/// derived [`ResultDetail`].
#[derive(Debug)]
pub struct MeasurementRecord {
    pub timestamp: DateTime<Utc>,
    pub duration: Duration,
    pub status: String,
    pub error: Option<anyhow::Error>,
}

impl MeasurementRecord {
    /// A successful call finishing now
    pub fn ok(duration: Duration, status: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            duration,
            status: status.into(),
            error: None,
        }
    }

    /// A failed call finishing now; the error is kept for its textual form
    pub fn failed(
        duration: Duration,
        status: impl Into<String>,
        error: impl Into<anyhow::Error>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            duration,
            status: status.into(),
            error: Some(error.into()),
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Textual form of the error, empty when the call succeeded
    pub fn error_message(&self) -> String {
        self.error
            .as_ref()
            .map(|e| e.to_string())
            .unwrap_or_default()
    }
}

/// Per-call detail retained in the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultDetail {
    pub timestamp: DateTime<Utc>,
    #[serde(with = "crate::report::nanos")]
    pub latency: Duration,
    /// Empty when the call succeeded
    pub error: String,
    pub status: String,
}

impl ResultDetail {
    pub fn is_error(&self) -> bool {
        !self.error.is_empty()
    }
}

/// Why a run was stopped
///
/// The aggregator treats this as an opaque label and echoes it into the
/// report's `endReason`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopReason {
    /// The workload ran to its configured end
    #[default]
    #[serde(rename = "normal")]
    NormalEnd,
    Cancel,
    Timeout,
    /// Stopped because an error crossed the run's failure threshold
    Error,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::NormalEnd => write!(f, "normal"),
            StopReason::Cancel => write!(f, "cancel"),
            StopReason::Timeout => write!(f, "timeout"),
            StopReason::Error => write!(f, "error"),
        }
    }
}
