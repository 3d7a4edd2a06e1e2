//! # Run Configuration
//!
//! A `RunConfig` is fixed once a run starts. It can be built in code with the
//! `with_*` setters, deserialized from a JSON document, or derived from the
//! command line with [`RunConfig::from_args`].

use crate::{
    cli::Args,
    defaults,
    error::{ReporterError, Result},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Immutable parameters of a single run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunConfig {
    /// Name echoed into the report
    pub name: String,

    /// Number of leading records excluded from every aggregate
    ///
    /// Warm-up records are dropped before they touch counts, distributions
    /// or the retained details.
    pub skip_first: usize,

    /// Whether latencies of failed calls count toward percentiles, histogram
    /// and fastest/slowest
    pub count_error_latency: bool,

    /// Free-form labels copied verbatim into the report
    pub tags: BTreeMap<String, String>,

    /// Capacity of the queue between producers and the consumer
    pub queue_capacity: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            skip_first: 0,
            count_error_latency: false,
            tags: BTreeMap::new(),
            queue_capacity: defaults::QUEUE_CAPACITY,
        }
    }
}

impl RunConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_skip_first(mut self, skip_first: usize) -> Self {
        self.skip_first = skip_first;
        self
    }

    pub fn with_count_error_latency(mut self, count_error_latency: bool) -> Self {
        self.count_error_latency = count_error_latency;
        self
    }

    pub fn with_tags(mut self, tags: BTreeMap<String, String>) -> Self {
        self.tags = tags;
        self
    }

    /// Set tags from a raw JSON object such as `{"env":"staging"}`
    ///
    /// Empty or whitespace-only input clears the tags.
    pub fn with_tags_json(mut self, raw: &[u8]) -> Result<Self> {
        self.tags = parse_tags(raw)?;
        Ok(self)
    }

    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    /// Check the configuration before a run is started
    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(ReporterError::InvalidConfig(
                "queue capacity must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Create a run configuration from CLI arguments
    ///
    /// ## Returns
    /// - `Ok(RunConfig)`: Valid configuration ready for `Reporter::start`
    /// - `Err(ReporterError)`: Malformed tags or an invalid queue capacity
    pub fn from_args(args: &Args) -> Result<Self> {
        let mut config = Self::new(args.name.clone())
            .with_skip_first(args.skip_first)
            .with_count_error_latency(args.count_error_latency)
            .with_queue_capacity(args.queue_capacity);

        if let Some(ref tags) = args.tags {
            config = config.with_tags_json(tags.as_bytes())?;
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_tags(raw: &[u8]) -> Result<BTreeMap<String, String>> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(BTreeMap::new());
    }
    Ok(serde_json::from_slice(raw)?)
}
