use clap::Parser;
use std::time::Duration;

/// Bench Report - aggregate a synthetic load run into a statistical report
#[derive(Parser, Debug, Clone)]
#[clap(version, about, long_about = None)]
pub struct Args {
    /// Run name echoed into the report
    #[clap(short = 'n', long, default_value = crate::defaults::RUN_NAME, help_heading = "Run Options")]
    pub name: String,

    /// Number of leading records discarded as warm-up
    #[clap(long, default_value_t = 0, help_heading = "Run Options")]
    pub skip_first: usize,

    /// Count latencies of failed calls toward percentiles and histogram
    #[clap(long, default_value_t = false, help_heading = "Run Options")]
    pub count_error_latency: bool,

    /// Run tags as a JSON object, e.g. '{"env":"staging"}'
    #[clap(long, help_heading = "Run Options")]
    pub tags: Option<String>,

    /// Capacity of the queue between workers and the aggregator
    #[clap(long, default_value_t = crate::defaults::QUEUE_CAPACITY, help_heading = "Run Options")]
    pub queue_capacity: usize,

    /// Number of concurrent synthetic workers
    #[clap(short = 'c', long, default_value_t = 4, help_heading = "Load Options")]
    pub concurrency: usize,

    /// Total number of calls to issue across all workers
    #[clap(short = 'i', long, default_value_t = 1000, help_heading = "Load Options")]
    pub calls: usize,

    /// Stop after this long even if calls remain (e.g. 10s, 500ms, 1m)
    #[clap(short = 'd', long, value_parser = parse_duration, help_heading = "Load Options")]
    pub duration: Option<Duration>,

    /// Fastest simulated call latency
    #[clap(long, value_parser = parse_duration, default_value = "5ms", help_heading = "Load Options")]
    pub min_latency: Duration,

    /// Slowest simulated call latency
    #[clap(long, value_parser = parse_duration, default_value = "50ms", help_heading = "Load Options")]
    pub max_latency: Duration,

    /// Fraction of simulated calls that fail (0.0 to 1.0)
    #[clap(long, default_value_t = 0.0, help_heading = "Load Options")]
    pub error_rate: f64,

    /// Export per-call metrics to a Prometheus registry and log it at the end
    #[clap(long, default_value_t = false)]
    pub prometheus: bool,

    /// Verbose output
    #[clap(short = 'v', long, default_value_t = false)]
    pub verbose: bool,
}

/// Parse duration from string (e.g., "10s", "5m", "1h", "250ms")
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();

    if s.is_empty() {
        return Err("Duration cannot be empty".to_string());
    }

    let (num_str, unit) = if let Some(stripped) = s.strip_suffix("ms") {
        (stripped, "ms")
    } else if let Some(stripped) = s.strip_suffix('s') {
        (stripped, "s")
    } else if let Some(stripped) = s.strip_suffix('m') {
        (stripped, "m")
    } else if let Some(stripped) = s.strip_suffix('h') {
        (stripped, "h")
    } else {
        (s, "s") // Default to seconds
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number in duration: {}", num_str))?;

    if !num.is_finite() || num < 0.0 {
        return Err(format!("Duration must be a non-negative number: {}", s));
    }

    let nanos_per_unit = match unit {
        "ms" => 1e6,
        "s" => 1e9,
        "m" => 60.0 * 1e9,
        "h" => 3600.0 * 1e9,
        _ => return Err(format!("Invalid duration unit: {}", unit)),
    };

    Ok(Duration::from_nanos((num * nanos_per_unit).round() as u64))
}

impl Args {
    /// Check the load options the run configuration does not cover
    pub fn validate(&self) -> Result<(), String> {
        if self.concurrency == 0 {
            return Err("concurrency must be greater than 0".to_string());
        }
        if self.min_latency > self.max_latency {
            return Err(format!(
                "min latency {:?} exceeds max latency {:?}",
                self.min_latency, self.max_latency
            ));
        }
        if !(0.0..=1.0).contains(&self.error_rate) {
            return Err(format!("error rate {} is outside 0.0..=1.0", self.error_rate));
        }
        Ok(())
    }
}
