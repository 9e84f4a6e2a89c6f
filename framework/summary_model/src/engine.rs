//! Local mirror of the parts of the engine's benchmark report that the summary reads.
//!
//! Every field is optional or defaulted so that reports from engine versions that add, rename or
//! drop metrics still load.

use serde::{Deserialize, Serialize};

/// The report the engine writes when a run completes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EngineReport {
    #[serde(default)]
    pub benchmarks: Vec<EngineBenchmark>,
}

/// One benchmark of a run. Sweeps produce several of these, one per rate.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EngineBenchmark {
    #[serde(default, alias = "id_")]
    pub id: Option<String>,
    /// Unix timestamp in seconds.
    #[serde(default)]
    pub start_time: Option<f64>,
    /// Unix timestamp in seconds.
    #[serde(default)]
    pub end_time: Option<f64>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub request_totals: RequestTotals,
    #[serde(default)]
    pub metrics: Metrics,
    #[serde(default)]
    pub requests: Requests,
}

/// Request counts by outcome.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RequestTotals {
    #[serde(default)]
    pub successful: u64,
    #[serde(default)]
    pub errored: u64,
    #[serde(default)]
    pub incomplete: u64,
    #[serde(default)]
    pub total: u64,
}

/// The aggregate metrics of a benchmark.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Metrics {
    #[serde(default)]
    pub requests_per_second: Option<StatusDistribution>,
    #[serde(default)]
    pub request_concurrency: Option<StatusDistribution>,
    #[serde(default)]
    pub request_latency: Option<StatusDistribution>,
    #[serde(default)]
    pub prompt_token_count: Option<StatusDistribution>,
    #[serde(default)]
    pub output_token_count: Option<StatusDistribution>,
    #[serde(default)]
    pub time_to_first_token_ms: Option<StatusDistribution>,
    #[serde(default)]
    pub time_per_output_token_ms: Option<StatusDistribution>,
    #[serde(default)]
    pub inter_token_latency_ms: Option<StatusDistribution>,
    #[serde(default)]
    pub output_tokens_per_second: Option<StatusDistribution>,
    #[serde(default)]
    pub tokens_per_second: Option<StatusDistribution>,
}

/// A metric split by request outcome.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StatusDistribution {
    #[serde(default)]
    pub successful: Option<DistributionSummary>,
    #[serde(default)]
    pub errored: Option<DistributionSummary>,
    #[serde(default)]
    pub incomplete: Option<DistributionSummary>,
    #[serde(default)]
    pub total: Option<DistributionSummary>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DistributionSummary {
    #[serde(default)]
    pub mean: Option<f64>,
    #[serde(default)]
    pub median: Option<f64>,
    #[serde(default)]
    pub std_dev: Option<f64>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub count: Option<f64>,
    #[serde(default)]
    pub total_sum: Option<f64>,
    #[serde(default)]
    pub percentiles: Option<Percentiles>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Percentiles {
    #[serde(default)]
    pub p50: Option<f64>,
    #[serde(default)]
    pub p90: Option<f64>,
    #[serde(default)]
    pub p95: Option<f64>,
    #[serde(default)]
    pub p99: Option<f64>,
    #[serde(default)]
    pub p999: Option<f64>,
}

/// Individual requests, kept as raw JSON since only a sample of the failures is echoed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Requests {
    #[serde(default)]
    pub errored: Vec<serde_json::Value>,
    #[serde(default)]
    pub incomplete: Vec<serde_json::Value>,
}

impl DistributionSummary {
    /// Shortcut for a percentile that may be missing at any level.
    pub fn percentile(&self, pick: impl Fn(&Percentiles) -> Option<f64>) -> Option<f64> {
        self.percentiles.as_ref().and_then(pick)
    }
}
