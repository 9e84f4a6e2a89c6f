use serde::{Deserialize, Serialize};
use sha3::Digest;
use std::collections::BTreeMap;

use crate::engine::{EngineBenchmark, EngineReport, Metrics, RequestTotals};

/// Summary of a run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    /// The unique run id
    ///
    /// Chosen by the runner. Unique for each run and used as the default summary file name.
    pub run_id: String,
    /// The time the run started
    ///
    /// This is a Unix timestamp in seconds.
    pub started_at: i64,
    /// The configuration the engine was started with
    pub config: RunConfig,
    /// Environment variables set for the run
    ///
    /// This won't capture all environment variables. Just the `BENCHMARK_RUNNER_*` ones that the
    /// runner reads, minus credentials.
    pub env: BTreeMap<String, String>,
    /// The version of the runner that was used for this run
    pub runner_version: String,
}

/// Echo of the benchmark configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RunConfig {
    /// The URL of the server under test
    pub target: Option<String>,
    /// The load profile, for example `sweep` or `constant`
    pub profile: Option<String>,
    /// Rates for the profile. Their meaning depends on the profile.
    pub rate: Vec<f64>,
    pub max_seconds: Option<f64>,
    pub max_requests: Option<u64>,
    /// Data sources as handed to the engine, after dataset conversion
    pub data: Vec<String>,
    pub processor: Option<String>,
    pub model: Option<String>,
    pub backend: Option<String>,
    /// Extra arguments passed verbatim to the engine
    pub engine_args: Vec<String>,
}

impl RunSummary {
    /// Create a new run summary
    pub fn new(run_id: String, started_at: i64, config: RunConfig, runner_version: String) -> Self {
        Self {
            run_id,
            started_at,
            config,
            env: BTreeMap::new(),
            runner_version,
        }
    }

    /// Add an environment variable
    pub fn add_env(&mut self, key: String, value: String) {
        self.env.insert(key, value);
    }

    /// Compute a fingerprint for this run summary
    ///
    /// The fingerprint is intended to identify the configuration used for the run, so that runs
    /// that can be compared with each other share a fingerprint. It uses the
    ///     - Run configuration, except the data sources which are local paths
    ///     - Selected environment variables
    ///     - Runner version
    ///
    /// The fingerprint is computed using [sha3::Sha3_256].
    pub fn fingerprint(&self) -> String {
        let mut hasher = sha3::Sha3_256::new();
        let config = &self.config;

        for (tag, value) in [
            ("target", &config.target),
            ("profile", &config.profile),
            ("processor", &config.processor),
            ("model", &config.model),
            ("backend", &config.backend),
        ] {
            hash_field(&mut hasher, tag, value.as_deref().map(str::as_bytes));
        }

        hash_count(&mut hasher, "rate", config.rate.len());
        for rate in &config.rate {
            Digest::update(&mut hasher, rate.to_le_bytes());
        }
        hash_field(
            &mut hasher,
            "max_seconds",
            config.max_seconds.map(f64::to_le_bytes).as_ref().map(|b| &b[..]),
        );
        hash_field(
            &mut hasher,
            "max_requests",
            config.max_requests.map(u64::to_le_bytes).as_ref().map(|b| &b[..]),
        );

        hash_count(&mut hasher, "engine_args", config.engine_args.len());
        for arg in &config.engine_args {
            hash_bytes(&mut hasher, arg.as_bytes());
        }

        hash_count(&mut hasher, "env", self.env.len());
        for (key, value) in &self.env {
            hash_bytes(&mut hasher, key.as_bytes());
            hash_bytes(&mut hasher, value.as_bytes());
        }

        hash_field(&mut hasher, "runner_version", Some(self.runner_version.as_bytes()));

        format!("{:x}", hasher.finalize())
    }
}

/// Hash a tagged field with a presence byte, so that unset and empty values differ.
fn hash_field(hasher: &mut sha3::Sha3_256, tag: &str, value: Option<&[u8]>) {
    Digest::update(hasher, tag.as_bytes());
    match value {
        Some(bytes) => {
            Digest::update(hasher, [1u8]);
            hash_bytes(hasher, bytes);
        }
        None => Digest::update(hasher, [0u8]),
    }
}

fn hash_count(hasher: &mut sha3::Sha3_256, tag: &str, count: usize) {
    Digest::update(hasher, tag.as_bytes());
    Digest::update(hasher, (count as u64).to_le_bytes());
}

/// Length prefixed, so adjacent values can't run into each other.
fn hash_bytes(hasher: &mut sha3::Sha3_256, bytes: &[u8]) {
    Digest::update(hasher, (bytes.len() as u64).to_le_bytes());
    Digest::update(hasher, bytes);
}

/// The summary report written at the end of a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SummaryReport {
    #[serde(flatten)]
    pub run: RunSummary,
    /// See [RunSummary::fingerprint]
    pub fingerprint: String,
    pub benchmarks: Vec<BenchmarkSummary>,
}

/// The aggregates of a single benchmark.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BenchmarkSummary {
    pub id: Option<String>,
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
    pub duration: Option<f64>,
    pub request_totals: RequestTotals,
    pub metrics: Metrics,
    /// A bounded sample of the failed requests, absent when nothing failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests_truncated: Option<TruncatedRequests>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TruncatedRequests {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errored: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub incomplete: Vec<serde_json::Value>,
}

/// Limits on the request samples copied into a summary. [`None`] copies everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleLimits {
    pub errored: Option<usize>,
    pub incomplete: Option<usize>,
}

impl Default for SampleLimits {
    fn default() -> Self {
        Self {
            errored: Some(20),
            incomplete: Some(20),
        }
    }
}

impl SummaryReport {
    /// Build the summary of a run from the engine's report.
    pub fn from_engine(run: RunSummary, report: &EngineReport, limits: SampleLimits) -> Self {
        let fingerprint = run.fingerprint();
        let benchmarks = report
            .benchmarks
            .iter()
            .map(|benchmark| BenchmarkSummary::from_engine(benchmark, limits))
            .collect();

        Self {
            run,
            fingerprint,
            benchmarks,
        }
    }
}

impl BenchmarkSummary {
    fn from_engine(benchmark: &EngineBenchmark, limits: SampleLimits) -> Self {
        let truncated = TruncatedRequests {
            errored: limit_items(&benchmark.requests.errored, limits.errored),
            incomplete: limit_items(&benchmark.requests.incomplete, limits.incomplete),
        };
        let requests_truncated = if truncated.errored.is_empty() && truncated.incomplete.is_empty()
        {
            None
        } else {
            Some(truncated)
        };

        Self {
            id: benchmark.id.clone(),
            start_time: benchmark.start_time,
            end_time: benchmark.end_time,
            duration: benchmark.duration,
            request_totals: benchmark.request_totals.clone(),
            metrics: benchmark.metrics.clone(),
            requests_truncated,
        }
    }
}

fn limit_items(items: &[serde_json::Value], limit: Option<usize>) -> Vec<serde_json::Value> {
    match limit {
        Some(limit) => items.iter().take(limit).cloned().collect(),
        None => items.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Requests;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn run_summary() -> RunSummary {
        RunSummary::new(
            "abc123".to_string(),
            1_700_000_000,
            RunConfig {
                target: Some("http://localhost:8000".to_string()),
                profile: Some("constant".to_string()),
                rate: vec![2.0],
                max_requests: Some(100),
                ..Default::default()
            },
            "0.1.0".to_string(),
        )
    }

    fn benchmark_with_failures(errored: usize, incomplete: usize) -> EngineBenchmark {
        EngineBenchmark {
            id: Some("b-1".to_string()),
            requests: Requests {
                errored: (0..errored).map(|i| json!({ "request_id": i })).collect(),
                incomplete: (0..incomplete).map(|i| json!({ "request_id": i })).collect(),
            },
            ..Default::default()
        }
    }

    #[test]
    fn fingerprint_is_stable_for_same_config() {
        let mut other = run_summary();
        other.run_id = "different".to_string();
        other.started_at = 0;

        assert_eq!(run_summary().fingerprint(), other.fingerprint());
    }

    #[test]
    fn fingerprint_changes_with_config_and_env() {
        let base = run_summary().fingerprint();

        let mut rate = run_summary();
        rate.config.rate = vec![4.0];
        assert_ne!(base, rate.fingerprint());

        let mut env = run_summary();
        env.add_env("BENCHMARK_RUNNER_MODEL".to_string(), "m".to_string());
        assert_ne!(base, env.fingerprint());
    }

    #[test]
    fn fingerprint_tells_fields_with_equal_values_apart() {
        let config = RunConfig {
            profile: Some("constant".to_string()),
            ..Default::default()
        };
        let summary = |config: RunConfig| {
            RunSummary::new("r".to_string(), 0, config, "0.1.0".to_string()).fingerprint()
        };

        let rate = summary(RunConfig {
            rate: vec![60.0],
            ..config.clone()
        });
        let max_seconds = summary(RunConfig {
            max_seconds: Some(60.0),
            ..config.clone()
        });
        assert_ne!(rate, max_seconds);

        let split = summary(RunConfig {
            engine_args: vec!["--warmup".to_string(), "0.1".to_string()],
            ..config.clone()
        });
        let joined = summary(RunConfig {
            engine_args: vec!["--warmup0.1".to_string()],
            ..config.clone()
        });
        assert_ne!(split, joined);

        let unset = summary(config.clone());
        let empty = summary(RunConfig {
            model: Some(String::new()),
            ..config
        });
        assert_ne!(unset, empty);
    }

    #[test]
    fn should_truncate_failed_requests() {
        let report = EngineReport {
            benchmarks: vec![benchmark_with_failures(30, 3)],
        };

        let summary = SummaryReport::from_engine(run_summary(), &report, SampleLimits::default());

        let truncated = summary.benchmarks[0].requests_truncated.as_ref().unwrap();
        assert_eq!(truncated.errored.len(), 20);
        assert_eq!(truncated.incomplete.len(), 3);
        assert_eq!(truncated.errored[19], json!({ "request_id": 19 }));
    }

    #[test]
    fn should_copy_all_requests_without_limit() {
        let report = EngineReport {
            benchmarks: vec![benchmark_with_failures(30, 0)],
        };
        let limits = SampleLimits {
            errored: None,
            incomplete: None,
        };

        let summary = SummaryReport::from_engine(run_summary(), &report, limits);

        let truncated = summary.benchmarks[0].requests_truncated.as_ref().unwrap();
        assert_eq!(truncated.errored.len(), 30);
        assert!(truncated.incomplete.is_empty());
    }

    #[test]
    fn should_omit_truncated_requests_without_failures() {
        let report = EngineReport {
            benchmarks: vec![benchmark_with_failures(0, 0)],
        };

        let summary = SummaryReport::from_engine(run_summary(), &report, SampleLimits::default());
        assert_eq!(summary.benchmarks[0].requests_truncated, None);

        let value = serde_json::to_value(&summary).unwrap();
        assert!(value["benchmarks"][0].get("requests_truncated").is_none());
    }

    #[test]
    fn should_flatten_run_fields() {
        let report = EngineReport::default();
        let summary = SummaryReport::from_engine(run_summary(), &report, SampleLimits::default());

        let value = serde_json::to_value(&summary).unwrap();
        let mut keys = value
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect::<Vec<_>>();
        keys.sort();
        assert_eq!(
            keys,
            vec![
                "benchmarks",
                "config",
                "env",
                "fingerprint",
                "run_id",
                "runner_version",
                "started_at"
            ]
        );
    }
}
