use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::engine::{DistributionSummary, StatusDistribution};
use crate::summary::SummaryReport;

#[derive(Tabled)]
struct BenchmarkRow {
    benchmark: String,
    successful: u64,
    errored: u64,
    req_per_sec: String,
    latency_p50_s: String,
    latency_p99_s: String,
    ttft_p50_ms: String,
    itl_p50_ms: String,
    output_tok_per_sec: String,
}

fn float2(n: Option<f64>) -> String {
    match n {
        Some(n) => format!("{:.2}", n),
        None => "-".to_string(),
    }
}

fn successful(distribution: &Option<StatusDistribution>) -> Option<&DistributionSummary> {
    distribution.as_ref().and_then(|d| d.successful.as_ref())
}

/// Render the benchmarks of a summary as a table for the console.
pub fn summary_table(summary: &SummaryReport) -> String {
    let rows = summary
        .benchmarks
        .iter()
        .enumerate()
        .map(|(index, benchmark)| {
            let metrics = &benchmark.metrics;
            BenchmarkRow {
                benchmark: benchmark
                    .id
                    .clone()
                    .unwrap_or_else(|| format!("#{}", index + 1)),
                successful: benchmark.request_totals.successful,
                errored: benchmark.request_totals.errored,
                req_per_sec: float2(successful(&metrics.requests_per_second).and_then(|d| d.mean)),
                latency_p50_s: float2(
                    successful(&metrics.request_latency).and_then(|d| d.percentile(|p| p.p50)),
                ),
                latency_p99_s: float2(
                    successful(&metrics.request_latency).and_then(|d| d.percentile(|p| p.p99)),
                ),
                ttft_p50_ms: float2(
                    successful(&metrics.time_to_first_token_ms)
                        .and_then(|d| d.percentile(|p| p.p50)),
                ),
                itl_p50_ms: float2(
                    successful(&metrics.inter_token_latency_ms)
                        .and_then(|d| d.percentile(|p| p.p50)),
                ),
                output_tok_per_sec: float2(
                    successful(&metrics.output_tokens_per_second).and_then(|d| d.mean),
                ),
            }
        })
        .collect::<Vec<_>>();

    let mut table = Table::new(&rows);
    table.with(Style::modern());
    table.to_string()
}
