//! The summary model of a benchmark run.
//!
//! The engine writes its own, large, report when a run completes. This crate reads the parts of it
//! that matter ([`EngineReport`]), combines them with a description of the run ([`RunSummary`])
//! into a [`SummaryReport`], and writes that to the runner owned outputs ([`OutputTarget`]).

mod engine;
mod error;
mod output;
mod summary;
mod table;

pub use self::engine::{
    DistributionSummary, EngineBenchmark, EngineReport, Metrics, Percentiles, RequestTotals,
    Requests, StatusDistribution,
};
pub use self::error::SummaryError;
pub use self::output::{
    load_engine_report, load_summary_report, store_report, write_report, EngineOutput, OutputKind,
    OutputTarget,
};
pub use self::summary::{
    BenchmarkSummary, RunConfig, RunSummary, SampleLimits, SummaryReport, TruncatedRequests,
};
pub use self::table::summary_table;
