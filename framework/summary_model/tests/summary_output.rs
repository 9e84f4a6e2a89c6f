use benchmark_runner_summary_model::{
    load_engine_report, load_summary_report, OutputKind, OutputTarget, RunConfig, RunSummary,
    SampleLimits, SummaryError,
};
use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};

fn fixture() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("engine_report.json")
}

fn run_summary() -> RunSummary {
    RunSummary::new(
        "run-42".to_string(),
        1_700_000_000,
        RunConfig {
            target: Some("http://localhost:8000".to_string()),
            profile: Some("constant".to_string()),
            rate: vec![2.0],
            max_seconds: Some(60.0),
            data: vec!["converted_sharegpt.jsonl".to_string()],
            ..Default::default()
        },
        "0.1.0".to_string(),
    )
}

#[test]
fn should_write_summary_into_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let output_dir = dir.path().join("results").join("nested");
    let engine_output = load_engine_report(&fixture()).unwrap();
    let summary = engine_output.summarize(run_summary(), SampleLimits::default());

    let target = OutputTarget::resolve("summary_json", &output_dir, "run-42").unwrap();
    let written = target.write(&summary, &engine_output).unwrap();

    assert_eq!(written, vec![output_dir.join("run-42.json")]);
    let loaded = load_summary_report(std::fs::File::open(&written[0]).unwrap()).unwrap();
    assert_eq!(loaded, summary);
}

#[test]
fn should_contain_exactly_the_summary_fields() {
    let dir = tempfile::tempdir().unwrap();
    let engine_output = load_engine_report(&fixture()).unwrap();
    let summary = engine_output.summarize(run_summary(), SampleLimits::default());
    let target = OutputTarget::resolve("summary_json", dir.path(), "run-42").unwrap();
    target.write(&summary, &engine_output).unwrap();

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&target.path).unwrap()).unwrap();

    let benchmark = &value["benchmarks"][0];
    let mut keys = benchmark
        .as_object()
        .unwrap()
        .keys()
        .cloned()
        .collect::<Vec<_>>();
    keys.sort();
    assert_eq!(
        keys,
        vec![
            "duration",
            "end_time",
            "id",
            "metrics",
            "request_totals",
            "requests_truncated",
            "start_time"
        ]
    );
    assert!(benchmark["metrics"].get("audio").is_none());
    assert!(benchmark.get("requests").is_none());
    assert_eq!(benchmark["request_totals"]["total"], 121);
    assert_eq!(
        benchmark["metrics"]["request_latency"]["successful"]["percentiles"]["p99"],
        3.6
    );
    assert_eq!(
        benchmark["requests_truncated"]["errored"]
            .as_array()
            .unwrap()
            .len(),
        2
    );
    assert_eq!(value["config"]["profile"], "constant");
}

#[test]
fn should_overwrite_previous_summary() {
    let dir = tempfile::tempdir().unwrap();
    let engine_output = load_engine_report(&fixture()).unwrap();
    let target = OutputTarget::resolve("summary_json", dir.path(), "run-42").unwrap();
    std::fs::write(&target.path, "stale content that is much longer than nothing").unwrap();

    let summary = engine_output.summarize(run_summary(), SampleLimits::default());
    target.write(&summary, &engine_output).unwrap();

    let loaded = load_summary_report(std::fs::File::open(&target.path).unwrap()).unwrap();
    assert_eq!(loaded.run.run_id, "run-42");
    let entries = std::fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(entries, 1);
}

#[test]
fn should_write_full_report_for_dual_json() {
    let dir = tempfile::tempdir().unwrap();
    let engine_output = load_engine_report(&fixture()).unwrap();
    let summary = engine_output.summarize(run_summary(), SampleLimits::default());

    let target = OutputTarget::resolve("report.dual_json", dir.path(), "run-42").unwrap();
    assert_eq!(target.kind, OutputKind::DualJson);
    let written = target.write(&summary, &engine_output).unwrap();

    assert_eq!(
        written,
        vec![dir.path().join("report.json"), dir.path().join("report.full.json")]
    );
    let full: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&written[1]).unwrap()).unwrap();
    assert_eq!(full, engine_output.raw);
    assert_eq!(
        full["benchmarks"][0]["requests"]["successful"][0]["request_id"],
        "ok-1"
    );
}

#[test]
fn should_report_unwritable_destination() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-directory");
    std::fs::write(&blocker, "file").unwrap();
    let engine_output = load_engine_report(&fixture()).unwrap();
    let summary = engine_output.summarize(run_summary(), SampleLimits::default());

    let target = OutputTarget::resolve("summary_json", &blocker, "run-42").unwrap();
    let err = target.write(&summary, &engine_output).unwrap_err();

    assert!(matches!(err, SummaryError::Write { .. }));
}
