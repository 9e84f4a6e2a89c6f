use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use benchmark_runner_dataset::{classify, prepare_datasets, token_counter_for, PrepareOptions};
use benchmark_runner_summary_model::{
    load_engine_report, summary_table, OutputTarget, RunConfig, RunSummary, SampleLimits,
};
use itertools::Itertools;

use crate::cli::RunArgs;
use crate::config::{configured_env_vars, runner_env};
use crate::engine::{BenchmarkEngine, EngineInvocation, ExternalEngine};
use crate::progress::{ChainedProgress, ConsoleProgress};
use crate::relay::ProgressRelay;

/// Number of benchmarks in a sweep when no rate is given.
const DEFAULT_SWEEP_BENCHMARKS: usize = 10;

/// What a completed run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: String,
    /// Files written by the runner. Engine outputs are not listed.
    pub written: Vec<PathBuf>,
}

/// Run a benchmark with the engine binary named in `args`.
pub fn run(args: RunArgs) -> anyhow::Result<RunOutcome> {
    let engine = ExternalEngine::locate(&args.engine_bin, seconds(args.progress_interval)?)?;
    run_with_engine(args, &engine)
}

/// Run a benchmark with the given engine.
///
/// ShareGPT data sources are converted first. Once the engine has finished, the runner owned
/// outputs are built from the report the engine wrote.
pub fn run_with_engine<E>(args: RunArgs, engine: &E) -> anyhow::Result<RunOutcome>
where
    E: BenchmarkEngine + ?Sized,
{
    let configured = configured_env_vars();
    if !configured.is_empty() {
        log::info!(
            "Using settings from the environment: {}",
            configured.join(", ")
        );
    }
    let env = runner_env();

    let run_id = nanoid::nanoid!();
    let started_at = chrono::Utc::now().timestamp();
    log::info!("Starting benchmark run {run_id}");

    let (output_dir, outputs) = output_location(
        args.output_dir.as_deref(),
        args.output_path.as_deref(),
        &args.outputs,
    );

    let mut targets = Vec::new();
    let mut engine_outputs = Vec::new();
    for output in outputs {
        match OutputTarget::resolve(&output, &output_dir, &run_id) {
            Some(target) => targets.push(target),
            None => engine_outputs.push(output),
        }
    }

    let report_path = if targets.is_empty() {
        None
    } else {
        let file_name = format!("{run_id}.engine.json");
        engine_outputs.push(file_name.clone());
        Some(output_dir.join(file_name))
    };

    let data = prepare_data(&args)?;

    let invocation = EngineInvocation {
        args: engine_args(&args, &data, &output_dir, &engine_outputs),
        report_path: report_path.clone(),
        planned_runtime: planned_runtime(&args),
        total_requests: planned_requests(&args),
    };
    log::debug!("Engine arguments: {:?}", invocation.args);

    let mut progress = ChainedProgress::new();
    if let Some(url) = &args.progress_url {
        log::info!("Sending progress updates to {url}");
        progress.push(ProgressRelay::new(
            url.clone(),
            args.progress_auth.clone(),
            seconds(args.progress_timeout)?,
        ));
    }
    if !args.disable_console && !args.disable_console_interactive {
        progress.push(ConsoleProgress::new());
    }

    engine.run(&invocation, &mut progress)?;
    log::info!("Benchmark run {run_id} finished");

    let mut written = Vec::new();
    if let Some(report_path) = report_path {
        let engine_output = load_engine_report(&report_path)?;

        let mut run = RunSummary::new(
            run_id.clone(),
            started_at,
            run_config(&args, data),
            env!("CARGO_PKG_VERSION").to_string(),
        );
        for (key, value) in env {
            run.add_env(key, value);
        }

        let summary = engine_output.summarize(
            run,
            SampleLimits {
                errored: Some(args.error_limit),
                incomplete: Some(args.incomplete_limit),
            },
        );

        for target in &targets {
            for path in target.write(&summary, &engine_output)? {
                log::info!("Wrote {}", path.display());
                written.push(path);
            }
        }

        if !args.disable_console {
            println!("{}", summary_table(&summary));
        }

        if let Err(e) = std::fs::remove_file(&report_path) {
            log::warn!(
                "Failed to remove engine report {}: {}",
                report_path.display(),
                e
            );
        }
    }

    Ok(RunOutcome { run_id, written })
}

/// Work out the output directory and outputs, honouring the legacy `--output-path`.
///
/// An existing directory is used as the output directory. Anything else is treated as a file,
/// whose parent becomes the output directory and whose name becomes the only output.
fn output_location(
    output_dir: Option<&Path>,
    output_path: Option<&Path>,
    outputs: &[String],
) -> (PathBuf, Vec<String>) {
    let Some(output_path) = output_path else {
        let output_dir = output_dir.unwrap_or(Path::new(".")).to_path_buf();
        return (output_dir, outputs.to_vec());
    };

    if output_path.is_dir() {
        return (output_path.to_path_buf(), outputs.to_vec());
    }

    if !outputs.is_empty() {
        log::warn!(
            "--output-path names a file, ignoring --outputs {}",
            outputs.join(",")
        );
    }
    let parent = match output_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file_name = output_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .into_iter()
        .collect();

    (parent, file_name)
}

fn prepare_data(args: &RunArgs) -> anyhow::Result<Vec<String>> {
    if !args.data.iter().any(|source| classify(source).is_sharegpt()) {
        return Ok(args.data.clone());
    }

    let counter = token_counter_for(args.processor.as_deref())?;
    let prepared = prepare_datasets(
        &args.data,
        &PrepareOptions {
            counter: counter.as_ref(),
            sample_mode: args.sharegpt_sample_mode,
            max_items: args.max_requests.map(conversion_limit),
        },
    )
    .context("Failed to prepare ShareGPT data")?;

    Ok(prepared)
}

/// Samples converted for `--max-requests`: 20% extra, rounded down, so requests that fail don't
/// exhaust the dataset.
fn conversion_limit(max_requests: u64) -> usize {
    usize::try_from(max_requests.saturating_mul(6) / 5).unwrap_or(usize::MAX)
}

/// Expected runtime of the whole run, if it is time bounded and doesn't overflow.
fn planned_runtime(args: &RunArgs) -> Option<Duration> {
    let per_benchmark = Duration::try_from_secs_f64(args.max_seconds?).ok()?;
    per_benchmark.checked_mul(u32::try_from(planned_benchmarks(args)).ok()?)
}

fn planned_requests(args: &RunArgs) -> Option<u64> {
    args.max_requests?.checked_mul(u64::try_from(planned_benchmarks(args)).ok()?)
}

fn planned_benchmarks(args: &RunArgs) -> usize {
    match args.profile.as_deref() {
        Some("sweep") => args
            .rate
            .first()
            .map(|rate| *rate as usize)
            .unwrap_or(DEFAULT_SWEEP_BENCHMARKS),
        _ => args.rate.len(),
    }
    .max(1)
}

fn engine_args(
    args: &RunArgs,
    data: &[String],
    output_dir: &Path,
    outputs: &[String],
) -> Vec<String> {
    let mut cmd = vec!["benchmark".to_string(), "run".to_string()];

    push_arg(&mut cmd, "scenario", args.scenario.as_ref());
    push_arg(&mut cmd, "target", args.target.as_ref());
    for source in data {
        push_arg(&mut cmd, "data", Some(source));
    }
    push_arg(&mut cmd, "profile", args.profile.as_ref());
    if !args.rate.is_empty() {
        push_arg(&mut cmd, "rate", Some(args.rate.iter().join(",")));
    }
    push_arg(&mut cmd, "backend", args.backend.as_ref());
    push_arg(&mut cmd, "model", args.model.as_ref());
    push_arg(&mut cmd, "processor", args.processor.as_ref());
    push_arg(&mut cmd, "random-seed", args.random_seed);
    push_arg(&mut cmd, "max-seconds", args.max_seconds);
    push_arg(&mut cmd, "max-requests", args.max_requests);
    if !outputs.is_empty() {
        push_arg(&mut cmd, "output-dir", Some(output_dir.display()));
        for output in outputs {
            push_arg(&mut cmd, "outputs", Some(output));
        }
    }

    // The runner draws its own progress bar.
    cmd.push("--disable-console-interactive".to_string());
    if args.disable_console {
        cmd.push("--disable-console".to_string());
    }

    cmd.extend(args.engine_args.iter().cloned());
    cmd
}

fn push_arg<T: ToString>(cmd: &mut Vec<String>, flag: &str, value: Option<T>) {
    if let Some(value) = value {
        cmd.push(format!("--{flag}"));
        cmd.push(value.to_string());
    }
}

fn run_config(args: &RunArgs, data: Vec<String>) -> RunConfig {
    RunConfig {
        target: args.target.clone(),
        profile: args.profile.clone(),
        rate: args.rate.clone(),
        max_seconds: args.max_seconds,
        max_requests: args.max_requests,
        data,
        processor: args.processor.clone(),
        model: args.model.clone(),
        backend: args.backend.clone(),
        engine_args: args.engine_args.clone(),
    }
}

fn seconds(value: f64) -> anyhow::Result<Duration> {
    Duration::try_from_secs_f64(value)
        .with_context(|| format!("Invalid number of seconds: {value}"))
}
