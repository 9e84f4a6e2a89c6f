use std::collections::BTreeMap;
use std::time::Duration;

use clap::CommandFactory;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::cli::BenchmarkRunnerCli;
use crate::engine::ExternalEngine;

/// Prefix shared by all environment variables the runner reads.
pub const ENV_PREFIX: &str = "BENCHMARK_RUNNER_";

/// Variables whose values are never echoed.
const SECRET_VARS: &[&str] = &["BENCHMARK_RUNNER_PROGRESS_AUTH"];

/// Variables holding local paths. They differ between machines running the same benchmark, so
/// they stay out of the run summary and its fingerprint.
const LOCAL_PATH_VARS: &[&str] = &[
    "BENCHMARK_RUNNER_DATA",
    "BENCHMARK_RUNNER_OUTPUT_DIR",
    "BENCHMARK_RUNNER_OUTPUT_PATH",
];

#[derive(Tabled)]
struct Setting {
    #[tabled(rename = "Variable")]
    variable: String,
    #[tabled(rename = "Value")]
    value: String,
}

/// All environment variables any runner command reads, sorted.
pub fn runner_env_vars() -> Vec<String> {
    fn collect(command: &clap::Command, vars: &mut Vec<String>) {
        for arg in command.get_arguments() {
            if let Some(env) = arg.get_env() {
                vars.push(env.to_string_lossy().into_owned());
            }
        }
        for subcommand in command.get_subcommands() {
            collect(subcommand, vars);
        }
    }

    let mut vars = Vec::new();
    collect(&BenchmarkRunnerCli::command(), &mut vars);
    vars.sort();
    vars.dedup();
    vars
}

/// The runner variables that are currently set and recorded in the run summary.
pub fn runner_env() -> BTreeMap<String, String> {
    summary_env(std::env::vars())
}

/// Keep the variables the CLI reads, minus secrets and local paths.
fn summary_env(vars: impl IntoIterator<Item = (String, String)>) -> BTreeMap<String, String> {
    let known = runner_env_vars();
    vars.into_iter()
        .filter(|(key, _)| {
            known.contains(key)
                && !SECRET_VARS.contains(&key.as_str())
                && !LOCAL_PATH_VARS.contains(&key.as_str())
        })
        .collect()
}

/// The names of the runner variables that are currently set.
pub fn configured_env_vars() -> Vec<String> {
    runner_env_vars()
        .into_iter()
        .filter(|var| std::env::var_os(var).is_some())
        .collect()
}

/// Print the runner's settings, then ask the engine for its own.
pub fn show_config(engine_bin: &str) -> anyhow::Result<()> {
    let settings = runner_env_vars()
        .into_iter()
        .map(|variable| {
            let value = match std::env::var(&variable) {
                Ok(_) if SECRET_VARS.contains(&variable.as_str()) => "<set>".to_string(),
                Ok(value) => value,
                Err(_) => "-".to_string(),
            };
            Setting { variable, value }
        })
        .collect::<Vec<_>>();

    println!("Runner settings:");
    println!("{}", Table::new(settings).with(Style::modern()));

    match ExternalEngine::locate(engine_bin, Duration::from_secs(1)) {
        Ok(engine) => {
            println!("Engine settings ({}):", engine.bin().display());
            engine.run_to_end(&["config"])?;
        }
        Err(e) => log::warn!("Not showing engine settings: {e}"),
    }

    Ok(())
}
