use std::path::PathBuf;

use benchmark_runner_dataset::{OutputFormat, SampleMode};
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "benchmark-runner", version, about, long_about = None)]
pub struct BenchmarkRunnerCli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a benchmark against a generative model.
    Benchmark {
        #[command(subcommand)]
        command: BenchmarkCommand,
    },

    /// Show the configuration settings of the runner and the engine.
    Config {
        /// The benchmarking engine binary
        #[arg(long, env = "BENCHMARK_RUNNER_ENGINE_BIN", default_value = "guidellm")]
        engine_bin: String,
    },

    /// Work with benchmark datasets.
    Dataset {
        #[command(subcommand)]
        command: DatasetCommand,
    },
}

#[derive(Subcommand)]
pub enum BenchmarkCommand {
    /// Run a benchmark. Options not listed here can be given to the engine after `--`.
    Run(RunArgs),
}

#[derive(Subcommand)]
pub enum DatasetCommand {
    /// Convert a ShareGPT dataset into the engine's sample format.
    Convert(ConvertArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Builtin scenario name or path to an engine config file. CLI options override scenario settings.
    #[arg(long, short = 'c', env = "BENCHMARK_RUNNER_SCENARIO")]
    pub scenario: Option<String>,

    /// Target backend URL, for example `http://localhost:8000`
    #[arg(long, env = "BENCHMARK_RUNNER_TARGET", value_parser = parse_http_url)]
    pub target: Option<String>,

    /// Data sources: dataset ids, data files or synthetic data specs.
    ///
    /// Files whose name contains `sharegpt` and that end in `.json` or `.jsonl` are converted into
    /// the engine's sample format first.
    #[arg(long, env = "BENCHMARK_RUNNER_DATA")]
    pub data: Vec<String>,

    /// Benchmark profile type, for example `sweep`, `constant` or `poisson`
    #[arg(long, alias = "rate-type", env = "BENCHMARK_RUNNER_PROFILE")]
    pub profile: Option<String>,

    /// Benchmark rate(s). Their meaning depends on the profile.
    #[arg(long, env = "BENCHMARK_RUNNER_RATE", value_delimiter = ',')]
    pub rate: Vec<f64>,

    /// Backend type
    #[arg(long, alias = "backend-type", env = "BENCHMARK_RUNNER_BACKEND")]
    pub backend: Option<String>,

    /// Model id to benchmark
    #[arg(long, env = "BENCHMARK_RUNNER_MODEL")]
    pub model: Option<String>,

    /// Processor or tokenizer used for token counts, also used when converting ShareGPT data
    #[arg(long, env = "BENCHMARK_RUNNER_PROCESSOR")]
    pub processor: Option<String>,

    /// Random seed for reproducibility
    #[arg(long, env = "BENCHMARK_RUNNER_RANDOM_SEED")]
    pub random_seed: Option<u64>,

    /// Maximum seconds per benchmark
    #[arg(long, env = "BENCHMARK_RUNNER_MAX_SECONDS")]
    pub max_seconds: Option<f64>,

    /// Maximum requests per benchmark
    #[arg(long, env = "BENCHMARK_RUNNER_MAX_REQUESTS")]
    pub max_requests: Option<u64>,

    /// The directory to save file outputs in
    #[arg(long, env = "BENCHMARK_RUNNER_OUTPUT_DIR", conflicts_with = "output_path")]
    pub output_dir: Option<PathBuf>,

    /// Outputs to create.
    ///
    /// `summary_json` and `dual_json` are written by the runner, as `<run-id>.json` or as the given
    /// file name when written as `name.summary_json`/`name.dual_json`. Anything else is passed to
    /// the engine.
    #[arg(long, env = "BENCHMARK_RUNNER_OUTPUTS", value_delimiter = ',')]
    pub outputs: Vec<String>,

    /// Legacy output path. A directory sets `--output-dir`, a file sets both the directory and the
    /// single output.
    #[arg(long, env = "BENCHMARK_RUNNER_OUTPUT_PATH")]
    pub output_path: Option<PathBuf>,

    /// URL to send benchmark progress updates to
    #[arg(long, env = "BENCHMARK_RUNNER_PROGRESS_URL", value_parser = parse_http_url)]
    pub progress_url: Option<String>,

    /// Bearer token for progress update requests
    #[arg(long, env = "BENCHMARK_RUNNER_PROGRESS_AUTH", hide_env_values = true)]
    pub progress_auth: Option<String>,

    /// Seconds to wait for the progress server before dropping an update
    #[arg(
        long,
        env = "BENCHMARK_RUNNER_PROGRESS_TIMEOUT",
        default_value = "5",
        value_parser = parse_positive_seconds
    )]
    pub progress_timeout: f64,

    /// Seconds between progress updates
    #[arg(
        long,
        env = "BENCHMARK_RUNNER_PROGRESS_INTERVAL",
        default_value = "1",
        value_parser = parse_positive_seconds
    )]
    pub progress_interval: f64,

    /// How multi-turn ShareGPT conversations are turned into samples
    #[arg(
        long,
        env = "BENCHMARK_RUNNER_SHAREGPT_SAMPLE_MODE",
        default_value_t = SampleMode::FirstTurn
    )]
    pub sharegpt_sample_mode: SampleMode,

    /// Maximum number of errored requests to include in a summary
    #[arg(long, env = "BENCHMARK_RUNNER_ERROR_LIMIT", default_value = "20")]
    pub error_limit: usize,

    /// Maximum number of incomplete requests to include in a summary
    #[arg(long, env = "BENCHMARK_RUNNER_INCOMPLETE_LIMIT", default_value = "20")]
    pub incomplete_limit: usize,

    /// Disable all console output of the runner and the engine
    #[arg(long, alias = "disable-console-outputs", env = "BENCHMARK_RUNNER_DISABLE_CONSOLE")]
    pub disable_console: bool,

    /// Disable the interactive progress bar.
    ///
    /// This is recommended for CI/CD environments where the progress bar isn't being looked at by
    /// anyone and is just adding noise to the logs.
    #[arg(
        long,
        alias = "disable-progress",
        env = "BENCHMARK_RUNNER_DISABLE_CONSOLE_INTERACTIVE"
    )]
    pub disable_console_interactive: bool,

    /// The benchmarking engine binary
    #[arg(long, env = "BENCHMARK_RUNNER_ENGINE_BIN", default_value = "guidellm")]
    pub engine_bin: String,

    /// Arguments passed verbatim to the engine
    #[arg(last = true)]
    pub engine_args: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ConvertArgs {
    /// The ShareGPT dataset to convert
    #[arg(long)]
    pub input_file: PathBuf,

    /// Where to write the converted dataset, defaults to `converted_<stem>.jsonl` next to the input
    #[arg(long)]
    pub output_file: Option<PathBuf>,

    /// Local `tokenizer.json` used to count output tokens
    #[arg(long)]
    pub tokenizer: Option<String>,

    /// Stop after this many samples
    #[arg(long)]
    pub max_items: Option<usize>,

    /// Output layout
    #[arg(long, default_value_t = OutputFormat::Jsonl)]
    pub format: OutputFormat,

    /// How multi-turn conversations are turned into samples
    #[arg(long, default_value_t = SampleMode::FirstTurn)]
    pub sample_mode: SampleMode,
}

fn parse_http_url(s: &str) -> anyhow::Result<String> {
    let url = url::Url::parse(s)?;
    match url.scheme() {
        "http" | "https" => Ok(s.to_string()),
        scheme => Err(anyhow::anyhow!(
            "Unsupported URL scheme `{scheme}`, expected http or https"
        )),
    }
}

fn parse_positive_seconds(s: &str) -> anyhow::Result<f64> {
    let value: f64 = s.parse()?;
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(anyhow::anyhow!(
            "Expected a positive number of seconds, got `{s}`"
        ))
    }
}
