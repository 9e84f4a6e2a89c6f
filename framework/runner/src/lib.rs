mod cli;
mod config;
mod dataset;
mod engine;
mod init;
mod progress;
mod relay;
mod run;

pub mod prelude {
    pub use crate::cli::{
        BenchmarkCommand, BenchmarkRunnerCli, Command, ConvertArgs, DatasetCommand, RunArgs,
    };
    pub use crate::config::{
        configured_env_vars, runner_env, runner_env_vars, show_config, ENV_PREFIX,
    };
    pub use crate::dataset::convert_dataset;
    pub use crate::engine::{BenchmarkEngine, EngineError, EngineInvocation, ExternalEngine};
    pub use crate::init::init;
    pub use crate::progress::{ChainedProgress, ConsoleProgress, ProgressListener, ProgressSnapshot};
    pub use crate::relay::ProgressRelay;
    pub use crate::run::{run, run_with_engine, RunOutcome};
}
