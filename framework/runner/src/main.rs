#[macro_use]
extern crate log;

use benchmark_runner::prelude::*;

fn main() -> anyhow::Result<()> {
    let cli = init();

    let result = match cli.command {
        Command::Benchmark {
            command: BenchmarkCommand::Run(args),
        } => run(args).map(|outcome| {
            info!(
                "Run {} complete, wrote {} file(s)",
                outcome.run_id,
                outcome.written.len()
            );
        }),
        Command::Config { engine_bin } => show_config(&engine_bin),
        Command::Dataset {
            command: DatasetCommand::Convert(args),
        } => convert_dataset(&args).map(|stats| {
            info!(
                "Converted {} record(s) into {} sample(s) at {}",
                stats.processed,
                stats.written,
                stats.output.display()
            );
        }),
    };

    // A failing engine decides the exit code.
    if let Err(e) = &result {
        if let Some(engine_error) = e.downcast_ref::<EngineError>() {
            error!("{e:#}");
            std::process::exit(engine_error.exit_code());
        }
    }

    result
}
