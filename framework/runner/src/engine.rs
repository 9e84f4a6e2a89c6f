use std::path::PathBuf;
use std::process::{Command, ExitStatus};
use std::time::{Duration, Instant};

use crate::progress::{ProgressListener, ProgressSnapshot};

/// How often the engine process is checked for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Could not find the benchmark engine `{bin}`: {source}")]
    NotFound {
        bin: String,
        #[source]
        source: which::Error,
    },
    #[error("Failed to start the benchmark engine: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("Failed to wait for the benchmark engine: {0}")]
    Wait(#[source] std::io::Error),
    #[error("Benchmark engine exited with {}", exit_description(.code))]
    Exited { code: Option<i32> },
}

impl EngineError {
    /// The exit code the runner should finish with for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            EngineError::Exited { code: Some(code) } => *code,
            _ => 1,
        }
    }
}

fn exit_description(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code, it was terminated by a signal".to_string(),
    }
}

/// One run of the benchmarking engine.
#[derive(Debug, Clone, Default)]
pub struct EngineInvocation {
    /// Arguments passed to the engine, starting with its subcommand.
    pub args: Vec<String>,
    /// The JSON report the engine was asked to write, if the runner needs to read one back.
    pub report_path: Option<PathBuf>,
    /// Expected runtime, used to estimate progress.
    pub planned_runtime: Option<Duration>,
    pub total_requests: Option<u64>,
}

impl EngineInvocation {
    fn snapshot(&self, elapsed: Duration) -> ProgressSnapshot {
        // Without a time bound the engine's progress can't be observed from outside.
        // 100% is only reported once the engine has exited.
        let progress = self
            .planned_runtime
            .filter(|planned| !planned.is_zero())
            .map(|planned| (elapsed.as_secs_f64() / planned.as_secs_f64() * 100.0).min(99.0));

        ProgressSnapshot {
            progress,
            elapsed_secs: elapsed.as_secs_f64(),
            completed_requests: None,
            total_requests: self.total_requests,
            current_rate: None,
        }
    }
}

/// Something that can execute a benchmark.
pub trait BenchmarkEngine {
    /// Runs the benchmark to completion, reporting progress as it goes.
    ///
    /// Listeners get `on_start` first, `on_complete` only on success and `on_finalize` always.
    fn run(
        &self,
        invocation: &EngineInvocation,
        progress: &mut dyn ProgressListener,
    ) -> Result<(), EngineError>;
}

/// Runs the engine as a child process sharing the runner's stdio.
pub struct ExternalEngine {
    bin: PathBuf,
    tick_interval: Duration,
}

impl ExternalEngine {
    pub fn new<P>(bin: P, tick_interval: Duration) -> Self
    where
        P: Into<PathBuf>,
    {
        ExternalEngine {
            bin: bin.into(),
            tick_interval,
        }
    }

    /// Resolves `bin` on the `PATH`, or as a path if it contains a separator.
    pub fn locate(bin: &str, tick_interval: Duration) -> Result<Self, EngineError> {
        let path = which::which(bin).map_err(|source| EngineError::NotFound {
            bin: bin.to_string(),
            source,
        })?;
        log::debug!("Using benchmark engine at {}", path.display());

        Ok(Self::new(path, tick_interval))
    }

    pub fn bin(&self) -> &std::path::Path {
        &self.bin
    }

    /// Runs the engine with `args` and waits for it, without progress reporting.
    pub fn run_to_end(&self, args: &[&str]) -> Result<(), EngineError> {
        let status = Command::new(&self.bin)
            .args(args)
            .status()
            .map_err(EngineError::Spawn)?;
        check_status(status)
    }
}

impl BenchmarkEngine for ExternalEngine {
    fn run(
        &self,
        invocation: &EngineInvocation,
        progress: &mut dyn ProgressListener,
    ) -> Result<(), EngineError> {
        let mut process = Command::new(&self.bin)
            .args(&invocation.args)
            .spawn()
            .map_err(EngineError::Spawn)?;
        log::debug!("Running benchmark engine with PID: {}", process.id());

        let start_time = Instant::now();
        progress.on_start(&invocation.snapshot(Duration::ZERO));

        let mut last_tick = start_time;
        let status = loop {
            match process.try_wait() {
                Ok(Some(status)) => break Ok(status),
                Ok(None) => {}
                Err(e) => {
                    // The child can't be tracked anymore, don't leave it running.
                    let _ = process.kill();
                    break Err(EngineError::Wait(e));
                }
            }

            if last_tick.elapsed() >= self.tick_interval {
                last_tick = Instant::now();
                progress.on_update(&invocation.snapshot(start_time.elapsed()));
            }

            std::thread::sleep(POLL_INTERVAL.min(self.tick_interval));
        };

        let result = status.and_then(|status| {
            log::debug!("Benchmark engine finished with status: {status}");
            check_status(status)
        });
        if result.is_ok() {
            progress.on_complete(&invocation.snapshot(start_time.elapsed()).completed());
        }
        progress.on_finalize();

        result
    }
}

fn check_status(status: ExitStatus) -> Result<(), EngineError> {
    if status.success() {
        Ok(())
    } else {
        Err(EngineError::Exited {
            code: status.code(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn progress_is_estimated_from_runtime() {
        let invocation = EngineInvocation {
            planned_runtime: Some(Duration::from_secs(10)),
            total_requests: Some(50),
            ..Default::default()
        };

        let snapshot = invocation.snapshot(Duration::from_secs(4));
        assert_eq!(snapshot.progress, Some(40.0));
        assert_eq!(snapshot.total_requests, Some(50));

        assert_eq!(
            invocation.snapshot(Duration::from_secs(30)).progress,
            Some(99.0)
        );
    }

    #[test]
    fn request_bounded_progress_is_unknown() {
        let invocation = EngineInvocation {
            total_requests: Some(100),
            ..Default::default()
        };

        let snapshot = invocation.snapshot(Duration::from_secs(4));
        assert_eq!(snapshot.progress, None);
        assert_eq!(snapshot.elapsed_secs, 4.0);
        assert_eq!(snapshot.total_requests, Some(100));
        assert_eq!(snapshot.completed().progress, Some(100.0));
    }

    #[test]
    fn exit_code_is_passed_through() {
        assert_eq!(EngineError::Exited { code: Some(3) }.exit_code(), 3);
        assert_eq!(EngineError::Exited { code: None }.exit_code(), 1);
        assert_eq!(
            EngineError::Spawn(std::io::Error::other("boom")).exit_code(),
            1
        );
    }

    #[test]
    fn missing_engine_is_reported() {
        let err = ExternalEngine::locate("definitely-not-a-benchmark-engine", POLL_INTERVAL)
            .err()
            .expect("Engine should not be found");
        assert!(matches!(err, EngineError::NotFound { .. }));
    }
}
