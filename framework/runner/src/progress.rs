use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

/// A point-in-time view of a running benchmark.
///
/// This is also the JSON body posted to a progress URL.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    /// Percent complete, from 0 to 100. Unknown when the run has no time bound to measure against.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    pub elapsed_secs: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_requests: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_requests: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_rate: Option<f64>,
}

impl ProgressSnapshot {
    pub fn starting(total_requests: Option<u64>) -> Self {
        Self {
            progress: Some(0.0),
            elapsed_secs: 0.0,
            completed_requests: None,
            total_requests,
            current_rate: None,
        }
    }

    pub fn completed(mut self) -> Self {
        self.progress = Some(100.0);
        self
    }
}

/// Receives progress events while the engine runs.
///
/// Listeners are called from the thread that waits on the engine, so they must not block for
/// long. A listener must never fail the benchmark.
pub trait ProgressListener {
    fn on_start(&mut self, _snapshot: &ProgressSnapshot) {}

    fn on_update(&mut self, snapshot: &ProgressSnapshot);

    fn on_complete(&mut self, snapshot: &ProgressSnapshot) {
        self.on_update(snapshot);
    }

    /// Called once after the engine has exited, whether or not it succeeded.
    fn on_finalize(&mut self) {}
}

/// Forwards every event to each listener in order.
#[derive(Default)]
pub struct ChainedProgress {
    listeners: Vec<Box<dyn ProgressListener>>,
}

impl ChainedProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, listener: impl ProgressListener + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl ProgressListener for ChainedProgress {
    fn on_start(&mut self, snapshot: &ProgressSnapshot) {
        for listener in &mut self.listeners {
            listener.on_start(snapshot);
        }
    }

    fn on_update(&mut self, snapshot: &ProgressSnapshot) {
        for listener in &mut self.listeners {
            listener.on_update(snapshot);
        }
    }

    fn on_complete(&mut self, snapshot: &ProgressSnapshot) {
        for listener in &mut self.listeners {
            listener.on_complete(snapshot);
        }
    }

    fn on_finalize(&mut self) {
        for listener in &mut self.listeners {
            listener.on_finalize();
        }
    }
}

/// Displays a progress bar while the benchmark is running to show the user how far along it is.
#[derive(Default)]
pub struct ConsoleProgress {
    bar: Option<ProgressBar>,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressListener for ConsoleProgress {
    fn on_start(&mut self, _snapshot: &ProgressSnapshot) {
        let bar = ProgressBar::new(100);
        let style = ProgressStyle::with_template(
            "{spinner:.green} [{wide_bar:.cyan/blue}] {pos:>3}% [{elapsed_precise}] {msg}",
        )
        .map(|style| style.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        self.bar = Some(bar);
    }

    fn on_update(&mut self, snapshot: &ProgressSnapshot) {
        if let Some(bar) = &self.bar {
            match snapshot.progress {
                Some(progress) => bar.set_position(progress.clamp(0.0, 100.0) as u64),
                None => bar.tick(),
            }
            if let (Some(completed), Some(total)) =
                (snapshot.completed_requests, snapshot.total_requests)
            {
                bar.set_message(format!("{completed}/{total} requests"));
            }
        }
    }

    fn on_complete(&mut self, snapshot: &ProgressSnapshot) {
        self.on_update(snapshot);
        if let Some(bar) = &self.bar {
            bar.finish();
        }
    }

    fn on_finalize(&mut self) {
        if let Some(bar) = self.bar.take() {
            log::trace!("Progress bar shutting down");
            bar.finish_and_clear();
        }
    }
}
