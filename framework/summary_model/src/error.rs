use std::path::PathBuf;

/// Errors raised while producing the summary outputs of a finished run.
#[derive(Debug, thiserror::Error)]
pub enum SummaryError {
    #[error("Failed to read engine report {}: {source}", path.display())]
    ReadReport {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Engine report {} is not valid: {source}", path.display())]
    InvalidReport {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to write summary {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
