use std::path::PathBuf;

/// Errors raised while preparing a dataset. All of them abort the run before the benchmark
/// starts.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed JSON in {} at line {line}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("No convertible records in {}", path.display())]
    NoConvertibleRecords { path: PathBuf },
    #[error("Failed to load tokenizer from {}: {message}", path.display())]
    Tokenizer { path: PathBuf, message: String },
}

impl DatasetError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DatasetError::Io {
            path: path.into(),
            source,
        }
    }
}
