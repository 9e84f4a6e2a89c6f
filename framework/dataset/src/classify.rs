use std::path::{Path, PathBuf};

/// Marker that identifies a ShareGPT dataset by its file name.
const SHAREGPT_MARKER: &str = "sharegpt";

/// Prefix of the file written next to a converted source.
const CONVERTED_PREFIX: &str = "converted_";

/// How a `--data` source is handled before it reaches the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetKind {
    /// A ShareGPT dataset stored as `.json`.
    ShareGptJson,
    /// A ShareGPT dataset stored as `.jsonl`.
    ShareGptJsonl,
    /// Anything else, given to the engine unchanged.
    Passthrough,
}

impl DatasetKind {
    pub fn is_sharegpt(&self) -> bool {
        !matches!(self, DatasetKind::Passthrough)
    }
}

/// Classify a data source by its file name.
///
/// A source is ShareGPT when its file name contains `sharegpt` in any case and ends in `.json` or
/// `.jsonl`. Data sources are not required to be paths (hub ids and synthetic data specs are
/// common) so the file system is not consulted.
pub fn classify(source: &str) -> DatasetKind {
    let path = Path::new(source);
    let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
        return DatasetKind::Passthrough;
    };
    if !file_name.to_lowercase().contains(SHAREGPT_MARKER) {
        return DatasetKind::Passthrough;
    }

    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("json") => DatasetKind::ShareGptJson,
        Some("jsonl") => DatasetKind::ShareGptJsonl,
        _ => DatasetKind::Passthrough,
    }
}

/// The path a ShareGPT source is converted to: `converted_<stem>.jsonl` in the same directory.
pub fn converted_path(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    source.with_file_name(format!("{CONVERTED_PREFIX}{stem}.jsonl"))
}
