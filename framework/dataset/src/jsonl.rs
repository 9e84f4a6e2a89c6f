use std::io::BufRead as _;

/// A module for reading JSON Lines (jsonl) files.
///
/// Blank lines are ignored. Line numbers reported in errors are 1-based and count blank lines, so
/// they match what an editor shows.
#[derive(Debug, Default)]
pub struct JsonlReader;

impl JsonlReader {
    /// Parses JSON Lines content from the given reader into a vector of type `T`.
    pub fn parse<R, T>(&self, reader: R) -> Result<Vec<T>, JsonlError>
    where
        R: std::io::Read,
        T: serde::de::DeserializeOwned,
    {
        let mut results = Vec::new();
        for (index, line) in std::io::BufReader::new(reader).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let value = serde_json::from_str(&line).map_err(|source| JsonlError::Serde {
                line: index + 1,
                source,
            })?;
            results.push(value);
        }
        Ok(results)
    }

    /// Parses a JSON Lines file from the specified path into a vector of type `T`.
    pub fn parse_from_file<P, T>(&self, path: P) -> Result<Vec<T>, JsonlError>
    where
        P: AsRef<std::path::Path>,
        T: serde::de::DeserializeOwned,
    {
        let file = std::fs::File::open(path)?;
        self.parse(file)
    }
}

/// An error type for [`JsonlReader::parse`].
#[derive(Debug, thiserror::Error)]
pub enum JsonlError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serde JSON error on line {line}: {source}")]
    Serde {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}
