//! Conversion of ShareGPT conversation datasets into the line-delimited sample format that the
//! benchmarking engine ingests.
//!
//! Data sources are first [`classify`]d by file name. ShareGPT sources are converted with
//! [`convert`] into a `converted_<stem>.jsonl` file next to the source, anything else is handed to
//! the engine untouched. [`prepare_datasets`] applies this to a list of `--data` sources.

mod classify;
mod convert;
mod error;
mod jsonl;
mod prepare;
mod record;
mod tokens;

pub use self::classify::{classify, converted_path, DatasetKind};
pub use self::convert::{convert, ConversionStats, ConvertOptions, OutputFormat};
pub use self::error::DatasetError;
pub use self::jsonl::{JsonlError, JsonlReader};
pub use self::prepare::{prepare_datasets, PrepareOptions};
pub use self::record::{ConversationRecord, ConvertedSample, Role, SampleMode, Turn};
pub use self::tokens::{token_counter_for, HfTokenCounter, TokenCounter, WhitespaceTokenCounter};

