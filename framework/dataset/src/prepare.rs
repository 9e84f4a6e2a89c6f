use std::path::Path;

use crate::classify::{classify, converted_path};
use crate::convert::{convert, ConvertOptions, OutputFormat};
use crate::record::SampleMode;
use crate::tokens::TokenCounter;
use crate::DatasetError;

/// Options for [`prepare_datasets`].
pub struct PrepareOptions<'a> {
    pub counter: &'a dyn TokenCounter,
    pub sample_mode: SampleMode,
    /// Maximum number of samples to convert per source.
    pub max_items: Option<usize>,
}

/// Replace every ShareGPT source with its converted file and leave the rest untouched.
///
/// The returned list has the same length and order as `sources`. Conversion failures abort the
/// whole preparation.
pub fn prepare_datasets(
    sources: &[String],
    options: &PrepareOptions<'_>,
) -> Result<Vec<String>, DatasetError> {
    let mut prepared = Vec::with_capacity(sources.len());

    for source in sources {
        let kind = classify(source);
        if !kind.is_sharegpt() {
            log::debug!("Passing data source through unchanged: {source}");
            prepared.push(source.clone());
            continue;
        }

        log::info!("Preparing ShareGPT dataset {source} ({kind:?})");
        let input = Path::new(source);
        let output = converted_path(input);
        let stats = convert(
            input,
            &output,
            options.counter,
            &ConvertOptions {
                sample_mode: options.sample_mode,
                max_items: options.max_items,
                format: OutputFormat::Jsonl,
            },
        )?;
        log::info!(
            "Conversion done: written={}, skipped={}, output={}",
            stats.written,
            stats.skipped,
            stats.output.display()
        );

        prepared.push(stats.output.to_string_lossy().into_owned());
    }

    Ok(prepared)
}
