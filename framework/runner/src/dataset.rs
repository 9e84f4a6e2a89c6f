use anyhow::Context;
use benchmark_runner_dataset::{
    convert, converted_path, token_counter_for, ConversionStats, ConvertOptions, OutputFormat,
};

use crate::cli::ConvertArgs;

/// Convert a single ShareGPT file, as `dataset convert` does.
pub fn convert_dataset(args: &ConvertArgs) -> anyhow::Result<ConversionStats> {
    let counter = token_counter_for(args.tokenizer.as_deref())?;

    let output = match &args.output_file {
        Some(output) => output.clone(),
        None => {
            let output = converted_path(&args.input_file);
            match args.format {
                OutputFormat::Jsonl => output,
                OutputFormat::Json => output.with_extension("json"),
            }
        }
    };

    let stats = convert(
        &args.input_file,
        &output,
        counter.as_ref(),
        &ConvertOptions {
            sample_mode: args.sample_mode,
            max_items: args.max_items,
            format: args.format,
        },
    )
    .with_context(|| format!("Failed to convert {}", args.input_file.display()))?;

    Ok(stats)
}
