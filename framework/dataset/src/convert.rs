use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::{fmt, str::FromStr};

use benchmark_runner_core::prelude::write_atomic;

use crate::jsonl::{JsonlError, JsonlReader};
use crate::record::{ConversationRecord, ConvertedSample, SampleMode};
use crate::tokens::TokenCounter;
use crate::DatasetError;

/// Log conversion progress every this many processed records.
const PROGRESS_LOG_INTERVAL: usize = 10_000;

/// Layout of the converted file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// One sample per line.
    #[default]
    Jsonl,
    /// A single pretty printed array of samples.
    Json,
}

impl FromStr for OutputFormat {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "jsonl" => Ok(OutputFormat::Jsonl),
            "json" => Ok(OutputFormat::Json),
            _ => Err("Unknown output format, expected `json` or `jsonl`"),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Jsonl => write!(f, "jsonl"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    pub sample_mode: SampleMode,
    /// Stop once this many samples have been written.
    pub max_items: Option<usize>,
    pub format: OutputFormat,
}

/// Outcome of a [`convert`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionStats {
    /// Records read from the source.
    pub processed: usize,
    /// Samples written to the output.
    pub written: usize,
    /// Records that produced no sample.
    pub skipped: usize,
    pub output: PathBuf,
}

/// Convert a ShareGPT dataset at `input` into engine samples written to `output`.
///
/// The source may be a JSON array or JSON Lines regardless of its extension; content starting with
/// `[` is read as an array. Records that already have the sample shape are normalized and kept so
/// converting a converted file is stable. Any JSON syntax error aborts the conversion and names
/// the offending line. Structurally unusable records are skipped, but a source that yields no
/// sample at all is an error.
///
/// The output is replaced atomically, so re-running with the same input produces an identical
/// file.
pub fn convert<C>(
    input: &Path,
    output: &Path,
    counter: &C,
    options: &ConvertOptions,
) -> Result<ConversionStats, DatasetError>
where
    C: TokenCounter + ?Sized,
{
    log::info!(
        "Starting conversion from {} to {}",
        input.display(),
        output.display()
    );

    let entries = read_entries(input)?;

    let mut samples = Vec::new();
    let mut processed = 0;
    let mut skipped = 0;
    'entries: for entry in entries {
        processed += 1;

        let extracted = samples_from_entry(entry, counter, options.sample_mode)?;
        if extracted.is_empty() {
            skipped += 1;
        }
        for sample in extracted {
            samples.push(sample);
            if options.max_items == Some(samples.len()) {
                break 'entries;
            }
        }

        if processed % PROGRESS_LOG_INTERVAL == 0 {
            log::info!(
                "Progress: processed={processed}, written={}, skipped={skipped}",
                samples.len()
            );
        }
    }
    log::info!(
        "Progress: processed={processed}, written={}, skipped={skipped} (final)",
        samples.len()
    );

    if samples.is_empty() {
        return Err(DatasetError::NoConvertibleRecords {
            path: input.to_path_buf(),
        });
    }

    write_atomic(output, |w| match options.format {
        OutputFormat::Jsonl => {
            for sample in &samples {
                serde_json::to_writer(&mut *w, sample)?;
                w.write_all(b"\n")?;
            }
            Ok(())
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *w, &samples)?;
            w.write_all(b"\n")
        }
    })
    .map_err(|e| DatasetError::io(output, e))?;

    Ok(ConversionStats {
        processed,
        written: samples.len(),
        skipped,
        output: output.to_path_buf(),
    })
}

/// Byte order mark some editors put at the start of UTF-8 files.
const UTF8_BOM: char = '\u{feff}';

/// Read every top level entry of the source, failing on the first JSON syntax error.
fn read_entries(input: &Path) -> Result<Vec<serde_json::Value>, DatasetError> {
    let content = std::fs::read_to_string(input).map_err(|e| DatasetError::io(input, e))?;
    let content = content.strip_prefix(UTF8_BOM).unwrap_or(&content);

    if content.trim_start().starts_with('[') {
        return serde_json::from_str(content).map_err(|source| DatasetError::Malformed {
            path: input.to_path_buf(),
            line: source.line(),
            source,
        });
    }

    JsonlReader::default()
        .parse(content.as_bytes())
        .map_err(|e| match e {
            JsonlError::Io(source) => DatasetError::io(input, source),
            JsonlError::Serde { line, source } => DatasetError::Malformed {
                path: input.to_path_buf(),
                line,
                source,
            },
        })
}

fn samples_from_entry<C>(
    entry: serde_json::Value,
    counter: &C,
    mode: SampleMode,
) -> Result<Vec<ConvertedSample>, DatasetError>
where
    C: TokenCounter + ?Sized,
{
    if entry.get("text").is_some() && entry.get("output_tokens_count").is_some() {
        return Ok(serde_json::from_value::<ConvertedSample>(entry)
            .ok()
            .filter(|sample| !sample.text.is_empty())
            .into_iter()
            .collect());
    }

    let record = match serde_json::from_value::<ConversationRecord>(entry) {
        Ok(record) => record,
        Err(e) => {
            log::trace!("Skipping invalid entry: {e}");
            return Ok(Vec::new());
        }
    };

    record
        .exchanges(mode)
        .into_iter()
        .map(|(prompt, completion)| {
            Ok(ConvertedSample {
                text: prompt.to_string(),
                output_tokens_count: counter.count(completion)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::WhitespaceTokenCounter;
    use pretty_assertions::assert_eq;

    fn write_input(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).expect("Failed to write input");
        path
    }

    fn read_samples(path: &Path) -> Vec<ConvertedSample> {
        JsonlReader::default()
            .parse_from_file(path)
            .expect("Failed to read output")
    }

    #[test]
    fn test_should_convert_jsonl_source() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(
            dir.path(),
            "sharegpt.jsonl",
            concat!(
                r#"{"conversations":[{"from":"human","value":"Hi"},{"from":"gpt","value":"Hello there friend"}]}"#,
                "\n",
                r#"{"conversations":[{"from":"user","value":"Bye"},{"from":"assistant","value":"See you"}]}"#,
                "\n"
            ),
        );
        let output = dir.path().join("out.jsonl");

        let stats = convert(
            &input,
            &output,
            &WhitespaceTokenCounter,
            &ConvertOptions::default(),
        )
        .unwrap();

        assert_eq!(stats.processed, 2);
        assert_eq!(stats.written, 2);
        assert_eq!(stats.skipped, 0);
        assert_eq!(
            read_samples(&output),
            vec![
                ConvertedSample {
                    text: "Hi".to_string(),
                    output_tokens_count: 3,
                },
                ConvertedSample {
                    text: "Bye".to_string(),
                    output_tokens_count: 2,
                },
            ]
        );
    }

    #[test]
    fn test_should_skip_malformed_records() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(
            dir.path(),
            "sharegpt.json",
            r#"[
                {"conversations":[{"from":"human","value":"Kept"},{"from":"gpt","value":"yes"}]},
                {"conversations":[{"from":"gpt","value":"wrong order"},{"from":"human","value":"no"}]},
                {"conversations":"not a list"},
                {"id": 7},
                42
            ]"#,
        );
        let output = dir.path().join("out.jsonl");

        let stats = convert(
            &input,
            &output,
            &WhitespaceTokenCounter,
            &ConvertOptions::default(),
        )
        .unwrap();

        assert_eq!(stats.processed, 5);
        assert_eq!(stats.written, 1);
        assert_eq!(stats.skipped, 4);
        assert_eq!(read_samples(&output)[0].text, "Kept");
    }

    #[test]
    fn test_should_fail_when_nothing_converts() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(
            dir.path(),
            "sharegpt.json",
            r#"[{"conversations":[]},{"id":"x"}]"#,
        );
        let output = dir.path().join("out.jsonl");

        let err = convert(
            &input,
            &output,
            &WhitespaceTokenCounter,
            &ConvertOptions::default(),
        )
        .unwrap_err();

        assert!(matches!(err, DatasetError::NoConvertibleRecords { .. }));
        assert!(!output.exists());
    }

    #[test]
    fn test_should_fail_on_empty_source() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path(), "sharegpt.jsonl", "\n\n");
        let output = dir.path().join("out.jsonl");

        let err = convert(
            &input,
            &output,
            &WhitespaceTokenCounter,
            &ConvertOptions::default(),
        )
        .unwrap_err();

        assert!(matches!(err, DatasetError::NoConvertibleRecords { .. }));
    }

    #[test]
    fn test_should_name_line_of_syntax_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(
            dir.path(),
            "sharegpt.json",
            "[\n  {\"conversations\": []},\n  {\"conversations\": [}\n]\n",
        );
        let output = dir.path().join("out.jsonl");

        let err = convert(
            &input,
            &output,
            &WhitespaceTokenCounter,
            &ConvertOptions::default(),
        )
        .unwrap_err();

        let message = err.to_string();
        match err {
            DatasetError::Malformed { line, .. } => assert_eq!(line, 3),
            other => panic!("Expected a malformed error, got {other:?}"),
        }
        assert!(message.contains("at line 3"), "{message}");
    }

    #[test]
    fn test_should_respect_max_items() {
        let dir = tempfile::tempdir().unwrap();
        let line = r#"{"conversations":[{"from":"human","value":"q"},{"from":"gpt","value":"a"}]}"#;
        let input = write_input(dir.path(), "sharegpt.jsonl", &[line; 10].join("\n"));
        let output = dir.path().join("out.jsonl");

        let stats = convert(
            &input,
            &output,
            &WhitespaceTokenCounter,
            &ConvertOptions {
                max_items: Some(4),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(stats.written, 4);
        assert_eq!(stats.processed, 4);
        assert_eq!(read_samples(&output).len(), 4);
    }

    #[test]
    fn test_should_split_turn_pairs() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(
            dir.path(),
            "sharegpt.jsonl",
            r#"{"conversations":[{"from":"human","value":"q1"},{"from":"gpt","value":"a1"},{"from":"human","value":"q2"},{"from":"gpt","value":"a2 a2"}]}"#,
        );
        let output = dir.path().join("out.jsonl");

        let stats = convert(
            &input,
            &output,
            &WhitespaceTokenCounter,
            &ConvertOptions {
                sample_mode: SampleMode::TurnPairs,
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(stats.written, 2);
        let samples = read_samples(&output);
        assert_eq!(samples[1].text, "q2");
        assert_eq!(samples[1].output_tokens_count, 2);
    }

    #[test]
    fn test_should_normalize_already_converted_samples() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(
            dir.path(),
            "converted_sharegpt.jsonl",
            "{\"output_tokens_count\": 5, \"text\": \"already\"}\n{\"text\": \"\", \"output_tokens_count\": 1}\n",
        );
        let output = dir.path().join("out.jsonl");

        let stats = convert(
            &input,
            &output,
            &WhitespaceTokenCounter,
            &ConvertOptions::default(),
        )
        .unwrap();

        assert_eq!(stats.written, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "{\"text\":\"already\",\"output_tokens_count\":5}\n"
        );
    }

    #[test]
    fn test_should_write_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(
            dir.path(),
            "sharegpt.jsonl",
            r#"{"conversations":[{"from":"human","value":"q"},{"from":"gpt","value":"a"}]}"#,
        );
        let output = dir.path().join("out.json");

        convert(
            &input,
            &output,
            &WhitespaceTokenCounter,
            &ConvertOptions {
                format: OutputFormat::Json,
                ..Default::default()
            },
        )
        .unwrap();

        let samples: Vec<ConvertedSample> =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(samples.len(), 1);
    }

    #[test]
    fn test_should_keep_non_ascii_text() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(
            dir.path(),
            "sharegpt.jsonl",
            r#"{"conversations":[{"from":"human","value":"你好，世界"},{"from":"gpt","value":"こんにちは"}]}"#,
        );
        let output = dir.path().join("out.jsonl");

        convert(
            &input,
            &output,
            &WhitespaceTokenCounter,
            &ConvertOptions::default(),
        )
        .unwrap();

        assert!(std::fs::read_to_string(&output)
            .unwrap()
            .contains("你好，世界"));
    }

    #[test]
    fn test_should_ignore_byte_order_mark() {
        let dir = tempfile::tempdir().unwrap();
        let conversation =
            r#"{"conversations":[{"from":"human","value":"Hi"},{"from":"gpt","value":"Hello"}]}"#;
        let sources = [
            ("sharegpt.json", format!("\u{feff}[{conversation}]")),
            ("sharegpt.jsonl", format!("\u{feff}{conversation}\n")),
        ];

        for (name, content) in sources {
            let input = write_input(dir.path(), name, &content);
            let output = dir.path().join(format!("out_{name}"));

            let stats = convert(
                &input,
                &output,
                &WhitespaceTokenCounter,
                &ConvertOptions::default(),
            )
            .unwrap();

            assert_eq!(stats.written, 1, "{name}");
            assert_eq!(read_samples(&output)[0].text, "Hi");
        }
    }

    #[test]
    fn test_should_parse_output_format() {
        assert_eq!(OutputFormat::from_str("json").unwrap(), OutputFormat::Json);
        assert_eq!(OutputFormat::from_str("jsonl").unwrap(), OutputFormat::Jsonl);
        assert!(OutputFormat::from_str("csv").is_err());
    }
}
