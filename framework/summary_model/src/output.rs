use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use benchmark_runner_core::prelude::write_atomic;
use serde::Serialize;

use crate::engine::EngineReport;
use crate::summary::{SampleLimits, SummaryReport};
use crate::SummaryError;

const SUMMARY_JSON: &str = "summary_json";
const DUAL_JSON: &str = "dual_json";

/// An output format produced by the runner rather than the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// The summary report only.
    SummaryJson,
    /// The summary report plus the complete engine report next to it, named `<stem>.full.json`.
    DualJson,
}

/// Where a runner owned output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    pub kind: OutputKind,
    pub path: PathBuf,
}

impl OutputTarget {
    /// Resolve an `--outputs` entry.
    ///
    /// The bare aliases `summary_json` and `dual_json` write `<output_dir>/<run_id>.json`. A file
    /// name with the extension `.summary_json` or `.dual_json` selects the format and is written
    /// with a `.json` extension instead. Any other entry belongs to the engine and gives [`None`].
    pub fn resolve(output: &str, output_dir: &Path, run_id: &str) -> Option<Self> {
        let (kind, file_name) = match output {
            SUMMARY_JSON => (OutputKind::SummaryJson, PathBuf::from(run_id)),
            DUAL_JSON => (OutputKind::DualJson, PathBuf::from(run_id)),
            _ => {
                let path = Path::new(output);
                let kind = match path.extension().and_then(|e| e.to_str()) {
                    Some(ext) if ext.eq_ignore_ascii_case(SUMMARY_JSON) => OutputKind::SummaryJson,
                    Some(ext) if ext.eq_ignore_ascii_case(DUAL_JSON) => OutputKind::DualJson,
                    _ => return None,
                };
                (kind, path.with_extension(""))
            }
        };

        let mut path = output_dir.join(file_name);
        path.as_mut_os_string().push(".json");
        Some(Self { kind, path })
    }

    /// The companion file holding the complete engine report for [`OutputKind::DualJson`].
    pub fn full_path(&self) -> PathBuf {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = self
            .path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        self.path.with_file_name(format!("{stem}.full{extension}"))
    }

    /// Write this output and return the paths that were written.
    pub fn write(
        &self,
        summary: &SummaryReport,
        engine_output: &EngineOutput,
    ) -> Result<Vec<PathBuf>, SummaryError> {
        write_report(&self.path, summary)?;
        let mut written = vec![self.path.clone()];

        if self.kind == OutputKind::DualJson {
            let full_path = self.full_path();
            write_report(&full_path, &engine_output.raw)?;
            written.push(full_path);
        }

        Ok(written)
    }
}

/// The report written by the engine, both as raw JSON and as the fields the summary reads.
#[derive(Debug, Clone)]
pub struct EngineOutput {
    pub raw: serde_json::Value,
    pub report: EngineReport,
}

impl EngineOutput {
    pub fn summarize(&self, run: crate::RunSummary, limits: SampleLimits) -> SummaryReport {
        SummaryReport::from_engine(run, &self.report, limits)
    }
}

/// Load the report the engine wrote at `path`.
pub fn load_engine_report(path: &Path) -> Result<EngineOutput, SummaryError> {
    let content = std::fs::read_to_string(path).map_err(|source| SummaryError::ReadReport {
        path: path.to_path_buf(),
        source,
    })?;
    let invalid = |source| SummaryError::InvalidReport {
        path: path.to_path_buf(),
        source,
    };
    let raw: serde_json::Value = serde_json::from_str(&content).map_err(invalid)?;
    let report = serde_json::from_value(raw.clone()).map_err(invalid)?;

    Ok(EngineOutput { raw, report })
}

/// Serialize `value` as JSON indented by four spaces and atomically write it to `path`.
///
/// Parent directories are created as needed and an existing file is replaced.
pub fn write_report<T>(path: &Path, value: &T) -> Result<(), SummaryError>
where
    T: Serialize + ?Sized,
{
    write_atomic(path, |w| store_report(value, w)).map_err(|source| SummaryError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!("Wrote report to {}", path.display());
    Ok(())
}

/// Serialize a report to a writer
pub fn store_report<T, W>(value: &T, writer: W) -> std::io::Result<()>
where
    T: Serialize + ?Sized,
    W: Write,
{
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(writer, formatter);
    value.serialize(&mut serializer)?;
    Ok(())
}

/// Load a summary report from a reader
pub fn load_summary_report<R: Read>(reader: R) -> Result<SummaryReport, serde_json::Error> {
    let reader = std::io::BufReader::new(reader);
    serde_json::from_reader(reader)
}
