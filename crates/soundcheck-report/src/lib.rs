//! Report rendering.
//!
//! All four renderers work from the same [`ReportMeta`] + `BatchResults`
//! pair and write through [`write_report`], so a failed write always
//! surfaces as [`HarnessError::ReportWrite`] with the offending path.
//!
//! - [`json`] - the full machine-readable result tree
//! - [`csv`] - one spreadsheet row per engine
//! - [`text`] - the console/file summary
//! - [`html`] - a self-contained page, no external assets

pub mod csv;
pub mod html;
pub mod json;
pub mod text;

use serde::Serialize;
use soundcheck_core::HarnessError;
use soundcheck_harness::{BatchResults, RunConfig};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Context shared by every report format.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMeta {
    /// Human-visible name of the run.
    pub suite_name: String,
    /// Harness version that produced the results.
    pub version: String,
    /// Seconds since the Unix epoch when the run finished.
    pub timestamp_unix: u64,
    /// Configuration the batch ran under.
    pub configuration: RunConfig,
}

impl ReportMeta {
    /// Meta stamped with the current time and this crate's version.
    pub fn new(suite_name: impl Into<String>, configuration: RunConfig) -> Self {
        let timestamp_unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());
        Self {
            suite_name: suite_name.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp_unix,
            configuration,
        }
    }
}

/// Batch-level aggregates repeated in every format.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    /// Engines in the batch.
    pub total_engines: usize,
    /// Engines the factory failed to create.
    pub creation_failures: usize,
    /// Mean overall score of the created engines.
    pub average_score: f32,
    /// Worst per-block CPU percentage in the batch.
    pub worst_cpu_percent: f32,
    /// CRITICAL findings across all engines.
    pub critical_count: usize,
    /// ERROR findings across all engines.
    pub error_count: usize,
    /// WARNING findings across all engines.
    pub warning_count: usize,
    /// The batch exit code.
    pub exit_code: i32,
}

impl BatchSummary {
    /// Aggregate a batch.
    pub fn from_results(results: &BatchResults) -> Self {
        Self {
            total_engines: results.suites.len(),
            creation_failures: results.creation_failures(),
            average_score: results.average_score(),
            worst_cpu_percent: results.worst_cpu_percent(),
            critical_count: results.suites.iter().map(|s| s.critical_count).sum(),
            error_count: results.suites.iter().map(|s| s.error_count).sum(),
            warning_count: results.suites.iter().map(|s| s.warning_count).sum(),
            exit_code: results.exit_code(),
        }
    }
}

/// Write rendered report content, creating parent directories as needed.
pub fn write_report(path: &Path, content: &str) -> Result<(), HarnessError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| HarnessError::report_write(path, e))?;
    }
    std::fs::write(path, content).map_err(|e| HarnessError::report_write(path, e))?;
    tracing::info!(path = %path.display(), bytes = content.len(), "report written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_carries_the_crate_version() {
        let meta = ReportMeta::new("run", RunConfig::default());
        assert_eq!(meta.version, env!("CARGO_PKG_VERSION"));
        assert!(meta.timestamp_unix > 0);
    }

    #[test]
    fn write_creates_parent_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested/deeper/report.txt");
        write_report(&path, "hello").expect("write");
        assert_eq!(std::fs::read_to_string(&path).expect("read"), "hello");
    }

    #[test]
    fn summary_of_an_empty_batch() {
        let summary = BatchSummary::from_results(&BatchResults::default());
        assert_eq!(summary.total_engines, 0);
        assert_eq!(summary.exit_code, 0);
        assert_eq!(summary.average_score, 0.0);
    }
}
