//! Machine-readable JSON report: the complete result tree plus run
//! metadata, pretty-printed.

use crate::{BatchSummary, ReportMeta};
use serde::Serialize;
use soundcheck_core::HarnessError;
use soundcheck_harness::{BatchResults, EngineTestSuite, RunConfig};
use std::path::Path;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonReport<'a> {
    test_suite: &'a str,
    version: &'a str,
    #[serde(rename = "timestamp")]
    timestamp_unix: u64,
    configuration: &'a RunConfig,
    summary: BatchSummary,
    engines: &'a [EngineTestSuite],
}

/// Render the full report as a JSON string.
pub fn render(results: &BatchResults, meta: &ReportMeta) -> Result<String, HarnessError> {
    let report = JsonReport {
        test_suite: &meta.suite_name,
        version: &meta.version,
        timestamp_unix: meta.timestamp_unix,
        configuration: &meta.configuration,
        summary: BatchSummary::from_results(results),
        engines: &results.suites,
    };
    serde_json::to_string_pretty(&report)
        .map_err(|e| HarnessError::programmer(format!("JSON serialization failed: {e}")))
}

/// Render and write to `path`.
pub fn write(path: &Path, results: &BatchResults, meta: &ReportMeta) -> Result<(), HarnessError> {
    crate::write_report(path, &render(results, meta)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use soundcheck_harness::EngineTestSuite;

    fn sample_results() -> BatchResults {
        let mut ok = EngineTestSuite::new(0, "Gain");
        ok.finalize(1);
        BatchResults::new(vec![ok, EngineTestSuite::creation_failed(1, "Broken")])
    }

    #[test]
    fn json_has_the_documented_top_level_keys() {
        let meta = ReportMeta::new("reference run", RunConfig::default());
        let text = render(&sample_results(), &meta).expect("render");
        let value: serde_json::Value = serde_json::from_str(&text).expect("parse");
        for key in [
            "testSuite",
            "version",
            "timestamp",
            "configuration",
            "summary",
            "engines",
        ] {
            assert!(value.get(key).is_some(), "missing key {key}");
        }
        assert_eq!(value["engines"].as_array().expect("array").len(), 2);
        assert_eq!(value["summary"]["creationFailures"], 1);
        assert_eq!(value["summary"]["exitCode"], 3);
    }

    #[test]
    fn write_round_trips_through_a_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("report.json");
        let meta = ReportMeta::new("run", RunConfig::default());
        write(&path, &sample_results(), &meta).expect("write");
        let text = std::fs::read_to_string(&path).expect("read");
        assert!(serde_json::from_str::<serde_json::Value>(&text).is_ok());
    }
}
