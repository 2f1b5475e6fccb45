//! CSV report: one row per engine with a fixed column set, so runs can be
//! diffed and pivoted in a spreadsheet without schema surprises.

use crate::ReportMeta;
use soundcheck_core::HarnessError;
use soundcheck_harness::{BatchResults, EngineTestSuite};
use std::fmt::Write as _;
use std::path::Path;

/// Fixed header; category score columns stay present (empty) when a
/// battery did not run.
const HEADER: &str = "engine_id,engine_name,created,overall_score,\
generic_score,category_score,performance_score,sweep_score,\
critical,errors,warnings,\
avg_cpu_percent,max_cpu_percent,avg_latency_ms,max_latency_ms,duration_secs";

/// Render the batch as CSV.
pub fn render(results: &BatchResults, _meta: &ReportMeta) -> String {
    let mut out = String::with_capacity(256 + results.suites.len() * 128);
    out.push_str(HEADER);
    out.push('\n');
    for suite in &results.suites {
        let _ = writeln!(out, "{}", row(suite));
    }
    out
}

fn row(suite: &EngineTestSuite) -> String {
    let category_score = |name: &str| -> String {
        suite
            .categories
            .iter()
            .find(|c| c.name == name)
            .map_or(String::new(), |c| format!("{:.1}", c.aggregate_score))
    };
    format!(
        "{},{},{},{:.1},{},{},{},{},{},{},{},{:.2},{:.2},{:.3},{:.3},{:.2}",
        suite.engine_id,
        quote(&suite.engine_name),
        suite.engine_created,
        suite.overall_score,
        category_score("generic"),
        category_score("category"),
        category_score("performance"),
        category_score("sweep"),
        suite.critical_count,
        suite.error_count,
        suite.warning_count,
        suite.performance.avg_cpu_percent,
        suite.performance.max_cpu_percent,
        suite.performance.avg_latency_ms,
        suite.performance.max_latency_ms,
        suite.total_test_time_secs,
    )
}

/// Quote a field when it contains a comma, quote, or newline.
fn quote(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Render and write to `path`.
pub fn write(path: &Path, results: &BatchResults, meta: &ReportMeta) -> Result<(), HarnessError> {
    crate::write_report(path, &render(results, meta))
}
