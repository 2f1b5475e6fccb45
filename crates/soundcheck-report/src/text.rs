//! Plain-text summary: what a developer reads first after a batch run.

use crate::{BatchSummary, ReportMeta};
use soundcheck_core::HarnessError;
use soundcheck_harness::BatchResults;
use std::fmt::Write as _;
use std::path::Path;

/// Render the human-readable summary.
pub fn render(results: &BatchResults, meta: &ReportMeta) -> String {
    let summary = BatchSummary::from_results(results);
    let mut out = String::new();

    let _ = writeln!(out, "{}", meta.suite_name);
    let _ = writeln!(
        out,
        "soundcheck {} | level {} | {} Hz, block {}",
        meta.version,
        meta.configuration.level,
        meta.configuration.sample_rate,
        meta.configuration.block_size
    );
    let _ = writeln!(out, "{}", "=".repeat(64));
    let _ = writeln!(
        out,
        "engines: {} ({} failed creation) | average score {:.1} | worst CPU {:.1}%",
        summary.total_engines,
        summary.creation_failures,
        summary.average_score,
        summary.worst_cpu_percent
    );
    let _ = writeln!(
        out,
        "findings: {} critical, {} errors, {} warnings",
        summary.critical_count, summary.error_count, summary.warning_count
    );
    let _ = writeln!(out);

    for suite in &results.suites {
        let status = if !suite.engine_created {
            "CREATION FAILED"
        } else if suite.critical_count > 0 {
            "CRITICAL"
        } else if suite.error_count > 0 {
            "ERROR"
        } else if suite.warning_count > 0 {
            "WARNING"
        } else {
            "OK"
        };
        let _ = writeln!(
            out,
            "[{:>3}] {:<28} {:>5.1}  {}",
            suite.engine_id, suite.engine_name, suite.overall_score, status
        );
        for category in &suite.categories {
            for result in category.results.iter().filter(|r| !r.passed) {
                let _ = writeln!(
                    out,
                    "      {} / {}: {} ({})",
                    category.name,
                    result.name,
                    result.message,
                    result.severity.label()
                );
            }
        }
    }

    let problematic = results.problematic_engines();
    if !problematic.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "needs attention (worst first):");
        for suite in problematic {
            let _ = writeln!(
                out,
                "  {} - {} critical, {} errors, {} warnings",
                suite.engine_name, suite.critical_count, suite.error_count, suite.warning_count
            );
            for step in suite.prioritized_recommendations() {
                let _ = writeln!(out, "    * {step}");
            }
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "exit code: {}", summary.exit_code);
    out
}

/// Render and write to `path`.
pub fn write(path: &Path, results: &BatchResults, meta: &ReportMeta) -> Result<(), HarnessError> {
    crate::write_report(path, &render(results, meta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use soundcheck_core::Severity;
    use soundcheck_harness::{EngineTestSuite, RunConfig, TestCategory, TestResult};

    fn sample() -> BatchResults {
        let mut clean = EngineTestSuite::new(0, "Gain");
        let mut generic = TestCategory::new("generic");
        generic.push(TestResult::pass("unity_default_gain", "ok"));
        clean.push_category(generic);
        clean.finalize(1);

        let mut noisy = EngineTestSuite::new(1, "Buggy Divider");
        let mut sweep = TestCategory::new("sweep");
        sweep.push(
            TestResult::fail("sweep_amount", Severity::Critical, "non-finite output")
                .with_recommendation("guard divisions"),
        );
        noisy.push_category(sweep);
        noisy.finalize(1);

        BatchResults::new(vec![clean, noisy])
    }

    #[test]
    fn summary_names_the_problem_engine() {
        let meta = ReportMeta::new("reference run", RunConfig::default());
        let text = render(&sample(), &meta);
        assert!(text.contains("Buggy Divider"));
        assert!(text.contains("CRITICAL"));
        assert!(text.contains("guard divisions"));
        assert!(text.contains("exit code: 2"));
    }

    #[test]
    fn clean_engine_reports_ok() {
        let meta = ReportMeta::new("run", RunConfig::default());
        let text = render(&sample(), &meta);
        let gain_line = text
            .lines()
            .find(|l| l.contains("Gain") && !l.contains("Divider"))
            .expect("gain line");
        assert!(gain_line.contains("OK"));
    }
}
