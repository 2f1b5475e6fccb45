//! The severity-graded result tree.
//!
//! `TestResult` -> `TestCategory` -> `EngineTestSuite` -> `BatchResults`,
//! with the scoring rollup applied at each level: a test scores 100 on
//! pass, 50 on WARNING, 25 on ERROR, 0 on CRITICAL; a category is the mean
//! of its tests; an engine is the mean over the categories its validation
//! level expects (a battery that never ran contributes 0).

use serde::Serialize;
use soundcheck_core::Severity;
use std::collections::BTreeMap;

/// Outcome of a single test. Constructed once, immutable afterwards.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    /// Test name, stable across runs.
    pub name: String,
    /// Whether the test met its contract.
    pub passed: bool,
    /// Graded severity; `Info` for passing tests.
    pub severity: Severity,
    /// One-line outcome.
    pub message: String,
    /// Longer free-form detail; may be empty.
    pub details: String,
    /// Ordered remediation steps for failing tests.
    pub recommendations: Vec<String>,
    /// Score in [0, 100] derived from the severity.
    pub score: f32,
    /// Named measured values.
    pub metrics: BTreeMap<String, f32>,
    /// Optional series for plotting (sweep curves, response traces).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plot_data: Option<Vec<f32>>,
}

impl TestResult {
    /// A passing result.
    pub fn pass(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            severity: Severity::Info,
            message: message.into(),
            details: String::new(),
            recommendations: Vec::new(),
            score: Severity::Info.score(),
            metrics: BTreeMap::new(),
            plot_data: None,
        }
    }

    /// A failing result at the given severity.
    pub fn fail(
        name: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            passed: false,
            severity,
            message: message.into(),
            details: String::new(),
            recommendations: Vec::new(),
            score: severity.score(),
            metrics: BTreeMap::new(),
            plot_data: None,
        }
    }

    /// Attach a named metric.
    #[must_use]
    pub fn with_metric(mut self, name: impl Into<String>, value: f32) -> Self {
        self.metrics.insert(name.into(), value);
        self
    }

    /// Attach a remediation step.
    #[must_use]
    pub fn with_recommendation(mut self, step: impl Into<String>) -> Self {
        self.recommendations.push(step.into());
        self
    }

    /// Attach free-form detail text.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = details.into();
        self
    }

    /// Attach a plottable series.
    #[must_use]
    pub fn with_plot_data(mut self, data: Vec<f32>) -> Self {
        self.plot_data = Some(data);
        self
    }
}

/// A named group of test results.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCategory {
    /// Battery name ("generic", "dynamics", "sweep", "performance", ...).
    pub name: String,
    /// Member results in execution order.
    pub results: Vec<TestResult>,
    /// Mean of member scores; 0 when empty.
    pub aggregate_score: f32,
    /// Conjunction of member `passed` flags.
    pub all_passed: bool,
}

impl TestCategory {
    /// Create an empty category.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            results: Vec::new(),
            aggregate_score: 0.0,
            all_passed: true,
        }
    }

    /// Move a result in and recompute the aggregates.
    pub fn push(&mut self, result: TestResult) {
        self.all_passed &= result.passed;
        self.results.push(result);
        self.aggregate_score =
            self.results.iter().map(|r| r.score).sum::<f32>() / self.results.len() as f32;
    }

    /// Worst severity among members; `Info` when empty or all passing.
    pub fn worst_severity(&self) -> Severity {
        self.results
            .iter()
            .map(|r| r.severity)
            .max()
            .unwrap_or(Severity::Info)
    }
}

/// CPU and latency summary from the profiler.
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSummary {
    /// Mean per-block CPU use, percent of the block's audio duration.
    pub avg_cpu_percent: f32,
    /// Worst per-block CPU use, percent.
    pub max_cpu_percent: f32,
    /// Mean per-block processing time in milliseconds.
    pub avg_latency_ms: f32,
    /// Worst per-block processing time in milliseconds.
    pub max_latency_ms: f32,
}

/// Every result for one engine.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineTestSuite {
    /// Factory id of the engine.
    pub engine_id: u32,
    /// Display name (from the factory if creation failed).
    pub engine_name: String,
    /// False when the factory returned nothing; all tests are then skipped.
    pub engine_created: bool,
    /// One category per battery that ran.
    pub categories: Vec<TestCategory>,
    /// Mean of category scores over the expected category count.
    pub overall_score: f32,
    /// True when every test in every category passed.
    pub all_tests_passed: bool,
    /// Wall time of the whole suite, seconds.
    pub total_test_time_secs: f32,
    /// CPU/latency summary; zeros when the profiler never ran.
    pub performance: PerformanceSummary,
    /// Number of CRITICAL findings.
    pub critical_count: usize,
    /// Number of ERROR findings.
    pub error_count: usize,
    /// Number of WARNING findings.
    pub warning_count: usize,
}

impl EngineTestSuite {
    /// Start an empty suite for an engine that was successfully created.
    pub fn new(engine_id: u32, engine_name: impl Into<String>) -> Self {
        Self {
            engine_id,
            engine_name: engine_name.into(),
            engine_created: true,
            categories: Vec::new(),
            overall_score: 0.0,
            all_tests_passed: true,
            total_test_time_secs: 0.0,
            performance: PerformanceSummary::default(),
            critical_count: 0,
            error_count: 0,
            warning_count: 0,
        }
    }

    /// Suite for an engine the factory could not create: one CRITICAL
    /// result, everything else skipped.
    pub fn creation_failed(engine_id: u32, engine_name: impl Into<String>) -> Self {
        let mut suite = Self::new(engine_id, engine_name);
        suite.engine_created = false;
        let mut category = TestCategory::new("creation");
        category.push(
            TestResult::fail(
                "engine_creation",
                Severity::Critical,
                "factory returned no engine; all tests skipped",
            )
            .with_recommendation("check the engine id and factory registration"),
        );
        suite.push_category(category);
        suite
    }

    /// Move a completed category in and refresh the issue counts.
    pub fn push_category(&mut self, category: TestCategory) {
        self.all_tests_passed &= category.all_passed;
        for result in &category.results {
            match result.severity {
                Severity::Critical => self.critical_count += 1,
                Severity::Error => self.error_count += 1,
                Severity::Warning => self.warning_count += 1,
                Severity::Info => {}
            }
        }
        self.categories.push(category);
    }

    /// Compute the overall score against the number of categories the
    /// validation level expects. Missing categories count as zero.
    pub fn finalize(&mut self, expected_categories: usize) {
        let denominator = expected_categories.max(self.categories.len()).max(1);
        self.overall_score = self
            .categories
            .iter()
            .map(|c| c.aggregate_score)
            .sum::<f32>()
            / denominator as f32;
    }

    /// Worst severity across all categories.
    pub fn worst_severity(&self) -> Severity {
        self.categories
            .iter()
            .map(TestCategory::worst_severity)
            .max()
            .unwrap_or(Severity::Info)
    }

    /// All recommendations from failing tests, CRITICAL findings first.
    pub fn prioritized_recommendations(&self) -> Vec<String> {
        let mut out = Vec::new();
        for severity in [
            Severity::Critical,
            Severity::Error,
            Severity::Warning,
        ] {
            for category in &self.categories {
                for result in &category.results {
                    if result.severity == severity {
                        for step in &result.recommendations {
                            if !out.contains(step) {
                                out.push(step.clone());
                            }
                        }
                    }
                }
            }
        }
        out
    }

    fn severity_rank(&self) -> (usize, usize, usize) {
        (self.critical_count, self.error_count, self.warning_count)
    }
}

/// All suites from one batch run, ordered by engine id.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResults {
    /// Per-engine suites sorted by id.
    pub suites: Vec<EngineTestSuite>,
}

impl BatchResults {
    /// Collect suites and sort deterministically by engine id.
    pub fn new(mut suites: Vec<EngineTestSuite>) -> Self {
        suites.sort_by_key(|s| s.engine_id);
        Self { suites }
    }

    /// Engines whose factory creation failed.
    pub fn creation_failures(&self) -> usize {
        self.suites.iter().filter(|s| !s.engine_created).count()
    }

    /// Mean overall score, excluding engines that failed creation.
    pub fn average_score(&self) -> f32 {
        let created: Vec<_> = self.suites.iter().filter(|s| s.engine_created).collect();
        if created.is_empty() {
            return 0.0;
        }
        created.iter().map(|s| s.overall_score).sum::<f32>() / created.len() as f32
    }

    /// Worst per-block CPU percentage seen anywhere in the batch.
    pub fn worst_cpu_percent(&self) -> f32 {
        self.suites
            .iter()
            .map(|s| s.performance.max_cpu_percent)
            .fold(0.0, f32::max)
    }

    /// Engines with at least one non-INFO finding, ranked worst first:
    /// by severity counts descending, then by overall score ascending.
    pub fn problematic_engines(&self) -> Vec<&EngineTestSuite> {
        let mut list: Vec<&EngineTestSuite> = self
            .suites
            .iter()
            .filter(|s| s.critical_count + s.error_count + s.warning_count > 0)
            .collect();
        list.sort_by(|a, b| {
            b.severity_rank()
                .cmp(&a.severity_rank())
                .then(a.overall_score.total_cmp(&b.overall_score))
        });
        list
    }

    /// Process exit code for the batch: 3 when any engine failed creation,
    /// 2 on any CRITICAL, 1 on any ERROR, 0 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.creation_failures() > 0 {
            return 3;
        }
        if self.suites.iter().any(|s| s.critical_count > 0) {
            return 2;
        }
        if self.suites.iter().any(|s| s.error_count > 0) {
            return 1;
        }
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category_with(scores: &[Severity]) -> TestCategory {
        let mut category = TestCategory::new("test");
        for (i, &severity) in scores.iter().enumerate() {
            let result = if severity == Severity::Info {
                TestResult::pass(format!("t{i}"), "ok")
            } else {
                TestResult::fail(format!("t{i}"), severity, "bad")
            };
            category.push(result);
        }
        category
    }

    #[test]
    fn category_aggregates_mean_score() {
        let category = category_with(&[Severity::Info, Severity::Warning]);
        assert_eq!(category.aggregate_score, 75.0);
        assert!(!category.all_passed);
    }

    #[test]
    fn empty_category_scores_zero() {
        let category = TestCategory::new("empty");
        assert_eq!(category.aggregate_score, 0.0);
        assert!(category.all_passed);
    }

    #[test]
    fn suite_counts_issues() {
        let mut suite = EngineTestSuite::new(1, "A");
        suite.push_category(category_with(&[
            Severity::Critical,
            Severity::Error,
            Severity::Error,
            Severity::Warning,
            Severity::Info,
        ]));
        assert_eq!(suite.critical_count, 1);
        assert_eq!(suite.error_count, 2);
        assert_eq!(suite.warning_count, 1);
        assert!(!suite.all_tests_passed);
    }

    #[test]
    fn missing_categories_pull_the_score_down() {
        let mut suite = EngineTestSuite::new(1, "A");
        suite.push_category(category_with(&[Severity::Info]));
        suite.finalize(4);
        assert_eq!(suite.overall_score, 25.0);
    }

    #[test]
    fn creation_failure_is_critical_and_scores_zero() {
        let mut suite = EngineTestSuite::creation_failed(9, "Broken");
        suite.finalize(3);
        assert!(!suite.engine_created);
        assert_eq!(suite.critical_count, 1);
        assert_eq!(suite.overall_score, 0.0);
    }

    #[test]
    fn recommendations_are_prioritized_by_severity() {
        let mut suite = EngineTestSuite::new(1, "A");
        let mut category = TestCategory::new("c");
        category.push(
            TestResult::fail("warn", Severity::Warning, "w").with_recommendation("fix warning"),
        );
        category.push(
            TestResult::fail("crit", Severity::Critical, "c").with_recommendation("fix critical"),
        );
        suite.push_category(category);
        let recs = suite.prioritized_recommendations();
        assert_eq!(recs, vec!["fix critical".to_string(), "fix warning".to_string()]);
    }

    #[test]
    fn batch_sorts_by_engine_id() {
        let batch = BatchResults::new(vec![
            EngineTestSuite::new(3, "C"),
            EngineTestSuite::new(1, "A"),
        ]);
        assert_eq!(batch.suites[0].engine_id, 1);
    }

    #[test]
    fn batch_average_excludes_creation_failures() {
        let mut ok = EngineTestSuite::new(1, "A");
        ok.push_category(category_with(&[Severity::Info]));
        ok.finalize(1);
        let mut broken = EngineTestSuite::creation_failed(2, "B");
        broken.finalize(1);
        let batch = BatchResults::new(vec![ok, broken]);
        assert_eq!(batch.average_score(), 100.0);
    }

    #[test]
    fn problematic_ranking_is_worst_first() {
        let mut bad = EngineTestSuite::new(1, "bad");
        bad.push_category(category_with(&[Severity::Critical]));
        bad.finalize(1);
        let mut meh = EngineTestSuite::new(2, "meh");
        meh.push_category(category_with(&[Severity::Warning, Severity::Info]));
        meh.finalize(1);
        let mut fine = EngineTestSuite::new(3, "fine");
        fine.push_category(category_with(&[Severity::Info]));
        fine.finalize(1);

        let batch = BatchResults::new(vec![fine, meh, bad]);
        let ranked = batch.problematic_engines();
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].engine_id, 1);
        assert_eq!(ranked[1].engine_id, 2);
    }

    #[test]
    fn exit_codes_follow_the_ladder() {
        let clean = BatchResults::new(vec![EngineTestSuite::new(1, "A")]);
        assert_eq!(clean.exit_code(), 0);

        let mut warned = EngineTestSuite::new(1, "A");
        warned.push_category(category_with(&[Severity::Warning]));
        assert_eq!(BatchResults::new(vec![warned]).exit_code(), 0);

        let mut errored = EngineTestSuite::new(1, "A");
        errored.push_category(category_with(&[Severity::Error]));
        assert_eq!(BatchResults::new(vec![errored]).exit_code(), 1);

        let mut critical = EngineTestSuite::new(1, "A");
        critical.push_category(category_with(&[Severity::Critical]));
        assert_eq!(BatchResults::new(vec![critical]).exit_code(), 2);

        let broken = BatchResults::new(vec![EngineTestSuite::creation_failed(1, "A")]);
        assert_eq!(broken.exit_code(), 3);
    }
}
