//! Batch execution over many engines.
//!
//! One engine's suite always runs on a single thread; parallelism is
//! across engines. Every engine gets a hard wall-clock timeout, enforced
//! by running its suite on a detached thread and abandoning it when the
//! deadline passes.

use crate::config::{RunConfig, ValidationLevel};
use crate::driver::EngineHandle;
use crate::profiler;
use crate::protocols::{self, generic};
use crate::result::{BatchResults, EngineTestSuite, TestCategory, TestResult};
use crate::sweep::{sweep_parameter, SweepResult};
use soundcheck_core::{EngineCategory, EngineFactory, HarnessError, Severity};
use soundcheck_metrics::level;
use soundcheck_signals::{SignalKind, StimulusCache};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::{Duration, Instant};

/// Batch progress, reported once per finished engine.
#[derive(Debug, Clone)]
pub struct Progress {
    /// Engines finished so far.
    pub completed: usize,
    /// Engines in the batch.
    pub total: usize,
    /// Name of the engine that just finished.
    pub engine_name: String,
}

impl Progress {
    /// Completion as a percentage.
    pub fn percent(&self) -> f32 {
        if self.total == 0 {
            100.0
        } else {
            self.completed as f32 / self.total as f32 * 100.0
        }
    }
}

/// Run the full suite for one engine. Never fails: every problem, from a
/// refused creation to a mid-battery panic, lands in the suite as a graded
/// result.
pub fn run_suite(
    factory: &dyn EngineFactory,
    id: u32,
    config: &RunConfig,
    stop: &AtomicBool,
) -> EngineTestSuite {
    let expected = config.level.expected_categories();
    let start = Instant::now();

    let mut handle = match EngineHandle::load(factory, id) {
        Ok(handle) => handle,
        Err(_) => {
            let name = factory.engine_name(id).unwrap_or("unknown").to_string();
            tracing::warn!(id, %name, "engine creation failed");
            let mut suite = EngineTestSuite::creation_failed(id, name);
            suite.finalize(expected);
            suite.total_test_time_secs = start.elapsed().as_secs_f32();
            return suite;
        }
    };
    let category = factory.category(id).unwrap_or(EngineCategory::Utility);
    tracing::info!(id, name = %handle.name(), category = category.name(), "testing engine");

    let mut suite = EngineTestSuite::new(id, handle.name());
    let mut cache = StimulusCache::new();

    suite.push_category(battery_or_failure(
        "generic",
        generic::run(&mut handle, category, config, &mut cache),
    ));

    if config.level != ValidationLevel::Basic && !stop.load(Ordering::Relaxed) {
        suite.push_category(battery_or_failure(
            "category",
            protocols::category_battery(&mut handle, category, config, &mut cache),
        ));

        if !stop.load(Ordering::Relaxed) {
            let profile = profiler::profile(&mut handle, config.sample_rate, config.block_size);
            suite.performance = profile.summary();
            let mut performance = TestCategory::new("performance");
            performance.push(profile.into_result());
            suite.push_category(performance);
        }
    }

    let sweeps = config.level == ValidationLevel::Comprehensive
        || config.level == ValidationLevel::Stress;
    if sweeps && !stop.load(Ordering::Relaxed) {
        suite.push_category(sweep_battery(&mut handle, config, &mut cache));
    }

    suite.total_test_time_secs = start.elapsed().as_secs_f32();
    suite.finalize(expected);
    suite
}

/// Sweep every declared parameter and grade each characterization.
fn sweep_battery(
    handle: &mut EngineHandle,
    config: &RunConfig,
    cache: &mut StimulusCache,
) -> TestCategory {
    let mut battery = TestCategory::new("sweep");
    let stimulus = match cache.get(SignalKind::Sine, config.sample_rate, 1.0, 0.5) {
        Ok(stimulus) => stimulus,
        Err(e) => {
            battery.push(TestResult::fail(
                "sweep_stimulus",
                Severity::Critical,
                format!("stimulus generation failed: {e}"),
            ));
            return battery;
        }
    };

    handle.prepare(f64::from(config.sample_rate), config.block_size);
    for index in 0..handle.num_parameters() {
        let result = sweep_parameter(
            handle,
            index,
            &stimulus,
            config.block_size,
            config.sweep_steps,
            level::rms,
        );
        battery.push(grade_sweep(&result));
    }
    if handle.num_parameters() == 0 {
        battery.push(TestResult::pass("sweep_none", "engine declares no parameters"));
    }
    battery
}

fn grade_sweep(sweep: &SweepResult) -> TestResult {
    let name = format!(
        "sweep_{}",
        sweep.parameter_name.to_ascii_lowercase().replace(' ', "_")
    );
    let values: Vec<f32> = sweep.measurements.iter().map(|&(_, m)| m).collect();

    if let Some(message) = &sweep.panicked {
        return TestResult::fail(
            &name,
            Severity::Critical,
            format!("engine panicked mid-sweep: {message}"),
        )
        .with_plot_data(values)
        .with_recommendation("guard buffer indexing and internal state in process()");
    }
    if let Some(value) = sweep.non_finite_at {
        return TestResult::fail(
            &name,
            Severity::Critical,
            format!("non-finite output at parameter value {value:.3}"),
        )
        .with_metric("non_finite_at", value)
        .with_plot_data(values)
        .with_recommendation("guard divisions and logs across the whole parameter range");
    }

    let result = if sweep.is_effective {
        TestResult::pass(
            &name,
            format!(
                "range {:.4}, monotonicity {:+.2}",
                sweep.total_range, sweep.monotonicity
            ),
        )
    } else {
        TestResult::fail(
            &name,
            Severity::Warning,
            "parameter has no audible effect on the output level",
        )
        .with_recommendation("remove the parameter or wire it into the signal path")
    };
    result
        .with_metric("total_range", sweep.total_range)
        .with_metric("monotonicity", sweep.monotonicity)
        .with_metric("smoothness", sweep.smoothness)
        .with_metric("linearity", sweep.linearity)
        .with_metric("sensitivity", sweep.sensitivity)
        .with_plot_data(values)
}

fn battery_or_failure(
    name: &str,
    outcome: Result<TestCategory, HarnessError>,
) -> TestCategory {
    match outcome {
        Ok(category) => category,
        Err(e) => {
            tracing::error!(battery = name, error = %e, "battery aborted");
            let mut category = TestCategory::new(name);
            category.push(TestResult::fail(
                "battery_aborted",
                Severity::Critical,
                format!("battery aborted: {e}"),
            ));
            category
        }
    }
}

/// Suite recorded for an engine whose thread blew the wall-clock budget.
/// The runaway thread is abandoned, not joined.
fn timed_out_suite(id: u32, name: &str, config: &RunConfig) -> EngineTestSuite {
    let mut suite = EngineTestSuite::new(id, name);
    let mut category = TestCategory::new("timeout");
    category.push(
        TestResult::fail(
            "timeout",
            Severity::Critical,
            format!("suite did not finish within {} s", config.timeout_secs),
        )
        .with_recommendation("look for a hang or unbounded loop in process()"),
    );
    suite.push_category(category);
    suite.total_test_time_secs = config.timeout_secs as f32;
    suite.finalize(config.level.expected_categories());
    suite
}

/// Run one engine's suite on a detached thread with a hard timeout.
fn run_suite_with_timeout(
    factory: &Arc<dyn EngineFactory + Send + Sync>,
    id: u32,
    config: &RunConfig,
    stop: &Arc<AtomicBool>,
) -> EngineTestSuite {
    let (tx, rx) = mpsc::channel();
    let thread_factory = Arc::clone(factory);
    let thread_config = config.clone();
    let thread_stop = Arc::clone(stop);
    std::thread::spawn(move || {
        let suite = run_suite(thread_factory.as_ref(), id, &thread_config, &thread_stop);
        let _ = tx.send(suite);
    });

    match rx.recv_timeout(Duration::from_secs(config.timeout_secs)) {
        Ok(suite) => suite,
        Err(_) => {
            let name = factory.engine_name(id).unwrap_or("unknown").to_string();
            tracing::error!(id, %name, timeout_secs = config.timeout_secs, "engine timed out");
            timed_out_suite(id, &name, config)
        }
    }
}

/// Run suites for `engine_ids`, sequentially or on a worker pool, calling
/// `on_progress` once per finished engine. A raised stop flag finishes the
/// engines already in flight and skips the rest.
pub fn run_batch(
    factory: &Arc<dyn EngineFactory + Send + Sync>,
    engine_ids: &[u32],
    config: &RunConfig,
    stop: &Arc<AtomicBool>,
    mut on_progress: impl FnMut(&Progress),
) -> BatchResults {
    let total = engine_ids.len();
    let workers = if config.parallel {
        config.worker_count().min(total.max(1))
    } else {
        1
    };
    tracing::info!(total, workers, level = %config.level, "starting batch");

    if workers <= 1 {
        let mut suites = Vec::with_capacity(total);
        for (i, &id) in engine_ids.iter().enumerate() {
            if stop.load(Ordering::Relaxed) {
                break;
            }
            let suite = run_suite_with_timeout(factory, id, config, stop);
            on_progress(&Progress {
                completed: i + 1,
                total,
                engine_name: suite.engine_name.clone(),
            });
            suites.push(suite);
        }
        return BatchResults::new(suites);
    }

    let jobs: Mutex<VecDeque<u32>> = Mutex::new(engine_ids.iter().copied().collect());
    let (tx, rx) = mpsc::channel::<EngineTestSuite>();
    let mut suites = Vec::with_capacity(total);

    std::thread::scope(|scope| {
        for _ in 0..workers {
            let tx = tx.clone();
            let jobs = &jobs;
            scope.spawn(move || {
                loop {
                    if stop.load(Ordering::Relaxed) {
                        return;
                    }
                    let id = {
                        let mut queue = match jobs.lock() {
                            Ok(queue) => queue,
                            Err(poisoned) => poisoned.into_inner(),
                        };
                        queue.pop_front()
                    };
                    let Some(id) = id else { return };
                    let suite = run_suite_with_timeout(factory, id, config, stop);
                    if tx.send(suite).is_err() {
                        return;
                    }
                }
            });
        }
        drop(tx);

        for suite in rx {
            on_progress(&Progress {
                completed: suites.len() + 1,
                total,
                engine_name: suite.engine_name.clone(),
            });
            suites.push(suite);
        }
    });

    BatchResults::new(suites)
}
