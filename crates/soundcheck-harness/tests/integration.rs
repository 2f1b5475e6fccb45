//! End-to-end checks with known-answer signals and the reference engines.

use soundcheck_core::reference::ReferenceFactory;
use soundcheck_core::EngineFactory;
use soundcheck_harness::{run_batch, run_suite, EngineHandle, RunConfig, ValidationLevel};
use soundcheck_metrics::{level, spectral, timing};
use soundcheck_signals::{generate, SignalKind, SignalParams};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

const GAIN_ID: u32 = 0;
const HALF_GAIN_ID: u32 = 1;
const LOW_PASS_ID: u32 = 2;
const BUGGY_DIVIDER_ID: u32 = 9;

fn config(level: ValidationLevel) -> RunConfig {
    RunConfig {
        sample_rate: 48000.0,
        duration_secs: 0.5,
        level,
        parallel: false,
        ..RunConfig::default()
    }
}

#[test]
fn sine_stimulus_measures_as_expected() {
    let params = SignalParams {
        frequency: 440.0,
        ..SignalParams::default()
    };
    let stimulus = generate(SignalKind::Sine, 48000.0, 1.0, 0.5, params).expect("generate");

    let rms = level::rms(&stimulus.block);
    assert!(
        (rms - 0.3536).abs() < 0.002,
        "0.5 amplitude sine should have RMS ~0.3536, got {rms}"
    );

    let freq = spectral::peak_frequency(&stimulus.block, 48000.0);
    assert!((freq - 440.0).abs() < 2.0, "peak frequency {freq}");

    let thd = spectral::thd_percent(&stimulus.block, 48000.0, 440.0);
    assert!(thd < 0.1, "pure sine THD should be near zero, got {thd}%");
}

#[test]
fn pass_through_impulse_has_no_delay_and_no_tail() {
    let factory = ReferenceFactory::new();
    let mut handle = EngineHandle::load(&factory, HALF_GAIN_ID).expect("load");
    handle.prepare(48000.0, 512);

    let impulse = generate(
        SignalKind::Impulse,
        48000.0,
        0.5,
        1.0,
        SignalParams::default(),
    )
    .expect("generate");
    let output = handle.process_blocks(&impulse.block, 512).expect("process");

    assert_eq!(timing::delay_ms(&impulse.block, &output, 48000.0), 0.0);
    assert_eq!(timing::rt60_seconds(&output, 48000.0), 0.0);
}

#[test]
fn low_pass_attenuates_the_top_of_the_band() {
    let factory = ReferenceFactory::new();
    let mut handle = EngineHandle::load(&factory, LOW_PASS_ID).expect("load");
    handle.prepare(48000.0, 512);
    let defaults = handle.default_parameters();
    handle.apply(&defaults);

    let impulse = generate(
        SignalKind::Impulse,
        48000.0,
        0.5,
        1.0,
        SignalParams::default(),
    )
    .expect("generate");
    let output = handle.process_blocks(&impulse.block, 512).expect("process");

    let response = spectral::frequency_response(&output, 48000.0);
    let low = response.magnitude_at(100.0);
    let high = response.magnitude_at(20000.0);
    assert!(
        low - high > 20.0,
        "expected > 20 dB attenuation at 20 kHz, got {:.1} dB",
        low - high
    );
}

#[test]
fn half_gain_suite_flags_unity_and_passes_silence() {
    let factory = ReferenceFactory::new();
    let stop = AtomicBool::new(false);
    let suite = run_suite(&factory, HALF_GAIN_ID, &config(ValidationLevel::Standard), &stop);

    let generic = suite
        .categories
        .iter()
        .find(|c| c.name == "generic")
        .expect("generic battery");
    let unity = generic
        .results
        .iter()
        .find(|r| r.name == "unity_default_gain")
        .expect("unity result");
    assert!(!unity.passed);
    let gain = unity.metrics["gain_change_db"];
    assert!((gain + 6.02).abs() < 0.1, "expected -6.02 dB, got {gain}");

    let silence = generic
        .results
        .iter()
        .find(|r| r.name == "silence_in_silence_out")
        .expect("silence result");
    assert!(silence.passed);
}

#[test]
fn gain_sweep_characterizes_a_linear_parameter() {
    let factory = ReferenceFactory::new();
    let stop = AtomicBool::new(false);
    let suite = run_suite(&factory, GAIN_ID, &config(ValidationLevel::Comprehensive), &stop);

    let sweep = suite
        .categories
        .iter()
        .find(|c| c.name == "sweep")
        .expect("sweep category");
    let result = &sweep.results[0];
    assert!(result.passed, "{}", result.message);
    assert_eq!(result.metrics["monotonicity"], 1.0);
    assert!(result.metrics["linearity"] > 0.99);
    assert!(result.metrics["sensitivity"] > 0.99);
}

#[test]
fn divider_bug_is_critical_and_sets_the_exit_code() {
    let factory: Arc<dyn EngineFactory + Send + Sync> = Arc::new(ReferenceFactory::new());
    let stop = Arc::new(AtomicBool::new(false));
    // 21 steps place a sweep point exactly on the singular value 0.5.
    let batch_config = RunConfig {
        sweep_steps: 21,
        ..config(ValidationLevel::Comprehensive)
    };
    let results = run_batch(&factory, &[BUGGY_DIVIDER_ID], &batch_config, &stop, |_| {});

    let suite = &results.suites[0];
    assert!(suite.critical_count >= 1, "divider must be flagged CRITICAL");
    let sweep = suite
        .categories
        .iter()
        .find(|c| c.name == "sweep")
        .expect("sweep category");
    let result = &sweep.results[0];
    assert!(!result.passed);
    assert!((result.metrics["non_finite_at"] - 0.5).abs() < 1e-6);
    assert_eq!(results.exit_code(), 2);
}

#[test]
fn full_reference_batch_has_deterministic_shape() {
    let factory: Arc<dyn EngineFactory + Send + Sync> = Arc::new(ReferenceFactory::new());
    let ids = factory.engine_ids();
    let stop = Arc::new(AtomicBool::new(false));
    let mut progress = 0usize;
    let results = run_batch(&factory, &ids, &config(ValidationLevel::Basic), &stop, |_| {
        progress += 1;
    });

    assert_eq!(results.suites.len(), ids.len());
    assert_eq!(progress, ids.len());
    assert_eq!(results.creation_failures(), 0);
    for suite in &results.suites {
        assert!(suite.engine_created);
        assert!(!suite.categories.is_empty());
    }
}
