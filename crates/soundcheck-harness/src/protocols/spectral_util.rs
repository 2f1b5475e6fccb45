//! Battery shared by spectral processors, utilities, and generators.
//!
//! These categories have no single behavioral signature, so the battery
//! checks output integrity and stereo health rather than a specific
//! effect shape.

use crate::config::RunConfig;
use crate::driver::EngineHandle;
use crate::protocols::{panic_result, to_default_state};
use crate::result::{TestCategory, TestResult};
use soundcheck_core::{linear_to_db, AudioBlock, HarnessError, Severity};
use soundcheck_metrics::{level, AnomalyReport};
use soundcheck_signals::{SignalKind, StimulusCache};

/// Channels louder than this apart read as a broken pan.
const MAX_BALANCE_DB: f32 = 6.0;

pub fn run(
    handle: &mut EngineHandle,
    config: &RunConfig,
    cache: &mut StimulusCache,
) -> Result<TestCategory, HarnessError> {
    let mut battery = TestCategory::new("signal_quality");
    let output = stimulus_output(handle, config, cache)?;
    match output {
        Ok(output) => {
            battery.push(output_integrity(&output));
            battery.push(channel_balance(&output));
            battery.push(stereo_coherence(&output));
        }
        Err(result) => battery.push(result),
    }
    Ok(battery)
}

/// Generators run on silence; everything else gets broadband noise so the
/// whole band is exercised.
fn stimulus_output(
    handle: &mut EngineHandle,
    config: &RunConfig,
    cache: &mut StimulusCache,
) -> Result<Result<AudioBlock, TestResult>, HarnessError> {
    let kind = if handle.is_generator() {
        SignalKind::Silence
    } else {
        SignalKind::WhiteNoise
    };
    let stimulus = cache.get(kind, config.sample_rate, config.duration_secs, 0.5)?;

    handle.prepare(f64::from(config.sample_rate), config.block_size);
    to_default_state(handle);
    Ok(handle
        .process_blocks(&stimulus.block, config.block_size)
        .map_err(|panic| panic_result("output_integrity", &panic)))
}

/// Single-pass anomaly scan on a broadband stimulus.
fn output_integrity(output: &AudioBlock) -> TestResult {
    const NAME: &str = "output_integrity";
    let report = AnomalyReport::scan(output);
    match report.describe() {
        None => TestResult::pass(NAME, format!("clean output, peak {:.2}", report.peak))
            .with_metric("peak", report.peak),
        Some(problem) => {
            let severity = report.severity();
            TestResult::fail(NAME, severity, problem)
                .with_metric("peak", report.peak)
                .with_recommendation("scan the signal path for unguarded math on hot input")
        }
    }
}

/// Left/right RMS within 6 dB of each other.
fn channel_balance(output: &AudioBlock) -> TestResult {
    const NAME: &str = "channel_balance";
    if output.num_channels() < 2 {
        return TestResult::pass(NAME, "single-channel output");
    }
    let left_db = linear_to_db(level::rms_slice(output.channel(0)));
    let right_db = linear_to_db(level::rms_slice(output.channel(1)));
    let diff = (left_db - right_db).abs();
    if diff <= MAX_BALANCE_DB {
        TestResult::pass(NAME, format!("channel difference {diff:.2} dB"))
            .with_metric("balance_db", diff)
    } else {
        TestResult::fail(
            NAME,
            Severity::Warning,
            format!("channels differ by {diff:.1} dB"),
        )
        .with_metric("balance_db", diff)
        .with_recommendation("check per-channel gain staging")
    }
}

/// The correlation measurement itself must stay well defined.
fn stereo_coherence(output: &AudioBlock) -> TestResult {
    const NAME: &str = "stereo_coherence";
    let correlation = level::stereo_correlation(output);
    if correlation.is_finite() {
        TestResult::pass(NAME, format!("correlation {correlation:.3}"))
            .with_metric("correlation", correlation)
    } else {
        TestResult::fail(NAME, Severity::Error, "non-finite stereo correlation")
            .with_recommendation("look for NaN leakage into one channel")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use soundcheck_core::reference::{NoiseSource, StereoWidener};

    fn test_config() -> RunConfig {
        RunConfig {
            sample_rate: 48000.0,
            duration_secs: 0.5,
            ..RunConfig::default()
        }
    }

    #[test]
    fn widener_passes_signal_quality() {
        let mut handle = EngineHandle::from_engine(Box::new(StereoWidener::new()));
        let mut cache = StimulusCache::new();
        let battery = run(&mut handle, &test_config(), &mut cache).expect("battery");
        assert_eq!(battery.name, "signal_quality");
        assert!(battery.all_passed);
    }

    #[test]
    fn generator_is_fed_silence_and_still_measured() {
        let mut handle = EngineHandle::from_engine(Box::new(NoiseSource::new()));
        let mut cache = StimulusCache::new();
        let battery = run(&mut handle, &test_config(), &mut cache).expect("battery");
        let integrity = battery
            .results
            .iter()
            .find(|r| r.name == "output_integrity")
            .expect("integrity result");
        assert!(integrity.passed);
        assert!(integrity.metrics["peak"] > 0.0);
    }
}
