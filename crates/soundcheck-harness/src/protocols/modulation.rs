//! Battery for tremolos, chorus, phasers, and other LFO-driven engines.

use crate::config::RunConfig;
use crate::driver::EngineHandle;
use crate::protocols::{panic_result, to_default_state};
use crate::result::{TestCategory, TestResult};
use soundcheck_core::{AudioBlock, HarnessError, Severity};
use soundcheck_metrics::{level, modulation};
use soundcheck_signals::{generate, SignalKind, SignalParams};

/// Plausible LFO rate window in Hz.
const MIN_RATE_HZ: f32 = 0.1;
const MAX_RATE_HZ: f32 = 20.0;
/// Modulation shallower than this is inaudible.
const MIN_DEPTH: f32 = 0.05;

pub fn run(handle: &mut EngineHandle, config: &RunConfig) -> Result<TestCategory, HarnessError> {
    let mut battery = TestCategory::new("modulation");
    let output = sustained_output(handle, config)?;
    match output {
        Ok(output) => {
            battery.push(modulation_rate_and_depth(&output, config.sample_rate));
            battery.push(stereo_movement(&output));
        }
        Err(result) => battery.push(result),
    }
    Ok(battery)
}

/// A steady tone long enough to resolve sub-hertz LFO rates.
fn sustained_output(
    handle: &mut EngineHandle,
    config: &RunConfig,
) -> Result<Result<AudioBlock, TestResult>, HarnessError> {
    let params = SignalParams {
        frequency: 440.0,
        ..SignalParams::default()
    };
    // Three seconds resolves a 1 Hz LFO with margin in the
    // autocorrelation window.
    let seconds = config.duration_secs.max(3.0);
    let input = generate(SignalKind::Sine, config.sample_rate, seconds, 0.5, params)?.block;

    handle.prepare(f64::from(config.sample_rate), config.block_size);
    to_default_state(handle);
    Ok(handle
        .process_blocks(&input, config.block_size)
        .map_err(|panic| panic_result("modulation_rate", &panic)))
}

/// The LFO must land in the audible-movement window and actually move the
/// amplitude.
fn modulation_rate_and_depth(output: &AudioBlock, sample_rate: f32) -> TestResult {
    const NAME: &str = "modulation_rate";
    let profile = modulation::modulation_profile(output, sample_rate);

    let rate_ok = profile.rate_hz > MIN_RATE_HZ && profile.rate_hz <= MAX_RATE_HZ;
    let depth_ok = profile.depth >= MIN_DEPTH;
    if rate_ok && depth_ok {
        TestResult::pass(
            NAME,
            format!("{:.2} Hz at depth {:.2}", profile.rate_hz, profile.depth),
        )
        .with_metric("rate_hz", profile.rate_hz)
        .with_metric("depth", profile.depth)
    } else if !depth_ok {
        TestResult::fail(
            NAME,
            Severity::Warning,
            format!("modulation depth {:.3} is inaudible", profile.depth),
        )
        .with_metric("rate_hz", profile.rate_hz)
        .with_metric("depth", profile.depth)
        .with_recommendation("raise the default depth above 5%")
    } else {
        TestResult::fail(
            NAME,
            Severity::Warning,
            format!("no LFO rate detected in 0.1..20 Hz (got {:.2} Hz)", profile.rate_hz),
        )
        .with_metric("rate_hz", profile.rate_hz)
        .with_metric("depth", profile.depth)
        .with_recommendation("map the default rate into the audible-movement range")
    }
}

/// Channel decorrelation: an LFO phase offset between channels is what
/// makes modulation read as movement in the stereo field.
fn stereo_movement(output: &AudioBlock) -> TestResult {
    const NAME: &str = "stereo_movement";
    let correlation = level::stereo_correlation(output);
    if !correlation.is_finite() {
        return TestResult::fail(NAME, Severity::Error, "non-finite stereo correlation");
    }
    if correlation < 0.999 {
        TestResult::pass(NAME, format!("channel correlation {correlation:.4}"))
            .with_metric("correlation", correlation)
    } else {
        TestResult::fail(
            NAME,
            Severity::Warning,
            "channels are fully correlated; the modulation is mono",
        )
        .with_metric("correlation", correlation)
        .with_recommendation("offset the LFO phase between channels")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use soundcheck_core::reference::{Gain, Tremolo};

    fn test_config() -> RunConfig {
        RunConfig {
            sample_rate: 48000.0,
            ..RunConfig::default()
        }
    }

    #[test]
    fn tremolo_battery_passes() {
        let mut handle = EngineHandle::from_engine(Box::new(Tremolo::new()));
        let battery = run(&mut handle, &test_config()).expect("battery");
        assert_eq!(battery.results.len(), 2);
        assert!(
            battery.all_passed,
            "unexpected failures: {:?}",
            battery
                .results
                .iter()
                .filter(|r| !r.passed)
                .map(|r| &r.message)
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn static_gain_shows_no_modulation() {
        let mut handle = EngineHandle::from_engine(Box::new(Gain::new()));
        let battery = run(&mut handle, &test_config()).expect("battery");
        let rate = battery
            .results
            .iter()
            .find(|r| r.name == "modulation_rate")
            .expect("rate result");
        assert!(!rate.passed);
        assert_eq!(rate.severity, Severity::Warning);
    }
}
