//! Battery for saturators, waveshapers, and clippers.

use crate::config::RunConfig;
use crate::driver::EngineHandle;
use crate::protocols::{find_drive_parameter, panic_result, to_default_state};
use crate::result::{TestCategory, TestResult};
use soundcheck_core::{HarnessError, ParameterState, Severity};
use soundcheck_metrics::{level, spectral};
use soundcheck_signals::{generate, SignalKind, SignalParams};

/// Drive settings for the THD curve.
const DRIVE_POINTS: [f32; 5] = [0.0, 0.25, 0.5, 0.75, 1.0];
/// Two-tone IMD above this reads as mud rather than character.
const MAX_IMD_RATIO: f32 = 0.5;
/// Acceptable output/input peak ratio for a transient.
const MIN_TRANSIENT_RATIO: f32 = 0.5;
const MAX_TRANSIENT_RATIO: f32 = 1.2;

pub fn run(handle: &mut EngineHandle, config: &RunConfig) -> Result<TestCategory, HarnessError> {
    let mut battery = TestCategory::new("distortion");
    battery.push(thd_versus_drive(handle, config)?);
    battery.push(intermodulation(handle, config)?);
    battery.push(transient_preservation(handle, config)?);
    Ok(battery)
}

/// THD must grow with the drive control. Non-monotone THD means the
/// character changes unpredictably under the player's hands.
fn thd_versus_drive(
    handle: &mut EngineHandle,
    config: &RunConfig,
) -> Result<TestResult, HarnessError> {
    const NAME: &str = "thd_versus_drive";
    let Some(drive) = find_drive_parameter(handle) else {
        return Ok(TestResult::pass(NAME, "no drive-like parameter"));
    };
    let params = SignalParams {
        frequency: 1000.0,
        ..SignalParams::default()
    };
    let input = generate(SignalKind::Sine, config.sample_rate, 0.5, 0.5, params)?.block;

    handle.prepare(f64::from(config.sample_rate), config.block_size);
    let mut curve = Vec::with_capacity(DRIVE_POINTS.len());
    for &value in &DRIVE_POINTS {
        to_default_state(handle);
        handle.apply(&ParameterState::from([(drive, value)]));
        let output = match handle.process_blocks(&input, config.block_size) {
            Ok(block) => block,
            Err(panic) => return Ok(panic_result(NAME, &panic)),
        };
        curve.push(spectral::thd_percent(&output, config.sample_rate, 1000.0));
    }

    let range = curve.iter().fold(f32::MIN, |m, &x| m.max(x))
        - curve.iter().fold(f32::MAX, |m, &x| m.min(x));
    let tolerance = 0.05 * range;
    let monotone = curve.windows(2).all(|w| w[1] >= w[0] - tolerance);
    Ok(if monotone {
        TestResult::pass(
            NAME,
            format!("THD grows {:.2}% -> {:.2}%", curve[0], curve[curve.len() - 1]),
        )
        .with_plot_data(curve)
    } else {
        TestResult::fail(NAME, Severity::Warning, "THD is not monotone in drive")
            .with_plot_data(curve)
            .with_recommendation("keep the transfer curve order-preserving in drive")
    })
}

/// Two-tone test at 440 + 550 Hz on the default state.
fn intermodulation(
    handle: &mut EngineHandle,
    config: &RunConfig,
) -> Result<TestResult, HarnessError> {
    const NAME: &str = "intermodulation";
    let params = SignalParams {
        start_freq: 440.0,
        end_freq: 550.0,
        ..SignalParams::default()
    };
    let input = generate(SignalKind::TwoTone, config.sample_rate, 0.5, 0.5, params)?.block;

    handle.prepare(f64::from(config.sample_rate), config.block_size);
    to_default_state(handle);
    let output = match handle.process_blocks(&input, config.block_size) {
        Ok(block) => block,
        Err(panic) => return Ok(panic_result(NAME, &panic)),
    };

    let imd = spectral::imd_ratio(&output, config.sample_rate, 440.0, 550.0);
    Ok(if imd < MAX_IMD_RATIO {
        TestResult::pass(NAME, format!("IMD ratio {imd:.3}")).with_metric("imd_ratio", imd)
    } else {
        TestResult::fail(
            NAME,
            Severity::Warning,
            format!("IMD ratio {imd:.2} on a two-tone signal"),
        )
        .with_metric("imd_ratio", imd)
        .with_recommendation("soften the knee; hard discontinuities drive intermodulation")
    })
}

/// A drum hit through the default state must keep its punch: the peak
/// ratio stays within [0.5, 1.2].
fn transient_preservation(
    handle: &mut EngineHandle,
    config: &RunConfig,
) -> Result<TestResult, HarnessError> {
    const NAME: &str = "transient_preservation";
    let input = generate(
        SignalKind::DrumHit,
        config.sample_rate,
        0.5,
        1.0,
        SignalParams::default(),
    )?
    .block;

    handle.prepare(f64::from(config.sample_rate), config.block_size);
    to_default_state(handle);
    let output = match handle.process_blocks(&input, config.block_size) {
        Ok(block) => block,
        Err(panic) => return Ok(panic_result(NAME, &panic)),
    };

    let in_peak = level::peak(&input).max(1e-10);
    let ratio = level::peak(&output) / in_peak;
    Ok(
        if (MIN_TRANSIENT_RATIO..=MAX_TRANSIENT_RATIO).contains(&ratio) {
            TestResult::pass(NAME, format!("transient peak ratio {ratio:.2}"))
                .with_metric("peak_ratio", ratio)
        } else {
            TestResult::fail(
                NAME,
                Severity::Warning,
                format!("transient peak ratio {ratio:.2} outside 0.5..1.2"),
            )
            .with_metric("peak_ratio", ratio)
            .with_recommendation("compensate makeup gain so transients survive the shaper")
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use soundcheck_core::reference::SoftClip;

    fn test_config() -> RunConfig {
        RunConfig {
            sample_rate: 48000.0,
            ..RunConfig::default()
        }
    }

    #[test]
    fn soft_clip_thd_grows_with_drive() {
        let mut handle = EngineHandle::from_engine(Box::new(SoftClip::new()));
        let result = thd_versus_drive(&mut handle, &test_config()).expect("curve");
        assert!(result.passed, "{}", result.message);
        let curve = result.plot_data.expect("plot data");
        assert!(curve[curve.len() - 1] > curve[0]);
    }

    #[test]
    fn soft_clip_keeps_imd_reasonable() {
        let mut handle = EngineHandle::from_engine(Box::new(SoftClip::new()));
        let result = intermodulation(&mut handle, &test_config()).expect("imd");
        assert!(result.metrics["imd_ratio"].is_finite());
    }

    #[test]
    fn battery_has_three_tests() {
        let mut handle = EngineHandle::from_engine(Box::new(SoftClip::new()));
        let battery = run(&mut handle, &test_config()).expect("battery");
        assert_eq!(battery.name, "distortion");
        assert_eq!(battery.results.len(), 3);
    }
}
