//! Battery for compressors, limiters, gates, and expanders.

use crate::config::RunConfig;
use crate::driver::EngineHandle;
use crate::protocols::{panic_result, to_default_state};
use crate::result::{TestCategory, TestResult};
use soundcheck_core::{db_to_linear, linear_to_db, HarnessError, Severity};
use soundcheck_metrics::{level, spectral, timing};
use soundcheck_signals::{generate, SignalKind, SignalParams};

/// Input levels for the gain-reduction curve, in dBFS.
const CURVE_LEVELS_DB: [f32; 13] = [
    -60.0, -55.0, -50.0, -45.0, -40.0, -35.0, -30.0, -25.0, -20.0, -15.0, -10.0, -5.0, 0.0,
];
/// THD above this on a hot sine counts as audible compression artifacts.
const MAX_HOT_THD_PERCENT: f32 = 5.0;

pub fn run(handle: &mut EngineHandle, config: &RunConfig) -> Result<TestCategory, HarnessError> {
    let mut battery = TestCategory::new("dynamics");
    battery.push(gain_reduction_curve(handle, config)?);
    battery.push(envelope_response(handle, config)?);
    battery.push(hot_signal_distortion(handle, config)?);
    Ok(battery)
}

/// Static transfer curve: output level versus input level over -60..0 dBFS.
/// A dynamics processor must never expand the level ordering; the curve has
/// to be non-decreasing in input level.
fn gain_reduction_curve(
    handle: &mut EngineHandle,
    config: &RunConfig,
) -> Result<TestResult, HarnessError> {
    const NAME: &str = "gain_reduction_curve";
    let params = SignalParams {
        frequency: 1000.0,
        ..SignalParams::default()
    };
    handle.prepare(f64::from(config.sample_rate), config.block_size);

    let mut output_db = Vec::with_capacity(CURVE_LEVELS_DB.len());
    for &level_db in &CURVE_LEVELS_DB {
        let input = generate(
            SignalKind::Sine,
            config.sample_rate,
            0.5,
            db_to_linear(level_db),
            params,
        )?
        .block;
        to_default_state(handle);
        let output = match handle.process_blocks(&input, config.block_size) {
            Ok(block) => block,
            Err(panic) => return Ok(panic_result(NAME, &panic)),
        };
        // Skip the first half: the envelope needs to settle.
        let ch = output.channel(0);
        output_db.push(linear_to_db(level::rms_slice(&ch[ch.len() / 2..])));
    }

    // Gain reduction at the top of the curve, relative to the quietest
    // measurement's gain.
    let low_gain = output_db[0] - CURVE_LEVELS_DB[0];
    let high_gain = output_db[CURVE_LEVELS_DB.len() - 1] - CURVE_LEVELS_DB[CURVE_LEVELS_DB.len() - 1];
    let reduction_db = low_gain - high_gain;

    let monotone = output_db.windows(2).all(|w| w[1] >= w[0] - 0.5);
    Ok(if !monotone {
        TestResult::fail(
            NAME,
            Severity::Error,
            "output level is not monotone in input level",
        )
        .with_plot_data(output_db)
        .with_recommendation("check the detector for level-dependent sign errors")
    } else if reduction_db <= 0.5 {
        TestResult::fail(
            NAME,
            Severity::Warning,
            "no gain reduction measured over -60..0 dBFS",
        )
        .with_metric("reduction_db", reduction_db)
        .with_plot_data(output_db)
        .with_recommendation("verify the threshold maps into the tested range")
    } else {
        TestResult::pass(NAME, format!("{reduction_db:.1} dB reduction at 0 dBFS"))
            .with_metric("reduction_db", reduction_db)
            .with_plot_data(output_db)
    })
}

/// Attack and release measured on a gated tone burst.
fn envelope_response(
    handle: &mut EngineHandle,
    config: &RunConfig,
) -> Result<TestResult, HarnessError> {
    const NAME: &str = "envelope_response";
    let params = SignalParams {
        frequency: 1000.0,
        step_time: 0.25,
        ..SignalParams::default()
    };
    let input = generate(SignalKind::Burst, config.sample_rate, 1.0, 0.9, params)?.block;

    handle.prepare(f64::from(config.sample_rate), config.block_size);
    to_default_state(handle);
    let output = match handle.process_blocks(&input, config.block_size) {
        Ok(block) => block,
        Err(panic) => return Ok(panic_result(NAME, &panic)),
    };

    let timing = timing::envelope_timing(&output, config.sample_rate);
    Ok(if level::rms(&output) < 1e-6 {
        TestResult::fail(NAME, Severity::Warning, "burst produced no output")
            .with_recommendation("check the gate threshold against a 0.9 amplitude burst")
    } else {
        TestResult::pass(
            NAME,
            format!(
                "attack {:.1} ms, release {:.1} ms",
                timing.attack_ms, timing.release_ms
            ),
        )
        .with_metric("attack_ms", timing.attack_ms)
        .with_metric("release_ms", timing.release_ms)
    })
}

/// THD on a 0.9 amplitude sine. Fast envelopes ripple at the signal rate
/// and show up as harmonic distortion.
fn hot_signal_distortion(
    handle: &mut EngineHandle,
    config: &RunConfig,
) -> Result<TestResult, HarnessError> {
    const NAME: &str = "hot_signal_distortion";
    let params = SignalParams {
        frequency: 1000.0,
        ..SignalParams::default()
    };
    let input = generate(SignalKind::Sine, config.sample_rate, 1.0, 0.9, params)?.block;

    handle.prepare(f64::from(config.sample_rate), config.block_size);
    to_default_state(handle);
    let output = match handle.process_blocks(&input, config.block_size) {
        Ok(block) => block,
        Err(panic) => return Ok(panic_result(NAME, &panic)),
    };

    let thd = spectral::thd_percent(&output, config.sample_rate, 1000.0);
    Ok(if thd > MAX_HOT_THD_PERCENT {
        TestResult::fail(
            NAME,
            Severity::Warning,
            format!("{thd:.2}% THD on a hot sine"),
        )
        .with_metric("thd_percent", thd)
        .with_recommendation("slow the detector or smooth the gain signal")
    } else {
        TestResult::pass(NAME, format!("{thd:.2}% THD on a hot sine")).with_metric("thd_percent", thd)
    })
}
