//! Battery for filters and EQs.

use crate::config::RunConfig;
use crate::driver::EngineHandle;
use crate::protocols::{panic_result, to_default_state};
use crate::result::{TestCategory, TestResult};
use soundcheck_core::{AudioBlock, HarnessError, ParameterState, Severity};
use soundcheck_metrics::{level, spectral};
use soundcheck_signals::{generate, SignalKind, SignalParams};
use std::f32::consts::TAU;

/// Band inspected for frequency shaping and group delay, in Hz.
const BAND_LOW_HZ: f32 = 100.0;
const BAND_HIGH_HZ: f32 = 16000.0;
/// Minimum magnitude spread for an engine that claims to shape frequency.
const MIN_SHAPING_DB: f32 = 6.0;
/// Group delay above this is audible smearing.
const MAX_GROUP_DELAY_MS: f32 = 10.0;
/// Parameter value used to push resonance-like controls toward
/// self-oscillation.
const HIGH_RESONANCE: f32 = 0.95;

pub fn run(handle: &mut EngineHandle, config: &RunConfig) -> Result<TestCategory, HarnessError> {
    let mut battery = TestCategory::new("filter");
    let response = impulse_response(handle, config)?;
    match response {
        Ok(ir) => {
            let response = spectral::frequency_response(&ir, config.sample_rate);
            battery.push(frequency_shaping(&response));
            battery.push(group_delay(&response));
        }
        Err(result) => battery.push(result),
    }
    battery.push(resonance_stability(handle, config)?);
    Ok(battery)
}

/// Impulse response at the default state. `Err` carries the CRITICAL panic
/// result.
fn impulse_response(
    handle: &mut EngineHandle,
    config: &RunConfig,
) -> Result<Result<AudioBlock, TestResult>, HarnessError> {
    let input = generate(
        SignalKind::Impulse,
        config.sample_rate,
        0.5,
        1.0,
        SignalParams::default(),
    )?
    .block;
    handle.prepare(f64::from(config.sample_rate), config.block_size);
    to_default_state(handle);
    Ok(handle
        .process_blocks(&input, config.block_size)
        .map_err(|panic| panic_result("frequency_shaping", &panic)))
}

/// A filter must shape the band: at least 6 dB between its loudest and
/// quietest bin in 100 Hz..16 kHz of the impulse-response spectrum.
fn frequency_shaping(response: &spectral::FrequencyResponse) -> TestResult {
    const NAME: &str = "frequency_shaping";
    let band: Vec<f32> = response
        .frequencies
        .iter()
        .zip(&response.magnitude_db)
        .filter(|&(&f, _)| (BAND_LOW_HZ..=BAND_HIGH_HZ).contains(&f))
        .map(|(_, &m)| m)
        .collect();
    if band.is_empty() {
        return TestResult::fail(NAME, Severity::Error, "no spectrum in the audible band");
    }
    let max = band.iter().fold(f32::MIN, |m, &x| m.max(x));
    let min = band.iter().fold(f32::MAX, |m, &x| m.min(x));
    let spread = max - min;

    if spread >= MIN_SHAPING_DB {
        TestResult::pass(NAME, format!("{spread:.1} dB of shaping in the band"))
            .with_metric("shaping_db", spread)
    } else {
        TestResult::fail(
            NAME,
            Severity::Warning,
            format!("only {spread:.1} dB of shaping in 100 Hz..16 kHz"),
        )
        .with_metric("shaping_db", spread)
        .with_recommendation("verify the default cutoff lies inside the audible band")
    }
}

/// Group delay from the unwrapped phase derivative, worst bin in the band.
fn group_delay(response: &spectral::FrequencyResponse) -> TestResult {
    const NAME: &str = "group_delay";
    if response.frequencies.len() < 3 {
        return TestResult::fail(NAME, Severity::Error, "spectrum too short for group delay");
    }
    let bin_width = response.frequencies[1];
    let d_omega = TAU * bin_width;

    let mut worst_ms = 0.0f32;
    for i in 1..response.phase.len() {
        let freq = response.frequencies[i];
        if !(BAND_LOW_HZ..=BAND_HIGH_HZ).contains(&freq) {
            continue;
        }
        let mut d_phase = response.phase[i] - response.phase[i - 1];
        // Unwrap.
        while d_phase > std::f32::consts::PI {
            d_phase -= TAU;
        }
        while d_phase < -std::f32::consts::PI {
            d_phase += TAU;
        }
        let gd_ms = (-d_phase / d_omega * 1000.0).abs();
        worst_ms = worst_ms.max(gd_ms);
    }

    if worst_ms < MAX_GROUP_DELAY_MS {
        TestResult::pass(NAME, format!("worst group delay {worst_ms:.2} ms"))
            .with_metric("max_group_delay_ms", worst_ms)
    } else {
        TestResult::fail(
            NAME,
            Severity::Warning,
            format!("group delay peaks at {worst_ms:.1} ms"),
        )
        .with_metric("max_group_delay_ms", worst_ms)
        .with_recommendation("check for narrow high-Q sections near the band edges")
    }
}

/// All parameters pushed to 0.95, impulse in, then a second of silence:
/// a stable filter rings down, a self-oscillating one sustains.
fn resonance_stability(
    handle: &mut EngineHandle,
    config: &RunConfig,
) -> Result<TestResult, HarnessError> {
    const NAME: &str = "resonance_stability";
    let mut input = AudioBlock::silence(2, (1.5 * config.sample_rate) as usize);
    input.channel_mut(0)[0] = 1.0;
    input.channel_mut(1)[0] = 1.0;

    handle.prepare(f64::from(config.sample_rate), config.block_size);
    handle.reset();
    let hot: ParameterState = (0..handle.num_parameters())
        .map(|i| (i, HIGH_RESONANCE))
        .collect();
    handle.apply(&hot);
    let output = match handle.process_blocks(&input, config.block_size) {
        Ok(block) => block,
        Err(panic) => return Ok(panic_result(NAME, &panic)),
    };

    Ok(if level::sustained_oscillation(&output) {
        TestResult::fail(
            NAME,
            Severity::Error,
            "self-oscillation at high resonance settings",
        )
        .with_metric("tail_peak", level::peak(&output))
        .with_recommendation("limit feedback gain below unity at maximum resonance")
    } else {
        TestResult::pass(NAME, "impulse rings down at high resonance")
            .with_metric("tail_peak", level::peak(&output))
    })
}
