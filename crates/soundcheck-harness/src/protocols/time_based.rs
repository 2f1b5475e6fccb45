//! Battery for delays and reverbs.

use crate::config::RunConfig;
use crate::driver::EngineHandle;
use crate::protocols::{find_mix_parameter, panic_result, to_default_state};
use crate::result::{TestCategory, TestResult};
use soundcheck_core::{HarnessError, ParameterState, Severity};
use soundcheck_metrics::{level, timing};
use soundcheck_signals::{generate, SignalKind, SignalParams, StimulusCache};

/// Seconds of silence appended after the impulse so the tail can ring out.
const TAIL_SECS: f32 = 3.0;
/// Detected echo must land inside (0, 2000] ms.
const MAX_DELAY_MS: f32 = 2000.0;
/// Plausible reverb decay range in seconds.
const MIN_RT60_SECS: f32 = 0.1;
const MAX_RT60_SECS: f32 = 10.0;

pub fn run(
    handle: &mut EngineHandle,
    config: &RunConfig,
    cache: &mut StimulusCache,
) -> Result<TestCategory, HarnessError> {
    let mut battery = TestCategory::new("time_based");
    battery.push(echo_or_tail(handle, config, cache)?);
    battery.push(feedback_stability(handle, config)?);
    Ok(battery)
}

/// An impulse through a time-based engine must come back with either a
/// discrete echo or a decaying tail. The wet path is isolated by pinning
/// the mix at 1 when the engine declares one.
fn echo_or_tail(
    handle: &mut EngineHandle,
    config: &RunConfig,
    cache: &mut StimulusCache,
) -> Result<TestResult, HarnessError> {
    const NAME: &str = "echo_or_tail";
    let impulse = cache.get(SignalKind::Impulse, config.sample_rate, TAIL_SECS, 1.0)?;

    handle.prepare(f64::from(config.sample_rate), config.block_size);
    to_default_state(handle);
    if let Some(mix) = find_mix_parameter(handle) {
        handle.apply(&ParameterState::from([(mix, 1.0)]));
    }
    let output = match handle.process_blocks(&impulse.block, config.block_size) {
        Ok(block) => block,
        Err(panic) => return Ok(panic_result(NAME, &panic)),
    };

    let delay = timing::delay_ms(&impulse.block, &output, config.sample_rate);
    let rt60 = timing::rt60_seconds(&output, config.sample_rate);
    let has_echo = delay > 0.0 && delay <= MAX_DELAY_MS;
    let has_tail = (MIN_RT60_SECS..=MAX_RT60_SECS).contains(&rt60);

    Ok(if has_echo || has_tail {
        TestResult::pass(
            NAME,
            format!("echo at {delay:.1} ms, RT60 {rt60:.2} s"),
        )
        .with_metric("delay_ms", delay)
        .with_metric("rt60_s", rt60)
    } else {
        TestResult::fail(
            NAME,
            Severity::Warning,
            "no echo or decaying tail on an impulse",
        )
        .with_metric("delay_ms", delay)
        .with_metric("rt60_s", rt60)
        .with_recommendation("verify the default delay time and wet level are audible")
    })
}

/// A sustained sine at the default state must not build up through the
/// feedback path.
fn feedback_stability(
    handle: &mut EngineHandle,
    config: &RunConfig,
) -> Result<TestResult, HarnessError> {
    const NAME: &str = "feedback_stability";
    let params = SignalParams {
        frequency: 440.0,
        ..SignalParams::default()
    };
    let seconds = config.duration_secs.max(2.0);
    let input = generate(SignalKind::Sine, config.sample_rate, seconds, 0.5, params)?.block;

    handle.prepare(f64::from(config.sample_rate), config.block_size);
    to_default_state(handle);
    let output = match handle.process_blocks(&input, config.block_size) {
        Ok(block) => block,
        Err(panic) => return Ok(panic_result(NAME, &panic)),
    };

    let peak = level::peak(&output);
    // Compare the last tenth against the first: growth means runaway
    // feedback even before the peak clips.
    let ch = output.channel(0);
    let seg = ch.len() / 10;
    let early = level::rms_slice(&ch[..seg.max(1)]);
    let late = level::rms_slice(&ch[ch.len() - seg.max(1)..]);
    let growing = seg > 0 && late > early * 2.0 && late > 0.1;

    Ok(if peak >= 1.0 || growing {
        TestResult::fail(
            NAME,
            Severity::Error,
            format!("feedback accumulation: peak {peak:.2}"),
        )
        .with_metric("peak", peak)
        .with_recommendation("clamp the feedback coefficient below unity")
    } else {
        TestResult::pass(NAME, format!("stable under sustained input, peak {peak:.2}"))
            .with_metric("peak", peak)
    })
}
