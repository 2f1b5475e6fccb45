//! The generic battery, applied to every engine regardless of category.

use crate::config::{RunConfig, ValidationLevel};
use crate::driver::{EngineHandle, BUFFER_SIZES};
use crate::protocols::{
    find_bypass_parameter, find_mix_parameter, panic_result, to_default_state, ParamRng,
};
use crate::result::{TestCategory, TestResult};
use soundcheck_core::{
    linear_to_db, AudioBlock, EngineCategory, HarnessError, ParameterState, Severity,
};
use soundcheck_metrics::{level, spectral, AnomalyReport};
use soundcheck_signals::{generate, SignalKind, SignalParams, StimulusCache};
use std::sync::Mutex;
use std::time::Instant;

/// Seconds of silence fed to the silence and denormal tests.
const LONG_SILENCE_SECS: f32 = 10.0;
/// Output below this noise floor counts as silence.
const SILENCE_FLOOR_DB: f32 = -80.0;
/// Allowed unity-gain deviation on the default state.
const UNITY_TOLERANCE_DB: f32 = 3.0;
/// Per-sample tolerance for the invariance tests.
const INVARIANCE_MAX_DIFF: f32 = 1e-6;
/// RMS tolerance for the invariance tests.
const INVARIANCE_RMS_DIFF: f32 = 1e-7;
/// Residual RMS allowed one block after a reset.
const RESET_RESIDUAL_RMS: f32 = 1e-6;
/// Sample rates exercised by the sample-rate invariance test.
const TEST_SAMPLE_RATES: [f32; 4] = [44100.0, 48000.0, 88200.0, 96000.0];

/// Run the full generic battery. Every engine failure lands in a result,
/// never in the error channel; the `Err` arm is for harness misuse only.
pub fn run(
    handle: &mut EngineHandle,
    category: EngineCategory,
    config: &RunConfig,
    cache: &mut StimulusCache,
) -> Result<TestCategory, HarnessError> {
    let stress = config.level == ValidationLevel::Stress;
    let mut battery = TestCategory::new("generic");
    battery.push(silence_in_silence_out(handle, config, cache)?);
    battery.push(unity_default_gain(handle, config)?);
    battery.push(block_size_invariance(handle, config)?);
    battery.push(buffer_size_invariance(handle, config)?);
    battery.push(sample_rate_invariance(handle, category, config)?);
    battery.push(denormal_safety(handle, config));
    battery.push(reset_completeness(handle, config, cache)?);
    battery.push(rapid_parameter_change(handle, config, stress)?);
    battery.push(bypass_stability(handle, config)?);
    battery.push(mix_linearity(handle, config)?);
    battery.push(thread_contention(handle, config)?);
    if stress {
        battery.push(extreme_level_input(handle, config)?);
    }
    Ok(battery)
}

fn sine_1k(config: &RunConfig, amplitude: f32) -> Result<AudioBlock, HarnessError> {
    let params = SignalParams {
        frequency: 1000.0,
        ..SignalParams::default()
    };
    Ok(generate(
        SignalKind::Sine,
        config.sample_rate,
        config.duration_secs,
        amplitude,
        params,
    )?
    .block)
}

fn silence_in_silence_out(
    handle: &mut EngineHandle,
    config: &RunConfig,
    cache: &mut StimulusCache,
) -> Result<TestResult, HarnessError> {
    const NAME: &str = "silence_in_silence_out";
    let stimulus = cache.get(
        SignalKind::Silence,
        config.sample_rate,
        LONG_SILENCE_SECS,
        1.0,
    )?;
    handle.prepare(f64::from(config.sample_rate), config.block_size);
    to_default_state(handle);
    let output = match handle.process_blocks(&stimulus.block, config.block_size) {
        Ok(block) => block,
        Err(panic) => return Ok(panic_result(NAME, &panic)),
    };

    if handle.is_generator() {
        let rms = level::rms(&output);
        return Ok(if rms > 1e-5 {
            TestResult::pass(NAME, "generator produces signal from silence")
                .with_metric("output_rms", rms)
        } else {
            TestResult::fail(NAME, Severity::Warning, "generator output is silent")
                .with_metric("output_rms", rms)
                .with_recommendation("verify the source is running when input is silent")
        });
    }

    let floor = level::noise_floor_db(&output);
    Ok(if floor <= SILENCE_FLOOR_DB {
        TestResult::pass(NAME, format!("noise floor {floor:.1} dB")).with_metric("floor_db", floor)
    } else {
        TestResult::fail(
            NAME,
            Severity::Warning,
            format!("output for silence has a {floor:.1} dB noise floor"),
        )
        .with_metric("floor_db", floor)
        .with_recommendation("decay internal state toward zero; flush denormals")
    })
}

fn unity_default_gain(
    handle: &mut EngineHandle,
    config: &RunConfig,
) -> Result<TestResult, HarnessError> {
    const NAME: &str = "unity_default_gain";
    let input = sine_1k(config, 0.5)?;
    handle.prepare(f64::from(config.sample_rate), config.block_size);
    to_default_state(handle);
    let output = match handle.process_blocks(&input, config.block_size) {
        Ok(block) => block,
        Err(panic) => return Ok(panic_result(NAME, &panic)),
    };

    let gain_db = linear_to_db(level::rms(&output)) - linear_to_db(level::rms(&input));
    Ok(if gain_db.abs() <= UNITY_TOLERANCE_DB {
        TestResult::pass(NAME, format!("default-state gain {gain_db:+.2} dB"))
            .with_metric("gain_change_db", gain_db)
    } else {
        TestResult::fail(
            NAME,
            Severity::Warning,
            format!("default-state gain change of {gain_db:+.2} dB exceeds +-3 dB"),
        )
        .with_metric("gain_change_db", gain_db)
        .with_recommendation("pick default parameters that pass signal at unity")
    })
}

fn block_size_invariance(
    handle: &mut EngineHandle,
    config: &RunConfig,
) -> Result<TestResult, HarnessError> {
    const NAME: &str = "block_size_invariance";
    let input = sine_1k(config, 0.5)?;
    handle.prepare(f64::from(config.sample_rate), config.block_size);
    to_default_state(handle);
    let whole = match handle.process_blocks(&input, input.num_samples()) {
        Ok(block) => block,
        Err(panic) => return Ok(panic_result(NAME, &panic)),
    };
    to_default_state(handle);
    let chunked = match handle.process_blocks(&input, 64) {
        Ok(block) => block,
        Err(panic) => return Ok(panic_result(NAME, &panic)),
    };

    let (max_diff, rms_diff) = sample_difference(&whole, &chunked);
    Ok(
        if max_diff < INVARIANCE_MAX_DIFF && rms_diff < INVARIANCE_RMS_DIFF {
            TestResult::pass(NAME, "single-block and 64-sample-chunk output match")
                .with_metric("max_diff", max_diff)
        } else {
            TestResult::fail(
                NAME,
                Severity::Error,
                format!("outputs diverge: max diff {max_diff:.2e}, RMS diff {rms_diff:.2e}"),
            )
            .with_metric("max_diff", max_diff)
            .with_metric("rms_diff", rms_diff)
            .with_recommendation("keep internal state independent of block boundaries")
        },
    )
}

fn buffer_size_invariance(
    handle: &mut EngineHandle,
    config: &RunConfig,
) -> Result<TestResult, HarnessError> {
    const NAME: &str = "buffer_size_invariance";
    let input = sine_1k(config, 0.5)?;

    let mut reference: Option<AudioBlock> = None;
    let mut worst_diff = 0.0f32;
    let mut worst_size = BUFFER_SIZES[0];
    for &size in &BUFFER_SIZES {
        handle.prepare(f64::from(config.sample_rate), size);
        to_default_state(handle);
        let output = match handle.process_blocks(&input, size) {
            Ok(block) => block,
            Err(panic) => return Ok(panic_result(NAME, &panic)),
        };
        match &reference {
            None => reference = Some(output),
            Some(reference) => {
                let (max_diff, _) = sample_difference(reference, &output);
                if max_diff > worst_diff {
                    worst_diff = max_diff;
                    worst_size = size;
                }
            }
        }
    }
    // Restore the configured block size for later tests.
    handle.prepare(f64::from(config.sample_rate), config.block_size);

    Ok(if worst_diff < INVARIANCE_MAX_DIFF {
        TestResult::pass(NAME, "output identical across buffer sizes 1..4096")
            .with_metric("worst_diff", worst_diff)
    } else {
        TestResult::fail(
            NAME,
            Severity::Error,
            format!("buffer size {worst_size} diverges by {worst_diff:.2e}"),
        )
        .with_metric("worst_diff", worst_diff)
        .with_recommendation("avoid buffer-length-dependent coefficient updates")
    })
}

fn sample_rate_invariance(
    handle: &mut EngineHandle,
    category: EngineCategory,
    config: &RunConfig,
) -> Result<TestResult, HarnessError> {
    const NAME: &str = "sample_rate_invariance";
    let params = SignalParams {
        frequency: 1000.0,
        ..SignalParams::default()
    };

    let mut peaks = Vec::with_capacity(TEST_SAMPLE_RATES.len());
    let mut thds = Vec::with_capacity(TEST_SAMPLE_RATES.len());
    for &rate in &TEST_SAMPLE_RATES {
        let input = generate(SignalKind::Sine, rate, 0.5, 0.5, params)?.block;
        handle.prepare(f64::from(rate), config.block_size);
        to_default_state(handle);
        let output = match handle.process_blocks(&input, config.block_size) {
            Ok(block) => block,
            Err(panic) => return Ok(panic_result(NAME, &panic)),
        };
        peaks.push(level::peak(&output));
        if category == EngineCategory::Distortion {
            thds.push(spectral::thd_percent(&output, rate, 1000.0));
        }
    }
    handle.prepare(f64::from(config.sample_rate), config.block_size);

    let spread = relative_spread(&peaks);
    let thd_spread = relative_spread(&thds);
    let peak_ok = spread <= 0.15;
    let thd_ok = thds.is_empty() || thd_spread <= 0.20;
    Ok(if peak_ok && thd_ok {
        TestResult::pass(NAME, "behavior stable from 44.1 to 96 kHz")
            .with_metric("peak_spread", spread)
    } else {
        let mut result = TestResult::fail(
            NAME,
            Severity::Error,
            format!("peak varies {:.0}% across sample rates", spread * 100.0),
        )
        .with_metric("peak_spread", spread)
        .with_recommendation("derive all time constants from the prepared sample rate");
        if !thds.is_empty() {
            result = result.with_metric("thd_spread", thd_spread);
        }
        result
    })
}

fn denormal_safety(handle: &mut EngineHandle, config: &RunConfig) -> TestResult {
    const NAME: &str = "denormal_safety";
    let num_samples = (LONG_SILENCE_SECS * config.sample_rate) as usize;
    let mut input = AudioBlock::silence(2, num_samples);
    input.channel_mut(0)[0] = 1e-10;
    input.channel_mut(1)[0] = 1e-10;

    handle.prepare(f64::from(config.sample_rate), config.block_size);
    to_default_state(handle);
    let output = match handle.process_blocks(&input, config.block_size) {
        Ok(block) => block,
        Err(panic) => return panic_result(NAME, &panic),
    };

    let report = AnomalyReport::scan(&output);
    if report.has_non_finite() {
        TestResult::fail(NAME, Severity::Critical, "NaN/Inf on near-silent input")
            .with_recommendation("add 1/(A+eps) divisor guards")
    } else if report.has_denormal {
        TestResult::fail(NAME, Severity::Warning, "denormal samples in output")
            .with_recommendation("flush denormals to zero (FTZ or a tiny dither offset)")
    } else {
        TestResult::pass(NAME, "no denormals or non-finite samples")
    }
}

fn reset_completeness(
    handle: &mut EngineHandle,
    config: &RunConfig,
    cache: &mut StimulusCache,
) -> Result<TestResult, HarnessError> {
    const NAME: &str = "reset_completeness";
    let impulse = cache.get(SignalKind::Impulse, config.sample_rate, 0.1, 1.0)?;
    handle.prepare(f64::from(config.sample_rate), config.block_size);
    to_default_state(handle);
    if let Err(panic) = handle.process_blocks(&impulse.block, config.block_size) {
        return Ok(panic_result(NAME, &panic));
    }
    handle.reset();

    let silence = AudioBlock::silence(2, config.block_size);
    let output = match handle.process_blocks(&silence, config.block_size) {
        Ok(block) => block,
        Err(panic) => return Ok(panic_result(NAME, &panic)),
    };
    let residual = level::rms(&output);
    Ok(if residual < RESET_RESIDUAL_RMS {
        TestResult::pass(NAME, "reset clears internal state").with_metric("residual_rms", residual)
    } else {
        TestResult::fail(
            NAME,
            Severity::Error,
            format!("residual RMS {residual:.2e} one block after reset"),
        )
        .with_metric("residual_rms", residual)
        .with_recommendation("clear delay lines and filter state in reset()")
    })
}

fn rapid_parameter_change(
    handle: &mut EngineHandle,
    config: &RunConfig,
    stress: bool,
) -> Result<TestResult, HarnessError> {
    const NAME: &str = "rapid_parameter_change";
    let iterations = if stress { 200 } else { 50 };
    let input = sine_1k(config, 0.5)?;
    let chunk_len = config.block_size.min(input.num_samples());
    let mut chunk = AudioBlock::silence(input.num_channels(), chunk_len);

    handle.prepare(f64::from(config.sample_rate), config.block_size);
    to_default_state(handle);
    let mut rng = ParamRng::new();
    let mut worst_peak = 0.0f32;
    for i in 0..iterations {
        handle.apply(&rng.random_state(handle.num_parameters()));
        let offset = (i * chunk_len) % input.num_samples().saturating_sub(chunk_len).max(1);
        chunk.clear();
        chunk.copy_range_from(&input, offset, 0, chunk_len);
        let output = match handle.process_blocks(&chunk, chunk_len) {
            Ok(block) => block,
            Err(panic) => return Ok(panic_result(NAME, &panic)),
        };
        let report = AnomalyReport::scan(&output);
        if report.has_non_finite() {
            return Ok(TestResult::fail(
                NAME,
                Severity::Critical,
                format!("NaN/Inf after {i} rapid parameter changes"),
            )
            .with_recommendation("add parameter smoothing"));
        }
        worst_peak = worst_peak.max(report.peak);
    }

    Ok(if worst_peak > 5.0 {
        TestResult::fail(
            NAME,
            Severity::Error,
            format!("peak {worst_peak:.2} under rapid parameter changes"),
        )
        .with_metric("worst_peak", worst_peak)
        .with_recommendation("add parameter smoothing")
    } else {
        TestResult::pass(NAME, format!("{iterations} randomizations, peak {worst_peak:.2}"))
            .with_metric("worst_peak", worst_peak)
    })
}

fn bypass_stability(
    handle: &mut EngineHandle,
    config: &RunConfig,
) -> Result<TestResult, HarnessError> {
    const NAME: &str = "bypass_stability";
    let Some(bypass) = find_bypass_parameter(handle) else {
        return Ok(TestResult::pass(NAME, "no bypass-like parameter"));
    };

    let input = sine_1k(config, 0.5)?;
    let chunk_len = config.block_size.min(input.num_samples());
    let mut chunk = AudioBlock::silence(input.num_channels(), chunk_len);
    handle.prepare(f64::from(config.sample_rate), config.block_size);
    to_default_state(handle);

    let mut worst_peak = 0.0f32;
    for toggle in 0..20 {
        // >= 0.5 means enabled.
        let value = if toggle % 2 == 0 { 1.0 } else { 0.0 };
        handle.apply(&ParameterState::from([(bypass, value)]));
        let offset = (toggle * chunk_len) % input.num_samples().saturating_sub(chunk_len).max(1);
        chunk.clear();
        chunk.copy_range_from(&input, offset, 0, chunk_len);
        let output = match handle.process_blocks(&chunk, chunk_len) {
            Ok(block) => block,
            Err(panic) => return Ok(panic_result(NAME, &panic)),
        };
        let report = AnomalyReport::scan(&output);
        if report.has_non_finite() {
            return Ok(TestResult::fail(NAME, Severity::Critical, "NaN/Inf while toggling bypass")
                .with_recommendation("crossfade bypass transitions"));
        }
        worst_peak = worst_peak.max(report.peak);
    }

    Ok(if worst_peak > 2.0 {
        TestResult::fail(
            NAME,
            Severity::Error,
            format!("peak {worst_peak:.2} while toggling bypass"),
        )
        .with_metric("worst_peak", worst_peak)
        .with_recommendation("crossfade bypass transitions")
    } else {
        TestResult::pass(NAME, "20 bypass toggles, output stable").with_metric("worst_peak", worst_peak)
    })
}

fn mix_linearity(
    handle: &mut EngineHandle,
    config: &RunConfig,
) -> Result<TestResult, HarnessError> {
    const NAME: &str = "mix_linearity";
    let Some(mix) = find_mix_parameter(handle) else {
        return Ok(TestResult::pass(NAME, "no mix-like parameter"));
    };

    let input = sine_1k(config, 0.5)?;
    handle.prepare(f64::from(config.sample_rate), config.block_size);
    let mut levels = Vec::with_capacity(5);
    for &value in &[0.0f32, 0.25, 0.5, 0.75, 1.0] {
        to_default_state(handle);
        handle.apply(&ParameterState::from([(mix, value)]));
        let output = match handle.process_blocks(&input, config.block_size) {
            Ok(block) => block,
            Err(panic) => return Ok(panic_result(NAME, &panic)),
        };
        levels.push(level::rms(&output));
    }

    // Monotone in the overall direction of travel, with 10% of the range
    // as slack.
    let range = levels.iter().fold(f32::MIN, |m, &x| m.max(x))
        - levels.iter().fold(f32::MAX, |m, &x| m.min(x));
    let ascending = levels[levels.len() - 1] >= levels[0];
    let tolerance = 0.1 * range;
    let monotone = levels.windows(2).all(|w| {
        if ascending {
            w[1] >= w[0] - tolerance
        } else {
            w[1] <= w[0] + tolerance
        }
    });

    Ok(if monotone {
        TestResult::pass(NAME, "mix scan is monotone").with_plot_data(levels)
    } else {
        TestResult::fail(NAME, Severity::Warning, "output level is not monotone in the mix")
            .with_plot_data(levels)
            .with_recommendation("use an equal-power or linear wet/dry law")
    })
}

fn thread_contention(
    handle: &mut EngineHandle,
    config: &RunConfig,
) -> Result<TestResult, HarnessError> {
    const NAME: &str = "thread_contention";
    const WORKERS: usize = 4;
    const BLOCKS_PER_WORKER: usize = 20;

    let input = sine_1k(config, 0.5)?;
    let chunk_len = config.block_size.min(input.num_samples());
    let mut chunk = AudioBlock::silence(input.num_channels(), chunk_len);
    chunk.copy_range_from(&input, 0, 0, chunk_len);

    handle.prepare(f64::from(config.sample_rate), config.block_size);
    to_default_state(handle);

    // Single-thread budget for the same total work.
    let start = Instant::now();
    for _ in 0..WORKERS * BLOCKS_PER_WORKER {
        if let Err(panic) = handle.process_blocks(&chunk, chunk_len) {
            return Ok(panic_result(NAME, &panic));
        }
    }
    let budget = start.elapsed();

    let num_parameters = handle.num_parameters();
    let shared = Mutex::new(handle);
    let bad_output = std::sync::atomic::AtomicBool::new(false);
    let start = Instant::now();
    std::thread::scope(|scope| {
        for _ in 0..WORKERS {
            scope.spawn(|| {
                for _ in 0..BLOCKS_PER_WORKER {
                    let result = {
                        let mut guard = match shared.lock() {
                            Ok(guard) => guard,
                            Err(poisoned) => poisoned.into_inner(),
                        };
                        guard.process_blocks(&chunk, chunk_len)
                    };
                    match result {
                        Ok(output) => {
                            if AnomalyReport::scan(&output).has_non_finite() {
                                bad_output.store(true, std::sync::atomic::Ordering::Relaxed);
                            }
                        }
                        Err(_) => bad_output.store(true, std::sync::atomic::Ordering::Relaxed),
                    }
                }
            });
        }
        scope.spawn(|| {
            let mut rng = ParamRng::new();
            for _ in 0..50 {
                let state = rng.random_state(num_parameters);
                let mut guard = match shared.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                guard.apply(&state);
            }
        });
    });
    let elapsed = start.elapsed();

    let bad = bad_output.load(std::sync::atomic::Ordering::Relaxed);
    // Engines are not contractually thread-safe between apply and
    // process; anything suspicious is a WARNING, never worse.
    Ok(if bad {
        TestResult::fail(
            NAME,
            Severity::Warning,
            "non-finite output or crash under concurrent apply/process",
        )
        .with_recommendation("snapshot parameters at block boundaries")
    } else if !budget.is_zero() && elapsed > budget * 10 {
        TestResult::fail(
            NAME,
            Severity::Warning,
            format!(
                "contended run took {:.1}x the single-thread time",
                elapsed.as_secs_f64() / budget.as_secs_f64()
            ),
        )
        .with_recommendation("avoid long critical sections around parameter state")
    } else {
        TestResult::pass(NAME, "stable under concurrent apply/process")
    })
}

fn extreme_level_input(
    handle: &mut EngineHandle,
    config: &RunConfig,
) -> Result<TestResult, HarnessError> {
    const NAME: &str = "extreme_level_input";
    let input = generate(
        SignalKind::ExtremeLevel,
        config.sample_rate,
        config.duration_secs,
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
    let report = AnomalyReport::scan(&output);
    Ok(if report.has_non_finite() {
        TestResult::fail(NAME, Severity::Critical, "NaN/Inf on 10x full-scale input")
            .with_recommendation("clamp input or guard divisions")
    } else {
        TestResult::pass(NAME, format!("finite output, peak {:.2}", report.peak))
            .with_metric("output_peak", report.peak)
    })
}

/// Max and RMS per-sample difference between two equally shaped blocks.
fn sample_difference(a: &AudioBlock, b: &AudioBlock) -> (f32, f32) {
    let mut max_diff = 0.0f32;
    let mut sum = 0.0f64;
    let n = a.samples().len().min(b.samples().len());
    for (&x, &y) in a.samples().iter().zip(b.samples()).take(n) {
        let d = (x - y).abs();
        max_diff = max_diff.max(d);
        sum += f64::from(d) * f64::from(d);
    }
    let rms = if n == 0 { 0.0 } else { ((sum / n as f64).sqrt()) as f32 };
    (max_diff, rms)
}

fn relative_spread(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let max = values.iter().fold(f32::MIN, |m, &x| m.max(x));
    let min = values.iter().fold(f32::MAX, |m, &x| m.min(x));
    (max - min) / min.max(1e-10)
}

#[cfg(test)]
mod tests {
    use super::*;
    use soundcheck_core::reference::{Gain, HalfGain, NoiseSource};

    fn test_config() -> RunConfig {
        RunConfig {
            sample_rate: 48000.0,
            duration_secs: 0.5,
            ..RunConfig::default()
        }
    }

    #[test]
    fn gain_passes_the_full_battery() {
        let mut handle = EngineHandle::from_engine(Box::new(Gain::new()));
        let config = test_config();
        let mut cache = StimulusCache::new();
        let battery = run(
            &mut handle,
            EngineCategory::Utility,
            &config,
            &mut cache,
        )
        .expect("battery");
        assert_eq!(battery.results.len(), 11);
        assert!(
            battery.all_passed,
            "unexpected failures: {:?}",
            battery
                .results
                .iter()
                .filter(|r| !r.passed)
                .map(|r| &r.name)
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn half_gain_fails_unity_but_passes_silence() {
        let mut handle = EngineHandle::from_engine(Box::new(HalfGain));
        let config = test_config();
        let mut cache = StimulusCache::new();
        let battery = run(
            &mut handle,
            EngineCategory::Utility,
            &config,
            &mut cache,
        )
        .expect("battery");

        let unity = battery
            .results
            .iter()
            .find(|r| r.name == "unity_default_gain")
            .expect("unity result");
        assert!(!unity.passed);
        let gain = unity.metrics["gain_change_db"];
        assert!((gain + 6.02).abs() < 0.1, "expected -6.02 dB, got {gain}");

        let silence = battery
            .results
            .iter()
            .find(|r| r.name == "silence_in_silence_out")
            .expect("silence result");
        assert!(silence.passed);
    }

    #[test]
    fn generator_is_exempt_from_silence_rule() {
        let mut handle = EngineHandle::from_engine(Box::new(NoiseSource::new()));
        let config = test_config();
        let mut cache = StimulusCache::new();
        let result = silence_in_silence_out(&mut handle, &config, &mut cache).expect("test");
        assert!(result.passed, "{}", result.message);
    }

    #[test]
    fn stress_level_adds_the_extreme_test() {
        let mut handle = EngineHandle::from_engine(Box::new(Gain::new()));
        let config = RunConfig {
            level: ValidationLevel::Stress,
            ..test_config()
        };
        let mut cache = StimulusCache::new();
        let battery = run(
            &mut handle,
            EngineCategory::Utility,
            &config,
            &mut cache,
        )
        .expect("battery");
        assert_eq!(battery.results.len(), 12);
        assert!(battery.results.iter().any(|r| r.name == "extreme_level_input"));
    }

    #[test]
    fn spread_of_identical_values_is_zero() {
        assert_eq!(relative_spread(&[1.0, 1.0, 1.0]), 0.0);
        assert!((relative_spread(&[1.0, 1.15]) - 0.15).abs() < 1e-6);
    }
}
