//! The generator itself.

use crate::kind::{SignalKind, SignalParams};
use crate::noise::{PinkFilter, Xorshift32};
use soundcheck_core::{AudioBlock, HarnessError};
use std::f32::consts::PI;

/// A generated stimulus: the samples plus everything needed to interpret a
/// measurement made on them.
#[derive(Debug, Clone)]
pub struct Stimulus {
    /// The generated samples, stereo.
    pub block: AudioBlock,
    /// Sample rate the block was generated at.
    pub sample_rate: f32,
    /// Which generator produced the block.
    pub kind: SignalKind,
    /// Effective parameters, with `amplitude` filled in.
    pub params: SignalParams,
}

/// How the two channels relate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StereoMode {
    /// Both channels carry identical samples.
    Identical,
    /// Sine-family kinds offset the right channel's phase by 15 degrees;
    /// other kinds fall back to identical channels.
    PhaseOffset,
}

/// Right-channel phase lag for [`StereoMode::PhaseOffset`], 15 degrees.
const STEREO_PHASE_OFFSET: f32 = 15.0 * PI / 180.0;

/// Generate a stereo stimulus with identical channels.
///
/// Deterministic: the same arguments always produce bit-identical samples.
/// A non-positive `duration_secs` yields an empty block; a non-positive
/// `sample_rate` is a programmer error.
pub fn generate(
    kind: SignalKind,
    sample_rate: f32,
    duration_secs: f32,
    amplitude: f32,
    params: SignalParams,
) -> Result<Stimulus, HarnessError> {
    generate_with(
        kind,
        sample_rate,
        duration_secs,
        amplitude,
        params,
        StereoMode::Identical,
    )
}

/// Generate with an explicit stereo mode.
pub fn generate_with(
    kind: SignalKind,
    sample_rate: f32,
    duration_secs: f32,
    amplitude: f32,
    mut params: SignalParams,
    stereo: StereoMode,
) -> Result<Stimulus, HarnessError> {
    if !(sample_rate > 0.0) {
        return Err(HarnessError::programmer(format!(
            "sample rate must be positive, got {sample_rate}"
        )));
    }
    params.amplitude = amplitude;

    let num_samples = if duration_secs > 0.0 {
        (duration_secs * sample_rate).round() as usize
    } else {
        0
    };
    if num_samples == 0 {
        return Ok(Stimulus {
            block: AudioBlock::silence(2, 0),
            sample_rate,
            kind,
            params,
        });
    }

    tracing::trace!(?kind, sample_rate, num_samples, "generating stimulus");

    let block = if kind.is_sine_family() && stereo == StereoMode::PhaseOffset {
        let left = render(kind, sample_rate, num_samples, amplitude, &params, 0.0);
        let right = render(
            kind,
            sample_rate,
            num_samples,
            amplitude,
            &params,
            -STEREO_PHASE_OFFSET,
        );
        AudioBlock::from_channels(vec![left, right])
    } else {
        let mono = render(kind, sample_rate, num_samples, amplitude, &params, 0.0);
        AudioBlock::from_mono_duplicated(&mono)
    };

    Ok(Stimulus {
        block,
        sample_rate,
        kind,
        params,
    })
}

fn render(
    kind: SignalKind,
    sample_rate: f32,
    num_samples: usize,
    amplitude: f32,
    params: &SignalParams,
    extra_phase: f32,
) -> Vec<f32> {
    match kind {
        SignalKind::Silence => vec![0.0; num_samples],
        SignalKind::Sine => sine(sample_rate, num_samples, amplitude, params, extra_phase),
        SignalKind::Chirp => chirp(sample_rate, num_samples, amplitude, params, extra_phase),
        SignalKind::WhiteNoise => white_noise(num_samples, amplitude),
        SignalKind::PinkNoise => pink_noise(num_samples, amplitude),
        SignalKind::Impulse => impulse(num_samples, amplitude),
        SignalKind::Burst => burst(sample_rate, num_samples, amplitude, params, extra_phase),
        SignalKind::TwoTone => two_tone(sample_rate, num_samples, amplitude, params, extra_phase),
        SignalKind::Chord => chord(sample_rate, num_samples, amplitude, params, extra_phase),
        SignalKind::DrumHit => drum_hit(sample_rate, num_samples, amplitude),
        SignalKind::Dc => vec![amplitude * params.dc; num_samples],
        SignalKind::ExtremeLevel => {
            sine(sample_rate, num_samples, amplitude * 10.0, params, extra_phase)
        }
    }
}

fn sine(
    sample_rate: f32,
    num_samples: usize,
    amplitude: f32,
    params: &SignalParams,
    extra_phase: f32,
) -> Vec<f32> {
    let w = 2.0 * PI * params.frequency / sample_rate;
    let phase = params.phase + extra_phase;
    (0..num_samples)
        .map(|i| amplitude * (w * i as f32 + phase).sin())
        .collect()
}

/// Log-frequency sweep with continuous phase:
/// phi(t) = 2*pi*f0*T/ln(f1/f0) * (e^(t*ln(f1/f0)/T) - 1).
fn chirp(
    sample_rate: f32,
    num_samples: usize,
    amplitude: f32,
    params: &SignalParams,
    extra_phase: f32,
) -> Vec<f32> {
    let f0 = params.start_freq.max(1.0);
    let f1 = params.end_freq.max(1.0);
    if (f1 / f0 - 1.0).abs() < 1e-6 {
        // Degenerate sweep: a plain tone at the start frequency.
        let fixed = SignalParams {
            frequency: f0,
            ..*params
        };
        return sine(sample_rate, num_samples, amplitude, &fixed, extra_phase);
    }
    let duration = num_samples as f64 / f64::from(sample_rate);
    let k = f64::from(f1 / f0).ln() / duration;
    let scale = 2.0 * std::f64::consts::PI * f64::from(f0) / k;
    let phase0 = f64::from(params.phase + extra_phase);
    (0..num_samples)
        .map(|i| {
            let t = i as f64 / f64::from(sample_rate);
            let phi = scale * ((k * t).exp() - 1.0) + phase0;
            amplitude * phi.sin() as f32
        })
        .collect()
}

fn white_noise(num_samples: usize, amplitude: f32) -> Vec<f32> {
    let mut rng = Xorshift32::new(Xorshift32::DEFAULT_SEED);
    (0..num_samples).map(|_| amplitude * rng.next_f32()).collect()
}

fn pink_noise(num_samples: usize, amplitude: f32) -> Vec<f32> {
    let mut rng = Xorshift32::new(Xorshift32::DEFAULT_SEED);
    let mut filter = PinkFilter::new();
    (0..num_samples)
        .map(|_| amplitude * filter.process(rng.next_f32()))
        .collect()
}

fn impulse(num_samples: usize, amplitude: f32) -> Vec<f32> {
    let mut samples = vec![0.0; num_samples];
    samples[0] = amplitude;
    samples
}

/// Sine gated on and off every `step_time` seconds, starting on.
fn burst(
    sample_rate: f32,
    num_samples: usize,
    amplitude: f32,
    params: &SignalParams,
    extra_phase: f32,
) -> Vec<f32> {
    let period = (params.step_time.max(0.001) * sample_rate) as usize;
    let tone = sine(sample_rate, num_samples, amplitude, params, extra_phase);
    tone.into_iter()
        .enumerate()
        .map(|(i, s)| if (i / period.max(1)) % 2 == 0 { s } else { 0.0 })
        .collect()
}

/// Two equal-amplitude tones at `start_freq` and `end_freq`, each at half
/// the requested amplitude.
fn two_tone(
    sample_rate: f32,
    num_samples: usize,
    amplitude: f32,
    params: &SignalParams,
    extra_phase: f32,
) -> Vec<f32> {
    let w1 = 2.0 * PI * params.start_freq / sample_rate;
    let w2 = 2.0 * PI * params.end_freq / sample_rate;
    let phase = params.phase + extra_phase;
    let half = amplitude * 0.5;
    (0..num_samples)
        .map(|i| {
            let t = i as f32;
            half * (w1 * t + phase).sin() + half * (w2 * t + phase).sin()
        })
        .collect()
}

/// `num_tones` tones in a just-intonation major stack over the root, each
/// at `amplitude / num_tones`.
fn chord(
    sample_rate: f32,
    num_samples: usize,
    amplitude: f32,
    params: &SignalParams,
    extra_phase: f32,
) -> Vec<f32> {
    const RATIOS: [f32; 4] = [1.0, 1.25, 1.5, 2.0];
    let num_tones = params.num_tones.max(1);
    let per_tone = amplitude / num_tones as f32;
    let phase = params.phase + extra_phase;
    let mut samples = vec![0.0f32; num_samples];
    for tone in 0..num_tones {
        let octave = (tone / RATIOS.len()) as f32;
        let freq = params.frequency * RATIOS[tone % RATIOS.len()] * 2.0f32.powf(octave);
        let w = 2.0 * PI * freq / sample_rate;
        for (i, s) in samples.iter_mut().enumerate() {
            *s += per_tone * (w * i as f32 + phase).sin();
        }
    }
    samples
}

/// White noise plus an 80 Hz tone under e^(-30 t).
fn drum_hit(sample_rate: f32, num_samples: usize, amplitude: f32) -> Vec<f32> {
    const DECAY: f32 = 30.0;
    const TONE_HZ: f32 = 80.0;
    let mut rng = Xorshift32::new(Xorshift32::DEFAULT_SEED);
    let w = 2.0 * PI * TONE_HZ / sample_rate;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate;
            let env = (-DECAY * t).exp();
            amplitude * env * (0.5 * rng.next_f32() + (w * i as f32).sin()) * 0.5
        })
        .collect()
}
