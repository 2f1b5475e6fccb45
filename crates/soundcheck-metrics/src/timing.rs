//! Time-domain measurements: envelope timing, delay, RT60.

use soundcheck_core::AudioBlock;

/// Attack and release times of the channel-0 amplitude envelope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeTiming {
    /// Time from the first 10%-of-peak crossing to the first 90% crossing,
    /// in milliseconds.
    pub attack_ms: f32,
    /// Time from the last 90% crossing after the peak to the following 10%
    /// crossing, in milliseconds.
    pub release_ms: f32,
}

/// Measure attack and release around the absolute peak of channel 0.
///
/// Crossings are taken on a peak-held amplitude envelope (sliding 2 ms
/// max over the rectified signal), so carrier zero crossings do not
/// register as envelope dips. Returns zeros when the block is silent or
/// the crossings do not exist.
pub fn envelope_timing(block: &AudioBlock, sample_rate: f32) -> EnvelopeTiming {
    let zero = EnvelopeTiming {
        attack_ms: 0.0,
        release_ms: 0.0,
    };
    let env = peak_hold_envelope(block.channel(0), sample_rate);
    let Some((peak_idx, peak)) = env
        .iter()
        .copied()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(&b.1))
    else {
        return zero;
    };
    if peak <= 0.0 {
        return zero;
    }
    let lo = 0.1 * peak;
    let hi = 0.9 * peak;
    let to_ms = 1000.0 / sample_rate;

    let attack_ms = {
        let start = env[..=peak_idx].iter().position(|&x| x >= lo);
        let end = env[..=peak_idx].iter().position(|&x| x >= hi);
        match (start, end) {
            (Some(s), Some(e)) if e >= s => (e - s) as f32 * to_ms,
            _ => 0.0,
        }
    };

    let release_ms = {
        let tail = &env[peak_idx..];
        match tail.iter().rposition(|&x| x >= hi) {
            Some(h) => tail[h..]
                .iter()
                .position(|&x| x <= lo)
                .map_or(0.0, |r| r as f32 * to_ms),
            None => 0.0,
        }
    };

    EnvelopeTiming {
        attack_ms,
        release_ms,
    }
}

/// Sliding maximum of |x| over a 2 ms window centered on each sample.
fn peak_hold_envelope(samples: &[f32], sample_rate: f32) -> Vec<f32> {
    let half = ((sample_rate * 0.001) as usize).max(1);
    (0..samples.len())
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half).min(samples.len() - 1);
            samples[lo..=hi].iter().fold(0.0f32, |m, &x| m.max(x.abs()))
        })
        .collect()
}

/// Delay from input to output in milliseconds, by cross-correlating the
/// first half of both signals and taking the argmax lag.
pub fn delay_ms(input: &AudioBlock, output: &AudioBlock, sample_rate: f32) -> f32 {
    let x = input.channel(0);
    let y = output.channel(0);
    let half = x.len().min(y.len()) / 2;
    if half == 0 {
        return 0.0;
    }

    let mut best_lag = 0usize;
    let mut best = f32::MIN;
    for lag in 0..half {
        let mut sum = 0.0f32;
        for i in 0..half {
            if i + lag < y.len() {
                sum += x[i] * y[i + lag];
            }
        }
        if sum > best {
            best = sum;
            best_lag = lag;
        }
    }
    best_lag as f32 * 1000.0 / sample_rate
}

/// RT60 via Schroeder backward integration of the channel-0 impulse
/// response: T30 is the time between the -5 dB and -35 dB crossings of the
/// energy decay curve, and RT60 = 2 * T30. Returns 0 when the decay never
/// reaches -35 dB.
pub fn rt60_seconds(impulse_response: &AudioBlock, sample_rate: f32) -> f32 {
    let edc = energy_decay_curve(impulse_response.channel(0));
    if edc.is_empty() {
        return 0.0;
    }
    let t5 = edc.iter().position(|&e| e <= -5.0);
    let t35 = edc.iter().position(|&e| e <= -35.0);
    match (t5, t35) {
        (Some(a), Some(b)) if b > a => 2.0 * (b - a) as f32 / sample_rate,
        _ => 0.0,
    }
}

/// Schroeder energy decay curve in dB, normalized to 0 dB at the start.
fn energy_decay_curve(ir: &[f32]) -> Vec<f32> {
    if ir.is_empty() {
        return Vec::new();
    }
    let mut edc = Vec::with_capacity(ir.len());
    let mut sum = 0.0f32;
    for &x in ir.iter().rev() {
        sum += x * x;
        edc.push(sum);
    }
    edc.reverse();
    let total = edc[0].max(1e-10);
    edc.iter()
        .map(|&e| 10.0 * (e / total).max(1e-10).log10())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shifted_impulse_reports_the_exact_shift() {
        let mut input = vec![0.0f32; 9600];
        input[0] = 1.0;
        let mut output = vec![0.0f32; 9600];
        output[480] = 1.0; // 10 ms at 48 kHz
        let d = delay_ms(
            &AudioBlock::from_mono(input),
            &AudioBlock::from_mono(output),
            48000.0,
        );
        assert!((d - 10.0).abs() < 1e-3, "expected 10 ms, got {d}");
    }

    #[test]
    fn unchanged_impulse_has_zero_delay_and_rt60() {
        let mut samples = vec![0.0f32; 4800];
        samples[0] = 1.0;
        let block = AudioBlock::from_mono(samples.clone());
        let out = AudioBlock::from_mono(samples);
        assert_eq!(delay_ms(&block, &out, 48000.0), 0.0);
        assert_eq!(rt60_seconds(&block, 48000.0), 0.0);
    }

    #[test]
    fn exponential_decay_rt60_matches_theory() {
        // Amplitude e^(-k t) decays 60 dB in t = 60 ln(10) / (20 k).
        let sample_rate = 48000.0f32;
        let k = 10.0f32;
        let expected = 60.0 * 10.0f32.ln() / (20.0 * k);
        let ir: Vec<f32> = (0..96000)
            .map(|i| {
                let t = i as f32 / sample_rate;
                (-k * t).exp() * (2.0 * std::f32::consts::PI * 1000.0 * t).sin()
            })
            .collect();
        let rt60 = rt60_seconds(&AudioBlock::from_mono(ir), sample_rate);
        assert!(
            (rt60 - expected).abs() < 0.1 * expected,
            "expected ~{expected} s, got {rt60} s"
        );
    }

    #[test]
    fn envelope_timing_of_a_ramped_tone() {
        // 50 ms linear fade-in, 100 ms hold, 50 ms fade-out.
        let sr = 48000.0f32;
        let fade = 2400usize;
        let hold = 4800usize;
        let n = fade + hold + fade;
        let samples: Vec<f32> = (0..n)
            .map(|i| {
                let env = if i < fade {
                    i as f32 / fade as f32
                } else if i < fade + hold {
                    1.0
                } else {
                    (n - i) as f32 / fade as f32
                };
                env * (2.0 * std::f32::consts::PI * 1000.0 * i as f32 / sr).sin()
            })
            .collect();
        let timing = envelope_timing(&AudioBlock::from_mono(samples), sr);
        // 10% to 90% of a 50 ms linear ramp is 40 ms.
        assert!(
            (timing.attack_ms - 40.0).abs() < 10.0,
            "attack {} ms",
            timing.attack_ms
        );
        assert!(
            (timing.release_ms - 40.0).abs() < 10.0,
            "release {} ms",
            timing.release_ms
        );
    }

    #[test]
    fn silent_block_has_zero_timing() {
        let timing = envelope_timing(&AudioBlock::silence(1, 4800), 48000.0);
        assert_eq!(timing.attack_ms, 0.0);
        assert_eq!(timing.release_ms, 0.0);
    }
}
