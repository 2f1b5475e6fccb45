//! Modulation rate and depth via envelope autocorrelation.

use soundcheck_core::AudioBlock;

/// One-pole smoothing coefficient for the rectified envelope.
const SMOOTHER_ALPHA: f32 = 0.99;

/// Detected periodic amplitude modulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModulationProfile {
    /// Modulation rate in Hz; 0 when no periodicity was found.
    pub rate_hz: f32,
    /// Modulation depth in [0, 1]: (max - min) / (max + min) of the
    /// smoothed envelope.
    pub depth: f32,
}

/// Measure amplitude modulation on channel 0.
///
/// Full-wave rectify, smooth with a one-pole filter (alpha = 0.99), then
/// autocorrelate the mean-removed envelope. The first autocorrelation
/// maximum at a lag of at least `sample_rate / 20` samples (excluding
/// sub-20 Hz DC glide) gives the modulation period.
pub fn modulation_profile(block: &AudioBlock, sample_rate: f32) -> ModulationProfile {
    let ch = block.channel(0);
    let none = ModulationProfile {
        rate_hz: 0.0,
        depth: 0.0,
    };
    if ch.len() < 4 {
        return none;
    }

    // Rectify and smooth.
    let mut envelope = Vec::with_capacity(ch.len());
    let mut state = 0.0f32;
    for &x in ch {
        state = SMOOTHER_ALPHA * state + (1.0 - SMOOTHER_ALPHA) * x.abs();
        envelope.push(state);
    }

    let max = envelope.iter().fold(f32::MIN, |m, &x| m.max(x));
    let min = envelope.iter().fold(f32::MAX, |m, &x| m.min(x));
    let depth = ((max - min) / (max + min + 1e-10)).clamp(0.0, 1.0);

    // Autocorrelate the mean-removed envelope over candidate lags.
    let mean = envelope.iter().sum::<f32>() / envelope.len() as f32;
    let centered: Vec<f32> = envelope.iter().map(|&x| x - mean).collect();
    let min_lag = (sample_rate / 20.0) as usize;
    let max_lag = centered.len() / 2;
    if min_lag + 1 >= max_lag {
        return ModulationProfile { rate_hz: 0.0, depth };
    }

    let ac = |lag: usize| -> f32 {
        centered[..centered.len() - lag]
            .iter()
            .zip(&centered[lag..])
            .map(|(a, b)| a * b)
            .sum()
    };
    let ac0: f32 = centered.iter().map(|&x| x * x).sum::<f32>().max(1e-10);

    // First local maximum with meaningful correlation; fall back to the
    // global argmax if the envelope has no clean peak.
    let mut values = Vec::with_capacity(max_lag - min_lag);
    for lag in min_lag..max_lag {
        values.push(ac(lag) / ac0);
    }
    let mut period = None;
    for i in 1..values.len() - 1 {
        if values[i] > values[i - 1] && values[i] >= values[i + 1] && values[i] > 0.2 {
            period = Some(min_lag + i);
            break;
        }
    }
    let period = period.or_else(|| {
        values
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .filter(|&(_, &v)| v > 0.2)
            .map(|(i, _)| min_lag + i)
    });

    match period {
        Some(lag) => ModulationProfile {
            rate_hz: sample_rate / lag as f32,
            depth,
        },
        None => ModulationProfile { rate_hz: 0.0, depth },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn tremolo_signal(rate: f32, depth: f32, seconds: f32) -> AudioBlock {
        let sr = 48000.0;
        let n = (seconds * sr) as usize;
        let samples: Vec<f32> = (0..n)
            .map(|i| {
                let t = i as f32 / sr;
                let lfo = 0.5 * (1.0 + (2.0 * PI * rate * t).sin());
                let gain = 1.0 - depth * (1.0 - lfo);
                gain * (2.0 * PI * 440.0 * t).sin()
            })
            .collect();
        AudioBlock::from_mono(samples)
    }

    #[test]
    fn detects_five_hz_tremolo() {
        let block = tremolo_signal(5.0, 1.0, 2.0);
        let profile = modulation_profile(&block, 48000.0);
        assert!(
            (profile.rate_hz - 5.0).abs() < 1.0,
            "expected ~5 Hz, got {}",
            profile.rate_hz
        );
        assert!(profile.depth > 0.5, "full-depth tremolo, got {}", profile.depth);
    }

    #[test]
    fn steady_tone_reports_no_modulation() {
        let sr = 48000.0;
        let samples: Vec<f32> = (0..96000)
            .map(|i| (2.0 * PI * 440.0 * i as f32 / sr).sin())
            .collect();
        let profile = modulation_profile(&AudioBlock::from_mono(samples), sr);
        assert!(profile.depth < 0.2, "steady tone depth {}", profile.depth);
    }

    #[test]
    fn shallow_modulation_has_smaller_depth() {
        let deep = modulation_profile(&tremolo_signal(5.0, 1.0, 2.0), 48000.0);
        let shallow = modulation_profile(&tremolo_signal(5.0, 0.2, 2.0), 48000.0);
        assert!(shallow.depth < deep.depth * 0.6);
    }

    #[test]
    fn tiny_block_is_harmless() {
        let profile = modulation_profile(&AudioBlock::silence(1, 2), 48000.0);
        assert_eq!(profile.rate_hz, 0.0);
        assert_eq!(profile.depth, 0.0);
    }
}
