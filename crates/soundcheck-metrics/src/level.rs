//! Level, correlation, and noise-floor measurements.

use soundcheck_core::{linear_to_db, AudioBlock};

/// RMS across all channels.
pub fn rms(block: &AudioBlock) -> f32 {
    let samples = block.samples();
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|&x| x * x).sum::<f32>() / samples.len() as f32).sqrt()
}

/// RMS of a single slice; used by windowed measurements.
pub fn rms_slice(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|&x| x * x).sum::<f32>() / samples.len() as f32).sqrt()
}

/// Absolute peak across all channels.
pub fn peak(block: &AudioBlock) -> f32 {
    block.samples().iter().fold(0.0f32, |m, &x| m.max(x.abs()))
}

/// Peak over RMS; 0 when the block is silent.
pub fn crest_factor(block: &AudioBlock) -> f32 {
    let r = rms(block);
    if r == 0.0 { 0.0 } else { peak(block) / r }
}

/// Mean of channel 0.
pub fn dc_offset(block: &AudioBlock) -> f32 {
    let ch = block.channel(0);
    if ch.is_empty() {
        return 0.0;
    }
    ch.iter().sum::<f32>() / ch.len() as f32
}

/// Pearson correlation of the two channels: +1 mono, 0 decorrelated,
/// -1 inverted. Single-channel input reports 1.
pub fn stereo_correlation(block: &AudioBlock) -> f32 {
    if block.num_channels() < 2 || block.num_samples() == 0 {
        return 1.0;
    }
    let left = block.channel(0);
    let right = block.channel(1);
    let n = left.len() as f32;
    let mean_l = left.iter().sum::<f32>() / n;
    let mean_r = right.iter().sum::<f32>() / n;

    let mut cov = 0.0f32;
    let mut var_l = 0.0f32;
    let mut var_r = 0.0f32;
    for (&l, &r) in left.iter().zip(right) {
        let dl = l - mean_l;
        let dr = r - mean_r;
        cov += dl * dr;
        var_l += dl * dl;
        var_r += dr * dr;
    }
    let denom = (var_l * var_r).sqrt();
    if denom < 1e-10 { 1.0 } else { cov / denom }
}

/// Noise floor in dB: minimum RMS over a sliding window of length N/10
/// with 50% overlap.
pub fn noise_floor_db(block: &AudioBlock) -> f32 {
    let ch = block.channel(0);
    let window = (ch.len() / 10).max(1);
    let hop = (window / 2).max(1);
    let mut min_rms = f32::MAX;
    let mut start = 0;
    while start + window <= ch.len() {
        min_rms = min_rms.min(rms_slice(&ch[start..start + window]));
        start += hop;
    }
    if min_rms == f32::MAX {
        min_rms = rms_slice(ch);
    }
    linear_to_db(min_rms)
}

/// True when the signal has not decayed: split into 10 segments; the last
/// segment's RMS must exceed 0.8x the first segment's and 0.01 absolute.
pub fn sustained_oscillation(block: &AudioBlock) -> bool {
    let ch = block.channel(0);
    let seg = ch.len() / 10;
    if seg == 0 {
        return false;
    }
    let first = rms_slice(&ch[..seg]);
    let last = rms_slice(&ch[ch.len() - seg..]);
    last > 0.8 * first && last > 0.01
}

#[cfg(test)]
mod tests {
    use super::*;
    use soundcheck_signals::{generate, SignalKind, SignalParams};

    fn sine(amp: f32) -> AudioBlock {
        generate(SignalKind::Sine, 48000.0, 1.0, amp, SignalParams::default())
            .expect("generate")
            .block
    }

    #[test]
    fn sine_rms_is_amplitude_over_root_two() {
        let block = sine(0.5);
        let expected = 0.5 / 2.0f32.sqrt();
        assert!((rms(&block) - expected).abs() < 0.01 * 0.5);
    }

    #[test]
    fn sine_crest_factor_is_root_two() {
        let block = sine(0.7);
        assert!((crest_factor(&block) - 2.0f32.sqrt()).abs() < 0.01);
    }

    #[test]
    fn empty_block_levels_are_zero() {
        let block = AudioBlock::silence(2, 0);
        assert_eq!(rms(&block), 0.0);
        assert_eq!(peak(&block), 0.0);
        assert_eq!(crest_factor(&block), 0.0);
        assert_eq!(dc_offset(&block), 0.0);
    }

    #[test]
    fn dc_offset_of_constant() {
        let block = AudioBlock::from_mono(vec![0.25; 4800]);
        assert!((dc_offset(&block) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn mono_duplicated_is_fully_correlated() {
        let block = sine(0.5);
        assert!((stereo_correlation(&block) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn inverted_channels_are_anticorrelated() {
        let left: Vec<f32> = (0..4800).map(|i| (i as f32 * 0.05).sin()).collect();
        let right: Vec<f32> = left.iter().map(|x| -x).collect();
        let block = AudioBlock::from_channels(vec![left, right]);
        assert!((stereo_correlation(&block) + 1.0).abs() < 1e-4);
    }

    #[test]
    fn single_channel_correlation_is_one() {
        let block = AudioBlock::from_mono(vec![0.5; 100]);
        assert_eq!(stereo_correlation(&block), 1.0);
    }

    #[test]
    fn silence_noise_floor_is_at_the_clamp() {
        let block = AudioBlock::silence(2, 48000);
        assert_eq!(noise_floor_db(&block), -200.0);
    }

    #[test]
    fn steady_sine_sustains() {
        let block = sine(0.5);
        assert!(sustained_oscillation(&block));
    }

    #[test]
    fn decaying_signal_does_not_sustain() {
        let samples: Vec<f32> = (0..48000)
            .map(|i| {
                let t = i as f32 / 48000.0;
                (-8.0 * t).exp() * (2.0 * std::f32::consts::PI * 440.0 * t).sin()
            })
            .collect();
        let block = AudioBlock::from_mono(samples);
        assert!(!sustained_oscillation(&block));
    }
}
