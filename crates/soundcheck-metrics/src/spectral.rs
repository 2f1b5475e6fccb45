//! Spectral measurements: THD, IMD, peak frequency, frequency response.

use crate::fft::{Fft, Window};
use soundcheck_core::{linear_to_db, AudioBlock};

/// FFT size for THD and IMD.
const DISTORTION_FFT_SIZE: usize = 4096;
/// FFT size for the full frequency response.
const RESPONSE_FFT_SIZE: usize = 2048;
/// Bins searched either side of the nominal harmonic bin.
const HARMONIC_SEARCH_BINS: usize = 3;
/// Harmonics measured, fundamental included.
const MAX_HARMONICS: usize = 10;

/// Total harmonic distortion as a percentage.
///
/// Magnitude spectrum at FFT size 4096 with a Hann window; harmonics at
/// `k * fundamental` for k = 1..10, each searched within +-3 bins for the
/// local peak; THD = sqrt(sum of squared harmonic amplitudes, k >= 2)
/// divided by the fundamental amplitude.
pub fn thd_percent(block: &AudioBlock, sample_rate: f32, fundamental: f32) -> f32 {
    let fft = Fft::new(DISTORTION_FFT_SIZE);
    let mags = fft.magnitudes(block.channel(0), Window::Hann);
    let bin_width = fft.bin_width(sample_rate);
    let nyquist = sample_rate / 2.0;

    let mut harmonics = Vec::with_capacity(MAX_HARMONICS);
    for k in 1..=MAX_HARMONICS {
        let freq = fundamental * k as f32;
        if freq >= nyquist {
            break;
        }
        harmonics.push(magnitude_near(&mags, freq, bin_width));
    }
    let Some(&a1) = harmonics.first() else {
        return 0.0;
    };
    let harmonic_power: f32 = harmonics[1..].iter().map(|a| a * a).sum();
    harmonic_power.sqrt() / a1.max(1e-10) * 100.0
}

/// Two-tone intermodulation distortion ratio: the magnitudes at `f1 + f2`
/// and `|f1 - f2|` relative to the mean of the two fundamentals.
pub fn imd_ratio(block: &AudioBlock, sample_rate: f32, f1: f32, f2: f32) -> f32 {
    let fft = Fft::new(DISTORTION_FFT_SIZE);
    let mags = fft.magnitudes(block.channel(0), Window::Hann);
    let bin_width = fft.bin_width(sample_rate);

    let a1 = magnitude_near(&mags, f1, bin_width);
    let a2 = magnitude_near(&mags, f2, bin_width);
    let sum = magnitude_near(&mags, f1 + f2, bin_width);
    let diff = magnitude_near(&mags, (f1 - f2).abs(), bin_width);

    (sum + diff) / (0.5 * (a1 + a2)).max(1e-10)
}

/// Frequency of the strongest spectral bin, in Hz.
pub fn peak_frequency(block: &AudioBlock, sample_rate: f32) -> f32 {
    let ch = block.channel(0);
    if ch.is_empty() {
        return 0.0;
    }
    let fft = Fft::new(ch.len());
    let mags = fft.magnitudes(ch, Window::Hann);
    let peak_bin = mags
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map_or(0, |(i, _)| i);
    peak_bin as f32 * fft.bin_width(sample_rate)
}

/// Magnitude and phase spectrum at FFT size 2048 with a Hann window.
#[derive(Debug, Clone)]
pub struct FrequencyResponse {
    /// Bin center frequencies in Hz.
    pub frequencies: Vec<f32>,
    /// Bin magnitudes in dB.
    pub magnitude_db: Vec<f32>,
    /// Bin phases in radians.
    pub phase: Vec<f32>,
}

impl FrequencyResponse {
    /// Magnitude in dB at the bin nearest `freq`.
    pub fn magnitude_at(&self, freq: f32) -> f32 {
        if self.frequencies.is_empty() {
            return -200.0;
        }
        let bin_width = self.frequencies.get(1).copied().unwrap_or(1.0);
        let idx = ((freq / bin_width).round() as usize).min(self.magnitude_db.len() - 1);
        self.magnitude_db[idx]
    }
}

/// Full positive-frequency magnitude + phase response of channel 0.
pub fn frequency_response(block: &AudioBlock, sample_rate: f32) -> FrequencyResponse {
    let fft = Fft::new(RESPONSE_FFT_SIZE);
    let spectrum = fft.forward(block.channel(0), Window::Hann);
    let bin_width = fft.bin_width(sample_rate);

    let frequencies = (0..spectrum.len()).map(|i| i as f32 * bin_width).collect();
    let magnitude_db = spectrum.iter().map(|c| linear_to_db(c.norm())).collect();
    let phase = spectrum.iter().map(|c| c.arg()).collect();
    FrequencyResponse {
        frequencies,
        magnitude_db,
        phase,
    }
}

/// Largest magnitude within the +-3-bin search window around `freq`.
fn magnitude_near(mags: &[f32], freq: f32, bin_width: f32) -> f32 {
    if freq <= 0.0 || mags.is_empty() {
        return 0.0;
    }
    let center = (freq / bin_width).round() as usize;
    let lo = center.saturating_sub(HARMONIC_SEARCH_BINS);
    let hi = (center + HARMONIC_SEARCH_BINS).min(mags.len() - 1);
    if lo > hi {
        return 0.0;
    }
    mags[lo..=hi].iter().fold(0.0f32, |m, &x| m.max(x))
}

#[cfg(test)]
mod tests {
    use super::*;
    use soundcheck_signals::{generate, SignalKind, SignalParams};

    fn sine(freq: f32, amp: f32) -> AudioBlock {
        let params = SignalParams {
            frequency: freq,
            ..SignalParams::default()
        };
        generate(SignalKind::Sine, 48000.0, 1.0, amp, params)
            .expect("generate")
            .block
    }

    #[test]
    fn pure_sine_thd_is_tiny() {
        let block = sine(1000.0, 0.5);
        let thd = thd_percent(&block, 48000.0, 1000.0);
        assert!(thd < 0.5, "pure sine THD should be under 0.5%, got {thd}");
    }

    #[test]
    fn clipped_sine_thd_is_large() {
        let mut block = sine(1000.0, 1.0);
        for s in block.samples_mut() {
            *s = s.clamp(-0.5, 0.5);
        }
        let thd = thd_percent(&block, 48000.0, 1000.0);
        assert!(thd > 10.0, "hard clipping should show THD > 10%, got {thd}");
    }

    #[test]
    fn peak_frequency_finds_the_tone() {
        let block = sine(440.0, 0.5);
        let f = peak_frequency(&block, 48000.0);
        assert!((f - 440.0).abs() < 2.0, "expected ~440 Hz, got {f}");
    }

    #[test]
    fn peak_frequency_of_empty_block_is_zero() {
        assert_eq!(peak_frequency(&AudioBlock::silence(2, 0), 48000.0), 0.0);
    }

    #[test]
    fn clean_two_tone_has_low_imd() {
        let params = SignalParams {
            start_freq: 440.0,
            end_freq: 550.0,
            ..SignalParams::default()
        };
        let block = generate(SignalKind::TwoTone, 48000.0, 1.0, 0.5, params)
            .expect("generate")
            .block;
        let imd = imd_ratio(&block, 48000.0, 440.0, 550.0);
        assert!(imd < 0.05, "clean tones should show low IMD, got {imd}");
    }

    #[test]
    fn saturated_two_tone_has_higher_imd() {
        let params = SignalParams {
            start_freq: 440.0,
            end_freq: 550.0,
            ..SignalParams::default()
        };
        let mut block = generate(SignalKind::TwoTone, 48000.0, 1.0, 1.0, params)
            .expect("generate")
            .block;
        for s in block.samples_mut() {
            *s = (*s * 4.0).tanh();
        }
        let clean = {
            let clean_block = generate(SignalKind::TwoTone, 48000.0, 1.0, 1.0, params)
                .expect("generate")
                .block;
            imd_ratio(&clean_block, 48000.0, 440.0, 550.0)
        };
        let dirty = imd_ratio(&block, 48000.0, 440.0, 550.0);
        assert!(dirty > clean * 5.0, "saturation should raise IMD: {clean} -> {dirty}");
    }

    #[test]
    fn response_shows_the_tone_above_neighbors() {
        let block = sine(1000.0, 0.5);
        let resp = frequency_response(&block, 48000.0);
        assert_eq!(resp.frequencies.len(), RESPONSE_FFT_SIZE / 2 + 1);
        assert!(resp.magnitude_at(1000.0) > resp.magnitude_at(8000.0) + 20.0);
    }
}
