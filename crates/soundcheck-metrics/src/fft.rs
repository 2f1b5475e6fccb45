//! FFT plumbing shared by the spectral measurements.

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use std::f32::consts::PI;
use std::sync::Arc;

/// Analysis window applied before the transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    /// No windowing.
    Rectangular,
    /// Hann (raised cosine); the kernel's default for THD and response
    /// measurements.
    Hann,
}

impl Window {
    /// Apply the window to a buffer in place.
    pub fn apply(self, buffer: &mut [f32]) {
        if self == Window::Rectangular {
            return;
        }
        let n = buffer.len();
        for (i, sample) in buffer.iter_mut().enumerate() {
            let w = 0.5 * (1.0 - (2.0 * PI * i as f32 / n as f32).cos());
            *sample *= w;
        }
    }
}

/// Forward FFT of a fixed size with cached plan. Input shorter than the
/// size is zero-padded; longer input is truncated.
pub struct Fft {
    plan: Arc<dyn rustfft::Fft<f32>>,
    size: usize,
}

impl Fft {
    /// Plan a transform of `size` points. Sizes that are not a power of
    /// two are rounded up, matching the kernel's zero-padding policy.
    pub fn new(size: usize) -> Self {
        let size = size.max(2).next_power_of_two();
        let mut planner = FftPlanner::new();
        Self {
            plan: planner.plan_fft_forward(size),
            size,
        }
    }

    /// The padded transform size.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Window, pad, transform; returns the positive-frequency half
    /// (`size / 2 + 1` bins, DC through Nyquist).
    pub fn forward(&self, input: &[f32], window: Window) -> Vec<Complex<f32>> {
        let take = input.len().min(self.size);
        let mut windowed = input[..take].to_vec();
        window.apply(&mut windowed);

        let mut buffer: Vec<Complex<f32>> =
            windowed.iter().map(|&x| Complex::new(x, 0.0)).collect();
        buffer.resize(self.size, Complex::new(0.0, 0.0));
        self.plan.process(&mut buffer);
        buffer.truncate(self.size / 2 + 1);
        buffer
    }

    /// Magnitude spectrum of the positive-frequency half.
    pub fn magnitudes(&self, input: &[f32], window: Window) -> Vec<f32> {
        self.forward(input, window).iter().map(|c| c.norm()).collect()
    }

    /// Width of one bin in Hz at the given sample rate.
    pub fn bin_width(&self, sample_rate: f32) -> f32 {
        sample_rate / self.size as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_power_of_two_rounds_up() {
        assert_eq!(Fft::new(1000).size(), 1024);
        assert_eq!(Fft::new(4096).size(), 4096);
    }

    #[test]
    fn hann_window_shape() {
        let mut buffer = vec![1.0; 100];
        Window::Hann.apply(&mut buffer);
        assert!(buffer[0] < 0.01);
        assert!(buffer[99] < 0.01);
        assert!((buffer[50] - 1.0).abs() < 0.01);
    }

    #[test]
    fn sine_concentrates_in_one_bin() {
        let fft = Fft::new(1024);
        // Exactly bin 16 with a rectangular window.
        let input: Vec<f32> = (0..1024)
            .map(|i| (2.0 * PI * 16.0 * i as f32 / 1024.0).sin())
            .collect();
        let mags = fft.magnitudes(&input, Window::Rectangular);
        let peak_bin = mags
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak_bin, 16);
    }

    #[test]
    fn dc_lands_in_bin_zero() {
        let fft = Fft::new(256);
        let mags = fft.magnitudes(&vec![1.0; 256], Window::Rectangular);
        let rest: f32 = mags[1..].iter().sum();
        assert!(mags[0] > rest * 10.0);
    }
}
