//! Audio buffer type shared by stimuli, engines, and measurements.
//!
//! An [`AudioBlock`] is C channels by N samples of `f32`, stored planar
//! (channel-major). Identity (`num_channels`, `num_samples`) is fixed at
//! construction; sample contents are mutable. Engines process blocks in
//! place; the measurement kernel only ever reads them.

/// A two-dimensional audio buffer: channels x samples, planar layout.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBlock {
    num_channels: usize,
    num_samples: usize,
    data: Vec<f32>,
}

impl AudioBlock {
    /// Create a silent block of the given shape.
    ///
    /// # Panics
    /// Panics if `num_channels` is zero. A zero-sample block is valid and
    /// represents the empty stimulus.
    pub fn silence(num_channels: usize, num_samples: usize) -> Self {
        assert!(num_channels > 0, "AudioBlock needs at least one channel");
        Self {
            num_channels,
            num_samples,
            data: vec![0.0; num_channels * num_samples],
        }
    }

    /// Build a block from per-channel sample vectors.
    ///
    /// # Panics
    /// Panics if `channels` is empty or the channel lengths differ.
    pub fn from_channels(channels: Vec<Vec<f32>>) -> Self {
        assert!(!channels.is_empty(), "AudioBlock needs at least one channel");
        let num_samples = channels[0].len();
        assert!(
            channels.iter().all(|c| c.len() == num_samples),
            "all channels must have the same length"
        );
        let num_channels = channels.len();
        let mut data = Vec::with_capacity(num_channels * num_samples);
        for channel in channels {
            data.extend_from_slice(&channel);
        }
        Self {
            num_channels,
            num_samples,
            data,
        }
    }

    /// Build a mono block from a sample vector.
    pub fn from_mono(samples: Vec<f32>) -> Self {
        let num_samples = samples.len();
        Self {
            num_channels: 1,
            num_samples,
            data: samples,
        }
    }

    /// Duplicate a mono channel into a stereo block.
    pub fn from_mono_duplicated(samples: &[f32]) -> Self {
        let mut data = Vec::with_capacity(samples.len() * 2);
        data.extend_from_slice(samples);
        data.extend_from_slice(samples);
        Self {
            num_channels: 2,
            num_samples: samples.len(),
            data,
        }
    }

    /// Number of channels (1 or 2 in practice).
    #[inline]
    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    /// Number of samples per channel.
    #[inline]
    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    /// True if the block holds no samples.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.num_samples == 0
    }

    /// Immutable view of one channel.
    ///
    /// # Panics
    /// Panics if `channel >= num_channels()`.
    #[inline]
    pub fn channel(&self, channel: usize) -> &[f32] {
        assert!(channel < self.num_channels, "channel index out of range");
        let start = channel * self.num_samples;
        &self.data[start..start + self.num_samples]
    }

    /// Mutable view of one channel.
    ///
    /// # Panics
    /// Panics if `channel >= num_channels()`.
    #[inline]
    pub fn channel_mut(&mut self, channel: usize) -> &mut [f32] {
        assert!(channel < self.num_channels, "channel index out of range");
        let start = channel * self.num_samples;
        &mut self.data[start..start + self.num_samples]
    }

    /// Copy `len` samples starting at `src_offset` from every channel of
    /// `src` into this block starting at `dst_offset`.
    ///
    /// Channel counts must match; ranges must be in bounds.
    pub fn copy_range_from(
        &mut self,
        src: &AudioBlock,
        src_offset: usize,
        dst_offset: usize,
        len: usize,
    ) {
        assert_eq!(self.num_channels, src.num_channels, "channel count mismatch");
        for ch in 0..self.num_channels {
            let src_ch = src.channel(ch);
            let dst_ch = self.channel_mut(ch);
            dst_ch[dst_offset..dst_offset + len]
                .copy_from_slice(&src_ch[src_offset..src_offset + len]);
        }
    }

    /// Zero every sample.
    pub fn clear(&mut self) {
        self.data.fill(0.0);
    }

    /// Flat view over all samples, channel-major. Mostly useful for scans
    /// that do not care which channel a sample belongs to.
    #[inline]
    pub fn samples(&self) -> &[f32] {
        &self.data
    }

    /// Flat mutable view over all samples, channel-major.
    #[inline]
    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }
}
