//! Deterministic noise sources.

/// xorshift32 PRNG with a fixed default seed. Fast, portable, and good
/// enough for audio test noise; never used for anything security-adjacent.
pub(crate) struct Xorshift32 {
    state: u32,
}

impl Xorshift32 {
    pub(crate) const DEFAULT_SEED: u32 = 0x9E37_79B9;

    pub(crate) fn new(seed: u32) -> Self {
        Self {
            state: if seed == 0 { Self::DEFAULT_SEED } else { seed },
        }
    }

    fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    /// Uniform sample in [-1, 1].
    pub(crate) fn next_f32(&mut self) -> f32 {
        (self.next_u32() as f32 / u32::MAX as f32) * 2.0 - 1.0
    }
}

/// Paul Kellet's six-state pink-noise filter over a white source.
/// Approximates a -3 dB/octave slope across the audio band.
pub(crate) struct PinkFilter {
    b: [f32; 7],
}

impl PinkFilter {
    pub(crate) fn new() -> Self {
        Self { b: [0.0; 7] }
    }

    pub(crate) fn process(&mut self, white: f32) -> f32 {
        let b = &mut self.b;
        b[0] = 0.99886 * b[0] + white * 0.055_517_9;
        b[1] = 0.99332 * b[1] + white * 0.075_075_9;
        b[2] = 0.96900 * b[2] + white * 0.153_852_0;
        b[3] = 0.86650 * b[3] + white * 0.310_485_6;
        b[4] = 0.55000 * b[4] + white * 0.532_952_2;
        b[5] = -0.7616 * b[5] - white * 0.016_898_0;
        let pink = b[0] + b[1] + b[2] + b[3] + b[4] + b[5] + b[6] + white * 0.5362;
        b[6] = white * 0.115_926;
        pink * 0.11
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xorshift_is_deterministic() {
        let mut a = Xorshift32::new(Xorshift32::DEFAULT_SEED);
        let mut b = Xorshift32::new(Xorshift32::DEFAULT_SEED);
        for _ in 0..1000 {
            assert_eq!(a.next_f32().to_bits(), b.next_f32().to_bits());
        }
    }

    #[test]
    fn xorshift_zero_seed_is_remapped() {
        // A zero state would lock the generator at zero forever.
        let mut rng = Xorshift32::new(0);
        assert_ne!(rng.next_u32(), 0);
    }

    #[test]
    fn xorshift_stays_in_range() {
        let mut rng = Xorshift32::new(1);
        for _ in 0..10_000 {
            let x = rng.next_f32();
            assert!((-1.0..=1.0).contains(&x));
        }
    }

    #[test]
    fn pink_filter_output_is_bounded() {
        let mut rng = Xorshift32::new(Xorshift32::DEFAULT_SEED);
        let mut pink = PinkFilter::new();
        for _ in 0..48_000 {
            let p = pink.process(rng.next_f32());
            assert!(p.abs() < 1.5, "pink sample out of expected range: {p}");
        }
    }
}
