//! Signal kinds and their parameters.

use serde::{Deserialize, Serialize};

/// The stimulus families the generator can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignalKind {
    /// All-zero block.
    Silence,
    /// Pure sine at `frequency` with optional starting `phase`.
    Sine,
    /// Logarithmic frequency sweep from `start_freq` to `end_freq` with
    /// continuous phase.
    Chirp,
    /// Uniform white noise from a fixed-seed PRNG.
    WhiteNoise,
    /// Pink (1/f) noise, filtered from the white source.
    PinkNoise,
    /// Unit impulse at sample zero.
    Impulse,
    /// Sine gated on and off every `step_time` seconds.
    Burst,
    /// Two equal-amplitude tones at `start_freq` and `end_freq`.
    TwoTone,
    /// `num_tones` harmonically related tones rooted at `frequency`.
    Chord,
    /// Noise plus an 80 Hz tone under a fast exponential decay.
    DrumHit,
    /// Constant offset of `dc` scaled by amplitude.
    Dc,
    /// Sine driven to ten times the requested amplitude, for overload
    /// probing.
    ExtremeLevel,
}

impl SignalKind {
    /// Kinds built from sinusoids; these support the stereo phase offset.
    pub(crate) const fn is_sine_family(self) -> bool {
        matches!(
            self,
            SignalKind::Sine | SignalKind::Chirp | SignalKind::TwoTone | SignalKind::Chord
        )
    }
}

/// Per-kind generation parameters. Kinds read only the fields they need;
/// unread fields are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalParams {
    /// Primary frequency in Hz (sine, burst, chord root, extreme level).
    pub frequency: f32,
    /// Starting phase in radians.
    pub phase: f32,
    /// Sweep start / first tone frequency in Hz.
    pub start_freq: f32,
    /// Sweep end / second tone frequency in Hz.
    pub end_freq: f32,
    /// Gate period for bursts, in seconds.
    pub step_time: f32,
    /// Effective amplitude; `generate` overwrites this with its argument.
    pub amplitude: f32,
    /// Tone count for chords.
    pub num_tones: usize,
    /// Normalized DC value for [`SignalKind::Dc`].
    pub dc: f32,
}

impl Default for SignalParams {
    fn default() -> Self {
        Self {
            frequency: 440.0,
            phase: 0.0,
            start_freq: 20.0,
            end_freq: 20000.0,
            step_time: 0.1,
            amplitude: 1.0,
            num_tones: 4,
            dc: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let p = SignalParams::default();
        assert_eq!(p.frequency, 440.0);
        assert!(p.start_freq < p.end_freq);
        assert!(p.num_tones > 0);
    }

    #[test]
    fn sine_family_membership() {
        assert!(SignalKind::Sine.is_sine_family());
        assert!(SignalKind::Chord.is_sine_family());
        assert!(!SignalKind::WhiteNoise.is_sine_family());
        assert!(!SignalKind::Impulse.is_sine_family());
    }
}
