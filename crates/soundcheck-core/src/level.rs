//! Decibel conversion helpers with the harness-wide numerical guards.
//!
//! Every dB conversion in the workspace goes through these so the clamp
//! policy (argument floored at 1e-10 before the log) is applied in exactly
//! one place.

/// Linear amplitude to decibels. The argument is clamped to 1e-10, so the
/// floor of the scale is -200 dB.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    20.0 * linear.max(1e-10).log10()
}

/// Decibels to linear amplitude.
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unity_is_zero_db() {
        assert!(linear_to_db(1.0).abs() < 1e-6);
    }

    #[test]
    fn half_is_about_minus_six_db() {
        assert!((linear_to_db(0.5) + 6.0206).abs() < 0.001);
    }

    #[test]
    fn zero_clamps_to_floor() {
        assert_eq!(linear_to_db(0.0), -200.0);
        assert_eq!(linear_to_db(-1.0), -200.0);
    }

    #[test]
    fn round_trip() {
        for &db in &[-60.0, -20.0, -3.0, 0.0, 6.0] {
            let rt = linear_to_db(db_to_linear(db));
            assert!((rt - db).abs() < 0.001, "round trip failed for {db}: {rt}");
        }
    }
}
