//! Engine discovery and creation.
//!
//! The harness enumerates engines through an [`EngineFactory`]: stable
//! nonnegative integer ids, a category per id for battery selection, and a
//! `create` that may fail (a failed creation is itself a test outcome).

use crate::Engine;
use serde::{Deserialize, Serialize};

/// Category of DSP engine, used to pick the test battery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineCategory {
    /// Compressors, limiters, gates, expanders.
    Dynamics,
    /// Lowpass, highpass, EQ, wah.
    Filter,
    /// Delay, reverb, echo.
    TimeBased,
    /// Chorus, flanger, phaser, tremolo, vibrato.
    Modulation,
    /// Distortion, overdrive, saturation, bit reduction.
    Distortion,
    /// Stereo imagers, spectral processors, vocoders.
    Spectral,
    /// Gain stages, mono-makers, routing utilities.
    Utility,
    /// Engines that produce signal from silence (noise and chaos sources).
    Generator,
}

impl EngineCategory {
    /// Human-readable category name.
    pub const fn name(&self) -> &'static str {
        match self {
            EngineCategory::Dynamics => "Dynamics",
            EngineCategory::Filter => "Filter",
            EngineCategory::TimeBased => "Time-Based",
            EngineCategory::Modulation => "Modulation",
            EngineCategory::Distortion => "Distortion",
            EngineCategory::Spectral => "Spectral",
            EngineCategory::Utility => "Utility",
            EngineCategory::Generator => "Generator",
        }
    }

    /// All categories, in report order.
    pub const fn all() -> [EngineCategory; 8] {
        [
            EngineCategory::Dynamics,
            EngineCategory::Filter,
            EngineCategory::TimeBased,
            EngineCategory::Modulation,
            EngineCategory::Distortion,
            EngineCategory::Spectral,
            EngineCategory::Utility,
            EngineCategory::Generator,
        ]
    }
}

/// Creates engines by stable integer id.
pub trait EngineFactory {
    /// All ids this factory can create, in ascending order.
    fn engine_ids(&self) -> Vec<u32>;

    /// Display name for an id without creating the engine.
    fn engine_name(&self, id: u32) -> Option<&str>;

    /// Category for an id, used to select the test battery.
    fn category(&self, id: u32) -> Option<EngineCategory>;

    /// Create an engine. `None` models a creation failure; the harness
    /// records it as a CRITICAL suite result rather than an error.
    fn create(&self, id: u32) -> Option<Box<dyn Engine>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_names() {
        assert_eq!(EngineCategory::Dynamics.name(), "Dynamics");
        assert_eq!(EngineCategory::TimeBased.name(), "Time-Based");
        assert_eq!(EngineCategory::Generator.name(), "Generator");
    }

    #[test]
    fn all_categories_are_unique() {
        let all = EngineCategory::all();
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
