//! Test batteries.
//!
//! [`generic`] holds the battery every engine gets; the sibling modules
//! hold the per-category add-ons. Each battery produces a
//! [`TestCategory`](crate::result::TestCategory) and traps every engine
//! failure as a result instead of an error.

pub mod distortion;
pub mod dynamics;
pub mod filter;
pub mod generic;
pub mod modulation;
pub mod spectral_util;
pub mod time_based;

use crate::config::RunConfig;
use crate::driver::{EngineHandle, ProcessPanic};
use crate::result::{TestCategory, TestResult};
use soundcheck_core::{EngineCategory, HarnessError, ParameterState, Severity};
use soundcheck_signals::StimulusCache;

/// Name substrings that mark a parameter as mix-like. Fallback only; an
/// engine-declared mix index wins.
const MIX_NAME_HINTS: [&str; 5] = ["mix", "wet", "dry", "blend", "amount"];
/// Name substrings that mark a parameter as a bypass toggle.
const BYPASS_NAME_HINTS: [&str; 2] = ["bypass", "enable"];
/// Name substrings that mark a parameter as drive-like.
const DRIVE_NAME_HINTS: [&str; 3] = ["drive", "gain", "distort"];

/// Run the category-specific battery for an engine.
pub fn category_battery(
    handle: &mut EngineHandle,
    category: EngineCategory,
    config: &RunConfig,
    cache: &mut StimulusCache,
) -> Result<TestCategory, HarnessError> {
    match category {
        EngineCategory::Dynamics => dynamics::run(handle, config),
        EngineCategory::Filter => filter::run(handle, config),
        EngineCategory::TimeBased => time_based::run(handle, config, cache),
        EngineCategory::Modulation => modulation::run(handle, config),
        EngineCategory::Distortion => distortion::run(handle, config),
        EngineCategory::Spectral | EngineCategory::Utility | EngineCategory::Generator => {
            spectral_util::run(handle, config, cache)
        }
    }
}

/// A trapped `process` panic, graded CRITICAL.
pub(crate) fn panic_result(name: &str, panic: &ProcessPanic) -> TestResult {
    TestResult::fail(
        name,
        Severity::Critical,
        format!("engine panicked: {}", panic.message),
    )
    .with_recommendation("guard buffer indexing and internal state in process()")
}

/// The engine's mix parameter: declared index first, name heuristic as
/// fallback.
pub fn find_mix_parameter(handle: &EngineHandle) -> Option<usize> {
    if let Some(declared) = handle.mix_parameter_index() {
        return Some(declared);
    }
    find_by_name(handle, &MIX_NAME_HINTS)
}

/// A bypass-like parameter, by name.
pub fn find_bypass_parameter(handle: &EngineHandle) -> Option<usize> {
    find_by_name(handle, &BYPASS_NAME_HINTS)
}

/// A drive-like parameter, by name; falls back to parameter 0 when the
/// engine has parameters but none matches.
pub fn find_drive_parameter(handle: &EngineHandle) -> Option<usize> {
    find_by_name(handle, &DRIVE_NAME_HINTS).or(if handle.num_parameters() > 0 {
        Some(0)
    } else {
        None
    })
}

fn find_by_name(handle: &EngineHandle, hints: &[&str]) -> Option<usize> {
    (0..handle.num_parameters()).find(|&i| {
        let name = handle.parameter_name(i).to_ascii_lowercase();
        hints.iter().any(|hint| name.contains(hint))
    })
}

/// Apply the engine's declared defaults and clear its state.
pub fn to_default_state(handle: &mut EngineHandle) {
    let defaults = handle.default_parameters();
    handle.apply(&defaults);
    handle.reset();
}

/// Deterministic parameter randomizer for the rapid-change and contention
/// tests.
pub struct ParamRng {
    state: u32,
}

impl ParamRng {
    /// Fixed-seed randomizer; every run exercises the same sequence.
    pub fn new() -> Self {
        Self { state: 0x2545_F491 }
    }

    /// Next value in [0, 1].
    pub fn next_value(&mut self) -> f32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x as f32 / u32::MAX as f32
    }

    /// A full random state over all of the engine's parameters.
    pub fn random_state(&mut self, num_parameters: usize) -> ParameterState {
        (0..num_parameters).map(|i| (i, self.next_value())).collect()
    }
}

impl Default for ParamRng {
    fn default() -> Self {
        Self::new()
    }
}
