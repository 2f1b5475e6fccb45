//! The consumed engine contract.
//!
//! The harness treats every DSP processor as an opaque [`Engine`]: a named
//! object with a dense, zero-based list of normalized parameters and an
//! in-place block processor. The lifecycle is
//! `prepare_to_play` -> (`process` | `update_parameters` | `reset`)* and the
//! contract guarantees:
//!
//! - `prepare_to_play` precedes the first `process`
//! - `reset` clears internal state so that silence in yields silence out
//!   within one block
//! - `update_parameters` is cheap enough to call between any two blocks
//! - parameter values outside \[0, 1\] are clamped or at least never produce
//!   NaN/Inf
//!
//! The trait is object-safe; the harness always drives `Box<dyn Engine>`.

use crate::AudioBlock;
use std::collections::BTreeMap;

/// A partial mapping from parameter index to normalized value in \[0, 1\].
///
/// Indices not present keep the engine's current value. `BTreeMap` keeps
/// iteration deterministic, which matters for reproducible test runs.
pub type ParameterState = BTreeMap<usize, f32>;

/// Black-box DSP processor under test.
pub trait Engine: Send {
    /// Human-readable engine name.
    fn name(&self) -> &str;

    /// Number of exposed parameters. Valid indices are `0..num_parameters()`.
    fn num_parameters(&self) -> usize;

    /// Name of the parameter at `index`.
    ///
    /// Implementations may return an empty string for out-of-range indices;
    /// the harness never asks for them.
    fn parameter_name(&self, index: usize) -> &str;

    /// Prepare for processing at the given sample rate and block size.
    ///
    /// Must be callable repeatedly; each call fully re-initialises
    /// rate-dependent state.
    fn prepare_to_play(&mut self, sample_rate: f64, block_size: usize);

    /// Clear all internal state (delay lines, filter history, envelopes)
    /// without changing parameters.
    fn reset(&mut self);

    /// Apply a (possibly partial) parameter state. Takes effect from the
    /// next processed block.
    fn update_parameters(&mut self, state: &ParameterState);

    /// Process one block in place. `block.num_samples()` equals the block
    /// size passed to the last `prepare_to_play`.
    fn process(&mut self, block: &mut AudioBlock);

    /// Canonical default parameter state, as declared by the engine.
    ///
    /// The harness applies this where a test calls for "default" settings;
    /// it never invents category-specific defaults. An empty map means the
    /// engine's construction-time values are already canonical.
    fn default_parameters(&self) -> ParameterState {
        ParameterState::new()
    }

    /// Index of the wet/dry mix parameter, if the engine declares one.
    ///
    /// When `None`, the harness falls back to a name-substring heuristic
    /// ("mix", "wet", "dry", "blend", "amount").
    fn mix_parameter_index(&self) -> Option<usize> {
        None
    }

    /// True for engines that intentionally produce output from silence
    /// (noise sources, oscillators). Such engines are exempt from the
    /// silence-in/silence-out invariant and must instead produce signal.
    fn is_generator(&self) -> bool {
        false
    }
}
