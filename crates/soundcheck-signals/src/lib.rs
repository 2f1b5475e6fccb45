//! Deterministic stimulus synthesis.
//!
//! Everything the harness feeds into an engine comes from here: sines,
//! log-frequency chirps, white and pink noise, impulses, tone bursts,
//! two-tone and chord stimuli, drum hits, silence, DC, and extreme-level
//! signals. Generation is bit-reproducible: the same arguments always
//! produce the same samples, so measurements are comparable across runs.
//!
//! # Example
//!
//! ```
//! use soundcheck_signals::{generate, SignalKind, SignalParams};
//!
//! let params = SignalParams {
//!     frequency: 440.0,
//!     ..SignalParams::default()
//! };
//! let stimulus = generate(SignalKind::Sine, 48000.0, 1.0, 0.5, params).unwrap();
//! assert_eq!(stimulus.block.num_samples(), 48000);
//! ```

pub mod cache;
mod generate;
mod kind;
mod noise;

pub use cache::StimulusCache;
pub use generate::{generate, generate_with, StereoMode, Stimulus};
pub use kind::{SignalKind, SignalParams};
