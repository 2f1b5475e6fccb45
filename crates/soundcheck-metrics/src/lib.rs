//! The measurement kernel.
//!
//! Every number the harness reports about an engine's output is computed
//! here, grouped by family:
//!
//! - [`level`] - RMS, peak, crest factor, DC offset, stereo correlation,
//!   noise floor, sustained-oscillation detection
//! - [`spectral`] - magnitude/phase spectra, peak frequency, THD, IMD
//! - [`timing`] - attack/release envelope timing, cross-correlation delay,
//!   Schroeder RT60
//! - [`modulation`] - modulation rate and depth via envelope
//!   autocorrelation
//! - [`anomaly`] - single-pass NaN/Inf/denormal/overload scanning
//!
//! Measurements read blocks without mutating them; stereo measurements
//! default to channel 0 unless the quantity is inherently two-channel.

pub mod anomaly;
pub mod fft;
pub mod level;
pub mod modulation;
pub mod spectral;
pub mod timing;

pub use anomaly::AnomalyReport;
pub use fft::{Fft, Window};
pub use modulation::ModulationProfile;
pub use spectral::FrequencyResponse;
pub use timing::EnvelopeTiming;
