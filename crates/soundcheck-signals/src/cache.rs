//! Caching for the canonical stimuli.
//!
//! Batch runs regenerate the same handful of signals for every engine.
//! Canonical stimuli (silence, the 440 Hz sine, white noise, the impulse)
//! are cached per exact `(sample_rate, duration, amplitude)` key; anything
//! parameterized beyond that is generated fresh.

use crate::generate::{generate, Stimulus};
use crate::kind::{SignalKind, SignalParams};
use soundcheck_core::HarnessError;
use std::collections::HashMap;
use std::sync::Arc;

/// Key by bit pattern, so 44100.0 and 44100.000001 never alias.
#[derive(PartialEq, Eq, Hash, Clone, Copy)]
struct CacheKey {
    kind: SignalKind,
    sample_rate: u32,
    duration: u32,
    amplitude: u32,
}

impl CacheKey {
    fn new(kind: SignalKind, sample_rate: f32, duration: f32, amplitude: f32) -> Self {
        Self {
            kind,
            sample_rate: sample_rate.to_bits(),
            duration: duration.to_bits(),
            amplitude: amplitude.to_bits(),
        }
    }
}

/// Cache of canonical stimuli. Not shared across threads; each worker owns
/// one.
#[derive(Default)]
pub struct StimulusCache {
    entries: HashMap<CacheKey, Arc<Stimulus>>,
}

impl StimulusCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Kinds worth caching: the ones batch tests request with default
    /// parameters.
    fn is_canonical(kind: SignalKind) -> bool {
        matches!(
            kind,
            SignalKind::Silence | SignalKind::Sine | SignalKind::WhiteNoise | SignalKind::Impulse
        )
    }

    /// Fetch a default-parameter stimulus, generating and caching it on
    /// first use. Non-canonical kinds bypass the cache entirely.
    pub fn get(
        &mut self,
        kind: SignalKind,
        sample_rate: f32,
        duration: f32,
        amplitude: f32,
    ) -> Result<Arc<Stimulus>, HarnessError> {
        if !Self::is_canonical(kind) {
            return Ok(Arc::new(generate(
                kind,
                sample_rate,
                duration,
                amplitude,
                SignalParams::default(),
            )?));
        }
        let key = CacheKey::new(kind, sample_rate, duration, amplitude);
        if let Some(hit) = self.entries.get(&key) {
            return Ok(Arc::clone(hit));
        }
        let stimulus = Arc::new(generate(
            kind,
            sample_rate,
            duration,
            amplitude,
            SignalParams::default(),
        )?);
        self.entries.insert(key, Arc::clone(&stimulus));
        Ok(stimulus)
    }

    /// Number of cached stimuli.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing has been cached yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_requests_share_the_allocation() {
        let mut cache = StimulusCache::new();
        let a = cache.get(SignalKind::Sine, 48000.0, 1.0, 0.5).expect("a");
        let b = cache.get(SignalKind::Sine, 48000.0, 1.0, 0.5).expect("b");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn distinct_keys_do_not_alias() {
        let mut cache = StimulusCache::new();
        let a = cache.get(SignalKind::Sine, 48000.0, 1.0, 0.5).expect("a");
        let b = cache.get(SignalKind::Sine, 44100.0, 1.0, 0.5).expect("b");
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn non_canonical_kinds_bypass_the_cache() {
        let mut cache = StimulusCache::new();
        let _ = cache.get(SignalKind::Chirp, 48000.0, 1.0, 0.5).expect("chirp");
        assert!(cache.is_empty());
    }
}
