//! Single-pass numerical anomaly scanning.

use serde::Serialize;
use soundcheck_core::{AudioBlock, Severity};

/// Samples above this magnitude count toward the clip count.
const CLIP_THRESHOLD: f32 = 1.5;
/// More clipped samples than this is excessive.
const MAX_CLIPPED_SAMPLES: usize = 10;

/// Everything suspicious found in one pass over a block.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct AnomalyReport {
    /// At least one NaN sample.
    pub has_nan: bool,
    /// At least one infinite sample.
    pub has_inf: bool,
    /// At least one subnormal sample.
    pub has_denormal: bool,
    /// Largest finite |x| seen.
    pub peak: f32,
    /// Samples with |x| > 1.5.
    pub clipped_samples: usize,
}

impl AnomalyReport {
    /// Scan a block. One pass over all samples.
    pub fn scan(block: &AudioBlock) -> Self {
        let mut report = AnomalyReport::default();
        for &x in block.samples() {
            if x.is_nan() {
                report.has_nan = true;
                continue;
            }
            if x.is_infinite() {
                report.has_inf = true;
                continue;
            }
            let mag = x.abs();
            if mag > 0.0 && mag < f32::MIN_POSITIVE {
                report.has_denormal = true;
            }
            if mag > report.peak {
                report.peak = mag;
            }
            if mag > CLIP_THRESHOLD {
                report.clipped_samples += 1;
            }
        }
        report
    }

    /// True when any sample was NaN or Inf.
    pub fn has_non_finite(&self) -> bool {
        self.has_nan || self.has_inf
    }

    /// Grade the findings. NaN/Inf or a peak beyond 2.0 is CRITICAL;
    /// peak beyond 1.2 or an excessive clip count is ERROR; peak beyond
    /// full scale or denormals is WARNING.
    pub fn severity(&self) -> Severity {
        if self.has_non_finite() || self.peak > 2.0 {
            Severity::Critical
        } else if self.peak > 1.2 || self.clipped_samples > MAX_CLIPPED_SAMPLES {
            Severity::Error
        } else if self.peak > 1.0 || self.has_denormal {
            Severity::Warning
        } else {
            Severity::Info
        }
    }

    /// Short human-readable summary of the findings, or `None` if clean.
    pub fn describe(&self) -> Option<String> {
        let mut parts = Vec::new();
        if self.has_nan {
            parts.push("NaN samples".to_string());
        }
        if self.has_inf {
            parts.push("infinite samples".to_string());
        }
        if self.has_denormal {
            parts.push("denormal samples".to_string());
        }
        if self.peak > 1.0 {
            parts.push(format!("peak {:.3} above full scale", self.peak));
        }
        if self.clipped_samples > MAX_CLIPPED_SAMPLES {
            parts.push(format!("{} samples beyond +-1.5", self.clipped_samples));
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_block_is_info() {
        let block = AudioBlock::from_mono(vec![0.5, -0.5, 0.9, -0.9]);
        let report = AnomalyReport::scan(&block);
        assert_eq!(report.severity(), Severity::Info);
        assert!(report.describe().is_none());
        assert!((report.peak - 0.9).abs() < 1e-6);
    }

    #[test]
    fn nan_is_critical() {
        let block = AudioBlock::from_mono(vec![0.0, f32::NAN, 0.0]);
        let report = AnomalyReport::scan(&block);
        assert!(report.has_nan);
        assert_eq!(report.severity(), Severity::Critical);
    }

    #[test]
    fn inf_is_critical() {
        let block = AudioBlock::from_mono(vec![f32::INFINITY]);
        let report = AnomalyReport::scan(&block);
        assert!(report.has_inf);
        assert_eq!(report.severity(), Severity::Critical);
    }

    #[test]
    fn peak_grading_ladder() {
        let grade = |p: f32| AnomalyReport::scan(&AudioBlock::from_mono(vec![p])).severity();
        assert_eq!(grade(0.99), Severity::Info);
        assert_eq!(grade(1.1), Severity::Warning);
        assert_eq!(grade(1.3), Severity::Error);
        assert_eq!(grade(2.5), Severity::Critical);
    }

    #[test]
    fn denormals_are_a_warning() {
        let block = AudioBlock::from_mono(vec![f32::MIN_POSITIVE / 2.0; 4]);
        let report = AnomalyReport::scan(&block);
        assert!(report.has_denormal);
        assert_eq!(report.severity(), Severity::Warning);
    }

    #[test]
    fn excessive_clipping_is_an_error() {
        // Eleven samples beyond 1.5 but each at most 2.0.
        let block = AudioBlock::from_mono(vec![1.6; 11]);
        let report = AnomalyReport::scan(&block);
        assert_eq!(report.clipped_samples, 11);
        assert_eq!(report.severity(), Severity::Error);
    }

    #[test]
    fn a_few_clipped_samples_are_tolerated() {
        let block = AudioBlock::from_mono(vec![1.6; 5]);
        let report = AnomalyReport::scan(&block);
        // Severity comes from the peak grading, not the clip count.
        assert_eq!(report.severity(), Severity::Error);
        assert_eq!(report.clipped_samples, 5);
    }
}
