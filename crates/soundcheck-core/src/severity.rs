//! Severity grading shared by anomaly detection and test results.

use serde::{Deserialize, Serialize};

/// How bad a finding is. Ordering is meaningful: `Critical` > `Error` >
/// `Warning` > `Info`, so severities can be compared and rolled up with
/// `max`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Informational; the test passed or the finding is cosmetic.
    #[default]
    Info,
    /// Suspicious but usable; the engine should be reviewed.
    Warning,
    /// A contract violation; the engine misbehaves audibly or numerically.
    Error,
    /// Unusable: NaN/Inf output, crash, creation failure, or timeout.
    Critical,
}

impl Severity {
    /// Score contribution of a test at this severity: pass 100, warning 50,
    /// error 25, critical 0.
    pub const fn score(self) -> f32 {
        match self {
            Severity::Info => 100.0,
            Severity::Warning => 50.0,
            Severity::Error => 25.0,
            Severity::Critical => 0.0,
        }
    }

    /// Uppercase label used in text reports.
    pub const fn label(self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_reflects_badness() {
        assert!(Severity::Critical > Severity::Error);
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
    }

    #[test]
    fn scores_match_rollup_rule() {
        assert_eq!(Severity::Info.score(), 100.0);
        assert_eq!(Severity::Warning.score(), 50.0);
        assert_eq!(Severity::Error.score(), 25.0);
        assert_eq!(Severity::Critical.score(), 0.0);
    }

    #[test]
    fn max_rollup() {
        let worst = [Severity::Info, Severity::Error, Severity::Warning]
            .into_iter()
            .max()
            .unwrap();
        assert_eq!(worst, Severity::Error);
    }

    #[test]
    fn display_is_uppercase() {
        assert_eq!(Severity::Warning.to_string(), "WARNING");
    }
}
