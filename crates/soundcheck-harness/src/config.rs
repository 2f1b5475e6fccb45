//! Run configuration.
//!
//! A [`RunConfig`] carries everything a batch run needs; no module-level
//! state anywhere. Configs come from CLI flags or a TOML file.

use serde::{Deserialize, Serialize};
use soundcheck_core::HarnessError;
use std::path::{Path, PathBuf};

/// How deep a validation run goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ValidationLevel {
    /// Generic battery only.
    Basic,
    /// Generic battery, category battery, CPU profile.
    #[default]
    Standard,
    /// Standard plus a full sweep of every parameter.
    Comprehensive,
    /// Comprehensive with extended stress stimuli and more rapid-change
    /// iterations.
    Stress,
}

impl ValidationLevel {
    /// Display name used in reports.
    pub const fn name(self) -> &'static str {
        match self {
            ValidationLevel::Basic => "basic",
            ValidationLevel::Standard => "standard",
            ValidationLevel::Comprehensive => "comprehensive",
            ValidationLevel::Stress => "stress",
        }
    }

    /// Number of result categories a full suite at this level produces.
    /// Used as the denominator of the overall score, so a battery that
    /// never ran drags the score down instead of being ignored.
    pub const fn expected_categories(self) -> usize {
        match self {
            ValidationLevel::Basic => 1,
            ValidationLevel::Standard => 3,
            ValidationLevel::Comprehensive | ValidationLevel::Stress => 4,
        }
    }
}

impl std::fmt::Display for ValidationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Configuration for one batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Sample rate for all tests that do not themselves vary it.
    pub sample_rate: f32,
    /// Processing block size.
    pub block_size: usize,
    /// Stimulus duration per test, in seconds.
    pub duration_secs: f32,
    /// Points per parameter sweep.
    pub sweep_steps: usize,
    /// How deep to test.
    pub level: ValidationLevel,
    /// Run engines on a worker pool.
    pub parallel: bool,
    /// Worker count; 0 means available parallelism.
    pub max_threads: usize,
    /// Where report files land.
    pub output_dir: PathBuf,
    /// Hard per-engine timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100.0,
            block_size: 512,
            duration_secs: 2.0,
            sweep_steps: 20,
            level: ValidationLevel::Standard,
            parallel: true,
            max_threads: 0,
            output_dir: PathBuf::from("soundcheck-reports"),
            timeout_secs: 60,
        }
    }
}

impl RunConfig {
    /// Check every field against its documented range.
    pub fn validate(&self) -> Result<(), HarnessError> {
        if !(self.sample_rate > 0.0) {
            return Err(HarnessError::InvalidConfig(format!(
                "sample_rate must be positive, got {}",
                self.sample_rate
            )));
        }
        if self.block_size == 0 {
            return Err(HarnessError::InvalidConfig(
                "block_size must be at least 1".to_string(),
            ));
        }
        if !(self.duration_secs > 0.0) {
            return Err(HarnessError::InvalidConfig(format!(
                "duration_secs must be positive, got {}",
                self.duration_secs
            )));
        }
        if self.sweep_steps < 2 {
            return Err(HarnessError::InvalidConfig(
                "sweep_steps must be at least 2".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(HarnessError::InvalidConfig(
                "timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Load and validate a config from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, HarnessError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| HarnessError::InvalidConfig(format!("{}: {e}", path.display())))?;
        let config: RunConfig = toml::from_str(&text)
            .map_err(|e| HarnessError::InvalidConfig(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Effective worker count for a parallel run.
    pub fn worker_count(&self) -> usize {
        if self.max_threads > 0 {
            self.max_threads
        } else {
            std::thread::available_parallelism().map_or(1, std::num::NonZero::get)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        RunConfig::default().validate().expect("defaults must be valid");
    }

    #[test]
    fn bad_fields_are_rejected() {
        for mutate in [
            (|c: &mut RunConfig| c.sample_rate = 0.0) as fn(&mut RunConfig),
            |c| c.block_size = 0,
            |c| c.duration_secs = -1.0,
            |c| c.sweep_steps = 1,
            |c| c.timeout_secs = 0,
        ] {
            let mut config = RunConfig::default();
            mutate(&mut config);
            assert!(config.validate().is_err());
        }
    }

    #[test]
    fn toml_round_trip() {
        let config = RunConfig {
            sample_rate: 96000.0,
            level: ValidationLevel::Comprehensive,
            ..RunConfig::default()
        };
        let text = toml::to_string(&config).expect("serialize");
        let back: RunConfig = toml::from_str(&text).expect("parse");
        assert_eq!(back.sample_rate, 96000.0);
        assert_eq!(back.level, ValidationLevel::Comprehensive);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let text = "sample_rate = 48000.0\nnot_a_field = 1\n";
        assert!(toml::from_str::<RunConfig>(text).is_err());
    }

    #[test]
    fn level_category_counts() {
        assert_eq!(ValidationLevel::Basic.expected_categories(), 1);
        assert_eq!(ValidationLevel::Standard.expected_categories(), 3);
        assert_eq!(ValidationLevel::Stress.expected_categories(), 4);
    }
}
