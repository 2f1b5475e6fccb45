//! Infrastructure errors that are fatal to a harness run.
//!
//! Test-observable failures (NaN output, invariance violations, budget
//! overruns) never surface here - they become `TestResult`s. This enum
//! covers misuse of the harness itself and the few conditions that abort a
//! run.

use thiserror::Error;

/// Errors that abort the harness rather than a single test.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Misuse of the harness API (invalid signal kind, zero sample rate,
    /// empty engine list). Maps to exit code 4.
    #[error("programmer error: {0}")]
    Programmer(String),

    /// The engine factory returned `None` for an id the caller insisted on.
    #[error("engine {id} could not be created")]
    EngineCreation {
        /// The id passed to the factory.
        id: u32,
    },

    /// A run configuration value is out of its documented range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failed to write a report file.
    #[error("failed to write report '{path}': {source}")]
    ReportWrite {
        /// Destination path of the report.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl HarnessError {
    /// Create a programmer error from any displayable value.
    pub fn programmer(msg: impl Into<String>) -> Self {
        HarnessError::Programmer(msg.into())
    }

    /// Create a report-write error.
    pub fn report_write(path: impl Into<std::path::PathBuf>, source: std::io::Error) -> Self {
        HarnessError::ReportWrite {
            path: path.into(),
            source,
        }
    }
}
