//! Engine validation: driving, protocols, sweeps, profiling, orchestration.
//!
//! The harness treats an engine as a black box behind the
//! [`soundcheck_core::Engine`] contract and asks it a fixed battery of
//! questions:
//!
//! - [`driver`] - owns the engine lifecycle and block-feeds stimuli
//! - [`sweep`] - characterizes each parameter over its full range
//! - [`protocols`] - the generic battery plus per-category batteries
//! - [`profiler`] - CPU budget measurement on a monotonic clock
//! - [`result`] - the severity-graded result tree
//! - [`orchestrator`] - sequential or worker-pool execution over many
//!   engines, with progress callbacks and a stop flag
//! - [`config`] - the run configuration, optionally loaded from TOML

pub mod config;
pub mod driver;
pub mod orchestrator;
pub mod profiler;
pub mod protocols;
pub mod result;
pub mod sweep;

pub use config::{RunConfig, ValidationLevel};
pub use driver::EngineHandle;
pub use orchestrator::{run_batch, run_suite, Progress};
pub use profiler::CpuProfile;
pub use result::{BatchResults, EngineTestSuite, TestCategory, TestResult};
pub use sweep::SweepResult;
