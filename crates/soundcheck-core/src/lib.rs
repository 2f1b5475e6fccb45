//! Core contracts and data model for the soundcheck validation harness.
//!
//! This crate defines everything the rest of the workspace agrees on:
//!
//! - [`AudioBlock`] - the buffer type every stimulus and measurement works on
//! - [`Engine`] - the consumed contract for black-box DSP processors
//! - [`EngineFactory`] / [`EngineCategory`] - engine discovery and creation
//! - [`Severity`] - graded severity shared by anomalies and test results
//! - [`HarnessError`] - infrastructure errors that are fatal to a run
//! - [`reference`] - a small factory of reference engines for demos and tests
//!
//! # Example
//!
//! ```rust
//! use soundcheck_core::reference::ReferenceFactory;
//! use soundcheck_core::{AudioBlock, EngineFactory};
//!
//! let factory = ReferenceFactory::new();
//! let mut engine = factory.create(0).expect("gain engine exists");
//! engine.prepare_to_play(48000.0, 512);
//!
//! let mut block = AudioBlock::silence(2, 512);
//! engine.process(&mut block);
//! assert!(block.channel(0).iter().all(|s| s.is_finite()));
//! ```

pub mod block;
pub mod engine;
pub mod error;
pub mod factory;
pub mod level;
pub mod reference;
pub mod severity;

pub use block::AudioBlock;
pub use engine::{Engine, ParameterState};
pub use error::HarnessError;
pub use factory::{EngineCategory, EngineFactory};
pub use level::{db_to_linear, linear_to_db};
pub use severity::Severity;
