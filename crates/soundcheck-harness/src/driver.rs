//! Engine lifecycle and block-wise driving.

use soundcheck_core::{AudioBlock, Engine, EngineFactory, HarnessError, ParameterState};
use std::panic::{catch_unwind, AssertUnwindSafe};
use thiserror::Error;

/// Block sizes exercised by the buffer-size invariance test.
pub const BUFFER_SIZES: [usize; 7] = [1, 64, 128, 512, 1024, 2048, 4096];

/// A panic trapped at the block boundary. Test-observable: protocols turn
/// it into a CRITICAL result, the driver never recovers on its own.
#[derive(Debug, Error)]
#[error("engine panicked during process: {message}")]
pub struct ProcessPanic {
    /// Panic payload, stringified.
    pub message: String,
}

/// Owns one engine for the duration of a suite and enforces the lifecycle:
/// prepare before process, re-prepare on a sample-rate or block-size
/// change, reset between trials.
pub struct EngineHandle {
    engine: Box<dyn Engine>,
    name: String,
    sample_rate: f64,
    block_size: usize,
    prepared: bool,
}

impl EngineHandle {
    /// Create an engine through the factory.
    pub fn load(factory: &dyn EngineFactory, id: u32) -> Result<Self, HarnessError> {
        let engine = factory
            .create(id)
            .ok_or(HarnessError::EngineCreation { id })?;
        let name = engine.name().to_string();
        Ok(Self {
            engine,
            name,
            sample_rate: 0.0,
            block_size: 0,
            prepared: false,
        })
    }

    /// Wrap an already-created engine.
    pub fn from_engine(engine: Box<dyn Engine>) -> Self {
        let name = engine.name().to_string();
        Self {
            engine,
            name,
            sample_rate: 0.0,
            block_size: 0,
            prepared: false,
        }
    }

    /// Engine display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of parameters the engine declares.
    pub fn num_parameters(&self) -> usize {
        self.engine.num_parameters()
    }

    /// Name of one parameter.
    pub fn parameter_name(&self, index: usize) -> &str {
        self.engine.parameter_name(index)
    }

    /// Engine-declared default parameter state.
    pub fn default_parameters(&self) -> ParameterState {
        self.engine.default_parameters()
    }

    /// Engine-declared mix parameter, if any.
    pub fn mix_parameter_index(&self) -> Option<usize> {
        self.engine.mix_parameter_index()
    }

    /// True for engines that produce signal from silence.
    pub fn is_generator(&self) -> bool {
        self.engine.is_generator()
    }

    /// Prepare the engine. Idempotent: a call with the current sample rate
    /// and block size does nothing.
    pub fn prepare(&mut self, sample_rate: f64, block_size: usize) {
        if self.prepared && self.sample_rate == sample_rate && self.block_size == block_size {
            return;
        }
        self.engine.prepare_to_play(sample_rate, block_size);
        self.sample_rate = sample_rate;
        self.block_size = block_size;
        self.prepared = true;
    }

    /// Apply a parameter state; allowed between any two blocks.
    pub fn apply(&mut self, state: &ParameterState) {
        self.engine.update_parameters(state);
    }

    /// Request an internal-state clear.
    pub fn reset(&mut self) {
        self.engine.reset();
    }

    /// Process a whole stimulus in blocks of exactly `block_size`, the
    /// final block silence-padded, and return the concatenated output at
    /// the original length. Re-prepares if `block_size` differs from the
    /// prepared one. A panic inside `process` is trapped and surfaced.
    pub fn process_blocks(
        &mut self,
        input: &AudioBlock,
        block_size: usize,
    ) -> Result<AudioBlock, ProcessPanic> {
        let block_size = block_size.max(1);
        if !self.prepared || self.block_size != block_size {
            let sample_rate = if self.sample_rate > 0.0 {
                self.sample_rate
            } else {
                44100.0
            };
            self.prepare(sample_rate, block_size);
        }

        let channels = input.num_channels();
        let total = input.num_samples();
        let mut output = AudioBlock::silence(channels, total);
        let mut chunk = AudioBlock::silence(channels, block_size);

        let mut offset = 0;
        while offset < total {
            let len = block_size.min(total - offset);
            chunk.clear();
            chunk.copy_range_from(input, offset, 0, len);

            let engine = &mut self.engine;
            catch_unwind(AssertUnwindSafe(|| engine.process(&mut chunk))).map_err(|payload| {
                ProcessPanic {
                    message: panic_message(&*payload),
                }
            })?;

            output.copy_range_from(&chunk, 0, offset, len);
            offset += len;
        }
        Ok(output)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use soundcheck_core::reference::{Gain, ReferenceFactory};

    struct PanickingEngine;

    impl Engine for PanickingEngine {
        fn name(&self) -> &str {
            "Panicker"
        }
        fn num_parameters(&self) -> usize {
            0
        }
        fn parameter_name(&self, _index: usize) -> &str {
            ""
        }
        fn prepare_to_play(&mut self, _sample_rate: f64, _block_size: usize) {}
        fn reset(&mut self) {}
        fn update_parameters(&mut self, _state: &ParameterState) {}
        fn process(&mut self, _block: &mut AudioBlock) {
            panic!("index out of bounds simulation");
        }
    }

    /// Engine that records how many samples each process call saw.
    struct BlockRecorder {
        seen: std::sync::Arc<std::sync::Mutex<Vec<usize>>>,
    }

    impl Engine for BlockRecorder {
        fn name(&self) -> &str {
            "Recorder"
        }
        fn num_parameters(&self) -> usize {
            0
        }
        fn parameter_name(&self, _index: usize) -> &str {
            ""
        }
        fn prepare_to_play(&mut self, _sample_rate: f64, _block_size: usize) {}
        fn reset(&mut self) {}
        fn update_parameters(&mut self, _state: &ParameterState) {}
        fn process(&mut self, block: &mut AudioBlock) {
            self.seen.lock().expect("lock").push(block.num_samples());
        }
    }

    #[test]
    fn load_unknown_id_fails() {
        let factory = ReferenceFactory::new();
        assert!(EngineHandle::load(&factory, 999).is_err());
        assert!(EngineHandle::load(&factory, 0).is_ok());
    }

    #[test]
    fn every_block_has_exactly_the_block_size() {
        let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut handle = EngineHandle::from_engine(Box::new(BlockRecorder {
            seen: std::sync::Arc::clone(&seen),
        }));
        handle.prepare(48000.0, 100);
        // 250 samples in blocks of 100: the final block is padded.
        let input = AudioBlock::silence(2, 250);
        handle.process_blocks(&input, 100).expect("process");
        assert_eq!(*seen.lock().expect("lock"), vec![100, 100, 100]);
    }

    #[test]
    fn output_preserves_the_original_length() {
        let mut handle = EngineHandle::from_engine(Box::new(Gain::new()));
        handle.prepare(48000.0, 512);
        let input = AudioBlock::from_mono(vec![0.5; 1000]);
        let out = handle.process_blocks(&input, 512).expect("process");
        assert_eq!(out.num_samples(), 1000);
        // Gain defaults to unity.
        assert!(out.channel(0).iter().all(|&x| (x - 0.5).abs() < 1e-6));
    }

    #[test]
    fn panic_is_trapped_not_propagated() {
        let mut handle = EngineHandle::from_engine(Box::new(PanickingEngine));
        handle.prepare(48000.0, 64);
        let input = AudioBlock::silence(1, 128);
        let err = handle.process_blocks(&input, 64).expect_err("must trap");
        assert!(err.message.contains("index out of bounds"));
    }

    #[test]
    fn prepare_is_idempotent() {
        let mut handle = EngineHandle::from_engine(Box::new(Gain::new()));
        handle.prepare(48000.0, 512);
        handle.prepare(48000.0, 512);
        handle.prepare(44100.0, 512); // re-prepares
        let input = AudioBlock::silence(2, 512);
        assert!(handle.process_blocks(&input, 512).is_ok());
    }
}
