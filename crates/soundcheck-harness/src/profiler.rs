//! CPU budget measurement.
//!
//! Timing uses `std::time::Instant` exclusively; there is no wall-clock
//! fallback. CPU percentage is the per-call processing time relative to
//! the audio duration of one block.

use crate::driver::EngineHandle;
use crate::result::{PerformanceSummary, TestResult};
use serde::Serialize;
use soundcheck_core::{AudioBlock, Severity};
use std::time::Instant;

/// Blocks processed before timing starts.
const WARMUP_BLOCKS: usize = 10;
/// Default timed iterations.
const ITERATIONS: usize = 100;
/// Iterations for engines whose calls are too short to time reliably.
const SHORT_ENGINE_ITERATIONS: usize = 1000;
/// Mean call duration below which the longer run is used.
const SHORT_CALL_NS: f64 = 10_000.0;
/// CPU percentage at or under which the engine passes outright.
const PASS_CPU_PERCENT: f32 = 50.0;
/// CPU percentage at or under which the engine is real-time capable with
/// the 20% safety margin.
const REALTIME_CPU_PERCENT: f32 = 80.0;

/// Timing profile of an engine's `process` call.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuProfile {
    /// Fastest call in nanoseconds.
    pub min_ns: f64,
    /// Slowest call in nanoseconds.
    pub max_ns: f64,
    /// Mean call in nanoseconds.
    pub mean_ns: f64,
    /// Mean CPU use as a percentage of the block's audio duration.
    pub mean_cpu_percent: f32,
    /// Worst CPU use as a percentage.
    pub max_cpu_percent: f32,
    /// Number of timed iterations.
    pub iterations: usize,
}

impl CpuProfile {
    /// True when even the worst call fits the real-time budget with the
    /// safety margin.
    pub fn realtime_capable(&self) -> bool {
        self.max_cpu_percent <= REALTIME_CPU_PERCENT
    }

    /// Grade: pass at <= 50% worst-case CPU, WARNING up to 80%, ERROR
    /// above.
    pub fn severity(&self) -> Severity {
        if self.max_cpu_percent <= PASS_CPU_PERCENT {
            Severity::Info
        } else if self.max_cpu_percent <= REALTIME_CPU_PERCENT {
            Severity::Warning
        } else {
            Severity::Error
        }
    }

    /// Summary for the suite header.
    pub fn summary(&self) -> PerformanceSummary {
        PerformanceSummary {
            avg_cpu_percent: self.mean_cpu_percent,
            max_cpu_percent: self.max_cpu_percent,
            avg_latency_ms: (self.mean_ns / 1e6) as f32,
            max_latency_ms: (self.max_ns / 1e6) as f32,
        }
    }

    /// Express the profile as a battery result.
    pub fn into_result(self) -> TestResult {
        let severity = self.severity();
        let message = format!(
            "worst-case CPU {:.1}% of the block budget ({} iterations)",
            self.max_cpu_percent, self.iterations
        );
        let result = if severity == Severity::Info {
            TestResult::pass("cpu_budget", message)
        } else {
            TestResult::fail("cpu_budget", severity, message)
                .with_recommendation("precompute coefficient and log tables outside process()")
        };
        result
            .with_metric("mean_cpu_percent", self.mean_cpu_percent)
            .with_metric("max_cpu_percent", self.max_cpu_percent)
            .with_metric("mean_ns", self.mean_ns as f32)
            .with_metric("max_ns", self.max_ns as f32)
    }
}

/// Time `process` on identical input: 10 warm-up blocks, then 100 timed
/// calls (1000 when the mean call is under 10 microseconds).
pub fn profile(
    handle: &mut EngineHandle,
    sample_rate: f32,
    block_size: usize,
) -> CpuProfile {
    handle.prepare(f64::from(sample_rate), block_size);
    let input = AudioBlock::silence(2, block_size);

    let run = |handle: &mut EngineHandle, iterations: usize| -> Vec<f64> {
        let mut durations = Vec::with_capacity(iterations);
        for _ in 0..iterations {
            let start = Instant::now();
            // A panic here has already been surfaced by the battery.
            let _ = handle.process_blocks(&input, block_size);
            durations.push(start.elapsed().as_nanos() as f64);
        }
        durations
    };

    for _ in 0..WARMUP_BLOCKS {
        let _ = handle.process_blocks(&input, block_size);
    }

    let mut durations = run(handle, ITERATIONS);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;
    if mean < SHORT_CALL_NS {
        durations = run(handle, SHORT_ENGINE_ITERATIONS);
    }

    let min_ns = durations.iter().copied().fold(f64::MAX, f64::min);
    let max_ns = durations.iter().copied().fold(0.0f64, f64::max);
    let mean_ns = durations.iter().sum::<f64>() / durations.len() as f64;
    let block_ns = f64::from(block_size as u32) / f64::from(sample_rate) * 1e9;

    CpuProfile {
        min_ns,
        max_ns,
        mean_ns,
        mean_cpu_percent: (mean_ns / block_ns * 100.0) as f32,
        max_cpu_percent: (max_ns / block_ns * 100.0) as f32,
        iterations: durations.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use soundcheck_core::reference::Gain;

    #[test]
    fn gain_is_comfortably_realtime() {
        let mut handle = EngineHandle::from_engine(Box::new(Gain::new()));
        let profile = profile(&mut handle, 48000.0, 512);
        assert!(profile.min_ns <= profile.mean_ns);
        assert!(profile.mean_ns <= profile.max_ns);
        assert!(profile.realtime_capable(), "gain should be trivially realtime");
        assert_eq!(profile.severity(), Severity::Info);
    }

    #[test]
    fn severity_thresholds() {
        let mut p = CpuProfile {
            min_ns: 0.0,
            max_ns: 0.0,
            mean_ns: 0.0,
            mean_cpu_percent: 10.0,
            max_cpu_percent: 45.0,
            iterations: 100,
        };
        assert_eq!(p.severity(), Severity::Info);
        p.max_cpu_percent = 70.0;
        assert_eq!(p.severity(), Severity::Warning);
        assert!(p.realtime_capable());
        p.max_cpu_percent = 95.0;
        assert_eq!(p.severity(), Severity::Error);
        assert!(!p.realtime_capable());
    }

    #[test]
    fn summary_converts_to_milliseconds() {
        let p = CpuProfile {
            min_ns: 1e6,
            max_ns: 3e6,
            mean_ns: 2e6,
            mean_cpu_percent: 20.0,
            max_cpu_percent: 30.0,
            iterations: 100,
        };
        let s = p.summary();
        assert!((s.avg_latency_ms - 2.0).abs() < 1e-6);
        assert!((s.max_latency_ms - 3.0).abs() < 1e-6);
    }
}
