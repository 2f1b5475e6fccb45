//! Parameter sweeping and response characterization.

use crate::driver::EngineHandle;
use serde::Serialize;
use soundcheck_core::ParameterState;
use soundcheck_metrics::AnomalyReport;
use soundcheck_signals::Stimulus;

/// Characterization of one parameter over [0, 1].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepResult {
    /// Index of the swept parameter.
    pub parameter_index: usize,
    /// Its declared name.
    pub parameter_name: String,
    /// `(input value, measured value)` pairs in sweep order.
    pub measurements: Vec<(f32, f32)>,
    /// Max minus min of the measured values.
    pub total_range: f32,
    /// Signed agreement of successive differences: +1 strictly monotonic,
    /// -1 strictly anti-monotonic.
    pub monotonicity: f32,
    /// 1 minus the mean absolute second difference over the range.
    pub smoothness: f32,
    /// R-squared of the best-fit line through the measurements.
    pub linearity: f32,
    /// Range normalized by the largest measured magnitude, in [0, 1].
    pub sensitivity: f32,
    /// True when the parameter audibly changes the measurement
    /// (range at least 5% of the mean magnitude).
    pub is_effective: bool,
    /// The first sweep value at which output went NaN/Inf, if any; the
    /// sweep stops there.
    pub non_finite_at: Option<f32>,
    /// Panic message if the engine crashed mid-sweep.
    pub panicked: Option<String>,
}

/// Sweep one parameter: for each of `steps` evenly spaced values in
/// [0, 1], reset the engine, apply `{index: value}`, process the stimulus,
/// and run `measure` on the output. Non-finite output aborts the sweep at
/// that value.
pub fn sweep_parameter(
    handle: &mut EngineHandle,
    parameter_index: usize,
    stimulus: &Stimulus,
    block_size: usize,
    steps: usize,
    measure: impl Fn(&soundcheck_core::AudioBlock) -> f32,
) -> SweepResult {
    let steps = steps.max(2);
    let parameter_name = handle.parameter_name(parameter_index).to_string();
    tracing::debug!(parameter_index, %parameter_name, steps, "sweeping parameter");

    let mut measurements = Vec::with_capacity(steps);
    let mut non_finite_at = None;
    let mut panicked = None;

    for i in 0..steps {
        let value = i as f32 / (steps - 1) as f32;
        handle.reset();
        handle.apply(&ParameterState::from([(parameter_index, value)]));
        let output = match handle.process_blocks(&stimulus.block, block_size) {
            Ok(block) => block,
            Err(panic) => {
                panicked = Some(panic.message);
                break;
            }
        };
        if AnomalyReport::scan(&output).has_non_finite() {
            non_finite_at = Some(value);
            break;
        }
        measurements.push((value, measure(&output)));
    }

    let stats = SweepStats::from(&measurements);
    SweepResult {
        parameter_index,
        parameter_name,
        measurements,
        total_range: stats.range,
        monotonicity: stats.monotonicity,
        smoothness: stats.smoothness,
        linearity: stats.linearity,
        sensitivity: stats.sensitivity,
        is_effective: stats.effective,
        non_finite_at,
        panicked,
    }
}

struct SweepStats {
    range: f32,
    monotonicity: f32,
    smoothness: f32,
    linearity: f32,
    sensitivity: f32,
    effective: bool,
}

impl SweepStats {
    fn from(measurements: &[(f32, f32)]) -> Self {
        let zero = Self {
            range: 0.0,
            monotonicity: 0.0,
            smoothness: 0.0,
            linearity: 0.0,
            sensitivity: 0.0,
            effective: false,
        };
        if measurements.len() < 3 {
            return zero;
        }
        let values: Vec<f32> = measurements.iter().map(|&(_, m)| m).collect();
        let max = values.iter().fold(f32::MIN, |m, &x| m.max(x));
        let min = values.iter().fold(f32::MAX, |m, &x| m.min(x));
        let range = max - min;
        let mean = values.iter().sum::<f32>() / values.len() as f32;

        // Sign agreement of successive differences.
        let diffs: Vec<f32> = values.windows(2).map(|w| w[1] - w[0]).collect();
        let pos = diffs.iter().filter(|&&d| d > 0.0).count() as f32;
        let neg = diffs.iter().filter(|&&d| d < 0.0).count() as f32;
        let monotonicity = (pos - neg) / diffs.len() as f32;

        let second: Vec<f32> = diffs.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
        let mean_second = second.iter().sum::<f32>() / second.len().max(1) as f32;
        let smoothness = (1.0 - mean_second / (range + 1e-10)).clamp(0.0, 1.0);

        let linearity = r_squared(measurements);
        let max_mag = values.iter().fold(0.0f32, |m, &x| m.max(x.abs()));
        let sensitivity = (range / max_mag.max(1e-10)).clamp(0.0, 1.0);
        let effective = range / mean.abs().max(1e-10) >= 0.05;

        Self {
            range,
            monotonicity,
            smoothness,
            linearity,
            sensitivity,
            effective,
        }
    }
}

/// Coefficient of determination of the least-squares line.
fn r_squared(points: &[(f32, f32)]) -> f32 {
    let n = points.len() as f32;
    let sum_x: f32 = points.iter().map(|p| p.0).sum();
    let sum_y: f32 = points.iter().map(|p| p.1).sum();
    let sum_xy: f32 = points.iter().map(|p| p.0 * p.1).sum();
    let sum_xx: f32 = points.iter().map(|p| p.0 * p.0).sum();
    let sum_yy: f32 = points.iter().map(|p| p.1 * p.1).sum();

    let ss_xx = n * sum_xx - sum_x * sum_x;
    let ss_yy = n * sum_yy - sum_y * sum_y;
    let ss_xy = n * sum_xy - sum_x * sum_y;
    if ss_xx < 1e-10 || ss_yy < 1e-10 {
        return 0.0;
    }
    let r = ss_xy / (ss_xx * ss_yy).sqrt();
    r * r
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::EngineHandle;
    use soundcheck_core::reference::{BuggyDivider, Gain};
    use soundcheck_metrics::level;
    use soundcheck_signals::{generate, SignalKind, SignalParams};

    fn sine_stimulus() -> Stimulus {
        generate(SignalKind::Sine, 48000.0, 0.5, 0.5, SignalParams::default()).expect("generate")
    }

    #[test]
    fn linear_gain_sweep_is_monotone_and_linear() {
        let mut handle = EngineHandle::from_engine(Box::new(Gain::new()));
        handle.prepare(48000.0, 512);
        let stimulus = sine_stimulus();
        let result = sweep_parameter(&mut handle, 0, &stimulus, 512, 20, level::rms);

        assert_eq!(result.measurements.len(), 20);
        assert_eq!(result.monotonicity, 1.0);
        assert!(result.linearity > 0.99, "R^2 {}", result.linearity);
        assert!(result.sensitivity > 0.99, "sensitivity {}", result.sensitivity);
        assert!(result.is_effective);
        assert!(result.non_finite_at.is_none());
    }

    #[test]
    fn divider_bug_is_caught_at_the_midpoint() {
        let mut handle = EngineHandle::from_engine(Box::new(BuggyDivider::new()));
        handle.prepare(48000.0, 512);
        let stimulus = sine_stimulus();
        // 21 steps place a sweep point exactly on 0.5.
        let result = sweep_parameter(&mut handle, 0, &stimulus, 512, 21, level::rms);
        assert_eq!(result.non_finite_at, Some(0.5));
    }

    #[test]
    fn too_few_points_yield_zero_stats() {
        let stats = SweepStats::from(&[(0.0, 1.0), (1.0, 2.0)]);
        assert_eq!(stats.monotonicity, 0.0);
        assert!(!stats.effective);
    }

    #[test]
    fn r_squared_of_a_perfect_line() {
        let points: Vec<(f32, f32)> = (0..10).map(|i| (i as f32, 2.0 * i as f32 + 1.0)).collect();
        assert!((r_squared(&points) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn r_squared_of_a_constant_is_zero() {
        let points: Vec<(f32, f32)> = (0..10).map(|i| (i as f32, 5.0)).collect();
        assert_eq!(r_squared(&points), 0.0);
    }
}
