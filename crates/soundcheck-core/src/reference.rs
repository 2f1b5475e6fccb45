//! Reference engines and factory.
//!
//! A small stable of simple, well-understood engines used by the CLI demo
//! and by the harness's own integration tests. One engine per category plus
//! two special cases: a generator that produces signal from silence, and a
//! deliberately buggy engine whose gain divides by `param - 0.5`.
//!
//! All parameters are normalized to \[0, 1\] and mapped to natural units
//! internally. Engines clamp incoming values, as the contract requires.

use crate::{AudioBlock, Engine, EngineCategory, EngineFactory, ParameterState};
use std::f64::consts::PI;

fn clamp01(value: f32) -> f32 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}

/// Linear gain stage. One parameter mapping \[0, 1\] to a gain of \[0, 2\],
/// so 0.5 is unity. The sweep response (output RMS vs. parameter) is
/// exactly linear.
pub struct Gain {
    gain: f32,
}

impl Gain {
    /// Create at unity gain.
    pub fn new() -> Self {
        Self { gain: 0.5 }
    }
}

impl Default for Gain {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for Gain {
    fn name(&self) -> &str {
        "Gain"
    }
    fn num_parameters(&self) -> usize {
        1
    }
    fn parameter_name(&self, index: usize) -> &str {
        match index {
            0 => "Gain",
            _ => "",
        }
    }
    fn prepare_to_play(&mut self, _sample_rate: f64, _block_size: usize) {}
    fn reset(&mut self) {}
    fn update_parameters(&mut self, state: &ParameterState) {
        if let Some(&v) = state.get(&0) {
            self.gain = clamp01(v);
        }
    }
    fn process(&mut self, block: &mut AudioBlock) {
        let g = self.gain * 2.0;
        for s in block.samples_mut() {
            *s *= g;
        }
    }
    fn default_parameters(&self) -> ParameterState {
        ParameterState::from([(0, 0.5)])
    }
}

/// Fixed 0.5x attenuator with no parameters. Its unity-default test result
/// is a known -6.02 dB gain change.
pub struct HalfGain;

impl Engine for HalfGain {
    fn name(&self) -> &str {
        "Half Gain"
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
        for s in block.samples_mut() {
            *s *= 0.5;
        }
    }
}

/// One-pole low-pass filter with a logarithmic cutoff parameter and a
/// wet/dry mix.
pub struct OnePoleLowPass {
    cutoff: f32,
    mix: f32,
    sample_rate: f64,
    state: [f32; 2],
}

impl OnePoleLowPass {
    /// Create with cutoff at mid-range and full wet.
    pub fn new() -> Self {
        Self {
            cutoff: 0.5,
            mix: 1.0,
            sample_rate: 48000.0,
            state: [0.0; 2],
        }
    }

    /// Cutoff in Hz for the current normalized value (log 20 Hz .. 20 kHz).
    fn cutoff_hz(&self) -> f64 {
        20.0 * (1000.0_f64).powf(f64::from(self.cutoff))
    }

    fn alpha(&self) -> f32 {
        // Standard one-pole coefficient: a = e^(-2*pi*fc/sr)
        (-2.0 * PI * self.cutoff_hz() / self.sample_rate).exp() as f32
    }
}

impl Default for OnePoleLowPass {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for OnePoleLowPass {
    fn name(&self) -> &str {
        "One-Pole Low Pass"
    }
    fn num_parameters(&self) -> usize {
        2
    }
    fn parameter_name(&self, index: usize) -> &str {
        match index {
            0 => "Cutoff",
            1 => "Mix",
            _ => "",
        }
    }
    fn prepare_to_play(&mut self, sample_rate: f64, _block_size: usize) {
        self.sample_rate = sample_rate;
        self.state = [0.0; 2];
    }
    fn reset(&mut self) {
        self.state = [0.0; 2];
    }
    fn update_parameters(&mut self, state: &ParameterState) {
        if let Some(&v) = state.get(&0) {
            self.cutoff = clamp01(v);
        }
        if let Some(&v) = state.get(&1) {
            self.mix = clamp01(v);
        }
    }
    fn process(&mut self, block: &mut AudioBlock) {
        let a = self.alpha();
        let mix = self.mix;
        for ch in 0..block.num_channels() {
            let mut z = self.state[ch.min(1)];
            for s in block.channel_mut(ch) {
                z = (1.0 - a) * *s + a * z;
                *s = mix * z + (1.0 - mix) * *s;
            }
            self.state[ch.min(1)] = z;
        }
    }
    fn default_parameters(&self) -> ParameterState {
        ParameterState::from([(0, 0.5), (1, 1.0)])
    }
    fn mix_parameter_index(&self) -> Option<usize> {
        Some(1)
    }
}

/// Feedback delay with time, feedback, and mix parameters.
pub struct FeedbackDelay {
    time: f32,
    feedback: f32,
    mix: f32,
    sample_rate: f64,
    lines: [Vec<f32>; 2],
    write_pos: usize,
}

impl FeedbackDelay {
    const MAX_DELAY_SECS: f64 = 1.0;

    /// Create with a 250 ms default delay.
    pub fn new() -> Self {
        Self {
            time: 0.25,
            feedback: 0.4,
            mix: 0.5,
            sample_rate: 48000.0,
            lines: [Vec::new(), Vec::new()],
            write_pos: 0,
        }
    }

    fn delay_samples(&self) -> usize {
        // Time parameter maps linearly to 1 ms .. 1000 ms.
        let secs = 0.001 + f64::from(self.time) * (Self::MAX_DELAY_SECS - 0.001);
        ((secs * self.sample_rate) as usize).max(1)
    }
}

impl Default for FeedbackDelay {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for FeedbackDelay {
    fn name(&self) -> &str {
        "Feedback Delay"
    }
    fn num_parameters(&self) -> usize {
        3
    }
    fn parameter_name(&self, index: usize) -> &str {
        match index {
            0 => "Time",
            1 => "Feedback",
            2 => "Mix",
            _ => "",
        }
    }
    fn prepare_to_play(&mut self, sample_rate: f64, _block_size: usize) {
        self.sample_rate = sample_rate;
        let len = (Self::MAX_DELAY_SECS * sample_rate) as usize + 1;
        for line in &mut self.lines {
            line.clear();
            line.resize(len, 0.0);
        }
        self.write_pos = 0;
    }
    fn reset(&mut self) {
        for line in &mut self.lines {
            line.fill(0.0);
        }
        self.write_pos = 0;
    }
    fn update_parameters(&mut self, state: &ParameterState) {
        if let Some(&v) = state.get(&0) {
            self.time = clamp01(v);
        }
        if let Some(&v) = state.get(&1) {
            // Feedback capped at 0.95 to keep the loop stable.
            self.feedback = clamp01(v) * 0.95;
        }
        if let Some(&v) = state.get(&2) {
            self.mix = clamp01(v);
        }
    }
    fn process(&mut self, block: &mut AudioBlock) {
        let delay = self.delay_samples();
        let len = self.lines[0].len();
        if len == 0 {
            return;
        }
        let num_samples = block.num_samples();
        for i in 0..num_samples {
            let pos = (self.write_pos + i) % len;
            let read = (pos + len - (delay % len)) % len;
            for ch in 0..block.num_channels() {
                let line = &mut self.lines[ch.min(1)];
                let dry = block.channel(ch)[i];
                let wet = line[read];
                line[pos] = dry + wet * self.feedback;
                block.channel_mut(ch)[i] = self.mix * wet + (1.0 - self.mix) * dry;
            }
        }
        self.write_pos = (self.write_pos + num_samples) % len;
    }
    fn default_parameters(&self) -> ParameterState {
        ParameterState::from([(0, 0.25), (1, 0.4), (2, 0.5)])
    }
    fn mix_parameter_index(&self) -> Option<usize> {
        Some(2)
    }
}

/// Amplitude-modulation tremolo. The right channel's LFO runs 30 degrees
/// behind the left, so depth above zero measurably decorrelates the
/// channels.
pub struct Tremolo {
    rate: f32,
    depth: f32,
    sample_rate: f64,
    phase: f64,
}

impl Tremolo {
    /// Create at 5 Hz, half depth.
    pub fn new() -> Self {
        Self {
            rate: 0.5,
            depth: 0.5,
            sample_rate: 48000.0,
            phase: 0.0,
        }
    }

    /// LFO rate in Hz for the current normalized value (log 0.1 .. 10 Hz).
    fn rate_hz(&self) -> f64 {
        0.1 * (100.0_f64).powf(f64::from(self.rate))
    }
}

impl Default for Tremolo {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for Tremolo {
    fn name(&self) -> &str {
        "Tremolo"
    }
    fn num_parameters(&self) -> usize {
        2
    }
    fn parameter_name(&self, index: usize) -> &str {
        match index {
            0 => "Rate",
            1 => "Depth",
            _ => "",
        }
    }
    fn prepare_to_play(&mut self, sample_rate: f64, _block_size: usize) {
        self.sample_rate = sample_rate;
        self.phase = 0.0;
    }
    fn reset(&mut self) {
        self.phase = 0.0;
    }
    fn update_parameters(&mut self, state: &ParameterState) {
        if let Some(&v) = state.get(&0) {
            self.rate = clamp01(v);
        }
        if let Some(&v) = state.get(&1) {
            self.depth = clamp01(v);
        }
    }
    fn process(&mut self, block: &mut AudioBlock) {
        let inc = 2.0 * PI * self.rate_hz() / self.sample_rate;
        let depth = f64::from(self.depth);
        let offset = PI / 6.0; // 30 degrees between channels
        let num_samples = block.num_samples();
        for i in 0..num_samples {
            let phase = self.phase + inc * i as f64;
            for ch in 0..block.num_channels() {
                let ch_phase = if ch == 0 { phase } else { phase - offset };
                let lfo = 0.5 * (1.0 + ch_phase.sin());
                let gain = (1.0 - depth * (1.0 - lfo)) as f32;
                block.channel_mut(ch)[i] *= gain;
            }
        }
        self.phase = (self.phase + inc * num_samples as f64) % (2.0 * PI);
    }
    fn default_parameters(&self) -> ParameterState {
        ParameterState::from([(0, 0.5), (1, 0.5)])
    }
}

/// tanh soft clipper with drive and mix. THD rises monotonically with
/// drive.
pub struct SoftClip {
    drive: f32,
    mix: f32,
}

impl SoftClip {
    /// Create at minimum drive, full wet.
    pub fn new() -> Self {
        Self {
            drive: 0.0,
            mix: 1.0,
        }
    }

    /// Input gain for the current normalized drive (1x .. 20x).
    fn drive_gain(&self) -> f32 {
        1.0 + self.drive * 19.0
    }
}

impl Default for SoftClip {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for SoftClip {
    fn name(&self) -> &str {
        "Soft Clip"
    }
    fn num_parameters(&self) -> usize {
        2
    }
    fn parameter_name(&self, index: usize) -> &str {
        match index {
            0 => "Drive",
            1 => "Mix",
            _ => "",
        }
    }
    fn prepare_to_play(&mut self, _sample_rate: f64, _block_size: usize) {}
    fn reset(&mut self) {}
    fn update_parameters(&mut self, state: &ParameterState) {
        if let Some(&v) = state.get(&0) {
            self.drive = clamp01(v);
        }
        if let Some(&v) = state.get(&1) {
            self.mix = clamp01(v);
        }
    }
    fn process(&mut self, block: &mut AudioBlock) {
        let g = self.drive_gain();
        // Normalize so unity-amplitude input stays near unity out.
        let norm = 1.0 / g.tanh();
        let mix = self.mix;
        for s in block.samples_mut() {
            let wet = (*s * g).tanh() * norm;
            *s = mix * wet + (1.0 - mix) * *s;
        }
    }
    fn default_parameters(&self) -> ParameterState {
        ParameterState::from([(0, 0.0), (1, 1.0)])
    }
    fn mix_parameter_index(&self) -> Option<usize> {
        Some(1)
    }
}

/// Feed-forward compressor with threshold, ratio, attack, and release.
/// Channel-linked detection on the loudest channel.
pub struct Compressor {
    threshold: f32,
    ratio: f32,
    attack: f32,
    release: f32,
    sample_rate: f64,
    envelope: f32,
}

impl Compressor {
    /// Create with a -20 dB threshold and 4:1 ratio.
    pub fn new() -> Self {
        Self {
            threshold: 2.0 / 3.0, // -20 dB on the -60..0 map
            ratio: 3.0 / 19.0,    // 4:1 on the 1..20 map
            attack: 0.1,
            release: 0.1,
            sample_rate: 48000.0,
            envelope: 0.0,
        }
    }

    fn threshold_db(&self) -> f32 {
        -60.0 + self.threshold * 60.0
    }

    fn ratio_value(&self) -> f32 {
        1.0 + self.ratio * 19.0
    }

    fn attack_coeff(&self) -> f32 {
        let ms = 0.1 + f64::from(self.attack) * 99.9;
        (-1.0 / (ms * 0.001 * self.sample_rate)).exp() as f32
    }

    fn release_coeff(&self) -> f32 {
        let ms = 10.0 + f64::from(self.release) * 990.0;
        (-1.0 / (ms * 0.001 * self.sample_rate)).exp() as f32
    }
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for Compressor {
    fn name(&self) -> &str {
        "Compressor"
    }
    fn num_parameters(&self) -> usize {
        4
    }
    fn parameter_name(&self, index: usize) -> &str {
        match index {
            0 => "Threshold",
            1 => "Ratio",
            2 => "Attack",
            3 => "Release",
            _ => "",
        }
    }
    fn prepare_to_play(&mut self, sample_rate: f64, _block_size: usize) {
        self.sample_rate = sample_rate;
        self.envelope = 0.0;
    }
    fn reset(&mut self) {
        self.envelope = 0.0;
    }
    fn update_parameters(&mut self, state: &ParameterState) {
        if let Some(&v) = state.get(&0) {
            self.threshold = clamp01(v);
        }
        if let Some(&v) = state.get(&1) {
            self.ratio = clamp01(v);
        }
        if let Some(&v) = state.get(&2) {
            self.attack = clamp01(v);
        }
        if let Some(&v) = state.get(&3) {
            self.release = clamp01(v);
        }
    }
    fn process(&mut self, block: &mut AudioBlock) {
        let threshold_db = self.threshold_db();
        let ratio = self.ratio_value();
        let attack = self.attack_coeff();
        let release = self.release_coeff();
        let num_samples = block.num_samples();
        for i in 0..num_samples {
            let mut detect = 0.0f32;
            for ch in 0..block.num_channels() {
                detect = detect.max(block.channel(ch)[i].abs());
            }
            let coeff = if detect > self.envelope { attack } else { release };
            self.envelope = coeff * self.envelope + (1.0 - coeff) * detect;

            let level_db = 20.0 * self.envelope.max(1e-10).log10();
            let over_db = (level_db - threshold_db).max(0.0);
            let reduction_db = over_db - over_db / ratio;
            let gain = 10.0_f32.powf(-reduction_db / 20.0);
            for ch in 0..block.num_channels() {
                block.channel_mut(ch)[i] *= gain;
            }
        }
    }
    fn default_parameters(&self) -> ParameterState {
        ParameterState::from([(0, 2.0 / 3.0), (1, 3.0 / 19.0), (2, 0.1), (3, 0.1)])
    }
}

/// Mid/side stereo widener. Width below 0.5 narrows toward mono, above 0.5
/// widens; mono input passes through unchanged.
pub struct StereoWidener {
    width: f32,
}

impl StereoWidener {
    /// Create at neutral width.
    pub fn new() -> Self {
        Self { width: 0.5 }
    }
}

impl Default for StereoWidener {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for StereoWidener {
    fn name(&self) -> &str {
        "Stereo Widener"
    }
    fn num_parameters(&self) -> usize {
        1
    }
    fn parameter_name(&self, index: usize) -> &str {
        match index {
            0 => "Width",
            _ => "",
        }
    }
    fn prepare_to_play(&mut self, _sample_rate: f64, _block_size: usize) {}
    fn reset(&mut self) {}
    fn update_parameters(&mut self, state: &ParameterState) {
        if let Some(&v) = state.get(&0) {
            self.width = clamp01(v);
        }
    }
    fn process(&mut self, block: &mut AudioBlock) {
        if block.num_channels() < 2 {
            return;
        }
        let side_gain = self.width * 2.0;
        let num_samples = block.num_samples();
        for i in 0..num_samples {
            let l = block.channel(0)[i];
            let r = block.channel(1)[i];
            let mid = 0.5 * (l + r);
            let side = 0.5 * (l - r) * side_gain;
            block.channel_mut(0)[i] = mid + side;
            block.channel_mut(1)[i] = mid - side;
        }
    }
    fn default_parameters(&self) -> ParameterState {
        ParameterState::from([(0, 0.5)])
    }
}

/// Deterministic noise source. Replaces its input with xorshift noise at
/// the configured level; declares itself a generator.
pub struct NoiseSource {
    level: f32,
    state: u32,
}

impl NoiseSource {
    const SEED: u32 = 0x1F2E_3D4C;

    /// Create at a modest default level.
    pub fn new() -> Self {
        Self {
            level: 0.5,
            state: Self::SEED,
        }
    }

    fn next(&mut self) -> f32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        (x as f32 / u32::MAX as f32) * 2.0 - 1.0
    }
}

impl Default for NoiseSource {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for NoiseSource {
    fn name(&self) -> &str {
        "Noise Source"
    }
    fn num_parameters(&self) -> usize {
        1
    }
    fn parameter_name(&self, index: usize) -> &str {
        match index {
            0 => "Level",
            _ => "",
        }
    }
    fn prepare_to_play(&mut self, _sample_rate: f64, _block_size: usize) {
        self.state = Self::SEED;
    }
    fn reset(&mut self) {
        self.state = Self::SEED;
    }
    fn update_parameters(&mut self, state: &ParameterState) {
        if let Some(&v) = state.get(&0) {
            self.level = clamp01(v);
        }
    }
    fn process(&mut self, block: &mut AudioBlock) {
        let amp = self.level * 0.25;
        let num_samples = block.num_samples();
        for i in 0..num_samples {
            let n = self.next() * amp;
            for ch in 0..block.num_channels() {
                block.channel_mut(ch)[i] = n;
            }
        }
    }
    fn default_parameters(&self) -> ParameterState {
        ParameterState::from([(0, 0.5)])
    }
    fn is_generator(&self) -> bool {
        true
    }
}

/// Deliberately broken engine: gain divides by `param - 0.5`, so the
/// parameter sweep hits infinite or NaN output around the midpoint. Exists
/// to prove the harness catches it.
pub struct BuggyDivider {
    amount: f32,
}

impl BuggyDivider {
    /// Create with the parameter at zero (finite gain).
    pub fn new() -> Self {
        Self { amount: 0.0 }
    }
}

impl Default for BuggyDivider {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for BuggyDivider {
    fn name(&self) -> &str {
        "Buggy Divider"
    }
    fn num_parameters(&self) -> usize {
        1
    }
    fn parameter_name(&self, index: usize) -> &str {
        match index {
            0 => "Amount",
            _ => "",
        }
    }
    fn prepare_to_play(&mut self, _sample_rate: f64, _block_size: usize) {}
    fn reset(&mut self) {}
    fn update_parameters(&mut self, state: &ParameterState) {
        if let Some(&v) = state.get(&0) {
            // The bug under test: no clamp, no guard.
            self.amount = v;
        }
    }
    fn process(&mut self, block: &mut AudioBlock) {
        let gain = 0.1 / (self.amount - 0.5);
        for s in block.samples_mut() {
            *s *= gain;
        }
    }
}

/// Factory over the reference engines, ids 0..=9.
pub struct ReferenceFactory {
    entries: Vec<(u32, &'static str, EngineCategory)>,
}

impl ReferenceFactory {
    /// Create the factory with all reference engines registered.
    pub fn new() -> Self {
        Self {
            entries: vec![
                (0, "Gain", EngineCategory::Utility),
                (1, "Half Gain", EngineCategory::Utility),
                (2, "One-Pole Low Pass", EngineCategory::Filter),
                (3, "Feedback Delay", EngineCategory::TimeBased),
                (4, "Tremolo", EngineCategory::Modulation),
                (5, "Soft Clip", EngineCategory::Distortion),
                (6, "Compressor", EngineCategory::Dynamics),
                (7, "Stereo Widener", EngineCategory::Spectral),
                (8, "Noise Source", EngineCategory::Generator),
                (9, "Buggy Divider", EngineCategory::Utility),
            ],
        }
    }
}

impl Default for ReferenceFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineFactory for ReferenceFactory {
    fn engine_ids(&self) -> Vec<u32> {
        self.entries.iter().map(|e| e.0).collect()
    }

    fn engine_name(&self, id: u32) -> Option<&str> {
        self.entries.iter().find(|e| e.0 == id).map(|e| e.1)
    }

    fn category(&self, id: u32) -> Option<EngineCategory> {
        self.entries.iter().find(|e| e.0 == id).map(|e| e.2)
    }

    fn create(&self, id: u32) -> Option<Box<dyn Engine>> {
        match id {
            0 => Some(Box::new(Gain::new())),
            1 => Some(Box::new(HalfGain)),
            2 => Some(Box::new(OnePoleLowPass::new())),
            3 => Some(Box::new(FeedbackDelay::new())),
            4 => Some(Box::new(Tremolo::new())),
            5 => Some(Box::new(SoftClip::new())),
            6 => Some(Box::new(Compressor::new())),
            7 => Some(Box::new(StereoWidener::new())),
            8 => Some(Box::new(NoiseSource::new())),
            9 => Some(Box::new(BuggyDivider::new())),
            _ => None,
        }
    }
}
