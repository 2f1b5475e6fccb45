//! Standalone parameter characterization for one engine.

use clap::Args;
use soundcheck_core::reference::ReferenceFactory;
use soundcheck_harness::{sweep::sweep_parameter, EngineHandle, RunConfig};
use soundcheck_metrics::level;
use soundcheck_signals::{generate, SignalKind, SignalParams};

#[derive(Args)]
pub struct SweepArgs {
    /// Engine id to characterize
    #[arg(value_name = "ID")]
    engine: u32,

    /// Sample rate in Hz
    #[arg(long, default_value = "44100")]
    sample_rate: f32,

    /// Processing block size in samples
    #[arg(long, default_value = "512")]
    block_size: usize,

    /// Points per sweep
    #[arg(long, default_value = "20")]
    steps: usize,

    /// Stimulus duration in seconds
    #[arg(long, default_value = "1.0")]
    duration: f32,
}

pub fn run(args: SweepArgs) -> anyhow::Result<i32> {
    let config = RunConfig {
        sample_rate: args.sample_rate,
        block_size: args.block_size,
        sweep_steps: args.steps,
        duration_secs: args.duration,
        ..RunConfig::default()
    };
    config.validate()?;

    let factory = ReferenceFactory::new();
    let mut handle = EngineHandle::load(&factory, args.engine)?;
    handle.prepare(f64::from(config.sample_rate), config.block_size);
    println!(
        "Sweeping {} ({} parameter(s), {} steps)\n",
        handle.name(),
        handle.num_parameters(),
        config.sweep_steps
    );

    let stimulus = generate(
        SignalKind::Sine,
        config.sample_rate,
        config.duration_secs,
        0.5,
        SignalParams::default(),
    )?;

    println!(
        "{:<20} {:>9} {:>11} {:>10} {:>9} {:>11} {:>9}",
        "parameter", "range", "monotonic", "smooth", "linear", "sensitivity", "effective"
    );
    let mut worst_exit = 0;
    for index in 0..handle.num_parameters() {
        let sweep = sweep_parameter(
            &mut handle,
            index,
            &stimulus,
            config.block_size,
            config.sweep_steps,
            level::rms,
        );
        if let Some(message) = &sweep.panicked {
            println!("{:<20} PANICKED: {message}", sweep.parameter_name);
            worst_exit = 2;
            continue;
        }
        if let Some(value) = sweep.non_finite_at {
            println!(
                "{:<20} NON-FINITE OUTPUT at value {value:.3}",
                sweep.parameter_name
            );
            worst_exit = 2;
            continue;
        }
        println!(
            "{:<20} {:>9.4} {:>+11.2} {:>10.2} {:>9.2} {:>11.2} {:>9}",
            sweep.parameter_name,
            sweep.total_range,
            sweep.monotonicity,
            sweep.smoothness,
            sweep.linearity,
            sweep.sensitivity,
            if sweep.is_effective { "yes" } else { "NO" }
        );
    }
    if handle.num_parameters() == 0 {
        println!("(engine declares no parameters)");
    }
    Ok(worst_exit)
}
