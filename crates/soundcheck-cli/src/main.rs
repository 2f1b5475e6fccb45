//! soundcheck CLI - black-box validation for audio DSP engines.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "soundcheck")]
#[command(author, version, about = "Validation and measurement harness for audio DSP engines", long_about = None)]
struct Cli {
    /// Verbose output (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the validation batteries and write reports
    Validate(commands::validate::ValidateArgs),

    /// Characterize every parameter of one engine
    Sweep(commands::sweep::SweepArgs),

    /// List the engines the factory provides
    Engines(commands::engines::EnginesArgs),
}

fn main() {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let outcome = match cli.command {
        Commands::Validate(args) => commands::validate::run(args),
        Commands::Sweep(args) => commands::sweep::run(args),
        Commands::Engines(args) => commands::engines::run(args),
    };

    match outcome {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            std::process::exit(4);
        }
    }
}
