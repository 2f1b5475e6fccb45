//! The main batch-validation command.

use anyhow::Context;
use clap::{Args, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use soundcheck_core::reference::ReferenceFactory;
use soundcheck_core::EngineFactory;
use soundcheck_harness::{run_batch, RunConfig, ValidationLevel};
use soundcheck_report::{csv, html, json, text, ReportMeta};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LevelArg {
    Basic,
    Standard,
    Comprehensive,
    Stress,
}

impl From<LevelArg> for ValidationLevel {
    fn from(level: LevelArg) -> Self {
        match level {
            LevelArg::Basic => ValidationLevel::Basic,
            LevelArg::Standard => ValidationLevel::Standard,
            LevelArg::Comprehensive => ValidationLevel::Comprehensive,
            LevelArg::Stress => ValidationLevel::Stress,
        }
    }
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Engine ids to test; may repeat. Default: every engine
    #[arg(long = "engine", value_name = "ID")]
    engines: Vec<u32>,

    /// TOML configuration file; flags below override its values
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Sample rate in Hz
    #[arg(long)]
    sample_rate: Option<f32>,

    /// Processing block size in samples
    #[arg(long)]
    block_size: Option<usize>,

    /// Stimulus duration per test, seconds
    #[arg(long)]
    duration: Option<f32>,

    /// Points per parameter sweep
    #[arg(long)]
    sweep_steps: Option<usize>,

    /// How deep to test
    #[arg(long, value_enum)]
    level: Option<LevelArg>,

    /// Run engines on a worker pool (the default)
    #[arg(long, conflicts_with = "sequential")]
    parallel: bool,

    /// Run engines one at a time
    #[arg(long)]
    sequential: bool,

    /// Worker count; 0 means available parallelism
    #[arg(long)]
    max_threads: Option<usize>,

    /// Hard per-engine timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Directory for report files
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Write the HTML report (selecting any format flag disables the rest)
    #[arg(long)]
    html_report: bool,

    /// Write the JSON report
    #[arg(long)]
    json_report: bool,

    /// Write the CSV report
    #[arg(long)]
    csv_report: bool,

    /// Write the text summary file
    #[arg(long)]
    summary_report: bool,

    /// Write no report files at all
    #[arg(long, conflicts_with_all = ["html_report", "json_report", "csv_report", "summary_report"])]
    no_reports: bool,
}

impl ValidateArgs {
    fn build_config(&self) -> anyhow::Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::from_toml_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => RunConfig::default(),
        };
        if let Some(v) = self.sample_rate {
            config.sample_rate = v;
        }
        if let Some(v) = self.block_size {
            config.block_size = v;
        }
        if let Some(v) = self.duration {
            config.duration_secs = v;
        }
        if let Some(v) = self.sweep_steps {
            config.sweep_steps = v;
        }
        if let Some(level) = self.level {
            config.level = level.into();
        }
        if self.sequential {
            config.parallel = false;
        } else if self.parallel {
            config.parallel = true;
        }
        if let Some(v) = self.max_threads {
            config.max_threads = v;
        }
        if let Some(v) = self.timeout {
            config.timeout_secs = v;
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        config.validate()?;
        Ok(config)
    }

    /// Which formats to write: explicit flags select a subset, otherwise
    /// everything.
    fn formats(&self) -> (bool, bool, bool, bool) {
        if self.no_reports {
            return (false, false, false, false);
        }
        let any = self.html_report || self.json_report || self.csv_report || self.summary_report;
        if any {
            (
                self.json_report,
                self.csv_report,
                self.html_report,
                self.summary_report,
            )
        } else {
            (true, true, true, true)
        }
    }
}

pub fn run(args: ValidateArgs) -> anyhow::Result<i32> {
    let config = args.build_config()?;
    let factory: Arc<dyn EngineFactory + Send + Sync> = Arc::new(ReferenceFactory::new());

    let all_ids = factory.engine_ids();
    let ids = if args.engines.is_empty() {
        all_ids
    } else {
        for &id in &args.engines {
            if !all_ids.contains(&id) {
                anyhow::bail!("unknown engine id {id}; run `soundcheck engines` for the list");
            }
        }
        args.engines.clone()
    };

    println!(
        "Validating {} engine(s) at level {} ({} Hz, block {})",
        ids.len(),
        config.level,
        config.sample_rate,
        config.block_size
    );

    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        eprintln!("\nStopping after the engines in flight...");
        handler_stop.store(true, Ordering::SeqCst);
    })?;

    let pb = ProgressBar::new(ids.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("##-"),
    );

    let results = run_batch(&factory, &ids, &config, &stop, |progress| {
        pb.set_position(progress.completed as u64);
        pb.set_message(progress.engine_name.clone());
    });
    pb.finish_and_clear();

    let meta = ReportMeta::new("soundcheck reference validation", config.clone());
    println!("{}", text::render(&results, &meta));

    let (want_json, want_csv, want_html, want_summary) = args.formats();
    if want_json {
        json::write(&config.output_dir.join("report.json"), &results, &meta)?;
    }
    if want_csv {
        csv::write(&config.output_dir.join("report.csv"), &results, &meta)?;
    }
    if want_html {
        html::write(&config.output_dir.join("report.html"), &results, &meta)?;
    }
    if want_summary {
        text::write(&config.output_dir.join("summary.txt"), &results, &meta)?;
    }

    Ok(results.exit_code())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: ValidateArgs,
    }

    #[test]
    fn flags_override_the_defaults() {
        let parsed = Harness::parse_from([
            "validate",
            "--sample-rate",
            "96000",
            "--level",
            "stress",
            "--sequential",
            "--engine",
            "2",
            "--engine",
            "5",
        ]);
        let config = parsed.args.build_config().expect("config");
        assert_eq!(config.sample_rate, 96000.0);
        assert_eq!(config.level, ValidationLevel::Stress);
        assert!(!config.parallel);
        assert_eq!(parsed.args.engines, vec![2, 5]);
    }

    #[test]
    fn format_flags_select_a_subset() {
        let parsed = Harness::parse_from(["validate", "--json-report"]);
        assert_eq!(parsed.args.formats(), (true, false, false, false));

        let parsed = Harness::parse_from(["validate"]);
        assert_eq!(parsed.args.formats(), (true, true, true, true));

        let parsed = Harness::parse_from(["validate", "--no-reports"]);
        assert_eq!(parsed.args.formats(), (false, false, false, false));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let parsed = Harness::parse_from(["validate", "--block-size", "0"]);
        assert!(parsed.args.build_config().is_err());
    }
}
