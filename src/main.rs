//! `tabpipe` CLI: drive config-defined dataset pipelines from one positional token.
//!
//! ```bash
//! tabpipe                  # show usage and the configured datasets
//! tabpipe list             # list dataset names with their declared output
//! tabpipe all              # process every dataset, isolating failures
//! tabpipe <dataset_name>   # process a single dataset
//! ```
//!
//! Datasets are read from `datasets_config.json` in the working directory.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use tabpipe::batch::{load_config, run_all, run_one};
use tabpipe::io::{Severity, StdErrObserver};
use tabpipe::pipeline::RunnerOptions;

const CONFIG_FILE: &str = "datasets_config.json";

#[derive(Parser)]
#[command(name = "tabpipe")]
#[command(about = "Config-driven tabular data pipeline", long_about = None)]
struct Cli {
    /// Dataset name to process, `all` to process every dataset, or `list` to enumerate them.
    command: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let runner = RunnerOptions {
        observer: Some(Arc::new(StdErrObserver)),
        alert_at_or_above: Some(Severity::Critical),
    };

    match cli.command.as_deref() {
        Some("all") => {
            println!("Processing ALL datasets\n");
            let results = run_all(CONFIG_FILE, &runner);
            let failures = results.values().filter(|r| r.is_err()).count();
            if failures > 0 {
                eprintln!("{failures} of {} datasets failed", results.len());
            }
            ExitCode::SUCCESS
        }
        Some("list") => {
            list_datasets();
            ExitCode::SUCCESS
        }
        Some(name) => match run_one(name, CONFIG_FILE, &runner) {
            Ok(_) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Error: {e}");
                ExitCode::FAILURE
            }
        },
        None => {
            usage();
            ExitCode::SUCCESS
        }
    }
}

fn list_datasets() {
    match load_config(CONFIG_FILE) {
        Ok(configs) => {
            println!("Available datasets:");
            for (i, (name, config)) in configs.iter().enumerate() {
                println!("  {}. {}", i + 1, name);
                println!("     Output: {}", config.output_file.display());
            }
        }
        Err(e) => eprintln!("{e}"),
    }
}

fn usage() {
    println!("tabpipe - config-driven tabular data pipeline");
    println!("{}", "=".repeat(60));
    list_datasets();
    println!();
    println!("Usage:");
    println!("  tabpipe <dataset_name>   Process a single dataset");
    println!("  tabpipe all              Process all datasets");
    println!("  tabpipe list             List all datasets");
}
