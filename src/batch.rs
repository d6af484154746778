//! The batch runner: load a named collection of dataset configs and drive the pipeline once per
//! entry, isolating failures per dataset.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::{run_dataset, DatasetConfig, RunnerOptions};
use crate::store::TableStore;

/// Load named dataset configs from a JSON configuration document.
///
/// Fails with [`PipelineError::Config`] when the file is missing or unparsable.
pub fn load_config(path: impl AsRef<Path>) -> PipelineResult<BTreeMap<String, DatasetConfig>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| PipelineError::Config {
        message: format!("cannot read config '{}': {e}", path.display()),
    })?;
    serde_json::from_str(&text).map_err(|e| PipelineError::Config {
        message: format!("invalid JSON in config '{}': {e}", path.display()),
    })
}

/// Run every dataset in the configuration, in name order.
///
/// A missing or malformed configuration yields an empty result map (the error is printed, not
/// raised). A failure in one dataset's run is caught here, recorded under that dataset's name,
/// and does not abort the remaining datasets. Per-dataset isolation is the batch path's only
/// recovery policy.
pub fn run_all(
    config_path: impl AsRef<Path>,
    runner: &RunnerOptions,
) -> BTreeMap<String, PipelineResult<TableStore>> {
    let configs = match load_config(config_path) {
        Ok(configs) => configs,
        Err(e) => {
            eprintln!("{e}");
            return BTreeMap::new();
        }
    };

    let bar = "=".repeat(60);
    println!("Processing {} datasets...", configs.len());
    println!("{bar}");

    let mut results = BTreeMap::new();
    for (name, config) in configs {
        println!("\nProcessing: {name}");
        println!("{bar}");

        let outcome = run_dataset(&config, runner);
        match &outcome {
            Ok(_) => println!("{name} completed successfully"),
            Err(e) => eprintln!("Error processing {name}: {e}"),
        }
        results.insert(name, outcome);
    }

    println!("{bar}");
    println!("Batch processing complete! Processed {} datasets", results.len());
    results
}

/// Run a single dataset by name.
///
/// Fails with [`PipelineError::DatasetNotFound`] (listing the known names) when `name` is not in
/// the configuration.
pub fn run_one(
    name: &str,
    config_path: impl AsRef<Path>,
    runner: &RunnerOptions,
) -> PipelineResult<TableStore> {
    let mut configs = load_config(config_path)?;

    let Some(config) = configs.remove(name) else {
        return Err(PipelineError::DatasetNotFound {
            name: name.to_string(),
            known: configs.into_keys().collect(),
        });
    };

    println!("Processing: {name}\n");
    run_dataset(&config, runner)
}
