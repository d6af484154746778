//! The per-dataset pipeline driver.
//!
//! [`run_dataset`] executes one dataset's lifecycle in a fixed order: resolve the output path,
//! load, filter, keep-only, custom sort, clustering, statistics, save. Every step is skipped
//! (never failed) when its inputs are absent from the [`DatasetConfig`].

use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::error::PipelineResult;
use crate::format::TableFormat;
use crate::io::{Compression, IoObserver, LoadOptions, SaveOptions, Severity};
use crate::store::TableStore;
use crate::types::Value;

/// A named, flat set of pipeline options describing one end-to-end run.
///
/// Deserialized once from the configuration document at batch start; immutable thereafter.
/// Unknown keys are rejected so a typo'd option surfaces as a config error instead of being
/// silently ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetConfig {
    /// Path to the input file (format auto-detected from the extension).
    pub input_file: PathBuf,
    /// Output file name or path (format auto-detected unless `output_format` is set).
    pub output_file: PathBuf,
    /// Directory to place the output file in; joined with `output_file` when present.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    /// Explicit output format name (`"csv"`, `"parquet"`, `"json"`, `"excel"`, `"feather"`,
    /// `"hdf"`), overriding extension detection. Parsed at run time so a bad name fails only
    /// this dataset.
    #[serde(default)]
    pub output_format: Option<String>,
    /// Compression codec for Parquet output (`"snappy"`, `"gzip"`, `"brotli"`, `"zstd"`).
    #[serde(default)]
    pub compression: Option<String>,
    /// Column for primary clustering.
    #[serde(default)]
    pub primary_column: Option<String>,
    /// Columns for sub-clustering within the primary clusters.
    #[serde(default)]
    pub sub_columns: Vec<String>,
    /// Custom category order for sorting `primary_column`.
    #[serde(default)]
    pub sort_order: Vec<String>,
    /// Column to filter on.
    #[serde(default)]
    pub filter_column: Option<String>,
    /// Values to remove from `filter_column`.
    #[serde(default)]
    pub filter_values: Vec<JsonValue>,
    /// Column to keep specific values from.
    #[serde(default)]
    pub keep_column: Option<String>,
    /// Values to keep in `keep_column`.
    #[serde(default)]
    pub keep_values: Vec<JsonValue>,
    /// Whether to print per-cluster statistics.
    #[serde(default = "default_show_stats")]
    pub show_stats: bool,
}

fn default_show_stats() -> bool {
    true
}

/// Ambient options threaded through a run: the I/O observer and its alert threshold.
#[derive(Clone, Default)]
pub struct RunnerOptions {
    /// Optional observer receiving load/save events.
    pub observer: Option<Arc<dyn IoObserver>>,
    /// Severity threshold at which the observer's `on_alert` fires.
    pub alert_at_or_above: Option<Severity>,
}

impl fmt::Debug for RunnerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunnerOptions")
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

/// Run one dataset end to end and return the processed session for programmatic reuse.
///
/// Step order is fixed; steps whose inputs are absent are skipped. Any error aborts this run
/// immediately (no partial-state recovery); batch isolation happens one level up, in
/// [`crate::batch::run_all`].
pub fn run_dataset(config: &DatasetConfig, runner: &RunnerOptions) -> PipelineResult<TableStore> {
    let output_path = match &config.output_dir {
        Some(dir) => dir.join(&config.output_file),
        None => config.output_file.clone(),
    };

    println!("Loading data from {}...", config.input_file.display());
    let load_options = LoadOptions {
        format: None,
        observer: runner.observer.clone(),
        alert_at_or_above: runner.alert_at_or_above,
    };
    let mut store = TableStore::load(&config.input_file, &load_options)?;
    println!(
        "Loaded {} rows, {} columns",
        store.table().row_count(),
        store.table().column_count()
    );

    if let Some(column) = &config.filter_column {
        if !config.filter_values.is_empty() {
            let values = config_values(&config.filter_values);
            let dropped = store.filter_by_column(column, &values)?;
            println!(
                "Dropped {dropped} rows where {column} was in [{}]",
                render_values(&values)
            );
            println!("{} rows remaining", store.table().row_count());
        }
    }

    if let Some(column) = &config.keep_column {
        if !config.keep_values.is_empty() {
            let values = config_values(&config.keep_values);
            let dropped = store.keep_only_values(column, &values)?;
            println!(
                "Kept only [{}] in {column}. Dropped {dropped} rows.",
                render_values(&values)
            );
            println!("{} rows remaining", store.table().row_count());
        }
    }

    if let Some(primary) = &config.primary_column {
        if !config.sort_order.is_empty() {
            println!("Sorting by '{primary}' with custom order...");
            store.sort_by_custom_order(primary, &config.sort_order)?;
            println!("Sorted successfully");
        }
    }

    if let Some(primary) = &config.primary_column {
        let cluster_count = store.create_clusters(primary)?.len();
        println!("Created {cluster_count} clusters for '{primary}'");

        for sub in &config.sub_columns {
            println!("Creating sub-clusters by '{sub}'...");
            let sub_index = store.create_sub_clusters(primary, sub)?;
            for (primary_value, per_primary) in sub_index.iter() {
                println!("  {primary_value}: {} sub-clusters", per_primary.len());
            }
        }
    }

    if config.show_stats {
        if let Some(primary) = &config.primary_column {
            print_stats(&mut store, primary, config.sub_columns.first())?;
        }
    }

    println!("Saving processed data to {}...", output_path.display());
    let format = config
        .output_format
        .as_deref()
        .map(str::parse::<TableFormat>)
        .transpose()?;
    let compression = config
        .compression
        .as_deref()
        .map(str::parse::<Compression>)
        .transpose()?;
    let save_options = SaveOptions {
        format,
        compression,
        observer: runner.observer.clone(),
        alert_at_or_above: runner.alert_at_or_above,
    };
    store.save(&output_path, &save_options)?;

    let size_mb = fs::metadata(&output_path)?.len() as f64 / (1024.0 * 1024.0);
    println!(
        "Saved {} ({:.2} MB, {} rows, {} columns)",
        output_path.display(),
        size_mb,
        store.table().row_count(),
        store.table().column_count()
    );
    println!("Processing complete!");

    Ok(store)
}

/// Per-cluster row counts plus one illustrative sub-cluster lookup.
fn print_stats(
    store: &mut TableStore,
    primary: &str,
    first_sub: Option<&String>,
) -> PipelineResult<()> {
    let bar = "=".repeat(60);
    println!("{bar}");
    println!("STATISTICS");
    println!("{bar}");

    if let Some(index) = store.cluster_index(primary) {
        for (value, partition) in index.iter() {
            println!("{value}: {} rows", partition.row_count());
        }
    }

    if let Some(sub_col) = first_sub {
        let first_pair = store
            .sub_cluster_index(primary, sub_col)
            .and_then(|sub_index| sub_index.iter().next())
            .and_then(|(primary_value, sub_index)| {
                sub_index
                    .keys()
                    .first()
                    .map(|sub_value| (primary_value.clone(), sub_value.clone()))
            });
        if let Some((primary_value, sub_value)) = first_pair {
            match store.get_sub_cluster(primary, sub_col, &primary_value, &sub_value)? {
                Some(table) => println!(
                    "Example: {primary_value} -> {sub_value}: {} rows",
                    table.row_count()
                ),
                None => println!("No data found for {primary_value} -> {sub_value}"),
            }
        }
    }

    println!("{bar}");
    Ok(())
}

fn render_values(values: &[Value]) -> String {
    values
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Convert config-supplied JSON scalars into table [`Value`]s.
fn config_values(values: &[JsonValue]) -> Vec<Value> {
    values
        .iter()
        .map(|v| match v {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(*b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int64(i)
                } else {
                    Value::Float64(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            JsonValue::String(s) => Value::Utf8(s.clone()),
            other => Value::Utf8(other.to_string()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_leave_optional_steps_absent() {
        let cfg: DatasetConfig = serde_json::from_str(
            r#"{"input_file": "in.csv", "output_file": "out.parquet"}"#,
        )
        .unwrap();

        assert!(cfg.output_dir.is_none());
        assert!(cfg.primary_column.is_none());
        assert!(cfg.sub_columns.is_empty());
        assert!(cfg.filter_values.is_empty());
        assert!(cfg.show_stats);
    }

    #[test]
    fn config_rejects_unknown_keys() {
        let result: Result<DatasetConfig, _> = serde_json::from_str(
            r#"{"input_file": "in.csv", "output_file": "out.csv", "primry_column": "x"}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn config_values_convert_json_scalars() {
        let raw = vec![
            JsonValue::from(2),
            JsonValue::from(2.5),
            JsonValue::from("west"),
            JsonValue::Bool(false),
            JsonValue::Null,
        ];
        let values = config_values(&raw);
        assert_eq!(
            values,
            vec![
                Value::Int64(2),
                Value::Float64(2.5),
                Value::Utf8("west".to_string()),
                Value::Bool(false),
                Value::Null,
            ]
        );
    }
}
