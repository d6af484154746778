//! `tabpipe` is a small library (plus CLI) for config-driven tabular data pipelines: load a file
//! in one of several common formats into an in-memory [`types::Table`], apply filtering and
//! ordering, optionally partition rows into a two-level grouping index for fast retrieval, and
//! write the result back out in a possibly different format.
//!
//! ## Supported formats (auto-detected by extension)
//!
//! - **CSV**: `.csv`
//! - **Parquet**: `.parquet`, `.pq`
//! - **JSON**: `.json` (array-of-objects) and `.jsonl` (newline-delimited objects)
//! - **Spreadsheets** (requires the Cargo feature `excel`, on by default): `.xlsx`, `.xls`
//! - **Feather** (Arrow IPC): `.feather`, `.ftr`
//! - **HDF5** (requires the Cargo feature `hdf`): `.h5`, `.hdf`, `.hdf5`
//!
//! Every reader infers a [`types::Schema`] at load time; cells are typed [`types::Value`]s
//! ([`types::DataType::Int64`], [`types::DataType::Float64`], [`types::DataType::Bool`],
//! [`types::DataType::Utf8`], with empty/missing cells as [`types::Value::Null`]).
//!
//! ## Quick example: transform a table in memory
//!
//! ```rust
//! use tabpipe::store::TableStore;
//! use tabpipe::types::{DataType, Field, Schema, Table, Value};
//!
//! # fn main() -> Result<(), tabpipe::PipelineError> {
//! let schema = Schema::new(vec![
//!     Field::new("region", DataType::Utf8),
//!     Field::new("sales", DataType::Int64),
//! ]);
//! let table = Table::new(
//!     schema,
//!     vec![
//!         vec![Value::Utf8("east".to_string()), Value::Int64(10)],
//!         vec![Value::Utf8("west".to_string()), Value::Int64(20)],
//!         vec![Value::Utf8("east".to_string()), Value::Int64(30)],
//!     ],
//! );
//!
//! let mut store = TableStore::from_table(table);
//! store.filter_by_column("region", &[Value::Utf8("west".to_string())])?;
//! let clusters = store.create_clusters("region")?;
//! assert_eq!(clusters.len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Quick example: one dataset end to end
//!
//! ```no_run
//! use tabpipe::pipeline::{run_dataset, DatasetConfig, RunnerOptions};
//!
//! # fn main() -> Result<(), tabpipe::PipelineError> {
//! let config: DatasetConfig = serde_json::from_str(
//!     r#"{
//!         "input_file": "listings.csv",
//!         "output_file": "listings.parquet",
//!         "output_dir": "out",
//!         "compression": "snappy",
//!         "primary_column": "region",
//!         "sub_columns": ["city"],
//!         "sort_order": ["East", "West"]
//!     }"#,
//! )?;
//!
//! let store = run_dataset(&config, &RunnerOptions::default())?;
//! println!("rows={}", store.table().row_count());
//! # Ok(())
//! # }
//! ```
//!
//! ## Batch runs
//!
//! [`batch::run_all`] reads a JSON document mapping dataset names to [`pipeline::DatasetConfig`]
//! entries and runs each in turn. A failure in one dataset is caught, recorded, and does not
//! abort the rest. The `tabpipe` binary is a thin dispatch over this: `tabpipe all`,
//! `tabpipe list`, `tabpipe <dataset_name>`.
//!
//! ## Modules
//!
//! - [`format`]: file-extension to format resolution
//! - [`io`]: unified load/save entrypoints and format-specific implementations
//! - [`types`]: schema + in-memory table types
//! - [`store`]: the per-session table store with cluster/sub-cluster indices
//! - [`pipeline`]: dataset config + the fixed-order pipeline driver
//! - [`batch`]: config loading and the failure-isolating batch runner
//! - [`error`]: error types used across the crate

pub mod batch;
pub mod error;
pub mod format;
pub mod io;
pub mod pipeline;
pub mod store;
pub mod types;

pub use error::{PipelineError, PipelineResult};
