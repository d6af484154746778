use std::path::PathBuf;

use thiserror::Error;

/// Convenience result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Error type shared across loading, transformation, saving, and batch dispatch.
///
/// Within a single dataset run every error propagates immediately and aborts that run; the batch
/// runner catches errors at its boundary and records them per dataset instead of aborting the
/// whole batch.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Input path does not exist.
    #[error("file not found: {path}")]
    FileNotFound {
        /// The missing path.
        path: PathBuf,
    },

    /// A format could not be resolved from an extension or an explicit format name.
    #[error("unsupported format '{requested}' (supported: {supported})")]
    UnsupportedFormat {
        /// The extension or format name that failed to resolve.
        requested: String,
        /// Human-readable list of supported formats/extensions.
        supported: String,
    },

    /// A save-time option is invalid for the chosen format.
    #[error("unsupported option: {message}")]
    UnsupportedOption { message: String },

    /// A dataset name is absent from the configuration.
    #[error("dataset '{name}' not found in config (known datasets: {known:?})")]
    DatasetNotFound {
        name: String,
        /// Names present in the configuration, for the error message.
        known: Vec<String>,
    },

    /// The configuration source is missing or unparsable.
    #[error("config error: {message}")]
    Config { message: String },

    /// A referenced column does not exist in the table.
    #[error("column '{column}' not found (available: {available:?})")]
    ColumnNotFound {
        column: String,
        available: Vec<String>,
    },

    /// The input's structure does not fit the tabular model (no header row, non-object JSON
    /// rows, unsupported column types, etc.).
    #[error("schema error: {message}")]
    Schema { message: String },

    /// A value could not be parsed into its inferred [`crate::types::DataType`].
    #[error("failed to parse value at row {row} column '{column}': {message} (raw='{raw}')")]
    Parse {
        row: usize,
        column: String,
        raw: String,
        message: String,
    },

    /// Underlying I/O error (e.g. permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV read/write error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON read/write error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Parquet read/write error.
    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Arrow (Feather) read/write error.
    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[cfg(feature = "excel")]
    /// Excel read error (feature-gated behind `excel`).
    #[error("excel error: {0}")]
    Excel(#[from] calamine::Error),

    #[cfg(feature = "excel")]
    /// Excel write error (feature-gated behind `excel`).
    #[error("xlsx write error: {0}")]
    XlsxWrite(#[from] rust_xlsxwriter::XlsxError),

    #[cfg(feature = "hdf")]
    /// HDF5 read/write error (feature-gated behind `hdf`).
    #[error("hdf5 error: {0}")]
    Hdf5(#[from] hdf5::Error),
}
