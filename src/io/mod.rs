//! Format-specific table readers and writers behind a unified entrypoint.
//!
//! Most callers should use [`read_table`] / [`write_table`], which:
//!
//! - auto-detect the format from the file extension (or you can force one via
//!   [`LoadOptions::format`] / [`SaveOptions::format`])
//! - infer a [`crate::types::Schema`] on read; every reader produces typed
//!   [`crate::types::Value`] cells
//! - optionally report success/failure/alerts to an [`IoObserver`]
//!
//! Format-specific functions are also available under:
//! - [`csv`]
//! - [`json`]
//! - [`parquet`]
//! - [`feather`]
//! - `excel` / `hdf` (feature-gated)

pub mod csv;
#[cfg(feature = "excel")]
pub mod excel;
pub mod feather;
#[cfg(feature = "hdf")]
pub mod hdf;
pub mod json;
pub mod observability;
pub mod parquet;

use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{PipelineError, PipelineResult};
use crate::format::{resolve_format, TableFormat};
use crate::types::Table;

pub use observability::{
    CompositeObserver, FileObserver, IoContext, IoDirection, IoObserver, IoStats, Severity,
    StdErrObserver,
};

/// Compression codecs accepted for Parquet output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// No compression.
    None,
    /// Snappy (Parquet's common default).
    Snappy,
    /// Gzip.
    Gzip,
    /// Brotli.
    Brotli,
    /// Zstandard.
    Zstd,
}

impl FromStr for Compression {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "snappy" => Ok(Self::Snappy),
            "gzip" => Ok(Self::Gzip),
            "brotli" => Ok(Self::Brotli),
            "zstd" => Ok(Self::Zstd),
            other => Err(PipelineError::UnsupportedOption {
                message: format!(
                    "unknown compression '{other}' (supported: none, snappy, gzip, brotli, zstd)"
                ),
            }),
        }
    }
}

/// Options controlling table loading.
///
/// Use [`Default`] for common cases.
#[derive(Clone, Default)]
pub struct LoadOptions {
    /// If `None`, auto-detect format from the file extension.
    pub format: Option<TableFormat>,
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn IoObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: Option<Severity>,
}

impl fmt::Debug for LoadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadOptions")
            .field("format", &self.format)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

/// Options controlling table saving.
#[derive(Clone, Default)]
pub struct SaveOptions {
    /// If `None`, auto-detect format from the file extension.
    pub format: Option<TableFormat>,
    /// Compression codec; only valid for Parquet output.
    pub compression: Option<Compression>,
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn IoObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: Option<Severity>,
}

impl fmt::Debug for SaveOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaveOptions")
            .field("format", &self.format)
            .field("compression", &self.compression)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

/// Unified load entry point.
///
/// - If `options.format` is `None`, the format is resolved from the file extension
///   ([`PipelineError::UnsupportedFormat`] when unresolvable).
/// - Fails with [`PipelineError::FileNotFound`] when the path does not exist, before any
///   format-specific reader runs.
///
/// When an observer is configured, this reports `on_success` with row stats, `on_failure` with a
/// computed severity, and `on_alert` when that severity meets `options.alert_at_or_above`.
pub fn read_table(path: impl AsRef<Path>, options: &LoadOptions) -> PipelineResult<Table> {
    let path = path.as_ref();
    let fmt = match options.format {
        Some(f) => f,
        None => resolve_format(path)?,
    };

    let ctx = IoContext {
        path: path.to_path_buf(),
        format: fmt,
        direction: IoDirection::Read,
    };

    let result = if path.exists() {
        match fmt {
            TableFormat::Csv => csv::read_csv_from_path(path),
            TableFormat::Json => json::read_json_from_path(path),
            TableFormat::Parquet => parquet::read_parquet_from_path(path),
            TableFormat::Feather => feather::read_feather_from_path(path),
            TableFormat::Excel => read_excel_dispatch(path),
            TableFormat::Hdf => read_hdf_dispatch(path),
        }
    } else {
        Err(PipelineError::FileNotFound {
            path: path.to_path_buf(),
        })
    };

    report(&ctx, options.observer.as_deref(), options.alert_at_or_above, &result);
    result
}

/// Unified save entry point.
///
/// Resolves the output format the same way as [`read_table`], creates any missing intermediate
/// directories, and writes the table via the format-specific writer. A compression codec on a
/// non-Parquet format fails with [`PipelineError::UnsupportedOption`].
pub fn write_table(table: &Table, path: impl AsRef<Path>, options: &SaveOptions) -> PipelineResult<()> {
    let path = path.as_ref();
    let fmt = match options.format {
        Some(f) => f,
        None => resolve_format(path)?,
    };

    let ctx = IoContext {
        path: path.to_path_buf(),
        format: fmt,
        direction: IoDirection::Write,
    };

    let result = write_dispatch(table, path, fmt, options.compression);

    if let Some(obs) = options.observer.as_deref() {
        match &result {
            Ok(()) => obs.on_success(&ctx, IoStats { rows: table.row_count() }),
            Err(e) => {
                let sev = severity_for_error(e);
                obs.on_failure(&ctx, sev, e);
                if options.alert_at_or_above.is_some_and(|t| sev >= t) {
                    obs.on_alert(&ctx, sev, e);
                }
            }
        }
    }

    result
}

fn write_dispatch(
    table: &Table,
    path: &Path,
    fmt: TableFormat,
    compression: Option<Compression>,
) -> PipelineResult<()> {
    if compression.is_some() && fmt != TableFormat::Parquet {
        return Err(PipelineError::UnsupportedOption {
            message: format!("compression is not supported for {} output", fmt.name()),
        });
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    match fmt {
        TableFormat::Csv => csv::write_csv_to_path(table, path),
        TableFormat::Json => json::write_json_to_path(table, path),
        TableFormat::Parquet => parquet::write_parquet_to_path(table, path, compression),
        TableFormat::Feather => feather::write_feather_to_path(table, path),
        TableFormat::Excel => write_excel_dispatch(table, path),
        TableFormat::Hdf => write_hdf_dispatch(table, path),
    }
}

fn report(
    ctx: &IoContext,
    observer: Option<&dyn IoObserver>,
    alert_at_or_above: Option<Severity>,
    result: &PipelineResult<Table>,
) {
    let Some(obs) = observer else { return };
    match result {
        Ok(t) => obs.on_success(ctx, IoStats { rows: t.row_count() }),
        Err(e) => {
            let sev = severity_for_error(e);
            obs.on_failure(ctx, sev, e);
            if alert_at_or_above.is_some_and(|t| sev >= t) {
                obs.on_alert(ctx, sev, e);
            }
        }
    }
}

fn severity_for_error(e: &PipelineError) -> Severity {
    match e {
        PipelineError::Io(_) | PipelineError::FileNotFound { .. } => Severity::Critical,
        PipelineError::Csv(err) => match err.kind() {
            ::csv::ErrorKind::Io(_) => Severity::Critical,
            _ => Severity::Error,
        },
        PipelineError::Parquet(err) => {
            // Parquet errors often wrap IO, but not always in a structured way. If we can detect
            // IO in the source chain, treat it as Critical.
            if error_chain_contains_io(err) {
                Severity::Critical
            } else {
                Severity::Error
            }
        }
        _ => Severity::Error,
    }
}

fn error_chain_contains_io(e: &(dyn StdError + 'static)) -> bool {
    let mut cur: Option<&(dyn StdError + 'static)> = Some(e);
    while let Some(err) = cur {
        if err.is::<std::io::Error>() {
            return true;
        }
        cur = err.source();
    }
    false
}

fn read_excel_dispatch(path: &Path) -> PipelineResult<Table> {
    let _ = path;

    #[cfg(feature = "excel")]
    {
        excel::read_excel_from_path(path, None)
    }

    #[cfg(not(feature = "excel"))]
    {
        Err(PipelineError::Schema {
            message: "excel support not enabled (enable cargo feature 'excel')".to_string(),
        })
    }
}

fn write_excel_dispatch(table: &Table, path: &Path) -> PipelineResult<()> {
    let _ = (table, path);

    #[cfg(feature = "excel")]
    {
        excel::write_excel_to_path(table, path)
    }

    #[cfg(not(feature = "excel"))]
    {
        Err(PipelineError::Schema {
            message: "excel support not enabled (enable cargo feature 'excel')".to_string(),
        })
    }
}

fn read_hdf_dispatch(path: &Path) -> PipelineResult<Table> {
    let _ = path;

    #[cfg(feature = "hdf")]
    {
        hdf::read_hdf_from_path(path)
    }

    #[cfg(not(feature = "hdf"))]
    {
        Err(PipelineError::Schema {
            message: "hdf support not enabled (enable cargo feature 'hdf')".to_string(),
        })
    }
}

fn write_hdf_dispatch(table: &Table, path: &Path) -> PipelineResult<()> {
    let _ = (table, path);

    #[cfg(feature = "hdf")]
    {
        hdf::write_hdf_to_path(table, path)
    }

    #[cfg(not(feature = "hdf"))]
    {
        Err(PipelineError::Schema {
            message: "hdf support not enabled (enable cargo feature 'hdf')".to_string(),
        })
    }
}
