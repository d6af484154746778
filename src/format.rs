//! File-format resolution.
//!
//! Maps file extensions (and explicit config-supplied names) to a canonical [`TableFormat`].
//! Resolution is a pure function of the path's extension: case-insensitive, dot-stripped,
//! many-to-one. Unresolvable extensions are a hard [`PipelineError::UnsupportedFormat`].

use std::path::Path;
use std::str::FromStr;

use crate::error::{PipelineError, PipelineResult};

/// Supported on-disk table encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    /// Comma-separated values (`.csv`).
    Csv,
    /// Apache Parquet (`.parquet`, `.pq`).
    Parquet,
    /// JSON array-of-objects or NDJSON (`.json`, `.jsonl`).
    Json,
    /// Spreadsheet workbooks (`.xlsx`, `.xls`; feature-gated behind `excel`).
    Excel,
    /// Arrow IPC file, a.k.a. Feather (`.feather`, `.ftr`).
    Feather,
    /// HDF5 (`.h5`, `.hdf`, `.hdf5`; feature-gated behind `hdf`).
    Hdf,
}

/// Extensions accepted by [`TableFormat::from_extension`], for error messages.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "csv", "parquet", "pq", "json", "jsonl", "xlsx", "xls", "feather", "ftr", "h5", "hdf", "hdf5",
];

impl TableFormat {
    /// Parse a table format from a file extension (case-insensitive, without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "parquet" | "pq" => Some(Self::Parquet),
            "json" | "jsonl" => Some(Self::Json),
            "xlsx" | "xls" => Some(Self::Excel),
            "feather" | "ftr" => Some(Self::Feather),
            "h5" | "hdf" | "hdf5" => Some(Self::Hdf),
            _ => None,
        }
    }

    /// Short lowercase name, matching the names accepted by [`FromStr`].
    pub fn name(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Parquet => "parquet",
            Self::Json => "json",
            Self::Excel => "excel",
            Self::Feather => "feather",
            Self::Hdf => "hdf",
        }
    }
}

impl FromStr for TableFormat {
    type Err = PipelineError;

    /// Parse an explicit format name, as supplied in a dataset config's `output_format`.
    ///
    /// Accepts canonical names (`"excel"`, `"hdf"`, ...) as well as the extension aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("excel") {
            return Ok(Self::Excel);
        }
        Self::from_extension(s).ok_or_else(|| unsupported(s))
    }
}

/// Resolve a format from a path's extension.
///
/// Fails with [`PipelineError::UnsupportedFormat`] when the path has no extension or the
/// extension is not in the supported set. Callers holding an explicit [`TableFormat`] bypass
/// this entirely.
pub fn resolve_format(path: &Path) -> PipelineResult<TableFormat> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .ok_or_else(|| unsupported(&path.display().to_string()))?;
    TableFormat::from_extension(ext).ok_or_else(|| unsupported(ext))
}

fn unsupported(requested: &str) -> PipelineError {
    PipelineError::UnsupportedFormat {
        requested: requested.to_string(),
        supported: SUPPORTED_EXTENSIONS.join(", "),
    }
}
