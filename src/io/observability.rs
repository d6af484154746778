use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::PipelineError;
use crate::format::TableFormat;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal).
    Warning,
    /// Error-level event (operation failed).
    Error,
    /// Critical error (typically I/O or other infrastructure failures).
    Critical,
}

/// Whether an I/O event concerns loading or saving a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoDirection {
    /// Reading a table from disk.
    Read,
    /// Writing a table to disk.
    Write,
}

/// Context about one load or save attempt.
#[derive(Debug, Clone)]
pub struct IoContext {
    /// The file path involved.
    pub path: PathBuf,
    /// Format used for the operation.
    pub format: TableFormat,
    /// Load or save.
    pub direction: IoDirection,
}

/// Minimal stats reported on a successful load or save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoStats {
    /// Number of rows moved.
    pub rows: usize,
}

/// Observer interface for table I/O outcomes.
///
/// Implementors can record metrics, logs, or trigger alerts.
pub trait IoObserver: Send + Sync {
    /// Called when a load or save succeeds.
    fn on_success(&self, _ctx: &IoContext, _stats: IoStats) {}

    /// Called when a load or save fails.
    fn on_failure(&self, _ctx: &IoContext, _severity: Severity, _error: &PipelineError) {}

    /// Called when a failure meets an alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &IoContext, severity: Severity, error: &PipelineError) {
        self.on_failure(ctx, severity, error)
    }
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn IoObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn IoObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl IoObserver for CompositeObserver {
    fn on_success(&self, ctx: &IoContext, stats: IoStats) {
        for o in &self.observers {
            o.on_success(ctx, stats);
        }
    }

    fn on_failure(&self, ctx: &IoContext, severity: Severity, error: &PipelineError) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &IoContext, severity: Severity, error: &PipelineError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }
}

/// Logs table I/O events to stderr.
#[derive(Debug, Default)]
pub struct StdErrObserver;

impl IoObserver for StdErrObserver {
    fn on_success(&self, ctx: &IoContext, stats: IoStats) {
        eprintln!(
            "[{:?}][ok] format={:?} path={} rows={}",
            ctx.direction,
            ctx.format,
            ctx.path.display(),
            stats.rows
        );
    }

    fn on_failure(&self, ctx: &IoContext, severity: Severity, error: &PipelineError) {
        eprintln!(
            "[{:?}][{:?}] format={:?} path={} err={}",
            ctx.direction,
            severity,
            ctx.format,
            ctx.path.display(),
            error
        );
    }

    fn on_alert(&self, ctx: &IoContext, severity: Severity, error: &PipelineError) {
        eprintln!(
            "[ALERT][{:?}][{:?}] format={:?} path={} err={}",
            ctx.direction,
            severity,
            ctx.format,
            ctx.path.display(),
            error
        );
    }
}

/// Appends table I/O events to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{line}");
        }
    }
}

impl IoObserver for FileObserver {
    fn on_success(&self, ctx: &IoContext, stats: IoStats) {
        self.append_line(&format!(
            "{} ok direction={:?} format={:?} path={} rows={}",
            unix_ts(),
            ctx.direction,
            ctx.format,
            ctx.path.display(),
            stats.rows
        ));
    }

    fn on_failure(&self, ctx: &IoContext, severity: Severity, error: &PipelineError) {
        self.append_line(&format!(
            "{} fail severity={:?} direction={:?} format={:?} path={} err={}",
            unix_ts(),
            severity,
            ctx.direction,
            ctx.format,
            ctx.path.display(),
            error
        ));
    }

    fn on_alert(&self, ctx: &IoContext, severity: Severity, error: &PipelineError) {
        self.append_line(&format!(
            "{} ALERT severity={:?} direction={:?} format={:?} path={} err={}",
            unix_ts(),
            severity,
            ctx.direction,
            ctx.format,
            ctx.path.display(),
            error
        ));
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
