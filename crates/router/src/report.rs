//! Classification and optional logging of dispatch and registration failures.
//!
//! Reporting never changes the error being reported: callers get back exactly what failed,
//! whether or not the sink accepted the line.

use crate::error::{DispatchError, PatternError};
use chrono::{DateTime, Local};
use http::Method;
use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, warn};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// An append only destination for error log lines.
#[cfg_attr(test, mockall::automock)]
pub trait ErrorSink: Send + Sync {
    /// Appends one line, without its trailing newline.
    fn append(&self, line: &str) -> io::Result<()>;
}

/// Appends lines to a file, creating the file and its parent directories on first use.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ErrorSink for FileSink {
    fn append(&self, line: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{line}")
    }
}

/// The kind of a dispatch failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    NotFound,
    Fault,
    /// Deadline exceeded or cancelled.
    Timeout,
}

impl ErrorClass {
    pub fn of(err: &DispatchError) -> Self {
        match err {
            DispatchError::RouteNotFound { .. } => Self::NotFound,
            DispatchError::Fault { .. } => Self::Fault,
            DispatchError::DeadlineExceeded { .. } | DispatchError::Cancelled { .. } => Self::Timeout,
        }
    }
}

/// Forwards faults to `tracing` and, when a sink is configured, to the error log.
///
/// Only faults and compilation errors reach the sink; unmatched routes and timeouts are
/// traced but not logged.
#[derive(Clone, Default)]
pub struct ErrorReporter {
    sink: Option<Arc<dyn ErrorSink>>,
}

impl fmt::Debug for ErrorReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorReporter").field("logging", &self.sink.is_some()).finish()
    }
}

impl ErrorReporter {
    /// A reporter which only traces.
    pub fn disabled() -> Self {
        Self { sink: None }
    }

    pub fn new<S: ErrorSink + 'static>(sink: S) -> Self {
        Self { sink: Some(Arc::new(sink)) }
    }

    pub fn with_sink(sink: Arc<dyn ErrorSink>) -> Self {
        Self { sink: Some(sink) }
    }

    pub fn is_logging(&self) -> bool {
        self.sink.is_some()
    }

    pub fn report(&self, err: &DispatchError) -> ErrorClass {
        let class = ErrorClass::of(err);
        match err {
            DispatchError::RouteNotFound { method, path } => {
                debug!(%method, path = %path, "no route matched");
            }
            DispatchError::Fault { site, source } => {
                error!(cause = %source, site = %site, "dispatch failed");
                self.append(&source.to_string(), &site.to_string());
            }
            DispatchError::DeadlineExceeded { site } | DispatchError::Cancelled { site } => {
                warn!(cause = %err, site = %site, "dispatch interrupted");
            }
        }
        class
    }

    pub fn report_compilation(&self, method: &Method, err: &PatternError) {
        error!(cause = %err, %method, template = err.template(), "route registration failed");
        self.append(&err.to_string(), &format!("registration of {method} {}", err.template()));
    }

    fn append(&self, message: &str, location: &str) {
        let Some(sink) = &self.sink else {
            return;
        };

        let line = format_line(Local::now(), message, location);
        if let Err(e) = sink.append(&line) {
            warn!(cause = %e, "failed to append to the error log");
        }
    }
}

/// Formats `[YYYY-MM-DD HH:MM:SS] <message> in <location>`.
pub fn format_line(at: DateTime<Local>, message: &str, location: &str) -> String {
    format!("[{}] {message} in {location}", at.format(TIMESTAMP_FORMAT))
}
