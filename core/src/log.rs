//! Leveled logger interface with a process-wide default.
//!
//! Components that log take a `&dyn Logger`. Convenience call sites can use
//! [`logger()`], which returns whatever was installed with [`set_logger`] or
//! a [`TracingLogger`] otherwise.

use std::fmt;
use std::sync::OnceLock;

use crate::http::Options;

/// Severity levels, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Emergency,
    Alert,
    Critical,
    Error,
    Warning,
    Notice,
    Info,
    Debug,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Emergency => "emergency",
            Level::Alert => "alert",
            Level::Critical => "critical",
            Level::Error => "error",
            Level::Warning => "warning",
            Level::Notice => "notice",
            Level::Info => "info",
            Level::Debug => "debug",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sink for leveled messages with a structured context.
pub trait Logger: Send + Sync {
    fn log(&self, level: Level, message: &str, context: &Options);

    fn emergency(&self, message: &str, context: &Options) {
        self.log(Level::Emergency, message, context);
    }

    fn alert(&self, message: &str, context: &Options) {
        self.log(Level::Alert, message, context);
    }

    fn critical(&self, message: &str, context: &Options) {
        self.log(Level::Critical, message, context);
    }

    fn error(&self, message: &str, context: &Options) {
        self.log(Level::Error, message, context);
    }

    fn warning(&self, message: &str, context: &Options) {
        self.log(Level::Warning, message, context);
    }

    fn notice(&self, message: &str, context: &Options) {
        self.log(Level::Notice, message, context);
    }

    fn info(&self, message: &str, context: &Options) {
        self.log(Level::Info, message, context);
    }

    fn debug(&self, message: &str, context: &Options) {
        self.log(Level::Debug, message, context);
    }
}

/// Forwards to `tracing`. Levels above `error` map to `error`, `notice` maps
/// to `info`. The original level is kept in the `severity` field.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, level: Level, message: &str, context: &Options) {
        let context = serde_json::Value::Object(context.clone());
        let level_name = level.as_str();
        match level {
            Level::Emergency | Level::Alert | Level::Critical | Level::Error => {
                tracing::error!(severity = level_name, %context, "{message}")
            }
            Level::Warning => tracing::warn!(severity = level_name, %context, "{message}"),
            Level::Notice | Level::Info => {
                tracing::info!(severity = level_name, %context, "{message}")
            }
            Level::Debug => tracing::debug!(severity = level_name, %context, "{message}"),
        }
    }
}

static LOGGER: OnceLock<Box<dyn Logger>> = OnceLock::new();
static FALLBACK: TracingLogger = TracingLogger;

/// Install the process-wide logger. Only the first call succeeds; later calls
/// hand the rejected logger back.
pub fn set_logger(logger: Box<dyn Logger>) -> Result<(), Box<dyn Logger>> {
    LOGGER.set(logger)
}

/// The installed logger, or [`TracingLogger`] when none was installed.
pub fn logger() -> &'static dyn Logger {
    match LOGGER.get() {
        Some(logger) => logger.as_ref(),
        None => &FALLBACK,
    }
}
