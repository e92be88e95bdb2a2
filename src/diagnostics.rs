//! Per-table diagnostics.
//!
//! Each [`PieceTable`](crate::PieceTable) carries its own switch and an
//! optional log callback. With no callback installed, messages go to
//! `tracing` under the `piecetable` target.

use std::fmt;

/// Log level for diagnostic callbacks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Callback receiving diagnostic messages.
pub type LogCallback = Box<dyn Fn(LogLevel, &str) + Send + Sync + 'static>;

#[derive(Default)]
pub(crate) struct Diagnostics {
    enabled: bool,
    callback: Option<LogCallback>,
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("enabled", &self.enabled)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

impl Diagnostics {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            callback: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn set_callback(&mut self, callback: Option<LogCallback>) {
        self.callback = callback;
    }

    /// Emit a message. `message` is only built when diagnostics are on.
    pub fn emit(&self, level: LogLevel, message: impl FnOnce() -> String) {
        if !self.is_enabled() {
            return;
        }
        let message = message();
        if let Some(callback) = self.callback.as_ref() {
            callback(level, &message);
            return;
        }
        match level {
            LogLevel::Debug => tracing::debug!(target: "piecetable", "{message}"),
            LogLevel::Info => tracing::info!(target: "piecetable", "{message}"),
            LogLevel::Warn => tracing::warn!(target: "piecetable", "{message}"),
            LogLevel::Error => tracing::error!(target: "piecetable", "{message}"),
        }
    }
}
