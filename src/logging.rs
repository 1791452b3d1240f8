//! Log sink injected into every component.
//!
//! Components never reach for the global logger directly; they receive an
//! `Arc<dyn LogSink>` at construction. The binary wires in [`LogFacade`], which
//! forwards to the `log` crate, and tests use [`RecordingLog`].

use std::sync::Mutex;

use log::Level;

/// Four-severity logging interface
pub trait LogSink: Send + Sync {
    fn error(&self, msg: &str);
    fn warn(&self, msg: &str);
    fn info(&self, msg: &str);
    fn debug(&self, msg: &str);

    /// Warn with the underlying cause appended
    fn warn_with(&self, msg: &str, cause: &dyn std::error::Error) {
        self.warn(&format!("{}: {}", msg, cause));
    }
}

/// Forwards to the `log` crate macros
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFacade;

impl LogSink for LogFacade {
    fn error(&self, msg: &str) {
        log::error!("{}", msg);
    }

    fn warn(&self, msg: &str) {
        log::warn!("{}", msg);
    }

    fn info(&self, msg: &str) {
        log::info!("{}", msg);
    }

    fn debug(&self, msg: &str) {
        log::debug!("{}", msg);
    }
}

/// Keeps every message in memory for later inspection
#[derive(Debug, Default)]
pub struct RecordingLog {
    entries: Mutex<Vec<(Level, String)>>,
}

impl RecordingLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, level: Level, msg: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push((level, msg.to_string()));
        }
    }

    /// All recorded entries in order
    pub fn entries(&self) -> Vec<(Level, String)> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Messages logged at exactly `level`
    pub fn messages(&self, level: Level) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m)
            .collect()
    }

    /// Number of messages at `level` containing `needle`
    pub fn count(&self, level: Level, needle: &str) -> usize {
        self.messages(level).iter().filter(|m| m.contains(needle)).count()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.messages(Level::Warn)
    }

    pub fn errors(&self) -> Vec<String> {
        self.messages(Level::Error)
    }
}

impl LogSink for RecordingLog {
    fn error(&self, msg: &str) {
        self.push(Level::Error, msg);
    }

    fn warn(&self, msg: &str) {
        self.push(Level::Warn, msg);
    }

    fn info(&self, msg: &str) {
        self.push(Level::Info, msg);
    }

    fn debug(&self, msg: &str) {
        self.push(Level::Debug, msg);
    }
}
