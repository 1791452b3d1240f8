//! Regex evidence in tool-generated files.
//!
//! LaTeX tools are unreliable about exit codes, so their logs are the
//! authoritative signal. [`LogClassifier`] answers whether a pattern occurs in
//! a file, keeping "file absent or unreadable" apart from "pattern absent".

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::Path;
use std::sync::Arc;

use regex::{Regex, RegexBuilder};

use crate::error::{BuildError, Result};
use crate::logging::LogSink;

/// Outcome of scanning a file for a pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMatch {
    Found,
    NotFound,
    /// The file is missing or could not be read
    Unreadable,
}

impl LogMatch {
    pub fn is_found(self) -> bool {
        self == LogMatch::Found
    }
}

/// A compiled pattern plus how it is applied to a file.
///
/// Patterns are matched against one line at a time. A pattern starting with
/// `\A` describes a file header instead and is matched against the whole text.
#[derive(Debug, Clone)]
pub struct LinePattern {
    regex: Regex,
    whole_file: bool,
}

impl LinePattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = RegexBuilder::new(pattern)
            .multi_line(true)
            .build()
            .map_err(|source| BuildError::Pattern {
                pattern: pattern.to_string(),
                source,
            })?;
        Ok(Self {
            regex,
            whole_file: pattern.starts_with(r"\A"),
        })
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// Scans files for patterns, re-reading the file on every call
#[derive(Clone)]
pub struct LogClassifier {
    log: Arc<dyn LogSink>,
}

impl LogClassifier {
    pub fn new(log: Arc<dyn LogSink>) -> Self {
        Self { log }
    }

    /// Whether some line of `file` matches `pattern`
    pub fn find(&self, file: &Path, pattern: &LinePattern) -> LogMatch {
        if pattern.whole_file {
            return match self.read_all(file) {
                Some(text) if pattern.regex.is_match(&text) => LogMatch::Found,
                Some(_) => LogMatch::NotFound,
                None => LogMatch::Unreadable,
            };
        }

        let Some(mut reader) = self.open(file) else {
            return LogMatch::Unreadable;
        };
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => return LogMatch::NotFound,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    let line = line.trim_end_matches(['\n', '\r']);
                    if pattern.regex.is_match(line) {
                        return LogMatch::Found;
                    }
                }
                Err(e) => {
                    self.log
                        .warn_with(&format!("Cannot read file '{}'", file.display()), &e);
                    return LogMatch::Unreadable;
                }
            }
        }
    }

    /// Named group `group` of the first match of `pattern` in `file`.
    ///
    /// `None` if the file is unreadable, nothing matches, or the group did not
    /// participate in the match.
    pub fn capture(&self, file: &Path, pattern: &LinePattern, group: &str) -> Option<String> {
        let text = self.read_all(file)?;
        pattern
            .regex
            .captures(&text)
            .and_then(|caps| caps.name(group).map(|m| m.as_str().to_string()))
    }

    /// Distinct values of group `group` over all lines matching `pattern`.
    ///
    /// `None` if the file cannot be read.
    pub fn collect_matches(
        &self,
        file: &Path,
        pattern: &LinePattern,
        group: usize,
    ) -> Option<BTreeSet<String>> {
        let text = self.read_all(file)?;
        Some(
            text.lines()
                .filter_map(|line| pattern.regex.captures(line))
                .filter_map(|caps| caps.get(group).map(|m| m.as_str().to_string()))
                .collect(),
        )
    }

    /// Error evidence in a tool log.
    ///
    /// A missing log means the tool died early and is logged as an error. A
    /// matching line is a warning pointing at the log. An existing but
    /// unreadable log has already been reported by [`Self::find`].
    pub fn log_errs(&self, log_file: &Path, command: &str, pattern: &LinePattern) {
        match self.find(log_file, pattern) {
            LogMatch::Found => self.log.warn(&format!(
                "Running {} failed. Errors logged in '{}'",
                command,
                log_file.display()
            )),
            LogMatch::NotFound => {}
            LogMatch::Unreadable => {
                if !log_file.exists() {
                    self.log.error(&format!(
                        "Running {} failed: no log file '{}' written",
                        command,
                        log_file.display()
                    ));
                }
            }
        }
    }

    /// Warns if `log_file` shows `what` (warnings, bad boxes) of `command`
    pub fn log_warns(&self, log_file: &Path, command: &str, pattern: &LinePattern, what: &str) {
        if log_file.exists() && self.find(log_file, pattern).is_found() {
            self.log.warn(&format!(
                "Running {} emitted {} logged in '{}'",
                command,
                what,
                log_file.display()
            ));
        }
    }

    fn open(&self, file: &Path) -> Option<BufReader<File>> {
        match File::open(file) {
            Ok(f) => Some(BufReader::new(f)),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                self.log
                    .warn_with(&format!("Cannot open file '{}'", file.display()), &e);
                None
            }
        }
    }

    fn read_all(&self, file: &Path) -> Option<String> {
        match std::fs::read(file) {
            Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                self.log
                    .warn_with(&format!("Cannot read file '{}'", file.display()), &e);
                None
            }
        }
    }
}
