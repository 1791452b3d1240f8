//! Tool execution with target-file update checking.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use super::spawn::{ProcessCommand, ProcessOutput, Spawner};
use crate::error::{BuildError, Result};
use crate::logging::LogSink;

/// Minimum age a target must have before a run so that a rewrite shows a
/// newer mtime, even on filesystems with one-second timestamps.
pub const UPDATE_WINDOW: Duration = Duration::from_millis(1001);

/// A target file as seen before or after a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TargetState {
    Absent,
    Modified(SystemTime),
    /// Exists, but its mtime cannot be read
    Unknown,
}

impl TargetState {
    fn of(path: &Path) -> Self {
        match fs::metadata(path) {
            Ok(meta) => meta
                .modified()
                .map(TargetState::Modified)
                .unwrap_or(TargetState::Unknown),
            Err(e) if e.kind() == ErrorKind::NotFound => TargetState::Absent,
            Err(_) => TargetState::Unknown,
        }
    }
}

/// Runs external tools and reports what happened to their declared outputs.
///
/// Only a failure to start the tool is an error. A nonzero exit code and
/// missing or stale targets are logged as warnings and left to the caller,
/// which knows from the tool's log whether they matter.
#[derive(Clone)]
pub struct CommandRunner {
    spawner: Arc<dyn Spawner>,
    log: Arc<dyn LogSink>,
    tex_path: Option<PathBuf>,
    timeout: Option<Duration>,
    update_window: Duration,
}

impl CommandRunner {
    pub fn new(spawner: Arc<dyn Spawner>, log: Arc<dyn LogSink>) -> Self {
        Self {
            spawner,
            log,
            tex_path: None,
            timeout: None,
            update_window: UPDATE_WINDOW,
        }
    }

    /// Directory to look up tool executables in
    pub fn with_tex_path(mut self, tex_path: Option<PathBuf>) -> Self {
        self.tex_path = tex_path;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_update_window(mut self, window: Duration) -> Self {
        self.update_window = window;
        self
    }

    fn executable(&self, command: &str) -> String {
        match &self.tex_path {
            Some(dir) => dir.join(command).to_string_lossy().into_owned(),
            None => command.to_string(),
        }
    }

    /// Run `command` with `args` in `working_dir`, checking `targets` afterwards
    pub async fn execute(
        &self,
        working_dir: &Path,
        command: &str,
        args: &[String],
        targets: &[PathBuf],
    ) -> Result<ProcessOutput> {
        if !working_dir.exists() {
            return Err(BuildError::MissingDirectory(working_dir.to_path_buf()));
        }
        if !working_dir.is_dir() {
            return Err(BuildError::NotADirectory(working_dir.to_path_buf()));
        }

        let before: Vec<TargetState> = targets.iter().map(|t| TargetState::of(t)).collect();
        self.wait_for_update_window(&before).await;

        self.log.debug(&format!(
            "Running {} {} in '{}'",
            command,
            args.join(" "),
            working_dir.display()
        ));
        let invocation = ProcessCommand::new(self.executable(command), working_dir)
            .args(args.iter().cloned())
            .timeout(self.timeout);
        let output = self.spawner.spawn(&invocation).await?;

        if !output.is_success() {
            match output.exit_code {
                Some(code) => self.log.warn(&format!(
                    "Running {} failed with return code {}",
                    command, code
                )),
                None => self
                    .log
                    .warn(&format!("Running {} was terminated by a signal", command)),
            }
        }

        for (target, before) in targets.iter().zip(before) {
            self.check_target(target, before);
        }
        Ok(output)
    }

    async fn wait_for_update_window(&self, before: &[TargetState]) {
        let now = SystemTime::now();
        let youngest = before
            .iter()
            .filter_map(|state| match state {
                TargetState::Modified(mtime) => {
                    Some(now.duration_since(*mtime).unwrap_or(Duration::ZERO))
                }
                _ => None,
            })
            .min();
        if let Some(age) = youngest
            && age < self.update_window
        {
            tokio::time::sleep(self.update_window - age).await;
        }
    }

    fn check_target(&self, target: &Path, before: TargetState) {
        let after = TargetState::of(target);
        match (before, after) {
            (_, TargetState::Absent) => self.log.warn(&format!(
                "No target file '{}' written",
                target.display()
            )),
            (TargetState::Absent, _) => {}
            (TargetState::Modified(old), TargetState::Modified(new)) => {
                if new <= old {
                    self.log.warn(&format!(
                        "Target file '{}' is not updated",
                        target.display()
                    ));
                }
            }
            _ => self.log.warn(&format!(
                "Cannot read modification time of target file '{}'; may be outdated",
                target.display()
            )),
        }
    }
}
