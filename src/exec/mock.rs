//! Scripted spawner for tests.
//!
//! Each program name can be given a behavior closure that emulates the real
//! tool, typically by writing the files it would produce into the working
//! directory. Unscripted programs succeed without side effects.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::spawn::{ProcessCommand, ProcessOutput, Spawner};
use crate::error::{BuildError, Result};

type Behavior = Arc<dyn Fn(&ProcessCommand) -> ProcessOutput + Send + Sync>;

#[derive(Clone, Default)]
pub struct MockSpawner {
    behaviors: Arc<Mutex<HashMap<String, Behavior>>>,
    unspawnable: Arc<Mutex<HashSet<String>>>,
    call_history: Arc<Mutex<Vec<ProcessCommand>>>,
}

impl MockSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the behavior of `program`, replacing any earlier script
    pub fn on<F>(&self, program: &str, behavior: F) -> &Self
    where
        F: Fn(&ProcessCommand) -> ProcessOutput + Send + Sync + 'static,
    {
        if let Ok(mut behaviors) = self.behaviors.lock() {
            behaviors.insert(program.to_string(), Arc::new(behavior));
        }
        self
    }

    /// Make spawning `program` fail as if it were not installed
    pub fn unspawnable(&self, program: &str) -> &Self {
        if let Ok(mut set) = self.unspawnable.lock() {
            set.insert(program.to_string());
        }
        self
    }

    pub fn get_call_history(&self) -> Vec<ProcessCommand> {
        self.call_history
            .lock()
            .map(|h| h.clone())
            .unwrap_or_default()
    }

    /// Calls made to `program`, in order
    pub fn calls_to(&self, program: &str) -> Vec<ProcessCommand> {
        self.get_call_history()
            .into_iter()
            .filter(|cmd| cmd.program_name() == program)
            .collect()
    }

    pub fn call_count(&self, program: &str) -> usize {
        self.calls_to(program).len()
    }

    pub fn verify_called(&self, program: &str, times: usize) -> bool {
        self.call_count(program) == times
    }

    pub fn reset(&self) {
        if let Ok(mut history) = self.call_history.lock() {
            history.clear();
        }
    }
}

#[async_trait]
impl Spawner for MockSpawner {
    async fn spawn(&self, command: &ProcessCommand) -> Result<ProcessOutput> {
        let name = command.program_name().to_string();
        if let Ok(mut history) = self.call_history.lock() {
            history.push(command.clone());
        }

        let refused = self
            .unspawnable
            .lock()
            .map(|set| set.contains(&name))
            .unwrap_or(false);
        if refused {
            return Err(BuildError::Spawn {
                command: command.program.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "mock: not installed"),
            });
        }

        let behavior = self
            .behaviors
            .lock()
            .ok()
            .and_then(|behaviors| behaviors.get(&name).cloned());
        Ok(match behavior {
            Some(behavior) => behavior(command),
            None => ProcessOutput::success(""),
        })
    }
}
