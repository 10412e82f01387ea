//! Line input and interruption plumbing of the prompt loop.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Result of a single blocking read.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome {
    Line(String),
    /// Operator pressed Ctrl-C while typing.
    Interrupted,
    EndOfInput,
}

/// Source of operator input.
pub trait LineSource {
    /// Block until a line is available.
    fn read_line(&mut self, prompt: &str) -> anyhow::Result<ReadOutcome>;

    /// Record a line in the input history.
    fn add_history(&mut self, _line: &str) {}
}

/// Line source replaying a fixed script, never blocks.
///
/// Script exhaustion reads as end of input.
#[derive(Debug, Default)]
pub struct ScriptedLines {
    script: VecDeque<ReadOutcome>,
    prompts: Vec<String>,
    history: Vec<String>,
}

impl ScriptedLines {
    pub fn new<S: Into<String>>(lines: impl IntoIterator<Item = S>) -> Self {
        Self {
            script: lines
                .into_iter()
                .map(|line| ReadOutcome::Line(line.into()))
                .collect(),
            ..Default::default()
        }
    }

    /// Append an arbitrary outcome to the script.
    pub fn push(&mut self, outcome: ReadOutcome) {
        self.script.push_back(outcome);
    }

    /// Prompts shown so far, in order.
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Number of unread script entries.
    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl LineSource for ScriptedLines {
    fn read_line(&mut self, prompt: &str) -> anyhow::Result<ReadOutcome> {
        self.prompts.push(prompt.to_string());
        Ok(self.script.pop_front().unwrap_or(ReadOutcome::EndOfInput))
    }

    fn add_history(&mut self, line: &str) {
        self.history.push(line.to_string());
    }
}

/// Asynchronous interruption request, set from a signal handler and polled at prompt entry.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag(Arc<AtomicBool>);

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear the flag, return `true` if it was set.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

/// How the prompt loop ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PromptExit {
    /// Control returns to the engine.
    Resume,
    /// Operator asked to quit.
    Quit,
    /// No more input.
    EndOfInput,
}
