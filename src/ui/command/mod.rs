//! An interface to a debugger.
//! This is the most preferred way to use a debugger functional from UI layer.
//!
//! Contains commands and corresponding command handlers. Command is a some sort of request to
//! debugger that define an action and a list of input arguments. Command handler validate command,
//! define what exactly debugger must to do and return result of it.

pub mod r#break;
pub mod execution;
pub mod info;
pub mod node;
pub mod parser;
pub mod print;
pub mod state;

use crate::debugger::Error;

/// Command line parsing failure.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("unknown command")]
    UnknownCommand,
    #[error("missing argument for \"{0}\"")]
    MissingArgument(String),
    #[error("unsupported option or argument for \"{0}\": {1}")]
    UnsupportedArgument(String, String),
    #[error("conflicting options for \"{0}\"")]
    ConflictingOption(String),
}

#[derive(thiserror::Error, Debug)]
pub enum CommandError {
    #[error("malformed command: {0}")]
    Parsing(#[from] ParseError),
    #[error("render error: \n{0}")]
    FileRender(anyhow::Error),
    #[error(transparent)]
    Handle(#[from] Error),
}

/// Outcome of a command executed from the prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandResult {
    pub succeeded: bool,
    /// `false` if control must return to the engine.
    pub remain_in_prompt: bool,
    pub message: String,
}

impl CommandResult {
    pub fn stay(message: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            remain_in_prompt: true,
            message: message.into(),
        }
    }

    pub fn resume(message: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            remain_in_prompt: false,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            remain_in_prompt: true,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Toggle {
    Compact,
    StopOnError,
}

/// External commands that can be processed by the debugger.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Execution(execution::Command),
    Quit,
    Breakpoint(r#break::Command),
    Print(print::Command),
    Info(info::Command),
    State(state::Command),
    List(Option<String>),
    /// Source code around the current line, bounds default to the configured ones.
    Source(Option<u64>),
    Toggle(Toggle),
    Help(Vec<String>),
    /// Choice between forked states, 1-based.
    Select {
        index: usize,
        terminate_others: bool,
    },
}
