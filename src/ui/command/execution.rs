//! Commands that give control back to the engine.

use crate::debugger::engine::Engine;
use crate::debugger::Debugger;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Run until the next breakpoint, optionally stop at the next fork.
    Continue { stop_on_branch: bool },
    /// Remove all breakpoints and run until the end.
    Run,
    /// Run until the source line changes.
    Step,
    /// Execute a single instruction.
    StepInstruction,
}

pub enum ExecutionResult {
    Continued { stop_on_branch: bool },
    Ran { removed: usize },
    Stepped,
}

pub struct Handler<'a, E: Engine> {
    dbg: &'a mut Debugger,
    engine: &'a mut E,
}

impl<'a, E: Engine> Handler<'a, E> {
    pub fn new(debugger: &'a mut Debugger, engine: &'a mut E) -> Self {
        Self {
            dbg: debugger,
            engine,
        }
    }

    pub fn handle(&mut self, cmd: &Command) -> ExecutionResult {
        match *cmd {
            Command::Continue { stop_on_branch } => {
                self.dbg.continue_execution(stop_on_branch);
                ExecutionResult::Continued { stop_on_branch }
            }
            Command::Run => {
                let removed = self.dbg.run(self.engine);
                ExecutionResult::Ran { removed }
            }
            Command::Step => {
                self.dbg.step();
                ExecutionResult::Stepped
            }
            Command::StepInstruction => {
                self.dbg.step_instruction();
                ExecutionResult::Stepped
            }
        }
    }
}
