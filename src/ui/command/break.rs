use crate::debugger::breakpoint::{BreakpointKind, BreakpointView, DeleteOutcome};
use crate::debugger::engine::Engine;
use crate::debugger::{Debugger, Error};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Add {
        kind: BreakpointKind,
        /// `file:line` or a function name.
        location: String,
    },
    /// Remove entries by number, all entries if empty.
    Delete(Vec<u32>),
}

pub struct Handler<'a, E: Engine> {
    dbg: &'a mut Debugger,
    engine: &'a mut E,
}

pub enum ExecutionResult {
    New(BreakpointView<'static>),
    Removed(DeleteOutcome),
}

impl<'a, E: Engine> Handler<'a, E> {
    pub fn new(debugger: &'a mut Debugger, engine: &'a mut E) -> Self {
        Self {
            dbg: debugger,
            engine,
        }
    }

    pub fn handle(&mut self, cmd: &Command) -> Result<ExecutionResult, Error> {
        let result = match cmd {
            Command::Add { kind, location } => {
                let view = self.dbg.add_breakpoint(self.engine, location, *kind)?;
                ExecutionResult::New(view.to_owned())
            }
            Command::Delete(numbers) => {
                ExecutionResult::Removed(self.dbg.delete_breakpoints(self.engine, numbers))
            }
        };
        Ok(result)
    }
}
