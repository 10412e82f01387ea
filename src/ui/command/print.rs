use crate::debugger::engine::Engine;
use crate::debugger::{Debugger, Error};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Print value of a variable visible at the current instruction.
    Variable(String),
    /// Replace variable memory with a fresh symbolic value.
    SetSymbolic(String),
}

pub enum ExecutionResult {
    Value { name: String, value: String },
    Symbolic(String),
}

pub struct Handler<'a, E: Engine> {
    dbg: &'a Debugger,
    engine: &'a mut E,
}

impl<'a, E: Engine> Handler<'a, E> {
    pub fn new(debugger: &'a Debugger, engine: &'a mut E) -> Self {
        Self {
            dbg: debugger,
            engine,
        }
    }

    pub fn handle(self, cmd: Command) -> Result<ExecutionResult, Error> {
        match cmd {
            Command::Variable(name) => {
                let value = self.dbg.read_variable(&*self.engine, &name)?;
                Ok(ExecutionResult::Value { name, value })
            }
            Command::SetSymbolic(name) => {
                self.dbg.make_symbolic(self.engine, &name)?;
                Ok(ExecutionResult::Symbolic(name))
            }
        }
    }
}
