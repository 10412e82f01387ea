use crate::debugger::engine::{Engine, StateId};
use crate::debugger::{
    Debugger, Error, InputReport, StateDirection, TerminateOutcome, TerminateTarget,
};
use crate::ui::command::parser::state_address;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Next,
    Prev,
    /// Switch to state by its address, `0x` prefix is optional.
    Move(String),
    Terminate(TerminateTarget),
    GenerateInput,
}

pub enum ExecutionResult {
    Moved(StateId),
    Terminated(TerminateOutcome),
    Input(InputReport),
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

    pub fn handle(&mut self, cmd: &Command) -> Result<ExecutionResult, Error> {
        let result = match cmd {
            Command::Next => {
                ExecutionResult::Moved(self.dbg.move_state(self.engine, StateDirection::Next)?)
            }
            Command::Prev => {
                ExecutionResult::Moved(self.dbg.move_state(self.engine, StateDirection::Prev)?)
            }
            Command::Move(address) => {
                let addr =
                    state_address(address).ok_or_else(|| Error::InvalidAddress(address.clone()))?;
                ExecutionResult::Moved(self.dbg.move_to_state(self.engine, addr)?)
            }
            Command::Terminate(target) => {
                ExecutionResult::Terminated(self.dbg.terminate(self.engine, *target)?)
            }
            Command::GenerateInput => {
                ExecutionResult::Input(self.dbg.generate_input(&*self.engine)?)
            }
        };
        Ok(result)
    }
}
