use crate::debugger::breakpoint::{BreakpointKind, BreakpointView};
use crate::debugger::engine::{Engine, StateId, StateSnapshot, Statistics};
use crate::debugger::{Debugger, Error};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Breakpoints(BreakpointKind),
    Stack,
    Constraints,
    /// All live states, `compact` forces one line per state.
    States { compact: bool },
    Stats,
    /// Current state only.
    State,
}

pub enum ExecutionResult<'a> {
    Breakpoints {
        kind: BreakpointKind,
        list: Vec<BreakpointView<'a>>,
    },
    Stack(StateSnapshot),
    Constraints(Vec<String>),
    States {
        states: Vec<StateSnapshot>,
        current: Option<StateId>,
        compact: bool,
    },
    Stats(Statistics),
    State {
        snapshot: StateSnapshot,
        compact: bool,
    },
}

pub struct Handler<'a, E: Engine> {
    dbg: &'a Debugger,
    engine: &'a E,
}

impl<'a, E: Engine> Handler<'a, E> {
    pub fn new(debugger: &'a Debugger, engine: &'a E) -> Self {
        Self {
            dbg: debugger,
            engine,
        }
    }

    pub fn handle(&self, cmd: &Command) -> Result<ExecutionResult<'a>, Error> {
        let result = match *cmd {
            Command::Breakpoints(kind) => ExecutionResult::Breakpoints {
                kind,
                list: self.dbg.breakpoint_list(Some(kind)),
            },
            Command::Stack => ExecutionResult::Stack(self.dbg.current_snapshot(self.engine)?),
            Command::Constraints => {
                ExecutionResult::Constraints(self.dbg.current_snapshot(self.engine)?.constraints)
            }
            Command::States { compact } => {
                let states: Vec<_> = self
                    .engine
                    .states()
                    .into_iter()
                    .filter_map(|state| self.engine.snapshot(state))
                    .collect();
                let options = self.dbg.options();
                ExecutionResult::States {
                    compact: compact
                        || options.compact
                        || states.len() > options.compact_threshold,
                    current: self.engine.current_state(),
                    states,
                }
            }
            Command::Stats => ExecutionResult::Stats(self.engine.statistics()),
            Command::State => ExecutionResult::State {
                snapshot: self.dbg.current_snapshot(self.engine)?,
                compact: self.dbg.options().compact,
            },
        };
        Ok(result)
    }
}
